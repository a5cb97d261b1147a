//! `keel upload`.

use anyhow::Result;
use keel_pipeline::upload_pipeline;

use crate::commands::execute;
use crate::Invocation;

pub fn run(invocation: &Invocation) -> Result<()> {
    let mut ctx = invocation.context();
    execute(&upload_pipeline(), &mut ctx)?;
    Ok(())
}
