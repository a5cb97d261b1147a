//! `keel monitor`.

use anyhow::Result;
use keel_pipeline::monitor_pipeline;

use crate::commands::execute;
use crate::Invocation;

pub fn run(invocation: &Invocation) -> Result<()> {
    let mut ctx = invocation.context();
    execute(&monitor_pipeline(), &mut ctx)?;
    Ok(())
}
