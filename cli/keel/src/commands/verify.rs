//! `keel verify`: check the host and record the resolved toolchain.

use anyhow::Result;
use keel_pipeline::verify_pipeline;

use crate::commands::execute;
use crate::Invocation;

pub fn run(invocation: &Invocation, install_core: bool) -> Result<()> {
    let mut ctx = invocation.context();
    ctx.install_missing_core = install_core;
    execute(&verify_pipeline(), &mut ctx)?;
    println!("Toolchain exports: {}", ctx.env_script_path.display());
    Ok(())
}
