//! `keel build` (alias `compile`).

use anyhow::Result;
use keel_pipeline::build_pipeline;

use crate::commands::execute;
use crate::Invocation;

pub fn run(invocation: &Invocation) -> Result<()> {
    let mut ctx = invocation.context();
    execute(&build_pipeline(), &mut ctx)?;
    if let Some(staged) = &ctx.staged {
        for lib in &staged.libraries {
            let kind = if lib.reference.is_language_only() {
                "Swift only"
            } else {
                "Swift + native"
            };
            println!("  {:<16} {kind}", lib.reference.managed.leaf);
        }
        for collision in &staged.collisions {
            println!("  shim skipped (existing file kept): {collision}");
        }
    }
    println!("Artifacts: {}", ctx.arduino_build_dir.display());
    Ok(())
}
