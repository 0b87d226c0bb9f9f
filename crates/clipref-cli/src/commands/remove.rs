use anyhow::Result;
use clipref_core::error::CliprefError;

use super::context::CliContext;

pub fn run(ctx: &CliContext, id: &str) -> Result<()> {
    if !ctx.service(None).remove_reference(id) {
        return Err(CliprefError::not_found("reference", id).into());
    }
    println!("🗑️  Removed reference {}", id);
    Ok(())
}
