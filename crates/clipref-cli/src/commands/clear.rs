use anyhow::Result;
use clipref_core::reference::ReferenceStore;

use super::context::CliContext;

pub fn run(ctx: &CliContext, session: Option<&str>) -> Result<()> {
    match session {
        Some(session_id) => {
            let service = ctx.service(Some(session_id));
            let count = service.references().len();
            service.clear_session_references();
            println!("🧹 Cleared {} references from session {}", count, session_id);
        }
        None => {
            ctx.store().clear();
            println!("🧹 Cleared all stored references");
        }
    }
    Ok(())
}
