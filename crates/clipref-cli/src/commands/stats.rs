use anyhow::Result;
use clipref_core::reference::ReferenceStore;

use super::context::CliContext;

pub fn run(ctx: &CliContext) -> Result<()> {
    let stats = ctx.store().stats();

    println!("📦 Storage: {}", ctx.data_dir().display());
    println!("   References:    {}", stats.total_references);
    println!("   Size:          {} bytes", stats.estimated_size);
    println!("   Schema:        v{}", stats.version);
    match stats.last_updated {
        Some(ts) => println!("   Last updated:  {}", super::format_timestamp(ts)),
        None => println!("   Last updated:  never"),
    }

    Ok(())
}
