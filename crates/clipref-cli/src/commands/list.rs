use anyhow::{Context, Result};
use clipref_core::reference::{CopyReference, ReferenceStore};

use super::context::CliContext;

pub fn run(
    ctx: &CliContext,
    session: Option<&str>,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let references = match session {
        Some(_) => ctx.service(session).references(),
        None => ctx.store().load(),
    };
    let shown: Vec<CopyReference> = references
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .collect();

    if json {
        let out = serde_json::to_string_pretty(&shown).context("Failed to serialize references")?;
        println!("{}", out);
        return Ok(());
    }

    if shown.is_empty() {
        println!("No references stored.");
        return Ok(());
    }

    for reference in &shown {
        let agent = match (&reference.agent_name, reference.agent_index) {
            (Some(name), Some(index)) => format!("{} #{}", name, index),
            (Some(name), None) => name.clone(),
            (None, Some(index)) => format!("agent #{}", index),
            (None, None) => "-".to_string(),
        };
        println!(
            "{}  {}  [{}] {}  {}",
            reference.id,
            super::format_timestamp(reference.timestamp),
            reference.source_type,
            agent,
            reference.truncated_preview.replace('\n', " ")
        );
        if let Some(session_id) = &reference.session_id {
            println!("    session: {}", session_id);
        }
    }

    Ok(())
}
