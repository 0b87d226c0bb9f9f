use anyhow::Result;

use super::context::CliContext;

pub fn run(ctx: &CliContext) -> Result<()> {
    print!("{}", ctx.config.to_toml_string()?);
    Ok(())
}
