use crate::config::OutputFormat;

use super::{Command, Context};

/// Show params.
#[derive(Debug, clap::Args)]
pub struct ShowParams {}

impl Command for ShowParams {
    fn is_network_required(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: Context<'_>) -> eyre::Result<()> {
        let params = ctx.config().params()?;
        let output = match ctx.output() {
            OutputFormat::Json => serde_json::to_string_pretty(&params)?,
            OutputFormat::Table => toml::to_string_pretty(&params)?,
        };
        println!("{output}");
        Ok(())
    }
}
