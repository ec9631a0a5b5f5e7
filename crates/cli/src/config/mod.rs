mod output;

use std::path::PathBuf;

use refnet_model::Params;

pub use output::{DisplayOptions, OutputFormat};

const STATE_DIR: &str = "refnet";
const STATE_FILE: &str = "state.json";

/// Configuration.
#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone, Default)]
pub struct Config {
    /// Path to the state file.
    #[arg(long, env = "REFNET_STATE")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<String>,
    /// Output format.
    #[arg(long, short, value_enum)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output: Option<OutputFormat>,
    /// Network params.
    ///
    /// Only read from the config file and the environment.
    #[arg(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    params: Option<Params>,
}

impl Config {
    /// Create the config written by `init-config`.
    pub fn template() -> eyre::Result<Self> {
        Ok(Self {
            state: Some(default_state_path()?.display().to_string()),
            output: Some(OutputFormat::default()),
            params: Some(Params::default()),
        })
    }

    /// Get the output format.
    pub fn output(&self) -> OutputFormat {
        self.output.unwrap_or_default()
    }

    /// Get the network params, validated.
    pub fn params(&self) -> eyre::Result<Params> {
        let params = self.params.clone().unwrap_or_default();
        params.validate()?;
        Ok(params)
    }

    /// Get the path to the state file.
    pub fn state_path(&self) -> eyre::Result<PathBuf> {
        match self.state.as_ref() {
            Some(path) => Ok(PathBuf::from(shellexpand::tilde(path).into_owned())),
            None => default_state_path(),
        }
    }
}

fn default_state_path() -> eyre::Result<PathBuf> {
    use etcetera::{choose_base_strategy, BaseStrategy};

    let strategy = choose_base_strategy()?;
    Ok(strategy.data_dir().join(STATE_DIR).join(STATE_FILE))
}
