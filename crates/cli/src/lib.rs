/// Configuration.
pub mod config;

/// Commands.
pub mod commands;

/// Persistence of the network state.
pub mod state;

/// Event sinks.
pub mod sink;

use std::{ops::Deref, path::PathBuf};

use clap::Parser;
use commands::{Command, Commands, Context};
use config::Config;
use eyre::OptionExt;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use refnet_model::Network;
use sink::LogSink;

const ENV_PREFIX: &str = "REFNET_";
const CONFIG_DIR: &str = "refnet";

/// We use `__` in the name of environment variable as an alias of `.`.
///
/// See [`Env`] for more infomation.
const DOT_ALIAS: &str = "__";

/// Command-line interface for the referral network.
#[derive(Debug)]
pub struct Cli(Inner);

impl Cli {
    /// Creates from the command line arguments.
    pub fn init() -> eyre::Result<Self> {
        Self::from_inner(Inner::parse())
    }

    /// Creates from the given arguments.
    pub fn try_parse_from<I, T>(args: I) -> eyre::Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::from_inner(Inner::try_parse_from(args)?)
    }

    fn from_inner(cli: Inner) -> eyre::Result<Self> {
        let config_path = cli.find_config()?;
        let Inner {
            config, command, ..
        } = cli;

        let config = Figment::new()
            .merge(Toml::file(config_path.clone()))
            .merge(Env::prefixed(ENV_PREFIX).split(DOT_ALIAS))
            .merge(Serialized::defaults(config))
            .extract()?;

        Ok(Self(Inner {
            config_path: Some(config_path),
            config,
            command,
        }))
    }
}

impl Deref for Cli {
    type Target = Inner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Command-line interface for the referral network.
#[derive(Debug, Parser)]
#[command(name = "refnet", version)]
pub struct Inner {
    /// Path to the config file.
    #[clap(long = "config", short)]
    config_path: Option<PathBuf>,
    /// Config.
    #[command(flatten)]
    config: Config,
    /// Commands.
    #[command(subcommand)]
    command: Commands,
}

impl Inner {
    fn find_config(&self) -> eyre::Result<PathBuf> {
        use etcetera::{choose_base_strategy, BaseStrategy};

        match self.config_path.as_ref() {
            Some(path) => Ok(path.clone()),
            None => {
                let strategy = choose_base_strategy()?;
                Ok(strategy.config_dir().join(CONFIG_DIR).join("config.toml"))
            }
        }
    }

    /// Get the resolved config.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute command.
    pub async fn execute(&self) -> eyre::Result<()> {
        let config_path = self
            .config_path
            .as_ref()
            .ok_or_eyre("config path is not set")?;
        let network = if self.command.is_network_required() {
            let store = state::load(self.config.state_path()?).await?;
            Some(Network::try_new(store, self.config.params()?)?.with_sink(LogSink))
        } else {
            None
        };
        self.command
            .execute(Context::new(config_path, &self.config, network.as_ref()))
            .await
    }
}
