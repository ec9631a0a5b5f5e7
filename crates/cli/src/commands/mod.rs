use std::path::Path;

use enum_dispatch::enum_dispatch;
use eyre::OptionExt;
use refnet_model::{MemoryStore, Network};

use crate::config::{Config, OutputFormat};

use init_config::InitConfig;
use ledger::Ledger;
use operations::{Distribute, Enroll, Open, Place, RecordReferral};
use show_params::ShowParams;
use tree::Tree;

mod init_config;
mod ledger;
mod operations;
mod show_params;
mod tree;

/// Commands.
#[enum_dispatch]
#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Initialize config file.
    InitConfig(InitConfig),
    /// Show the effective network params.
    Params(ShowParams),
    /// Open the wallet of a member.
    Open(Open),
    /// Place a member without paying out anything.
    Place(Place),
    /// Enroll a member under a sponsor and pay out the enrollment reward.
    Enroll(Enroll),
    /// Distribute a pool across the ancestors of an anchor.
    Distribute(Distribute),
    /// Record a direct referral.
    RecordReferral(RecordReferral),
    /// Tree queries.
    Tree(Tree),
    /// Ledger queries.
    Ledger(Ledger),
}

#[enum_dispatch(Commands)]
pub(crate) trait Command {
    fn is_network_required(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: Context<'_>) -> eyre::Result<()>;
}

/// Execution context.
pub struct Context<'a> {
    config_path: &'a Path,
    config: &'a Config,
    network: Option<&'a Network<MemoryStore>>,
}

impl<'a> Context<'a> {
    pub(super) fn new(
        config_path: &'a Path,
        config: &'a Config,
        network: Option<&'a Network<MemoryStore>>,
    ) -> Self {
        Self {
            config_path,
            config,
            network,
        }
    }

    pub(crate) fn config_path(&self) -> &Path {
        self.config_path
    }

    pub(crate) fn config(&self) -> &Config {
        self.config
    }

    pub(crate) fn output(&self) -> OutputFormat {
        self.config.output()
    }

    pub(crate) fn network(&self) -> eyre::Result<&'a Network<MemoryStore>> {
        self.network.ok_or_eyre("network is not loaded")
    }

    /// Write the network state back to the state file.
    pub(crate) async fn save(&self) -> eyre::Result<()> {
        let network = self.network()?;
        crate::state::save(self.config.state_path()?, network.store()).await
    }
}
