use eyre::OptionExt;
use refnet_model::{ledger::Category, MemberId};
use serde_json::json;

use crate::config::DisplayOptions;

use super::Context;

/// Ledger queries.
#[derive(Debug, clap::Args)]
pub struct Ledger {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Show the wallet of a member.
    Wallet { member: MemberId },
    /// List the community buckets of a member.
    Buckets { member: MemberId },
    /// List the ledger entries of a member.
    Entries {
        member: MemberId,
        /// Only show entries of this category.
        #[arg(long)]
        category: Option<Category>,
        /// Only show the last `n` entries.
        #[arg(long, short = 'n')]
        last: Option<usize>,
    },
    /// Compare the buckets of a member with their wallet.
    Reconcile { member: MemberId },
}

impl super::Command for Ledger {
    async fn execute(&self, ctx: Context<'_>) -> eyre::Result<()> {
        let network = ctx.network()?;
        let output = ctx.output();
        let content = match &self.command {
            Command::Wallet { member } => {
                let wallet = network
                    .wallet(*member)?
                    .ok_or_eyre("wallet not found")?;
                let balance = wallet.balance()?;
                let summary = json!({
                    "member": wallet.member(),
                    "referral_count": wallet.referral_count(),
                    "unlocked_level": wallet.unlocked_level(),
                    "available": balance.available,
                    "locked": balance.locked,
                    "community_available": wallet.community_available(),
                    "community_locked": wallet.community_locked(),
                    "referral_total": wallet.referral_total(),
                    "personal_total": wallet.personal_total(),
                    "reserve_total": wallet.reserve_total(),
                });
                output.display_one(summary, DisplayOptions::default())?
            }
            Command::Buckets { member } => output.display_many(
                network.buckets(*member)?,
                DisplayOptions::table_projection([
                    ("level", "Level"),
                    ("locked", "Locked"),
                    ("available", "Available"),
                ]),
            )?,
            Command::Entries {
                member,
                category,
                last,
            } => {
                let mut entries = network.entries(*member)?;
                if let Some(category) = category {
                    entries.retain(|entry| entry.category == *category);
                }
                if let Some(last) = last {
                    let skip = entries.len().saturating_sub(*last);
                    entries = entries.split_off(skip);
                }
                output.display_many(
                    entries,
                    DisplayOptions::table_projection([
                        ("sequence", "Seq"),
                        ("category", "Category"),
                        ("kind", "Kind"),
                        ("amount", "Amount"),
                        ("locked", "Locked"),
                        ("level", "Level"),
                        ("balance.available", "Available"),
                        ("balance.locked", "Locked Balance"),
                        ("origin", "Origin"),
                    ]),
                )?
            }
            Command::Reconcile { member } => {
                let reconciliation = network.reconcile(*member)?;
                if !reconciliation.is_balanced() {
                    tracing::warn!(%member, "buckets and wallet disagree");
                }
                let mut value = serde_json::to_value(&reconciliation)?;
                if let Some(map) = value.as_object_mut() {
                    map.insert("balanced".into(), reconciliation.is_balanced().into());
                }
                output.display_one(value, DisplayOptions::default())?
            }
        };
        println!("{content}");
        Ok(())
    }
}
