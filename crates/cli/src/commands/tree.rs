use refnet_model::MemberId;
use serde_json::json;

use crate::config::DisplayOptions;

use super::Context;

/// Tree queries.
#[derive(Debug, clap::Args)]
pub struct Tree {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Show the slot the next member sponsored by `sponsor` would take.
    Slot { sponsor: MemberId },
    /// Show subtree statistics.
    Stats { root: MemberId },
    /// List the structural ancestors of a member, nearest first.
    Ancestors { member: MemberId },
    /// Show the position of a member relative to one of its ancestors.
    Position {
        member: MemberId,
        /// The ancestor.
        #[arg(long)]
        ancestor: MemberId,
    },
}

impl super::Command for Tree {
    async fn execute(&self, ctx: Context<'_>) -> eyre::Result<()> {
        let network = ctx.network()?;
        let output = ctx.output();
        let content = match &self.command {
            Command::Slot { sponsor } => output.display_one(
                network.find_open_slot(*sponsor)?,
                DisplayOptions::table_projection([
                    ("parent", "Parent"),
                    ("position", "Position"),
                    ("level", "Level"),
                ]),
            )?,
            Command::Stats { root } => {
                let stats = network.statistics(*root)?;
                let mut content = output.display_one(
                    &stats,
                    DisplayOptions::table_projection([
                        ("root", "Root"),
                        ("total", "Total"),
                        ("max_level", "Max Level"),
                        ("left_leg_count", "Left Leg"),
                        ("right_leg_count", "Right Leg"),
                    ]),
                )?;
                if output.is_table() {
                    let levels = stats.by_level.iter().enumerate().map(|(idx, count)| {
                        json!({
                            "level": idx + 1,
                            "count": count,
                            "capacity": u32::try_from(idx + 1).ok().and_then(|shift| 1u64.checked_shl(shift)),
                        })
                    });
                    content.push('\n');
                    content.push_str(&output.display_many(levels, DisplayOptions::default())?);
                }
                content
            }
            Command::Ancestors { member } => output.display_many(
                network.ancestors(*member)?,
                DisplayOptions::table_projection([
                    ("level", "Level"),
                    ("ancestor", "Ancestor"),
                    ("position", "From"),
                ]),
            )?,
            Command::Position { member, ancestor } => {
                let Some(position) = network.position(*member, *ancestor)? else {
                    eyre::bail!("{member} is not below {ancestor}");
                };
                let summary = json!({
                    "member": position.node,
                    "ancestor": position.ancestor,
                    "level": position.level(),
                    "leg": position.leg(),
                });
                let mut content = output.display_one(summary, DisplayOptions::default())?;
                if output.is_table() {
                    content.push('\n');
                    content.push_str(&output.display_many(
                        &position.path,
                        DisplayOptions::table_projection([
                            ("level", "Level"),
                            ("ancestor", "Ancestor"),
                            ("position", "From"),
                        ]),
                    )?);
                }
                content
            }
        };
        println!("{content}");
        Ok(())
    }
}
