use refnet_model::{action::DistributionReport, MemberId};
use rust_decimal::Decimal;
use serde_json::json;

use crate::config::DisplayOptions;

use super::{Command, Context};

/// Open a wallet.
#[derive(Debug, clap::Args)]
pub struct Open {
    /// The member.
    member: MemberId,
}

impl Command for Open {
    async fn execute(&self, ctx: Context<'_>) -> eyre::Result<()> {
        let wallet = ctx.network()?.open_wallet(self.member)?;
        ctx.save().await?;
        println!(
            "{}",
            ctx.output()
                .display_one(&wallet, DisplayOptions::default())?
        );
        Ok(())
    }
}

/// Place a member.
#[derive(Debug, clap::Args)]
pub struct Place {
    /// Who introduces the member.
    sponsor: MemberId,
    /// The member to place.
    member: MemberId,
}

impl Command for Place {
    async fn execute(&self, ctx: Context<'_>) -> eyre::Result<()> {
        let placement = ctx.network()?.place(self.sponsor, self.member)?;
        ctx.save().await?;
        println!(
            "{}",
            ctx.output().display_one(
                placement,
                DisplayOptions::table_projection([
                    ("edge.child", "Member"),
                    ("edge.sponsor", "Sponsor"),
                    ("edge.parent", "Parent"),
                    ("edge.position", "Position"),
                    ("level", "Level"),
                ]),
            )?
        );
        Ok(())
    }
}

/// Enroll a member.
#[derive(Debug, clap::Args)]
pub struct Enroll {
    /// Who introduces the member.
    sponsor: MemberId,
    /// The member to enroll.
    member: MemberId,
    /// Enrollment reward.
    reward: Decimal,
    /// Reference to the event causing the enrollment.
    #[arg(long)]
    origin: Option<String>,
}

impl Command for Enroll {
    async fn execute(&self, ctx: Context<'_>) -> eyre::Result<()> {
        let report = ctx.network()?.enroll(
            self.sponsor,
            self.member,
            self.reward,
            self.origin.as_deref(),
        )?;
        ctx.save().await?;
        let output = ctx.output();
        println!(
            "{}",
            output.display_one(
                &report,
                DisplayOptions::table_projection([
                    ("member", "Member"),
                    ("wallet_opened", "Wallet Opened"),
                    ("placement.edge.parent", "Parent"),
                    ("placement.edge.position", "Position"),
                    ("placement.level", "Level"),
                    ("split.personal", "Personal"),
                    ("split.referral", "Referral"),
                    ("split.community", "Community"),
                    ("split.reserve", "Reserve"),
                    ("distribution.credited_total", "Distributed"),
                    ("unallocated", "Unallocated"),
                ]),
            )?
        );
        if output.is_table() {
            println!("{}", display_credits(&ctx, report.distribution())?);
        }
        Ok(())
    }
}

/// Distribute a pool.
#[derive(Debug, clap::Args)]
pub struct Distribute {
    /// The member whose ancestors receive the pool.
    anchor: MemberId,
    /// The pool.
    pool: Decimal,
    /// Reference to the event causing the distribution.
    #[arg(long)]
    origin: Option<String>,
}

impl Command for Distribute {
    async fn execute(&self, ctx: Context<'_>) -> eyre::Result<()> {
        let report =
            ctx.network()?
                .distribute(self.anchor, self.pool, self.origin.as_deref())?;
        ctx.save().await?;
        let output = ctx.output();
        println!(
            "{}",
            output.display_one(
                &report,
                DisplayOptions::table_projection([
                    ("anchor", "Anchor"),
                    ("pool", "Pool"),
                    ("credited_total", "Credited"),
                    ("undistributed", "Undistributed"),
                ]),
            )?
        );
        if output.is_table() {
            println!("{}", display_credits(&ctx, &report)?);
        }
        Ok(())
    }
}

/// Record a referral.
#[derive(Debug, clap::Args)]
pub struct RecordReferral {
    /// The member who referred someone.
    member: MemberId,
    /// Reference to the event causing the referral.
    #[arg(long)]
    origin: Option<String>,
}

impl Command for RecordReferral {
    async fn execute(&self, ctx: Context<'_>) -> eyre::Result<()> {
        let report = ctx
            .network()?
            .record_referral(self.member, self.origin.as_deref())?;
        ctx.save().await?;
        println!(
            "{}",
            ctx.output().display_one(
                report,
                DisplayOptions::table_projection([
                    ("member", "Member"),
                    ("referral_count", "Referrals"),
                    ("unlock.previous_level", "Previous Level"),
                    ("unlock.unlocked_level", "Unlocked Level"),
                    ("unlock.released", "Released"),
                ]),
            )?
        );
        Ok(())
    }
}

fn display_credits(ctx: &Context<'_>, report: &DistributionReport) -> eyre::Result<String> {
    let credited = report.credits().iter().map(|credit| {
        json!({
            "level": credit.level,
            "member": credit.member,
            "amount": credit.amount,
            "locked": credit.locked,
            "status": "credited",
        })
    });
    let missed = report.gaps().iter().map(|gap| {
        json!({
            "level": gap.level,
            "member": gap.member,
            "amount": gap.amount,
            "locked": null,
            "status": "no wallet",
        })
    });
    ctx.output().display_many(
        credited.chain(missed),
        DisplayOptions::table_projection([
            ("level", "Level"),
            ("member", "Member"),
            ("amount", "Amount"),
            ("locked", "Locked"),
            ("status", "Status"),
        ]),
    )
}
