use std::path::Path;

use refnet_cli::{state, Cli};
use refnet_model::{MemberId, Network, Params};
use rust_decimal_macros::dec;

async fn run(dir: &Path, args: &[&str]) -> eyre::Result<()> {
    let config = dir.join("config.toml");
    let state = dir.join("state.json");
    let mut argv = vec![
        "refnet".to_string(),
        "--config".to_string(),
        config.display().to_string(),
        "--state".to_string(),
        state.display().to_string(),
    ];
    argv.extend(args.iter().map(|arg| arg.to_string()));
    Cli::try_parse_from(argv)?.execute().await
}

#[tokio::test]
async fn operations_persist_between_runs() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;

    run(dir.path(), &["open", "1"]).await?;
    run(dir.path(), &["enroll", "1", "2", "100", "--origin", "signup-2"]).await?;
    run(dir.path(), &["enroll", "1", "3", "100"]).await?;
    run(dir.path(), &["distribute", "3", "50"]).await?;
    run(dir.path(), &["record-referral", "2"]).await?;
    run(dir.path(), &["--output", "json", "tree", "stats", "1"]).await?;
    run(dir.path(), &["ledger", "entries", "#1", "-n", "2"]).await?;
    run(dir.path(), &["ledger", "entries", "2", "--category", "personal"]).await?;
    run(dir.path(), &["ledger", "reconcile", "1"]).await?;
    assert!(run(dir.path(), &["ledger", "entries", "2", "--category", "bonus"])
        .await
        .is_err());

    let store = state::load(dir.path().join("state.json")).await?;
    let network = Network::try_new(store, Params::default())?;
    let sponsor = network.wallet(MemberId(1))?.expect("opened");
    assert_eq!(sponsor.referral_count(), 2);
    assert!(network.wallet(MemberId(3))?.is_some());
    assert_eq!(
        network.wallet(MemberId(2))?.map(|w| w.referral_count()),
        Some(1)
    );
    assert_eq!(network.statistics(MemberId(1))?.by_level, vec![2]);
    assert!(network
        .entries(MemberId(2))?
        .iter()
        .any(|entry| entry.origin.as_deref() == Some("signup-2")));
    assert!(network.reconcile(MemberId(1))?.is_balanced());
    assert!(*sponsor.referral_total() > dec!(0));
    Ok(())
}

#[tokio::test]
async fn failed_operation_leaves_state_untouched() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;

    run(dir.path(), &["open", "1"]).await?;
    run(dir.path(), &["place", "1", "2"]).await?;
    let before = tokio::fs::read_to_string(dir.path().join("state.json")).await?;

    assert!(run(dir.path(), &["place", "1", "2"]).await.is_err());
    assert!(run(dir.path(), &["enroll", "1", "1", "10"]).await.is_err());
    let after = tokio::fs::read_to_string(dir.path().join("state.json")).await?;
    assert_eq!(before, after);
    Ok(())
}

#[tokio::test]
async fn init_config_refuses_to_overwrite() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;

    run(dir.path(), &["init-config"]).await?;
    assert!(dir.path().join("config.toml").exists());
    assert!(run(dir.path(), &["init-config"]).await.is_err());
    run(dir.path(), &["init-config", "--force"]).await?;

    // The written config is picked up by later runs.
    run(dir.path(), &["params"]).await?;
    Ok(())
}

#[tokio::test]
async fn params_come_from_the_config_file() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    tokio::fs::write(
        dir.path().join("config.toml"),
        "[params]\nreserve_account = 99\n",
    )
    .await?;

    let cli = Cli::try_parse_from([
        "refnet",
        "--config",
        &dir.path().join("config.toml").display().to_string(),
        "params",
    ])?;
    assert_eq!(cli.config().params()?.reserve_account(), Some(MemberId(99)));
    Ok(())
}
