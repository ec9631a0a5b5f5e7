use std::path::Path;

use eyre::WrapErr;
use refnet_model::{store::Snapshot, MemoryStore};
use tokio::{fs, io::AsyncWriteExt};

/// Load the state file, or start from an empty store if it does not exist yet.
pub async fn load(path: impl AsRef<Path>) -> eyre::Result<MemoryStore> {
    let path = path.as_ref();
    if !fs::try_exists(path).await? {
        tracing::debug!(path = %path.display(), "state file not found, starting empty");
        return Ok(MemoryStore::default());
    }
    let content = fs::read_to_string(path)
        .await
        .wrap_err_with(|| format!("reading state file `{}`", path.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&content)
        .wrap_err_with(|| format!("parsing state file `{}`", path.display()))?;
    Ok(MemoryStore::from_snapshot(snapshot)?)
}

/// Write the committed state of `store` to the state file.
///
/// The file is replaced atomically.
pub async fn save(path: impl AsRef<Path>, store: &MemoryStore) -> eyre::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_string_pretty(&store.snapshot()?)?;
    let tmp = path.with_extension("json.tmp");
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp)
        .await?;
    file.write_all(content.as_bytes()).await?;
    file.sync_all().await?;
    fs::rename(&tmp, path).await?;
    tracing::debug!(path = %path.display(), "state saved");
    Ok(())
}
