use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::Store;

/// Keeps every slot in one JSON document on disk.
///
/// Each mutation rewrites the document through a temp file and a rename, so a
/// crash leaves either the old or the new document, never a torn one.
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

type Slots = BTreeMap<String, String>;

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Slots, String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                format!(
                    "Failed to parse token store {}: {}",
                    self.path.display(),
                    e
                )
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Slots::new()),
            Err(e) => Err(format!(
                "Failed to read token store {}: {}",
                self.path.display(),
                e
            )),
        }
    }

    async fn save(&self, slots: &Slots) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    format!("Failed to create directory {}: {}", parent.display(), e)
                })?;
            }
        }

        let contents = serde_json::to_string_pretty(slots)
            .map_err(|e| format!("Failed to serialize token store: {}", e))?;
        let tmp = self.path.with_extension("json.tmp");
        write_private(&tmp, contents.as_bytes()).await?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            format!(
                "Failed to move {} into place: {}",
                tmp.display(),
                e
            )
        })?;
        debug!("Token store written to '{}'", self.path.display());
        Ok(())
    }
}

/// Writes a file readable only by the owner on unix.
async fn write_private(path: &Path, contents: &[u8]) -> Result<(), String> {
    use tokio::io::AsyncWriteExt;

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(path)
        .await
        .map_err(|e| format!("Failed to open {} for writing: {}", path.display(), e))?;
    file.write_all(contents)
        .await
        .map_err(|e| format!("Failed to write to {}: {}", path.display(), e))?;
    file.sync_all()
        .await
        .map_err(|e| format!("Failed to flush {}: {}", path.display(), e))
}

#[async_trait]
impl Store for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, String> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let _guard = self.lock.lock().await;
        let mut slots = self.load().await?;
        slots.insert(key.to_string(), value.to_string());
        self.save(&slots).await
    }

    async fn remove(&self, key: &str) -> Result<(), String> {
        let _guard = self.lock.lock().await;
        let mut slots = self.load().await?;
        if slots.remove(key).is_none() {
            return Ok(());
        }
        self.save(&slots).await
    }
}
