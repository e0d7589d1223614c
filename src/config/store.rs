use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the persisted token record lives. We differentiate backends via a "type" tag in the YAML.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema, PartialEq)]
#[serde(tag = "type")]
pub enum StoreConfig {
    /// A JSON document on disk, surviving restarts.
    #[serde(rename = "file")]
    File(FileStoreConfig),
    /// Process memory only; everything is gone on exit.
    #[serde(rename = "memory")]
    Memory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File(FileStoreConfig::default())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, JsonSchema, PartialEq)]
pub struct FileStoreConfig {
    /// Defaults to `<data dir>/sessiontron/session.json`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl FileStoreConfig {
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => path.clone(),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("sessiontron")
                .join("session.json"),
        }
    }
}
