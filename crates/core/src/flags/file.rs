//! YAML-file settings table.
//!
//! The file holds a list of `{key, value}` rows. A missing file means "no rows" (all defaults).
//! Updates are written to a sibling temp file and renamed into place so readers never observe a
//! half-written table.

use super::{FeatureFlags, FlagKey, FlagStore, SettingRow};
use crate::error::{FlagStoreError, FlagStoreResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[derive(Debug)]
pub struct FileFlagStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileFlagStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_rows(&self) -> FlagStoreResult<Vec<SettingRow>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(Vec::new()),
            Ok(contents) => {
                serde_yaml::from_str(&contents).map_err(FlagStoreError::YamlDeserialization)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(FlagStoreError::FileRead(e)),
        }
    }

    async fn write_rows(&self, rows: &[SettingRow]) -> FlagStoreResult<()> {
        let yaml = serde_yaml::to_string(rows).map_err(FlagStoreError::YamlSerialization)?;
        let tmp = self.path.with_extension("yaml.tmp");
        tokio::fs::write(&tmp, yaml)
            .await
            .map_err(FlagStoreError::FileWrite)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(FlagStoreError::FileWrite)
    }
}

#[async_trait::async_trait]
impl FlagStore for FileFlagStore {
    async fn snapshot(&self) -> FlagStoreResult<FeatureFlags> {
        let rows = self.read_rows().await?;
        FeatureFlags::from_rows(&rows)
    }

    async fn update(
        &self,
        key: FlagKey,
        value: serde_json::Value,
    ) -> FlagStoreResult<FeatureFlags> {
        let _guard = self.write_lock.lock().await;

        let mut rows = self.read_rows().await?;
        let mut flags = FeatureFlags::from_rows(&rows)?;
        flags.apply(key, &value)?;

        match rows.iter_mut().find(|r| r.key == key.as_str()) {
            Some(row) => row.value = value,
            None => rows.push(SettingRow {
                key: key.as_str().to_owned(),
                value,
            }),
        }

        self.write_rows(&rows).await?;
        tracing::info!(flag = %key, path = %self.path.display(), "feature flag updated");
        Ok(flags)
    }
}
