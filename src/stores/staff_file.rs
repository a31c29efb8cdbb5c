use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use super::{StaffStore, StoreError};
use crate::models::{StaffAccount, StaffDocument};

/// Staff accounts in a single JSON document: `{ "users": [...] }`.
pub struct JsonFileStaffStore {
    path: PathBuf,
}

impl JsonFileStaffStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl StaffStore for JsonFileStaffStore {
    fn backend_tag(&self) -> &'static str {
        "json_file"
    }

    async fn load(&self) -> Result<Vec<StaffAccount>, StoreError> {
        if !tokio::fs::try_exists(&self.path).await? {
            info!(path = %self.path.display(), "users file not found, starting empty");
            return Ok(vec![]);
        }
        let txt = tokio::fs::read_to_string(&self.path).await?;
        let doc: StaffDocument = serde_json::from_str(&txt).map_err(|e| {
            StoreError::Malformed(format!("{}: {e}", self.path.display()))
        })?;
        Ok(doc.users)
    }

    async fn save(&self, accounts: &[StaffAccount]) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let doc = StaffDocument {
            users: accounts.to_vec(),
        };
        let txt = serde_json::to_string_pretty(&doc)
            .map_err(|e| StoreError::Malformed(e.to_string()))?;

        // Readers see either the old or the new document, never a partial one.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, txt).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
