//! Durable JSON store for committed records.
//!
//! Writes always replace the whole snapshot: the new content goes to a
//! sibling `.updated` file which is then renamed over the store.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::records::{BaseInfo, ClientRecord, EntityId, InvoiceRecord};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub clients: BTreeMap<EntityId, ClientRecord>,
    #[serde(default)]
    pub invoices: BTreeMap<EntityId, InvoiceRecord>,
    #[serde(default)]
    pub base_info: BaseInfo,
}

#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the snapshot; a missing file is an empty store.
    pub fn load(&self) -> Result<Snapshot, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no store yet, starting empty");
                return Ok(Snapshot::default());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let snapshot = serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        Ok(snapshot)
    }

    pub fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(snapshot).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        let updated_path = self.path.with_extension("updated");
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        fs::write(&updated_path, json).map_err(io_err)?;
        fs::rename(&updated_path, &self.path).map_err(io_err)?;
        info!(
            path = %self.path.display(),
            clients = snapshot.clients.len(),
            invoices = snapshot.invoices.len(),
            "store saved"
        );
        Ok(())
    }

    /// Removes the store file. Clearing an absent store is not an error.
    pub fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
