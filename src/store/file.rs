//! FileStore - one JSON document per store, overwritten atomically.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, info};
use uuid::Uuid;

use super::in_memory::Tables;
use super::{BackingStore, ChangeOp, OpenStore};
use crate::config::CabinetConfig;
use crate::error::{StoreError, StoreResult};
use crate::query::Predicate;
use crate::storable::Row;

/// File-backed store at `<data_dir>/<store_name>.json`.
///
/// Every write stages the new table state, writes it to a temporary file and
/// renames it over the previous document. The in-memory copy is replaced only
/// once the rename succeeded, so a failed write leaves both untouched.
pub struct FileStore {
    path: PathBuf,
    tables: RwLock<Tables>,
}

impl FileStore {
    /// Open the document at `path`, starting empty if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let tables = if path.exists() {
            let bytes = fs::read(&path)?;
            serde_json::from_slice(&bytes)?
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            Tables::default()
        };

        info!(path = %path.display(), "opened file store");
        Ok(Self {
            path,
            tables: RwLock::new(tables),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    /// Write `tables` to the temp file, flush it to disk, then rename it over
    /// the document and sync the parent directory so the rename is durable.
    fn persist(&self, tables: &Tables) -> StoreResult<()> {
        let bytes = serde_json::to_vec(tables)?;
        let tmp = self.temp_path();

        let mut file = File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &self.path)?;
        sync_parent(&self.path)?;
        debug!(path = %self.path.display(), "persisted store document");
        Ok(())
    }
}

#[cfg(unix)]
fn sync_parent(path: &Path) -> StoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        File::open(parent)?.sync_all()?;
    }
    Ok(())
}

// Directories cannot be opened for syncing here; the rename is as durable as
// the platform makes it.
#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> StoreResult<()> {
    Ok(())
}

impl BackingStore for FileStore {
    fn query(&self, entity: &str, predicate: &Predicate) -> StoreResult<Vec<Row>> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::LockPoisoned("query"))?;
        tables.query(entity, predicate)
    }

    fn batch_delete(&self, entity: &str, field: &str, ids: &[Uuid]) -> StoreResult<usize> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::LockPoisoned("batch delete"))?;

        let mut staged = tables.clone();
        let removed = staged.batch_delete(entity, field, ids);
        if removed > 0 {
            self.persist(&staged)?;
            *tables = staged;
        }
        Ok(removed)
    }

    fn commit(&self, ops: &[ChangeOp]) -> StoreResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::LockPoisoned("commit"))?;

        let mut staged = tables.clone();
        staged.apply(ops);
        self.persist(&staged)?;
        *tables = staged;
        Ok(())
    }
}

impl OpenStore for FileStore {
    fn open_or_create(config: &CabinetConfig) -> StoreResult<Self> {
        if config.replication {
            return Err(StoreError::Unsupported(
                "file store cannot replicate to a remote sync service".into(),
            ));
        }
        Self::open(config.data_dir.join(format!("{}.json", config.store_name)))
    }
}
