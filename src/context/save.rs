use tracing::{info, warn};

use super::StoreContext;
use crate::error::{CabinetError, Result};
use crate::store::BackingStore;

impl<B: BackingStore> StoreContext<B> {
    /// Commit every staged change atomically.
    ///
    /// Returns `false` without touching the backing store when nothing is
    /// staged. On failure the staged changes are kept so the caller can retry.
    ///
    /// The buffer stays open to other callers while the commit runs; rows
    /// restaged in that window remain staged for the next save.
    pub fn save(&self) -> Result<bool> {
        let _writer = self.lock_writer("save")?;
        let ops = {
            let buffer = self.lock_buffer("save")?;
            if buffer.is_empty() {
                return Ok(false);
            }
            buffer.ops()
        };

        if let Err(err) = self.store.commit(&ops) {
            warn!(changes = ops.len(), error = %err, "commit failed, keeping staged changes");
            return Err(CabinetError::CommitFailed(err));
        }

        self.lock_buffer("save")?.settle(&ops);
        info!(changes = ops.len(), "committed staged changes");
        Ok(true)
    }
}
