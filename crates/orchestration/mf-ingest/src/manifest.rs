//! Durable ledger of completed batches.
//!
//! The manifest is a JSON object keyed by batch index, rewritten
//! atomically (temp file + rename) after every completed batch so a
//! crash can never leave a half-written ledger behind.

use mf_error::{MfError, Result, WriteError};
use mf_types::ManifestEntry;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct Manifest {
    path: PathBuf,
    entries: BTreeMap<u64, ManifestEntry>,
}

impl Manifest {
    /// Load the manifest at `path`, or start empty.
    ///
    /// A missing file is the normal first-run case. An unreadable or
    /// corrupt file is treated as empty with a warning, which at worst
    /// re-does work that a valid ledger would have skipped.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<BTreeMap<u64, ManifestEntry>>(&bytes) {
                Ok(entries) => {
                    debug!(path = %path.display(), entries = entries.len(), "loaded manifest");
                    entries
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "manifest unreadable, starting from an empty ledger"
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "manifest unreadable, starting from an empty ledger"
                );
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    pub fn contains(&self, batch_index: u64) -> bool {
        self.entries.contains_key(&batch_index)
    }

    pub fn insert(&mut self, entry: ManifestEntry) {
        self.entries.insert(entry.batch_index, entry);
    }

    /// Drop an entry that could not be persisted, so the in-memory
    /// view matches what is on disk.
    pub fn remove(&mut self, batch_index: u64) {
        self.entries.remove(&batch_index);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Output file paths in batch-index order.
    pub fn output_paths(&self) -> Vec<String> {
        self.entries.values().map(|e| e.output_path.clone()).collect()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the whole ledger atomically.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| MfError::Write(WriteError::Io(e.to_string())))?;
        }

        let bytes = serde_json::to_vec_pretty(&self.entries)
            .map_err(|e| MfError::Write(WriteError::Serialize(e.to_string())))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|e| MfError::Write(WriteError::Io(e.to_string())))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| MfError::Write(WriteError::Io(e.to_string())))?;

        debug!(path = %self.path.display(), entries = self.entries.len(), "saved manifest");
        Ok(())
    }
}
