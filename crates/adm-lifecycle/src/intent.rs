//! # Payment Intent Store
//!
//! A [`PendingIntent`] records that a ledger transfer was requested for a
//! deal. It is written *before* the transfer is dispatched and removed when
//! the deposit watcher observes a terminal outcome, so a restart in between
//! can resume watching instead of paying twice.
//!
//! Intents are keyed by `(type, dealId)`. `save` overwrites any prior
//! intent for the same key; clearing a missing intent is a no-op.
//!
//! ## Implementations
//!
//! - [`MemoryIntentStore`]: process-local, for tests and embedding.
//! - [`FileIntentStore`]: a JSON file in a session directory. Every write
//!   goes to a temp file in the same directory and is renamed over the
//!   target, so readers see either the old or the new map.
//!
//! Store methods are synchronous and may touch the disk. Async callers in
//! this crate go through [`blocking`], which runs them on tokio's blocking
//! pool.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use adm_core::{DealId, NanoAmount, Timestamp};

/// File name used by [`FileIntentStore::in_session_dir`].
pub const INTENTS_FILE: &str = "intents.json";

/// Default session directory when `ADM_SESSION_DIR` is unset.
pub const DEFAULT_SESSION_DIR: &str = ".adm-session";

/// Kind of pending intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    /// A transfer into a deal's escrow address.
    EscrowDeposit,
}

/// A payment that was requested but not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingIntent {
    /// Intent kind.
    #[serde(rename = "type")]
    pub kind: IntentType,
    /// Deal the payment belongs to.
    pub deal_id: DealId,
    /// When the intent was recorded.
    #[serde(with = "adm_core::temporal::epoch_millis")]
    pub sent_at: Timestamp,
    /// Escrow address the transfer targets.
    pub address: String,
    /// Transfer amount.
    pub amount_nano: NanoAmount,
}

impl PendingIntent {
    /// An escrow deposit intent recorded now.
    pub fn escrow_deposit(deal_id: DealId, address: impl Into<String>, amount_nano: NanoAmount) -> Self {
        Self {
            kind: IntentType::EscrowDeposit,
            deal_id,
            sent_at: Timestamp::now(),
            address: address.into(),
            amount_nano,
        }
    }
}

/// Errors from an [`IntentStore`].
#[derive(Error, Debug)]
pub enum IntentStoreError {
    /// Reading or writing the backing file failed.
    #[error("intent store I/O error at {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The backing file holds something other than an intent map.
    #[error("intent store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The blocking task running a store call panicked or was cancelled.
    #[error("intent store task failed: {0}")]
    Task(String),
}

/// Durable storage for pending escrow-deposit intents.
pub trait IntentStore: Send + Sync {
    /// Record `intent`, replacing any intent for the same deal.
    fn save(&self, intent: &PendingIntent) -> Result<(), IntentStoreError>;

    /// Record `intent` unless one is already pending for its deal.
    ///
    /// Returns whether it was recorded. The check and the write are one
    /// step, so two callers racing for the same deal cannot both win.
    fn save_if_absent(&self, intent: &PendingIntent) -> Result<bool, IntentStoreError>;

    /// The intent for `deal_id`, if one is pending.
    fn load(&self, deal_id: &DealId) -> Result<Option<PendingIntent>, IntentStoreError>;

    /// Forget the intent for `deal_id`. Missing intents are not an error.
    fn clear(&self, deal_id: &DealId) -> Result<(), IntentStoreError>;

    /// Every pending intent, ordered by deal id.
    fn pending(&self) -> Result<Vec<PendingIntent>, IntentStoreError>;
}

/// Run `op` against `store` on tokio's blocking pool.
pub(crate) async fn blocking<T, F>(store: &Arc<dyn IntentStore>, op: F) -> Result<T, IntentStoreError>
where
    T: Send + 'static,
    F: FnOnce(&dyn IntentStore) -> Result<T, IntentStoreError> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || op(store.as_ref()))
        .await
        .map_err(|e| IntentStoreError::Task(e.to_string()))?
}

type IntentKey = (IntentType, DealId);

fn key_for(deal_id: &DealId) -> IntentKey {
    (IntentType::EscrowDeposit, deal_id.clone())
}

// -- In-memory store ----------------------------------------------------------

/// Process-local intent store.
#[derive(Debug, Default, Clone)]
pub struct MemoryIntentStore {
    data: Arc<RwLock<BTreeMap<IntentKey, PendingIntent>>>,
}

impl MemoryIntentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl IntentStore for MemoryIntentStore {
    fn save(&self, intent: &PendingIntent) -> Result<(), IntentStoreError> {
        self.data
            .write()
            .insert((intent.kind, intent.deal_id.clone()), intent.clone());
        Ok(())
    }

    fn save_if_absent(&self, intent: &PendingIntent) -> Result<bool, IntentStoreError> {
        let mut data = self.data.write();
        let key = (intent.kind, intent.deal_id.clone());
        if data.contains_key(&key) {
            return Ok(false);
        }
        data.insert(key, intent.clone());
        Ok(true)
    }

    fn load(&self, deal_id: &DealId) -> Result<Option<PendingIntent>, IntentStoreError> {
        Ok(self.data.read().get(&key_for(deal_id)).cloned())
    }

    fn clear(&self, deal_id: &DealId) -> Result<(), IntentStoreError> {
        self.data.write().remove(&key_for(deal_id));
        Ok(())
    }

    fn pending(&self) -> Result<Vec<PendingIntent>, IntentStoreError> {
        Ok(self.data.read().values().cloned().collect())
    }
}

// -- File-backed store --------------------------------------------------------

/// Intent store persisted as a JSON array in a single file.
///
/// The whole file is re-read on every call so several processes sharing a
/// session directory observe each other's writes. Writers within a process
/// are serialized; across processes there is no lock and the last writer
/// wins.
#[derive(Debug)]
pub struct FileIntentStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileIntentStore {
    /// Store backed by the file at `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store backed by `intents.json` inside `dir`.
    pub fn in_session_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(INTENTS_FILE))
    }

    /// Store in the directory named by `ADM_SESSION_DIR`, or
    /// `.adm-session` when unset.
    pub fn from_env() -> Self {
        let dir = std::env::var("ADM_SESSION_DIR").unwrap_or_else(|_| DEFAULT_SESSION_DIR.to_string());
        Self::in_session_dir(dir)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<IntentKey, PendingIntent>, IntentStoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(IntentStoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let intents: Vec<PendingIntent> = serde_json::from_slice(&bytes)?;
        Ok(intents
            .into_iter()
            .map(|intent| ((intent.kind, intent.deal_id.clone()), intent))
            .collect())
    }

    fn write_all(&self, intents: &BTreeMap<IntentKey, PendingIntent>) -> Result<(), IntentStoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let io_err = |source| IntentStoreError::Io {
            path: dir.clone(),
            source,
        };
        std::fs::create_dir_all(&dir).map_err(io_err)?;

        let records: Vec<&PendingIntent> = intents.values().collect();
        let bytes = serde_json::to_vec_pretty(&records)?;

        let mut temp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
        temp.as_file_mut().write_all(&bytes).map_err(io_err)?;
        temp.as_file().sync_all().map_err(io_err)?;
        temp.persist(&self.path).map_err(|e| IntentStoreError::Io {
            path: self.path.clone(),
            source: e.error,
        })?;
        Ok(())
    }

    fn modify(
        &self,
        f: impl FnOnce(&mut BTreeMap<IntentKey, PendingIntent>) -> bool,
    ) -> Result<(), IntentStoreError> {
        let _guard = self.write_lock.lock();
        let mut intents = self.read_all()?;
        if f(&mut intents) {
            self.write_all(&intents)?;
        }
        Ok(())
    }
}

impl IntentStore for FileIntentStore {
    fn save(&self, intent: &PendingIntent) -> Result<(), IntentStoreError> {
        self.modify(|intents| {
            intents.insert((intent.kind, intent.deal_id.clone()), intent.clone());
            true
        })
    }

    fn save_if_absent(&self, intent: &PendingIntent) -> Result<bool, IntentStoreError> {
        let mut saved = false;
        self.modify(|intents| {
            let key = (intent.kind, intent.deal_id.clone());
            saved = !intents.contains_key(&key);
            if saved {
                intents.insert(key, intent.clone());
            }
            saved
        })?;
        Ok(saved)
    }

    fn load(&self, deal_id: &DealId) -> Result<Option<PendingIntent>, IntentStoreError> {
        Ok(self.read_all()?.remove(&key_for(deal_id)))
    }

    fn clear(&self, deal_id: &DealId) -> Result<(), IntentStoreError> {
        self.modify(|intents| intents.remove(&key_for(deal_id)).is_some())
    }

    fn pending(&self) -> Result<Vec<PendingIntent>, IntentStoreError> {
        Ok(self.read_all()?.into_values().collect())
    }
}
