//! Idempotency ledger for submissions
//!
//! Each natural key moves through `unsent -> sent -> acknowledged`. Only the
//! attempt holding the claim may advance it. A key that reached `sent`
//! without an acknowledgement is never transmitted again; an acknowledged key
//! answers with its stored result.
//!
//! [`FileSubmissionStore`] keeps the ledger across runs of the CLI;
//! [`InMemorySubmissionStore`] lasts as long as the process.

use super::SubmissionResult;
use crate::domain::{CpeError, NaturalKey, Result, SubmissionError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Ledger state of a natural key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerState {
    /// Claimed, not yet handed to the transport
    Unsent,
    /// Handed to the transport; the remote side may have recorded it
    Sent,
    /// Receipt interpreted and stored
    Acknowledged,
}

/// Ledger record for one natural key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub natural_key: String,
    pub attempt_id: Uuid,
    pub state: LedgerState,
    pub claimed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<SubmissionResult>,
}

/// Outcome of claiming a natural key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// The caller now owns the key and must advance or release it
    Claimed { attempt_id: Uuid },
    /// The key was already acknowledged
    Acknowledged(Box<SubmissionResult>),
}

/// Storage backend for the ledger
///
/// Implementations must make `claim` atomic per key.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Claim a key for a new attempt
    ///
    /// # Errors
    ///
    /// [`SubmissionError::InProgress`] when another attempt holds an unsent
    /// claim, [`SubmissionError::AlreadySent`] when the key was sent without
    /// an acknowledgement.
    async fn claim(&self, key: &NaturalKey) -> Result<Claim>;

    /// Record that the attempt handed the document to the transport
    async fn mark_sent(&self, key: &NaturalKey, attempt_id: Uuid) -> Result<()>;

    /// Store the final result of the attempt
    async fn acknowledge(
        &self,
        key: &NaturalKey,
        attempt_id: Uuid,
        result: &SubmissionResult,
    ) -> Result<()>;

    /// Drop the claim so the key can be submitted again
    async fn release(&self, key: &NaturalKey, attempt_id: Uuid) -> Result<()>;

    /// Current entry for a key
    async fn lookup(&self, key: &NaturalKey) -> Result<Option<LedgerEntry>>;
}

/// Ledger records keyed by natural key, with the state transitions
///
/// Both stores apply every operation through this type so they share the
/// same rules.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
struct Entries(BTreeMap<String, LedgerEntry>);

/// Age after which an unsent claim is considered abandoned
///
/// An unsent key was never handed to the transport, so a crashed attempt
/// can be taken over safely.
const ABANDONED_CLAIM_MINUTES: i64 = 10;

fn stale(key: &str, attempt_id: Uuid) -> SubmissionError {
    SubmissionError::StaleAttempt {
        natural_key: key.to_string(),
        attempt_id: attempt_id.to_string(),
    }
}

impl Entries {
    /// Entry owned by `attempt_id`, or a stale-attempt error
    fn owned(
        &mut self,
        key: &str,
        attempt_id: Uuid,
    ) -> std::result::Result<&mut LedgerEntry, SubmissionError> {
        self.0
            .get_mut(key)
            .filter(|entry| entry.attempt_id == attempt_id)
            .ok_or_else(|| stale(key, attempt_id))
    }

    fn claim(&mut self, natural_key: String) -> std::result::Result<Claim, SubmissionError> {
        let now = Utc::now();

        if let Some(entry) = self.0.get(&natural_key) {
            let abandoned = entry.state == LedgerState::Unsent
                && now - entry.claimed_at > Duration::minutes(ABANDONED_CLAIM_MINUTES);
            match (entry.state, &entry.result) {
                (LedgerState::Acknowledged, Some(result)) => {
                    return Ok(Claim::Acknowledged(Box::new(result.clone())));
                }
                (LedgerState::Unsent, _) if abandoned => {
                    tracing::warn!(
                        natural_key = %natural_key,
                        attempt_id = %entry.attempt_id,
                        "Taking over abandoned unsent claim"
                    );
                }
                (LedgerState::Unsent, _) => return Err(SubmissionError::InProgress(natural_key)),
                _ => return Err(SubmissionError::AlreadySent(natural_key)),
            }
        }

        let attempt_id = Uuid::new_v4();
        self.0.insert(
            natural_key.clone(),
            LedgerEntry {
                natural_key,
                attempt_id,
                state: LedgerState::Unsent,
                claimed_at: now,
                updated_at: now,
                result: None,
            },
        );
        Ok(Claim::Claimed { attempt_id })
    }

    fn mark_sent(&mut self, key: &str, attempt_id: Uuid) -> std::result::Result<(), SubmissionError> {
        let entry = self.owned(key, attempt_id)?;
        if entry.state != LedgerState::Unsent {
            return Err(stale(key, attempt_id));
        }
        entry.state = LedgerState::Sent;
        entry.updated_at = Utc::now();
        Ok(())
    }

    fn acknowledge(
        &mut self,
        key: &str,
        attempt_id: Uuid,
        result: &SubmissionResult,
    ) -> std::result::Result<(), SubmissionError> {
        let entry = self.owned(key, attempt_id)?;
        if entry.state != LedgerState::Sent {
            return Err(stale(key, attempt_id));
        }
        entry.state = LedgerState::Acknowledged;
        entry.result = Some(result.clone());
        entry.updated_at = Utc::now();
        Ok(())
    }

    fn release(&mut self, key: &str, attempt_id: Uuid) -> std::result::Result<(), SubmissionError> {
        let entry = self.owned(key, attempt_id)?;
        if entry.state == LedgerState::Acknowledged {
            return Err(stale(key, attempt_id));
        }
        self.0.remove(key);
        Ok(())
    }
}

/// Process-local ledger store
#[derive(Debug, Default)]
pub struct InMemorySubmissionStore {
    entries: Mutex<Entries>,
}

impl InMemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionStore for InMemorySubmissionStore {
    async fn claim(&self, key: &NaturalKey) -> Result<Claim> {
        Ok(self.entries.lock().await.claim(key.base_name())?)
    }

    async fn mark_sent(&self, key: &NaturalKey, attempt_id: Uuid) -> Result<()> {
        Ok(self.entries.lock().await.mark_sent(&key.base_name(), attempt_id)?)
    }

    async fn acknowledge(
        &self,
        key: &NaturalKey,
        attempt_id: Uuid,
        result: &SubmissionResult,
    ) -> Result<()> {
        Ok(self
            .entries
            .lock()
            .await
            .acknowledge(&key.base_name(), attempt_id, result)?)
    }

    async fn release(&self, key: &NaturalKey, attempt_id: Uuid) -> Result<()> {
        Ok(self.entries.lock().await.release(&key.base_name(), attempt_id)?)
    }

    async fn lookup(&self, key: &NaturalKey) -> Result<Option<LedgerEntry>> {
        Ok(self.entries.lock().await.0.get(&key.base_name()).cloned())
    }
}

/// Ledger store persisted as a JSON file
///
/// Every transition reads the file, applies the change and replaces the file
/// through a rename, so separate runs over the same directory see each
/// other's state. Access within the process is serialized; concurrent
/// processes sharing one file are not coordinated.
#[derive(Debug)]
pub struct FileSubmissionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSubmissionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Entries> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                CpeError::Serialization(format!(
                    "Corrupt submission ledger {}: {e}",
                    self.path.display()
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, entries: &Entries) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(entries)?;
        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }

    /// Apply a transition and persist the result when it succeeds
    async fn update<T>(
        &self,
        apply: impl FnOnce(&mut Entries) -> std::result::Result<T, SubmissionError>,
    ) -> Result<T> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        let value = apply(&mut entries)?;
        self.save(&entries).await?;
        Ok(value)
    }
}

#[async_trait]
impl SubmissionStore for FileSubmissionStore {
    async fn claim(&self, key: &NaturalKey) -> Result<Claim> {
        let natural_key = key.base_name();
        self.update(|entries| entries.claim(natural_key)).await
    }

    async fn mark_sent(&self, key: &NaturalKey, attempt_id: Uuid) -> Result<()> {
        let natural_key = key.base_name();
        self.update(|entries| entries.mark_sent(&natural_key, attempt_id))
            .await
    }

    async fn acknowledge(
        &self,
        key: &NaturalKey,
        attempt_id: Uuid,
        result: &SubmissionResult,
    ) -> Result<()> {
        let natural_key = key.base_name();
        self.update(|entries| entries.acknowledge(&natural_key, attempt_id, result))
            .await
    }

    async fn release(&self, key: &NaturalKey, attempt_id: Uuid) -> Result<()> {
        let natural_key = key.base_name();
        self.update(|entries| entries.release(&natural_key, attempt_id))
            .await
    }

    async fn lookup(&self, key: &NaturalKey) -> Result<Option<LedgerEntry>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.0.get(&key.base_name()).cloned())
    }
}

/// Ledger facade used by the pipeline
#[derive(Clone)]
pub struct SubmissionLedger {
    store: Arc<dyn SubmissionStore>,
}

impl Default for SubmissionLedger {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl SubmissionLedger {
    /// Create a ledger over a storage backend
    pub fn new(store: Arc<dyn SubmissionStore>) -> Self {
        Self { store }
    }

    /// Ledger backed by [`InMemorySubmissionStore`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemorySubmissionStore::new()))
    }

    /// Ledger persisted to a JSON file
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileSubmissionStore::new(path)))
    }

    pub async fn claim(&self, key: &NaturalKey) -> Result<Claim> {
        let claim = self.store.claim(key).await?;
        match &claim {
            Claim::Claimed { attempt_id } => {
                tracing::debug!(natural_key = %key, attempt_id = %attempt_id, "Claimed submission");
            }
            Claim::Acknowledged(result) => {
                tracing::info!(
                    natural_key = %key,
                    status = %result.status,
                    "Submission already acknowledged, returning stored result"
                );
            }
        }
        Ok(claim)
    }

    pub async fn mark_sent(&self, key: &NaturalKey, attempt_id: Uuid) -> Result<()> {
        self.store.mark_sent(key, attempt_id).await
    }

    pub async fn acknowledge(
        &self,
        key: &NaturalKey,
        attempt_id: Uuid,
        result: &SubmissionResult,
    ) -> Result<()> {
        tracing::debug!(natural_key = %key, attempt_id = %attempt_id, "Acknowledging submission");
        self.store.acknowledge(key, attempt_id, result).await
    }

    pub async fn release(&self, key: &NaturalKey, attempt_id: Uuid) -> Result<()> {
        tracing::debug!(natural_key = %key, attempt_id = %attempt_id, "Releasing submission claim");
        self.store.release(key, attempt_id).await
    }

    pub async fn lookup(&self, key: &NaturalKey) -> Result<Option<LedgerEntry>> {
        self.store.lookup(key).await
    }
}
