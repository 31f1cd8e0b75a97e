//! Per-user mastering preferences.
//!
//! Each user id owns one versioned [`SessionRecord`] behind its own async
//! mutex. Holding the guard returned by [`SessionStore::lock`] for the length
//! of a request keeps at most one request per user in flight, while requests
//! from different users proceed independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::engine::format::OutputFormat;
use crate::error::{Result, SessionError};
use crate::mastering::presets::{Intensity, PresetDefaults, PresetSelection, Tone};

/// Opaque caller identity
pub type UserId = u64;

/// One user's current choices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub intensity: Intensity,
    pub tone: Tone,
    pub format: OutputFormat,
    /// Derive parameters from analysis instead of the selected presets
    pub auto: bool,
    /// Incremented on every committed change
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(defaults: &PresetDefaults) -> Self {
        Self {
            intensity: defaults.intensity,
            tone: defaults.tone,
            format: defaults.format,
            auto: false,
            version: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn selection(&self) -> PresetSelection {
        PresetSelection::new(self.intensity, self.tone)
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

/// In-memory store of [`SessionRecord`]s keyed by user
#[derive(Debug, Clone)]
pub struct SessionStore {
    defaults: PresetDefaults,
    sessions: Arc<Mutex<HashMap<UserId, Arc<AsyncMutex<SessionRecord>>>>>,
}

impl SessionStore {
    pub fn new(defaults: PresetDefaults) -> Self {
        Self {
            defaults,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn entry(&self, user: UserId) -> Arc<AsyncMutex<SessionRecord>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(sessions.entry(user).or_insert_with(|| {
            debug!("Creating session for user {}", user);
            Arc::new(AsyncMutex::new(SessionRecord::new(&self.defaults)))
        }))
    }

    /// Exclusive access to a user's record until the guard is dropped
    pub async fn lock(&self, user: UserId) -> OwnedMutexGuard<SessionRecord> {
        self.entry(user).lock_owned().await
    }

    /// Run `f` with exclusive access to the record; any change bumps the version
    pub async fn with_session<F, T>(&self, user: UserId, f: F) -> T
    where
        F: FnOnce(&mut SessionRecord) -> T,
    {
        let mut guard = self.lock(user).await;
        apply(&mut *guard, f)
    }

    /// Apply `f` like [`with_session`](Self::with_session), then keep the
    /// record locked until the returned guard is dropped
    pub async fn begin<F>(&self, user: UserId, f: F) -> OwnedMutexGuard<SessionRecord>
    where
        F: FnOnce(&mut SessionRecord),
    {
        let mut guard = self.lock(user).await;
        apply(&mut *guard, f);
        guard
    }

    /// Optimistic update: applies `f` only if the stored version still matches
    pub async fn update<F>(&self, user: UserId, expected_version: u64, f: F) -> Result<SessionRecord>
    where
        F: FnOnce(&mut SessionRecord),
    {
        let mut guard = self.lock(user).await;
        if guard.version != expected_version {
            return Err(SessionError::VersionConflict {
                user,
                expected: expected_version,
                found: guard.version,
            }
            .into());
        }
        f(&mut *guard);
        guard.touch();
        Ok(guard.clone())
    }

    /// Copy of the current record, waiting for any in-flight request
    pub async fn snapshot(&self, user: UserId) -> SessionRecord {
        self.lock(user).await.clone()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or_else(|e| e.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn apply<F, T>(record: &mut SessionRecord, f: F) -> T
where
    F: FnOnce(&mut SessionRecord) -> T,
{
    let before = record.clone();
    let result = f(record);
    if !same_choices(&before, record) {
        record.touch();
    }
    result
}

fn same_choices(a: &SessionRecord, b: &SessionRecord) -> bool {
    a.intensity == b.intensity && a.tone == b.tone && a.format == b.format && a.auto == b.auto
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MasteringError;
    use crate::mastering::presets::PresetTable;
    use std::time::Duration;

    fn store() -> SessionStore {
        SessionStore::new(PresetTable::default().defaults)
    }

    #[tokio::test]
    async fn test_new_user_gets_defaults() {
        let store = store();
        let record = store.snapshot(7).await;
        assert_eq!(record.intensity, Intensity::Balanced);
        assert_eq!(record.tone, Tone::Balanced);
        assert_eq!(record.format, OutputFormat::Wav16);
        assert!(!record.auto);
        assert_eq!(record.version, 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_with_session_bumps_version_only_on_change() {
        let store = store();
        store.with_session(1, |r| r.tone = Tone::Warm).await;
        store.with_session(1, |r| r.tone = Tone::Warm).await;
        let record = store.snapshot(1).await;
        assert_eq!(record.tone, Tone::Warm);
        assert_eq!(record.version, 1);
    }

    #[tokio::test]
    async fn test_stale_update_is_rejected() {
        let store = store();
        let updated = store.update(3, 0, |r| r.auto = true).await.unwrap();
        assert_eq!(updated.version, 1);

        let stale = store.update(3, 0, |r| r.format = OutputFormat::Mp3_320).await;
        match stale {
            Err(MasteringError::Session(SessionError::VersionConflict { user, expected, found })) => {
                assert_eq!((user, expected, found), (3, 0, 1));
            }
            other => panic!("expected version conflict, got {:?}", other),
        }
        assert_eq!(store.snapshot(3).await.format, OutputFormat::Wav16);
    }

    #[tokio::test]
    async fn test_requests_for_one_user_are_serialized() {
        let store = store();
        let guard = store.lock(9).await;

        let waiting = {
            let store = store.clone();
            tokio::spawn(async move { store.with_session(9, |r| r.intensity = Intensity::High).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiting.is_finished());

        // another user is not blocked
        let other = tokio::time::timeout(Duration::from_secs(1), store.snapshot(10)).await;
        assert!(other.is_ok());

        drop(guard);
        waiting.await.unwrap();
        assert_eq!(store.snapshot(9).await.intensity, Intensity::High);
    }

    #[tokio::test]
    async fn test_begin_keeps_the_request_exclusive() {
        let store = store();
        let session = store.begin(4, |r| r.format = OutputFormat::Mp3_320).await;
        assert_eq!(session.format, OutputFormat::Mp3_320);
        assert_eq!(session.version, 1);

        let competing = {
            let store = store.clone();
            tokio::spawn(async move { store.with_session(4, |r| r.format = OutputFormat::Wav24).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!competing.is_finished());

        drop(session);
        competing.await.unwrap();
        let record = store.snapshot(4).await;
        assert_eq!(record.format, OutputFormat::Wav24);
        assert_eq!(record.version, 2);
    }
}
