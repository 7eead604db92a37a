//! Session configuration.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use yellboard_types::GroupId;

/// Configuration for one group session.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Root directory; clips live in `storage_root/{group_id}/`.
    pub storage_root: PathBuf,

    /// The group this process serves. One active group per process.
    pub group_id: String,

    /// Interval between periodic listing broadcasts (seconds).
    pub broadcast_interval_secs: u64,

    /// How long a missing-clip request waits for a reply (seconds).
    pub fetch_timeout_secs: u64,

    /// Upper bound on clip fetches running at the same time.
    pub max_concurrent_fetches: usize,

    /// Salutation sent to new realtime clients, followed by the group id.
    pub greeting_prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("sounds"),
            group_id: "default".to_string(),
            broadcast_interval_secs: 60,
            fetch_timeout_secs: 90,
            max_concurrent_fetches: 4,
            greeting_prefix: "hello, moto #".to_string(),
        }
    }
}

impl SessionConfig {
    /// Config for `group_id` under `storage_root`, other fields defaulted.
    pub fn for_group(storage_root: impl Into<PathBuf>, group_id: impl Into<String>) -> Self {
        Self {
            storage_root: storage_root.into(),
            group_id: group_id.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> SyncResult<()> {
        self.group()?;
        if self.broadcast_interval_secs == 0 {
            return Err(SyncError::Config("broadcast_interval_secs must be > 0".into()));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(SyncError::Config("fetch_timeout_secs must be > 0".into()));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(SyncError::Config("max_concurrent_fetches must be > 0".into()));
        }
        Ok(())
    }

    pub fn group(&self) -> SyncResult<GroupId> {
        GroupId::new(self.group_id.clone()).map_err(|e| SyncError::Config(e.to_string()))
    }

    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_secs(self.broadcast_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn greeting(&self, group: &GroupId) -> String {
        format!("{}{group}", self.greeting_prefix)
    }
}
