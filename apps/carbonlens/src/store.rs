//! # Activity Log
//!
//! Recorded activities per user, passed explicitly to whoever needs them.
//!
//! Only an in-memory implementation exists; the trait is the seam for a
//! persistent one.

use async_trait::async_trait;
use carbonlens_core::{ActivityRecord, CalculationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Number of entries returned by a recent-activity listing.
pub const RECENT_LIMIT: usize = 10;

/// Location recorded when none was supplied.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// One logged activity with its calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredActivity {
    pub id: u64,
    pub user_id: String,
    pub record: ActivityRecord,
    pub result: CalculationResult,
    pub timestamp: DateTime<Utc>,
}

/// A stored activity rendered for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityView {
    #[serde(flatten)]
    pub activity: StoredActivity,
    pub time_ago: String,
}

impl ActivityView {
    #[must_use]
    pub fn new(activity: StoredActivity, now: DateTime<Utc>) -> Self {
        let time_ago = time_ago(activity.timestamp, now);
        Self { activity, time_ago }
    }
}

#[async_trait]
pub trait ActivityLog: Send + Sync {
    /// Append an activity and return it as stored.
    async fn create(
        &self,
        user_id: &str,
        record: ActivityRecord,
        result: CalculationResult,
        at: DateTime<Utc>,
    ) -> StoredActivity;

    /// Newest first, at most `limit` entries.
    async fn recent(&self, user_id: &str, limit: usize) -> Vec<StoredActivity>;

    async fn count(&self, user_id: &str) -> usize;
}

#[derive(Debug, Default)]
struct LogState {
    next_id: u64,
    entries: Vec<StoredActivity>,
}

/// Process-local [`ActivityLog`].
#[derive(Debug, Default)]
pub struct InMemoryActivityLog {
    state: RwLock<LogState>,
}

impl InMemoryActivityLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActivityLog for InMemoryActivityLog {
    async fn create(
        &self,
        user_id: &str,
        mut record: ActivityRecord,
        result: CalculationResult,
        at: DateTime<Utc>,
    ) -> StoredActivity {
        if record.usable_location().is_none() {
            record.location = Some(UNKNOWN_LOCATION.to_string());
        }

        let mut state = self.state.write().await;
        state.next_id += 1;
        let activity = StoredActivity {
            id: state.next_id,
            user_id: user_id.to_string(),
            record,
            result,
            timestamp: at,
        };
        state.entries.push(activity.clone());
        activity
    }

    async fn recent(&self, user_id: &str, limit: usize) -> Vec<StoredActivity> {
        let state = self.state.read().await;
        let mut entries: Vec<StoredActivity> = state
            .entries
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        entries.truncate(limit);
        entries
    }

    async fn count(&self, user_id: &str) -> usize {
        let state = self.state.read().await;
        state.entries.iter().filter(|a| a.user_id == user_id).count()
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}

/// Coarse relative time: "Just now", minutes, hours, then days.
#[must_use]
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - then).num_minutes();
    match minutes {
        m if m < 1 => "Just now".to_string(),
        m if m < 60 => plural(m, "minute"),
        m if m < 1440 => plural(m / 60, "hour"),
        m => plural(m / 1440, "day"),
    }
}
