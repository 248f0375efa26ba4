use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::Cluster;
use crate::screening::domain::{AgentId, BpkbNameType};

/// Fixed-length default cluster assignment for agents without usable history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub cluster: Cluster,
}

impl DefaultWindow {
    /// Window of `months` calendar months starting at `start`, both ends inclusive.
    pub fn starting(start: NaiveDate, months: u32, cluster: Cluster) -> Self {
        let end = start
            .checked_add_months(Months::new(months))
            .and_then(|date| date.pred_opt())
            .unwrap_or(NaiveDate::MAX);
        Self {
            start,
            end,
            cluster,
        }
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowKey {
    pub agent_id: AgentId,
    pub bpkb_name_type: BpkbNameType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedWindow {
    pub version: u64,
    pub window: DefaultWindow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasOutcome {
    Stored(VersionedWindow),
    /// Another writer got there first; carries the current record.
    Conflict(Option<VersionedWindow>),
}

/// Shared default-window records. Writes are compare-and-swap on the version.
pub trait DefaultWindowStore: Send + Sync {
    fn get(&self, key: &WindowKey) -> Result<Option<VersionedWindow>, WindowStoreError>;

    /// `expected_version` of `None` means "only if absent".
    fn compare_and_swap(
        &self,
        key: &WindowKey,
        expected_version: Option<u64>,
        window: DefaultWindow,
    ) -> Result<CasOutcome, WindowStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum WindowStoreError {
    #[error("window store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Default)]
pub struct InMemoryWindowStore {
    records: Mutex<HashMap<WindowKey, VersionedWindow>>,
}

impl InMemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DefaultWindowStore for InMemoryWindowStore {
    fn get(&self, key: &WindowKey) -> Result<Option<VersionedWindow>, WindowStoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| WindowStoreError::Unavailable("window store lock poisoned".into()))?;
        Ok(records.get(key).cloned())
    }

    fn compare_and_swap(
        &self,
        key: &WindowKey,
        expected_version: Option<u64>,
        window: DefaultWindow,
    ) -> Result<CasOutcome, WindowStoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| WindowStoreError::Unavailable("window store lock poisoned".into()))?;

        let current = records.get(key).map(|record| record.version);
        if current != expected_version {
            return Ok(CasOutcome::Conflict(records.get(key).cloned()));
        }

        let stored = VersionedWindow {
            version: current.map_or(1, |version| version + 1),
            window,
        };
        records.insert(key.clone(), stored.clone());
        Ok(CasOutcome::Stored(stored))
    }
}
