//! Agent (CMO) clustering by first-payment-default history, with a shared
//! default window for agents whose history is not yet usable.

mod window;

pub use window::{
    CasOutcome, DefaultWindow, DefaultWindowStore, InMemoryWindowStore, VersionedWindow,
    WindowKey, WindowStoreError,
};

use std::fmt;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{AgentId, BpkbNameType};
use super::providers::{AgentDirectory, ProviderError};
use super::thresholds::ClusterPolicy;

const MAX_CAS_ATTEMPTS: usize = 3;

/// Risk cluster label used to select LTV rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cluster(pub String);

impl From<&str> for Cluster {
    fn from(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceCategory {
    New,
    Established,
}

/// One row of the FPD-to-cluster table; bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FpdBand {
    pub bpkb_name_type: BpkbNameType,
    pub fpd_min: f64,
    pub fpd_max: f64,
    pub cluster: Cluster,
}

/// First band covering `fpd` for the given BPKB type.
pub fn map_fpd(table: &[FpdBand], name_type: BpkbNameType, fpd: f64) -> Option<&Cluster> {
    table
        .iter()
        .find(|band| {
            band.bpkb_name_type == name_type && band.fpd_min <= fpd && fpd <= band.fpd_max
        })
        .map(|band| &band.cluster)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub agent_id: AgentId,
    pub bpkb_name_type: BpkbNameType,
    pub performance_category: PerformanceCategory,
    pub fpd_rate: Option<f64>,
    pub accumulated_sales: Option<u32>,
    pub cluster: Cluster,
    /// Present when the cluster came from the default window.
    pub default_window: Option<DefaultWindow>,
}

#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("agent {0} is not registered")]
    UnknownAgent(String),
    #[error("agent directory failed: {0}")]
    Directory(#[from] ProviderError),
    #[error(transparent)]
    WindowStore(#[from] WindowStoreError),
    #[error("default window for agent {0} kept changing under concurrent writers")]
    WindowContention(String),
}

pub struct ClusterResolver<D: ?Sized, W: ?Sized> {
    directory: Arc<D>,
    windows: Arc<W>,
}

impl<D, W> ClusterResolver<D, W>
where
    D: AgentDirectory + ?Sized,
    W: DefaultWindowStore + ?Sized,
{
    pub fn new(directory: Arc<D>, windows: Arc<W>) -> Self {
        Self { directory, windows }
    }

    pub async fn resolve(
        &self,
        agent_id: &AgentId,
        name_type: BpkbNameType,
        as_of: NaiveDate,
        policy: &ClusterPolicy,
        fpd_table: &[FpdBand],
    ) -> Result<ClusterAssignment, ClusterError> {
        let agent = self
            .directory
            .agent(agent_id)
            .await?
            .ok_or_else(|| ClusterError::UnknownAgent(agent_id.0.clone()))?;

        let key = WindowKey {
            agent_id: agent_id.clone(),
            bpkb_name_type: name_type,
        };
        let performance_category =
            if tenure_months(agent.join_date, as_of) < policy.new_agent_tenure_months {
                PerformanceCategory::New
            } else {
                PerformanceCategory::Established
            };

        let mut assignment = ClusterAssignment {
            agent_id: agent_id.clone(),
            bpkb_name_type: name_type,
            performance_category,
            fpd_rate: None,
            accumulated_sales: None,
            cluster: policy.default_cluster(name_type).clone(),
            default_window: None,
        };

        if let Some(current) = self.windows.get(&key)? {
            if current.window.covers(as_of) {
                debug!(
                    agent_id = %agent_id.0,
                    cluster = %current.window.cluster,
                    "reusing default window"
                );
                assignment.cluster = current.window.cluster.clone();
                assignment.default_window = Some(current.window);
                return Ok(assignment);
            }
        }

        let window_start = match performance_category {
            PerformanceCategory::New => agent.join_date,
            PerformanceCategory::Established => {
                let performance = self.directory.performance(agent_id, name_type).await?;
                if let Some(performance) = &performance {
                    assignment.fpd_rate = Some(performance.fpd_rate);
                    assignment.accumulated_sales = Some(performance.accumulated_sales);
                }

                let mapped = performance
                    .filter(|performance| performance.accumulated_sales > 0)
                    .and_then(|performance| map_fpd(fpd_table, name_type, performance.fpd_rate));

                if let Some(cluster) = mapped {
                    assignment.cluster = cluster.clone();
                    return Ok(assignment);
                }
                as_of
            }
        };

        let window = self.claim_default_window(&key, window_start, as_of, policy)?;
        debug!(
            agent_id = %agent_id.0,
            cluster = %window.cluster,
            start = %window.start,
            end = %window.end,
            "assigned default window"
        );
        assignment.cluster = window.cluster.clone();
        assignment.default_window = Some(window);
        Ok(assignment)
    }

    /// Store a fresh default window, or adopt whichever valid window a
    /// concurrent writer stored first.
    fn claim_default_window(
        &self,
        key: &WindowKey,
        candidate_start: NaiveDate,
        as_of: NaiveDate,
        policy: &ClusterPolicy,
    ) -> Result<DefaultWindow, ClusterError> {
        let cluster = policy.default_cluster(key.bpkb_name_type);
        let months = policy.default_window_months;
        let mut expected = self.windows.get(key)?;

        for _ in 0..MAX_CAS_ATTEMPTS {
            if let Some(current) = &expected {
                if current.window.covers(as_of) {
                    return Ok(current.window.clone());
                }
            }

            let candidate = DefaultWindow::starting(candidate_start, months, cluster.clone());
            let window = if candidate.covers(as_of) {
                candidate
            } else {
                DefaultWindow::starting(as_of, months, cluster.clone())
            };

            let version = expected.as_ref().map(|current| current.version);
            match self.windows.compare_and_swap(key, version, window)? {
                CasOutcome::Stored(stored) => return Ok(stored.window),
                CasOutcome::Conflict(winner) => expected = winner,
            }
        }

        match expected {
            Some(current) if current.window.covers(as_of) => Ok(current.window),
            _ => Err(ClusterError::WindowContention(key.agent_id.0.clone())),
        }
    }
}

/// Whole calendar months elapsed between two dates.
pub fn tenure_months(joined: NaiveDate, as_of: NaiveDate) -> u32 {
    let months =
        (as_of.year() - joined.year()) * 12 + as_of.month() as i32 - joined.month() as i32;
    let months = if as_of.day() < joined.day() {
        months - 1
    } else {
        months
    };
    months.max(0) as u32
}
