use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bureau::{BureauResultClass, BureauSnapshot};
use super::cluster::ClusterAssignment;
use super::domain::{Decision, ProspectId, RunId};
use super::verification::VerificationOutcome;

/// Aggregate persisted exactly once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteringDecision {
    pub run_id: RunId,
    pub prospect_id: ProspectId,
    pub decision: Decision,
    pub code: String,
    pub reason: String,
    pub next_process: bool,
    pub cluster: Option<ClusterAssignment>,
    pub bureau_result: Option<BureauResultClass>,
    pub ltv_percent: Option<f64>,
    pub max_tenor: Option<u16>,
    pub adjust_tenor: bool,
    pub verification: VerificationOutcome,
    pub bureau_snapshots: Vec<BureauSnapshot>,
    pub threshold_version: String,
    pub decided_at: DateTime<Utc>,
}

impl FilteringDecision {
    pub fn summary_view(&self) -> DecisionView {
        DecisionView {
            run_id: self.run_id.clone(),
            prospect_id: self.prospect_id.clone(),
            decision: self.decision,
            code: self.code.clone(),
            reason: self.reason.clone(),
            next_process: self.next_process,
            cluster: self
                .cluster
                .as_ref()
                .map(|assignment| assignment.cluster.0.clone()),
            ltv_percent: self.ltv_percent,
            max_tenor: self.max_tenor,
            adjust_tenor: self.adjust_tenor,
        }
    }
}

/// Decision fields exposed to the origination front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionView {
    pub run_id: RunId,
    pub prospect_id: ProspectId,
    pub decision: Decision,
    pub code: String,
    pub reason: String,
    pub next_process: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ltv_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tenor: Option<u16>,
    pub adjust_tenor: bool,
}

/// Append-only decision storage. `insert` must refuse an existing run id.
pub trait DecisionRepository: Send + Sync {
    fn insert(&self, record: FilteringDecision) -> Result<FilteringDecision, RepositoryError>;
    fn fetch(&self, run_id: &RunId) -> Result<Option<FilteringDecision>, RepositoryError>;
    fn for_prospect(
        &self,
        prospect_id: &ProspectId,
    ) -> Result<Vec<FilteringDecision>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
