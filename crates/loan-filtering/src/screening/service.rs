use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::bureau::{self, BureauContext, BureauEvaluation};
use super::cluster::{ClusterAssignment, ClusterError, ClusterResolver, DefaultWindowStore};
use super::domain::{ApplicantProfile, Decision, ProspectId, RunId};
use super::ltv::{LtvOutcome, LtvQuery};
use super::providers::{AgentDirectory, BureauGateway, IdentityGateway, ProviderError};
use super::repository::{DecisionRepository, FilteringDecision, RepositoryError};
use super::thresholds::{self, ThresholdConfig, ThresholdError, ThresholdStore};
use super::verification::{
    IdentityVerifier, VerificationError, VerificationMetrics, VerificationOutcome,
};
use crate::config::PipelineConfig;

/// One screening request from the origination front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningRequest {
    pub application: ApplicantProfile,
    #[serde(default)]
    pub override_to_regular_flow: bool,
    /// The applicant already has a bureau hit from an earlier application.
    #[serde(default)]
    pub prior_bureau_hit: bool,
    /// Evaluation date; defaults to today (UTC).
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

/// Outbound collaborators the pipeline talks to.
#[derive(Clone)]
pub struct ScreeningBackends {
    pub thresholds: Arc<dyn ThresholdStore>,
    pub identity: Arc<dyn IdentityGateway>,
    pub bureau: Arc<dyn BureauGateway>,
    pub agents: Arc<dyn AgentDirectory>,
    pub windows: Arc<dyn DefaultWindowStore>,
}

/// Pipeline orchestrator: verification runs alongside cluster + bureau, LTV
/// runs last, and the aggregate decision is persisted once.
pub struct FilteringService<R> {
    repository: Arc<R>,
    thresholds: Arc<dyn ThresholdStore>,
    verifier: IdentityVerifier<dyn IdentityGateway>,
    bureau: Arc<dyn BureauGateway>,
    clusters: ClusterResolver<dyn AgentDirectory, dyn DefaultWindowStore>,
    config: PipelineConfig,
}

static RUN_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_run_id() -> RunId {
    let id = RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RunId(format!("run-{id:08}"))
}

impl<R> FilteringService<R>
where
    R: DecisionRepository + 'static,
{
    pub fn new(repository: Arc<R>, backends: ScreeningBackends, config: PipelineConfig) -> Self {
        Self {
            repository,
            thresholds: backends.thresholds,
            verifier: IdentityVerifier::new(backends.identity, config.clone()),
            bureau: backends.bureau,
            clusters: ClusterResolver::new(backends.agents, backends.windows),
            config,
        }
    }

    /// Screen one application end to end and persist the decision.
    pub async fn screen(
        &self,
        request: ScreeningRequest,
    ) -> Result<FilteringDecision, FilteringError> {
        let thresholds =
            thresholds::load(self.thresholds.as_ref(), &self.config.line_of_business).await?;
        let run_id = next_run_id();
        let as_of = request.as_of.unwrap_or_else(|| Utc::now().date_naive());
        let profile = &request.application;

        let metrics = VerificationMetrics::from_profile(profile, request.prior_bureau_hit);
        let context = BureauContext::for_applicant(profile, request.override_to_regular_flow);

        let credit = async {
            let assignment = self
                .clusters
                .resolve(
                    &profile.agent_id,
                    context.bpkb_name_type,
                    as_of,
                    &thresholds.cluster,
                    &thresholds.fpd_table,
                )
                .await?;
            let response = self
                .bureau
                .inquire(&bureau::inquiry_request(profile))
                .await
                .map_err(FilteringError::Bureau)?;
            let evaluation = bureau::evaluate(&response, &context, &thresholds.bureau);
            Ok::<_, FilteringError>((assignment, evaluation))
        };
        let identity = async {
            self.verifier
                .verify(profile, metrics, &thresholds.verification)
                .await
                .map_err(FilteringError::from)
        };

        let ((assignment, evaluation), verification) = tokio::try_join!(credit, identity)?;

        let record = assemble(
            run_id,
            profile,
            as_of,
            &thresholds,
            assignment,
            evaluation,
            verification,
        );
        let stored = self.repository.insert(record)?;

        info!(
            run_id = %stored.run_id.0,
            prospect_id = %stored.prospect_id.0,
            decision = stored.decision.label(),
            code = %stored.code,
            "screening decided"
        );
        Ok(stored)
    }

    /// Race the pipeline against `cancel`. Nothing is persisted when
    /// cancellation wins.
    pub async fn screen_until<F>(
        &self,
        request: ScreeningRequest,
        cancel: F,
    ) -> Result<FilteringDecision, FilteringError>
    where
        F: Future<Output = ()>,
    {
        let prospect_id = request.application.prospect_id.clone();
        tokio::select! {
            biased;
            _ = cancel => {
                warn!(prospect_id = %prospect_id.0, "screening cancelled");
                Err(FilteringError::Cancelled)
            }
            result = self.screen(request) => result,
        }
    }

    pub fn get(&self, run_id: &RunId) -> Result<FilteringDecision, FilteringError> {
        let record = self
            .repository
            .fetch(run_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    pub fn history(
        &self,
        prospect_id: &ProspectId,
    ) -> Result<Vec<FilteringDecision>, FilteringError> {
        Ok(self.repository.for_prospect(prospect_id)?)
    }
}

fn assemble(
    run_id: RunId,
    profile: &ApplicantProfile,
    as_of: NaiveDate,
    thresholds: &ThresholdConfig,
    assignment: ClusterAssignment,
    evaluation: BureauEvaluation,
    verification: VerificationOutcome,
) -> FilteringDecision {
    let mut record = FilteringDecision {
        run_id,
        prospect_id: profile.prospect_id.clone(),
        decision: Decision::Reject,
        code: evaluation.code.clone(),
        reason: evaluation.reason.clone(),
        next_process: false,
        cluster: None,
        bureau_result: Some(evaluation.result_class),
        ltv_percent: None,
        max_tenor: None,
        adjust_tenor: false,
        verification,
        bureau_snapshots: evaluation.snapshots,
        threshold_version: thresholds.version.clone(),
        decided_at: Utc::now(),
    };

    match record.verification.decision {
        Decision::Reject | Decision::Contingency => {
            record.decision = record.verification.decision;
            record.code = record.verification.code.clone();
            record.reason = record.verification.reason.clone();
            record.cluster = Some(assignment);
            return record;
        }
        Decision::Pass | Decision::Bypass => {}
    }

    if !evaluation.next_process {
        record.cluster = Some(assignment);
        return record;
    }

    let query = LtvQuery {
        cluster: assignment.cluster.clone(),
        bureau_result: evaluation.result_class,
        tenor_months: profile.financing.tenor_months,
        bpkb_name_type: profile.bpkb_name_type(),
        vehicle_age_years: profile.vehicle_age_at_maturity(as_of),
        total_non_collateral_debt: evaluation.total_non_collateral_debt,
    };
    record.cluster = Some(assignment);

    match thresholds.ltv_table.elaborate(&query) {
        LtvOutcome::Available {
            ltv_percent,
            max_tenor,
        } => {
            record.decision = Decision::Pass;
            record.next_process = true;
            record.ltv_percent = Some(ltv_percent);
            record.max_tenor = Some(max_tenor);
            record.reason = format!(
                "{}; LTV {ltv_percent}% for {} months",
                evaluation.reason, query.tenor_months
            );
        }
        LtvOutcome::AdjustTenor { max_tenor } => {
            record.decision = Decision::Pass;
            record.next_process = true;
            record.ltv_percent = Some(0.0);
            record.max_tenor = Some(max_tenor);
            record.adjust_tenor = true;
            record.reason = format!("try a shorter tenor (up to {max_tenor} months)");
        }
        LtvOutcome::NoProduct => {
            record.decision = Decision::Reject;
            record.ltv_percent = Some(0.0);
            record.max_tenor = Some(0);
            record.reason = "no product available".to_string();
        }
    }

    record
}

/// Error raised by the filtering service.
#[derive(Debug, thiserror::Error)]
pub enum FilteringError {
    #[error(transparent)]
    Thresholds(#[from] ThresholdError),
    #[error(transparent)]
    Cluster(#[from] ClusterError),
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error("bureau inquiry failed: {0}")]
    Bureau(#[source] ProviderError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("screening cancelled")]
    Cancelled,
}
