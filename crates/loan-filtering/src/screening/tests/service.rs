use super::common::*;
use std::sync::Arc;

use crate::screening::bureau::{BureauReport, BureauResultClass, Category};
use crate::screening::cluster::{Cluster, PerformanceCategory};
use crate::screening::domain::{BpkbNameType, Decision, RunId};
use crate::screening::providers::{DataVerificationData, ProviderReply};
use crate::screening::repository::{DecisionRepository, RepositoryError};
use crate::screening::thresholds::{ThresholdError, BUREAU_KEY, LTV_KEY};
use crate::screening::verification::{VerificationError, VerificationSource};
use crate::screening::FilteringError;

#[tokio::test]
async fn clean_application_passes_with_ltv() {
    let (service, repository) = build_service();

    let decision = service
        .screen(request(profile()))
        .await
        .expect("screening completes");

    assert_eq!(decision.decision, Decision::Pass);
    assert_eq!(decision.code, "2110");
    assert!(decision.next_process);
    assert_eq!(decision.ltv_percent, Some(80.0));
    assert_eq!(decision.max_tenor, Some(48));
    assert!(!decision.adjust_tenor);
    assert_eq!(
        decision.reason,
        "category I, same BPKB name, overdue within limits; LTV 80% for 24 months"
    );
    assert_eq!(decision.bureau_result, Some(BureauResultClass::Pass));
    assert_eq!(decision.verification.code, "1621");
    assert_eq!(decision.bureau_snapshots.len(), 1);
    assert_eq!(
        decision.threshold_version,
        "verification@v1;bureau@v1;cluster_policy@v1;cluster_fpd@v1;ltv@v1"
    );

    let cluster = decision.cluster.as_ref().expect("cluster recorded");
    assert_eq!(cluster.cluster, Cluster::from("A"));
    assert_eq!(
        cluster.performance_category,
        PerformanceCategory::Established
    );

    let stored = repository
        .fetch(&decision.run_id)
        .expect("fetch succeeds")
        .expect("decision persisted");
    assert_eq!(stored, decision);
}

#[tokio::test]
async fn verification_reject_overrides_bureau_pass() {
    let mut harness = Harness::standard();
    harness.identity = Arc::new(ScriptedIdentity::passing().with_data(ProviderReply::Evaluated(
        DataVerificationData {
            birth_date_match: false,
            ..data_verified()
        },
    )));
    let repository = Arc::new(MemoryRepository::default());
    let service = harness.service(repository.clone());

    let decision = service
        .screen(request(profile()))
        .await
        .expect("screening completes");

    assert_eq!(decision.decision, Decision::Reject);
    assert_eq!(decision.code, "1614");
    assert!(!decision.next_process);
    assert!(decision.ltv_percent.is_none());
    assert!(decision.cluster.is_some());
    assert_eq!(decision.bureau_result, Some(BureauResultClass::Pass));
    assert_eq!(repository.len(), 1);
}

#[tokio::test]
async fn bureau_reject_skips_ltv() {
    let mut harness = Harness::standard();
    harness.bureau = Arc::new(ScriptedBureau::returning(scored_response(BureauReport {
        ko_category: Some("repossessed".to_string()),
        ..scored_report(Category::I)
    })));
    let service = harness.service(Arc::new(MemoryRepository::default()));

    let decision = service
        .screen(request(profile()))
        .await
        .expect("screening completes");

    assert_eq!(decision.decision, Decision::Reject);
    assert_eq!(decision.code, "2104");
    assert_eq!(decision.reason, "collateral repossessed");
    assert!(decision.ltv_percent.is_none());
    assert!(decision.max_tenor.is_none());
}

#[tokio::test]
async fn long_tenor_without_product_asks_for_shorter_tenor() {
    let (service, _) = build_service();
    let mut application = profile();
    application.financing.tenor_months = 54;

    let decision = service
        .screen(request(application))
        .await
        .expect("screening completes");

    assert_eq!(decision.decision, Decision::Pass);
    assert!(decision.adjust_tenor);
    assert_eq!(decision.ltv_percent, Some(0.0));
    assert_eq!(decision.max_tenor, Some(48));
    assert_eq!(decision.reason, "try a shorter tenor (up to 48 months)");
}

#[tokio::test]
async fn cluster_without_ltv_rows_rejects() {
    let mut harness = Harness::standard();
    harness.agents = Arc::new(
        StaticAgents::with_agent(date(2020, 1, 1)).performing(BpkbNameType::Same, 4.0, 10),
    );
    let service = harness.service(Arc::new(MemoryRepository::default()));

    let decision = service
        .screen(request(profile()))
        .await
        .expect("screening completes");

    assert_eq!(decision.decision, Decision::Reject);
    assert_eq!(decision.reason, "no product available");
    assert_eq!(decision.ltv_percent, Some(0.0));
    assert_eq!(decision.max_tenor, Some(0));
    assert_eq!(
        decision.cluster.map(|assignment| assignment.cluster),
        Some(Cluster::from("B"))
    );
}

#[tokio::test]
async fn missing_ltv_blob_means_no_product() {
    let mut harness = Harness::standard();
    harness.thresholds = Arc::new(StaticThresholds::standard().without(LTV_KEY));
    let service = harness.service(Arc::new(MemoryRepository::default()));

    let decision = service
        .screen(request(profile()))
        .await
        .expect("screening completes");

    assert_eq!(decision.decision, Decision::Reject);
    assert_eq!(decision.reason, "no product available");
    assert!(!decision.threshold_version.contains("ltv@"));
}

#[tokio::test]
async fn missing_required_blob_fails_without_persisting() {
    let mut harness = Harness::standard();
    harness.thresholds = Arc::new(StaticThresholds::standard().without(BUREAU_KEY));
    let repository = Arc::new(MemoryRepository::default());
    let service = harness.service(repository.clone());

    match service.screen(request(profile())).await {
        Err(FilteringError::Thresholds(ThresholdError::Missing { key })) => {
            assert_eq!(key, "filtering/NEW_CAR/bureau")
        }
        other => panic!("expected missing threshold, got {other:?}"),
    }
    assert_eq!(repository.len(), 0);
    assert!(harness.bureau.requests.lock().expect("bureau mutex").is_empty());
}

#[tokio::test]
async fn malformed_blob_is_reported() {
    let harness = Harness::standard();
    harness
        .thresholds
        .replace(BUREAU_KEY, serde_json::json!({ "max_inquiries_last_month": "many" }));
    let service = harness.service(Arc::new(MemoryRepository::default()));

    match service.screen(request(profile())).await {
        Err(FilteringError::Thresholds(ThresholdError::Malformed { key, .. })) => {
            assert_eq!(key, "filtering/NEW_CAR/bureau")
        }
        other => panic!("expected malformed threshold, got {other:?}"),
    }
}

#[tokio::test]
async fn document_validator_failure_fails_the_run() {
    let mut harness = Harness::standard();
    harness.identity = Arc::new(
        ScriptedIdentity::passing()
            .with_data(ProviderReply::TimedOut)
            .with_face(ProviderReply::TimedOut),
    );
    let repository = Arc::new(MemoryRepository::default());
    let service = harness.service(repository.clone());

    match service.screen(request(profile())).await {
        Err(FilteringError::Verification(VerificationError::DocumentValidator(_))) => {}
        other => panic!("expected document validator error, got {other:?}"),
    }
    assert_eq!(repository.len(), 0);
}

#[tokio::test]
async fn bureau_outage_fails_the_run() {
    let mut harness = Harness::standard();
    harness.bureau = Arc::new(ScriptedBureau {
        response: None,
        requests: Default::default(),
    });
    let service = harness.service(Arc::new(MemoryRepository::default()));

    match service.screen(request(profile())).await {
        Err(FilteringError::Bureau(error)) => assert_eq!(error.to_string(), "bureau offline"),
        other => panic!("expected bureau error, got {other:?}"),
    }
}

#[tokio::test]
async fn biometric_fallback_decides_after_contingency() {
    let mut harness = Harness::standard();
    harness.identity = Arc::new(
        ScriptedIdentity::passing()
            .with_face(ProviderReply::TimedOut)
            .with_biometric(BiometricScript::Record(None)),
    );
    let service = harness.service(Arc::new(MemoryRepository::default()));

    let decision = service
        .screen(request(profile()))
        .await
        .expect("screening completes");

    assert_eq!(decision.decision, Decision::Reject);
    assert_eq!(decision.code, "1632");
    assert_eq!(decision.verification.source, VerificationSource::Biometric);
    assert_eq!(
        decision.verification.contingency.as_deref(),
        Some("CONTINGENCY - registry")
    );
}

#[tokio::test]
async fn married_applicant_sends_spouse_to_bureau() {
    let harness = Harness::standard();
    let service = harness.service(Arc::new(MemoryRepository::default()));

    service
        .screen(request(married_profile()))
        .await
        .expect("screening completes");

    let requests = harness.bureau.requests.lock().expect("bureau mutex");
    assert_eq!(requests.len(), 1);
    assert!(requests[0].spouse.is_some());
}

#[tokio::test]
async fn every_run_gets_a_new_id() {
    let (service, _) = build_service();

    let first = service
        .screen(request(profile()))
        .await
        .expect("first run");
    let second = service
        .screen(request(profile()))
        .await
        .expect("second run");

    assert_ne!(first.run_id, second.run_id);
    let history = service
        .history(&first.prospect_id)
        .expect("history loads");
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn cancelled_screening_persists_nothing() {
    let (service, repository) = build_service();

    match service
        .screen_until(request(profile()), std::future::ready(()))
        .await
    {
        Err(FilteringError::Cancelled) => {}
        other => panic!("expected cancellation, got {other:?}"),
    }
    assert_eq!(repository.len(), 0);

    let decision = service
        .screen_until(request(profile()), std::future::pending())
        .await
        .expect("uncancelled run completes");
    assert_eq!(decision.decision, Decision::Pass);
    assert_eq!(repository.len(), 1);
}

#[test]
fn get_propagates_not_found() {
    let (service, _) = build_service();

    match service.get(&RunId("run-missing".to_string())) {
        Err(FilteringError::Repository(RepositoryError::NotFound)) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[tokio::test]
async fn conflicting_insert_is_reported() {
    let service = Harness::standard().service(Arc::new(ConflictRepository));

    match service.screen(request(profile())).await {
        Err(FilteringError::Repository(RepositoryError::Conflict)) => {}
        other => panic!("expected conflict, got {other:?}"),
    }
}
