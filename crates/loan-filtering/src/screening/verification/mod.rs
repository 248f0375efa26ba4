//! Identity verification chain: primary data + face link, then the biometric
//! cross-check, then the document validator. The first stage that yields a
//! terminal verdict ends the chain.

mod audit;
mod codes;
mod fallback;
mod primary;

pub use audit::VerificationAudit;
pub use codes::{FallbackCode, RuleCode};
pub use fallback::{assess_biometric, assess_document, BiometricVerdict, DocumentOverrides};
pub use primary::{
    assess_data, assess_face, combine, evaluate_data, evaluate_face, resolve_data, CheckStatus,
    CodeOwner, Combination, DataCheck, DataResolution, DataState, FaceCheck, FaceState,
    FaceVerdict, PrimaryOutcome,
};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::domain::{ApplicantProfile, CustomerSegment, CustomerStatus, Decision};
use super::providers::{
    audit_value, BiometricRequest, DataVerificationRequest, DocumentRequest, FaceMatchRequest,
    IdentityGateway, ProviderError,
};
use super::thresholds::VerificationThresholds;
use crate::config::PipelineConfig;

/// Caller-supplied facts that steer bypass and override rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationMetrics {
    pub customer_status: CustomerStatus,
    pub customer_segment: CustomerSegment,
    /// A previous bureau hit exists for the applicant.
    pub bureau_hit: bool,
}

impl VerificationMetrics {
    pub fn from_profile(profile: &ApplicantProfile, bureau_hit: bool) -> Self {
        Self {
            customer_status: profile.customer_status,
            customer_segment: profile.customer_segment,
            bureau_hit,
        }
    }
}

/// Stage of the chain that produced the final verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationSource {
    PrimaryLink,
    Biometric,
    DocumentValidator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub source: VerificationSource,
    pub decision: Decision,
    pub code: String,
    pub reason: String,
    pub similarity: Option<f64>,
    /// `CONTINGENCY - <provider>` when the primary link could not decide.
    pub contingency: Option<String>,
    pub audit: VerificationAudit,
}

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("document validator failed: {0}")]
    DocumentValidator(#[source] ProviderError),
}

pub struct IdentityVerifier<G: ?Sized> {
    gateway: Arc<G>,
    config: PipelineConfig,
}

impl<G> IdentityVerifier<G>
where
    G: IdentityGateway + ?Sized,
{
    pub fn new(gateway: Arc<G>, config: PipelineConfig) -> Self {
        Self { gateway, config }
    }

    /// Run the whole chain. Only a failing document validator is an error;
    /// every other provider failure is folded into a verdict.
    pub async fn verify(
        &self,
        profile: &ApplicantProfile,
        metrics: VerificationMetrics,
        thresholds: &VerificationThresholds,
    ) -> Result<VerificationOutcome, VerificationError> {
        let (primary, mut audit) = self.verify_primary(profile, metrics, thresholds).await;

        if primary.decision != Decision::Contingency {
            return Ok(VerificationOutcome {
                source: VerificationSource::PrimaryLink,
                decision: primary.decision,
                code: primary.code,
                reason: primary.reason,
                similarity: primary.similarity,
                contingency: None,
                audit,
            });
        }

        let contingency = primary.error.clone();
        debug!(
            prospect_id = %profile.prospect_id.0,
            code = %primary.code,
            "primary link undecided, trying biometric cross-check"
        );

        match self.gateway.biometric_check(&biometric_request(profile)).await {
            Ok(record) => {
                let verdict = assess_biometric(record.as_ref(), &thresholds.biometric);
                audit.record_biometric(json!({
                    "trigger_code": &primary.code,
                    "record": record.as_ref().map(audit_value),
                    "decision": verdict.decision,
                    "code": verdict.code.code(),
                    "failed_signals": verdict
                        .failed_signals
                        .iter()
                        .map(|code| code.code())
                        .collect::<Vec<_>>(),
                }));

                return Ok(VerificationOutcome {
                    source: VerificationSource::Biometric,
                    decision: verdict.decision,
                    code: verdict.code.code().to_string(),
                    reason: verdict.code.reason().to_string(),
                    similarity: record.map(|record| record.selfie_similarity),
                    contingency,
                    audit,
                });
            }
            Err(error) => {
                warn!(
                    prospect_id = %profile.prospect_id.0,
                    %error,
                    "biometric cross-check failed, falling back to document validator"
                );
                audit.record_biometric(json!({
                    "trigger_code": &primary.code,
                    "error": error.to_string(),
                }));
            }
        }

        let overrides = DocumentOverrides {
            alternate_owner: self
                .config
                .is_alternate_owner(&profile.vehicle.bpkb_ownership),
            bureau_hit: metrics.bureau_hit,
        };

        let validation = match self
            .gateway
            .validate_document(&document_request(profile))
            .await
        {
            Ok(validation) => validation,
            Err(error) => {
                audit.record_document(json!({
                    "trigger_code": &primary.code,
                    "error": error.to_string(),
                }));
                return Err(VerificationError::DocumentValidator(error));
            }
        };

        let (decision, code) = assess_document(&validation, overrides);
        audit.record_document(json!({
            "trigger_code": &primary.code,
            "validation": audit_value(&validation),
            "overrides": audit_value(&overrides),
            "decision": decision,
            "code": code.code(),
        }));

        Ok(VerificationOutcome {
            source: VerificationSource::DocumentValidator,
            decision,
            code: code.code().to_string(),
            reason: validation
                .message
                .filter(|_| decision == Decision::Reject)
                .unwrap_or_else(|| code.reason().to_string()),
            similarity: None,
            contingency,
            audit,
        })
    }

    /// Primary data + face link only. A data-stage reject skips the face call.
    pub async fn verify_primary(
        &self,
        profile: &ApplicantProfile,
        metrics: VerificationMetrics,
        thresholds: &VerificationThresholds,
    ) -> (PrimaryOutcome, VerificationAudit) {
        let mut audit = VerificationAudit::default();

        let data_provider = thresholds.data_provider;
        let reply = self
            .gateway
            .verify_data(data_provider, &data_request(profile))
            .await;
        let data = evaluate_data(
            data_provider,
            reply,
            thresholds.for_provider(data_provider),
            metrics.customer_status,
            metrics.customer_segment,
        );
        audit.record_data(&data);
        if data.status != CheckStatus::Evaluated {
            warn!(
                prospect_id = %profile.prospect_id.0,
                provider = %data_provider,
                status = ?data.status,
                "identity data verification unavailable"
            );
        }

        if data.decision == Decision::Reject {
            return (PrimaryOutcome::rejected_by_data(&data), audit);
        }

        let face_provider = thresholds.face_provider;
        let reply = self
            .gateway
            .match_face(face_provider, &face_request(profile))
            .await;
        let face = evaluate_face(face_provider, reply, thresholds.for_provider(face_provider));
        audit.record_face(&face);
        if face.status != CheckStatus::Evaluated {
            warn!(
                prospect_id = %profile.prospect_id.0,
                provider = %face_provider,
                status = ?face.status,
                "face match unavailable"
            );
        }

        let combination = combine(
            data.state(),
            face.state(),
            metrics.customer_status,
            metrics.customer_segment,
        );
        (
            PrimaryOutcome::from_combination(combination, &data, &face),
            audit,
        )
    }
}

fn data_request(profile: &ApplicantProfile) -> DataVerificationRequest {
    DataVerificationRequest {
        prospect_id: profile.prospect_id.0.clone(),
        nik: profile.identity.nik.clone(),
        legal_name: profile.identity.legal_name.clone(),
        birth_date: profile.identity.birth_date,
        birth_place: profile.identity.birth_place.clone(),
        mother_name: profile.identity.mother_name.clone(),
        gender: profile.identity.gender.code().to_string(),
        address: profile.address.single_line(),
    }
}

fn face_request(profile: &ApplicantProfile) -> FaceMatchRequest {
    FaceMatchRequest {
        prospect_id: profile.prospect_id.0.clone(),
        nik: profile.identity.nik.clone(),
        selfie_url: profile.photos.selfie_url.clone(),
        id_card_url: profile.photos.id_card_url.clone(),
    }
}

fn biometric_request(profile: &ApplicantProfile) -> BiometricRequest {
    BiometricRequest {
        prospect_id: profile.prospect_id.0.clone(),
        nik: profile.identity.nik.clone(),
        legal_name: profile.identity.legal_name.clone(),
        birth_date: profile.identity.birth_date,
        selfie_url: profile.photos.selfie_url.clone(),
    }
}

fn document_request(profile: &ApplicantProfile) -> DocumentRequest {
    DocumentRequest {
        prospect_id: profile.prospect_id.0.clone(),
        nik: profile.identity.nik.clone(),
        legal_name: profile.identity.legal_name.clone(),
        id_card_url: profile.photos.id_card_url.clone(),
    }
}
