use serde::{Deserialize, Serialize};

use super::codes::FallbackCode;
use crate::screening::domain::Decision;
use crate::screening::providers::{BiometricData, DocumentValidation};
use crate::screening::thresholds::BiometricThresholds;

/// Verdict of the biometric cross-check. Each signal is checked on its own;
/// the first failing one names the code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiometricVerdict {
    pub decision: Decision,
    pub code: FallbackCode,
    pub failed_signals: Vec<FallbackCode>,
}

pub fn assess_biometric(
    record: Option<&BiometricData>,
    thresholds: &BiometricThresholds,
) -> BiometricVerdict {
    let Some(record) = record else {
        return BiometricVerdict {
            decision: Decision::Reject,
            code: FallbackCode::BiometricNotFound,
            failed_signals: vec![FallbackCode::BiometricNotFound],
        };
    };

    let failed_signals: Vec<FallbackCode> = [
        (
            record.name_similarity >= thresholds.name_similarity_min,
            FallbackCode::BiometricName,
        ),
        (
            record.birth_date_similarity >= thresholds.birth_date_similarity_min,
            FallbackCode::BiometricBirthDate,
        ),
        (
            record.selfie_similarity >= thresholds.selfie_similarity_min,
            FallbackCode::BiometricSelfie,
        ),
    ]
    .into_iter()
    .filter(|(passed, _)| !passed)
    .map(|(_, code)| code)
    .collect();

    match failed_signals.first() {
        Some(code) => BiometricVerdict {
            decision: Decision::Reject,
            code: *code,
            failed_signals,
        },
        None => BiometricVerdict {
            decision: Decision::Pass,
            code: FallbackCode::BiometricPass,
            failed_signals,
        },
    }
}

/// Reasons the document-validator result may be overridden to a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentOverrides {
    /// BPKB ownership code is on the configured alternate-owner list.
    pub alternate_owner: bool,
    /// The applicant already has a bureau hit on record.
    pub bureau_hit: bool,
}

impl DocumentOverrides {
    pub fn applies(&self) -> bool {
        self.alternate_owner || self.bureau_hit
    }
}

pub fn assess_document(
    validation: &DocumentValidation,
    overrides: DocumentOverrides,
) -> (Decision, FallbackCode) {
    match (overrides.applies(), validation.valid) {
        (true, _) => (Decision::Pass, FallbackCode::DocumentOverride),
        (false, true) => (Decision::Pass, FallbackCode::DocumentPass),
        (false, false) => (Decision::Reject, FallbackCode::DocumentReject),
    }
}
