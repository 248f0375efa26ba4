use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::primary::{DataCheck, FaceCheck};
use crate::screening::providers::audit_value;

/// Raw payloads of every stage the chain reached. Stages that were never
/// reached serialize as `null` so the record shape stays fixed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct VerificationAudit {
    pub verification_data: Option<Value>,
    pub verification_data_service: Option<String>,
    pub verification_data_error: Option<String>,
    pub verification_face: Option<Value>,
    pub verification_face_service: Option<String>,
    pub verification_face_error: Option<String>,
    pub biometric_fallback: Option<Value>,
    pub document_fallback: Option<Value>,
}

impl VerificationAudit {
    pub(crate) fn record_data(&mut self, check: &DataCheck) {
        self.verification_data = Some(audit_value(check));
        self.verification_data_service = Some(check.provider.label().to_string());
        self.verification_data_error = check.error.clone();
    }

    pub(crate) fn record_face(&mut self, check: &FaceCheck) {
        self.verification_face = Some(audit_value(check));
        self.verification_face_service = Some(check.provider.label().to_string());
        self.verification_face_error = check.error.clone();
    }

    pub(crate) fn record_biometric(&mut self, payload: Value) {
        self.biometric_fallback = Some(payload);
    }

    pub(crate) fn record_document(&mut self, payload: Value) {
        self.document_fallback = Some(payload);
    }

    pub fn to_json(&self) -> Value {
        audit_value(self)
    }
}
