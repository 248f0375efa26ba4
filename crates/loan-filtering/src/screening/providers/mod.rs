//! Narrow interfaces to the identity providers, the credit bureau and the agent
//! directory. The pipeline only ever talks to these traits.

mod http;

pub use http::{
    classify_reply, EkycEnvelope, HttpAgentDirectory, HttpBureauGateway, HttpGatewayConfig,
    HttpIdentityGateway,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::bureau::BureauResponse;
use super::domain::{AgentId, BpkbNameType};

/// Identity provider selectable per sub-check through threshold config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Default civil-registry link.
    Registry,
    /// Alternate aggregator partner.
    Partner,
}

impl ProviderKind {
    pub const fn label(self) -> &'static str {
        match self {
            ProviderKind::Registry => "registry",
            ProviderKind::Partner => "partner",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classified outcome of a primary-stage provider call.
///
/// Timeouts and failed checks are outcomes rather than errors: they drive the
/// fallback chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ProviderReply<T> {
    Evaluated(T),
    TimedOut,
    NotChecked { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataVerificationRequest {
    pub prospect_id: String,
    pub nik: String,
    pub legal_name: String,
    pub birth_date: NaiveDate,
    pub birth_place: String,
    pub mother_name: String,
    pub gender: String,
    pub address: String,
}

/// Field-level match report returned by a data-verification provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataVerificationData {
    pub is_valid: bool,
    /// Negative-match reason such as `deceased`, `duplicate`, `inactive` or `not found`.
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub nik_match: bool,
    #[serde(default)]
    pub birth_date_match: bool,
    #[serde(default)]
    pub gender_match: bool,
    #[serde(default)]
    pub name_match: f64,
    #[serde(default)]
    pub address_match: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceMatchRequest {
    pub prospect_id: String,
    pub nik: String,
    pub selfie_url: String,
    pub id_card_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceRule {
    Match,
    IdMismatch,
    PhotoMismatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceMatchData {
    pub rule: FaceRule,
    #[serde(default)]
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiometricRequest {
    pub prospect_id: String,
    pub nik: String,
    pub legal_name: String,
    pub birth_date: NaiveDate,
    pub selfie_url: String,
}

/// Similarity scores (0–100) from the biometric cross-check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiometricData {
    pub name_similarity: f64,
    pub birth_date_similarity: f64,
    pub selfie_similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub prospect_id: String,
    pub nik: String,
    pub legal_name: String,
    pub id_card_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentValidation {
    pub valid: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BureauSubject {
    pub nik: String,
    pub legal_name: String,
    pub birth_date: NaiveDate,
    pub mother_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BureauRequest {
    pub prospect_id: String,
    pub applicant: BureauSubject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spouse: Option<BureauSubject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub agent_id: AgentId,
    pub join_date: NaiveDate,
}

/// Historical performance for one agent and BPKB name type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPerformance {
    pub fpd_rate: f64,
    pub accumulated_sales: u32,
}

/// eKYC providers used by the identity verification chain.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    async fn verify_data(
        &self,
        provider: ProviderKind,
        request: &DataVerificationRequest,
    ) -> ProviderReply<DataVerificationData>;

    async fn match_face(
        &self,
        provider: ProviderKind,
        request: &FaceMatchRequest,
    ) -> ProviderReply<FaceMatchData>;

    /// `Ok(None)` when the biometric provider holds no record for the applicant.
    async fn biometric_check(
        &self,
        request: &BiometricRequest,
    ) -> Result<Option<BiometricData>, ProviderError>;

    async fn validate_document(
        &self,
        request: &DocumentRequest,
    ) -> Result<DocumentValidation, ProviderError>;
}

#[async_trait]
pub trait BureauGateway: Send + Sync {
    async fn inquire(&self, request: &BureauRequest) -> Result<BureauResponse, ProviderError>;
}

/// HR lookups for agents and their sales performance.
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    async fn agent(&self, agent_id: &AgentId) -> Result<Option<AgentProfile>, ProviderError>;

    async fn performance(
        &self,
        agent_id: &AgentId,
        name_type: BpkbNameType,
    ) -> Result<Option<AgentPerformance>, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("provider returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("{message}")]
    InvalidResponse { message: String },
}

impl ProviderError {
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}

/// Wrap a raw payload for audit without losing it when serialization fails.
pub(crate) fn audit_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
