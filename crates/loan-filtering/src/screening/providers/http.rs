use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    AgentDirectory, AgentPerformance, AgentProfile, BiometricData, BiometricRequest,
    BureauGateway, BureauRequest, DataVerificationData, DataVerificationRequest, DocumentRequest,
    DocumentValidation, FaceMatchData, FaceMatchRequest, IdentityGateway, ProviderError,
    ProviderKind, ProviderReply,
};
use crate::config::PipelineConfig;
use crate::screening::bureau::BureauResponse;
use crate::screening::domain::{AgentId, BpkbNameType};

/// Connection settings shared by the outbound gateways.
#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub retries: u8,
}

impl HttpGatewayConfig {
    pub fn identity(config: &PipelineConfig) -> Self {
        Self {
            base_url: config.provider_base_url.clone(),
            timeout: config.provider_timeout,
            retries: config.provider_retries,
        }
    }

    pub fn bureau(config: &PipelineConfig) -> Self {
        Self {
            base_url: config.provider_base_url.clone(),
            timeout: config.bureau_timeout,
            retries: config.provider_retries,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Response envelope used by every eKYC provider: `{code, data|errors, message}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EkycEnvelope {
    #[serde(default)]
    pub code: Value,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Classify an HTTP outcome: 200/201 evaluate `data`, 502/504 time out, anything
/// else is "not checked" with the provider message captured for audit.
pub fn classify_reply(status: u16, envelope: &EkycEnvelope) -> ProviderReply<Value> {
    match status {
        200 | 201 => ProviderReply::Evaluated(envelope.data.clone().unwrap_or(Value::Null)),
        502 | 504 => ProviderReply::TimedOut,
        _ => ProviderReply::NotChecked {
            message: envelope
                .message
                .clone()
                .or_else(|| envelope.errors.as_ref().map(Value::to_string))
                .unwrap_or_else(|| format!("provider returned status {status}")),
        },
    }
}

struct RawReply {
    status: u16,
    body: String,
}

impl RawReply {
    fn envelope(&self) -> EkycEnvelope {
        serde_json::from_str(&self.body).unwrap_or_else(|_| EkycEnvelope {
            message: Some(self.body.chars().take(200).collect()),
            ..EkycEnvelope::default()
        })
    }

    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Thin JSON-over-HTTP client with a call-specific timeout and fixed retry count.
#[derive(Debug, Clone)]
struct JsonClient {
    client: Client,
    config: HttpGatewayConfig,
}

impl JsonClient {
    fn new(config: HttpGatewayConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    async fn post_once<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RawReply, reqwest::Error> {
        let response = self
            .client
            .post(self.config.url(path))
            .json(body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawReply { status, body })
    }

    /// Retries transport timeouts, connect errors and gateway-class statuses only.
    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RawReply, reqwest::Error> {
        let mut attempt = 0u8;
        loop {
            let result = self.post_once(path, body).await;
            let retryable = match &result {
                Ok(reply) => is_gateway_status(reply.status),
                Err(err) => err.is_timeout() || err.is_connect(),
            };
            if !retryable || attempt >= self.config.retries {
                return result;
            }
            attempt += 1;
            warn!(path, attempt, "retrying provider call");
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ProviderError> {
        let response = self.client.get(self.config.url(path)).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        let envelope: EkycEnvelope = response.json().await?;
        match envelope.data {
            Some(Value::Null) | None => Ok(None),
            Some(data) => Ok(Some(serde_json::from_value(data)?)),
        }
    }
}

fn is_gateway_status(status: u16) -> bool {
    matches!(status, 502 | 504)
}

fn reply_from_transport<T>(err: reqwest::Error) -> ProviderReply<T> {
    if err.is_timeout() {
        ProviderReply::TimedOut
    } else {
        ProviderReply::NotChecked {
            message: err.to_string(),
        }
    }
}

fn decode_reply<T: DeserializeOwned>(reply: ProviderReply<Value>) -> ProviderReply<T> {
    match reply {
        ProviderReply::Evaluated(data) => match serde_json::from_value(data) {
            Ok(parsed) => ProviderReply::Evaluated(parsed),
            Err(err) => ProviderReply::NotChecked {
                message: format!("unreadable provider payload: {err}"),
            },
        },
        ProviderReply::TimedOut => ProviderReply::TimedOut,
        ProviderReply::NotChecked { message } => ProviderReply::NotChecked { message },
    }
}

fn require_success(reply: RawReply) -> Result<EkycEnvelope, ProviderError> {
    let envelope = reply.envelope();
    if reply.is_success() {
        Ok(envelope)
    } else {
        Err(ProviderError::Status {
            status: reply.status,
            message: envelope.message.unwrap_or_default(),
        })
    }
}

pub struct HttpIdentityGateway {
    http: JsonClient,
}

impl HttpIdentityGateway {
    pub fn new(config: HttpGatewayConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            http: JsonClient::new(config)?,
        })
    }

    async fn primary<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> ProviderReply<T> {
        match self.http.post(path, body).await {
            Ok(reply) => {
                debug!(path, status = reply.status, "primary ekyc call returned");
                decode_reply(classify_reply(reply.status, &reply.envelope()))
            }
            Err(err) => {
                warn!(path, error = %err, "primary ekyc call failed");
                reply_from_transport(err)
            }
        }
    }
}

#[async_trait]
impl IdentityGateway for HttpIdentityGateway {
    async fn verify_data(
        &self,
        provider: ProviderKind,
        request: &DataVerificationRequest,
    ) -> ProviderReply<DataVerificationData> {
        let path = format!("/ekyc/{}/data-verification", provider.label());
        self.primary(&path, request).await
    }

    async fn match_face(
        &self,
        provider: ProviderKind,
        request: &FaceMatchRequest,
    ) -> ProviderReply<FaceMatchData> {
        let path = format!("/ekyc/{}/face-match", provider.label());
        self.primary(&path, request).await
    }

    async fn biometric_check(
        &self,
        request: &BiometricRequest,
    ) -> Result<Option<BiometricData>, ProviderError> {
        let reply = self.http.post("/ekyc/biometric", request).await?;
        if reply.status == StatusCode::NOT_FOUND.as_u16() {
            return Ok(None);
        }
        let envelope = require_success(reply)?;
        match envelope.data {
            Some(Value::Null) | None => Ok(None),
            Some(data) => Ok(Some(serde_json::from_value(data)?)),
        }
    }

    async fn validate_document(
        &self,
        request: &DocumentRequest,
    ) -> Result<DocumentValidation, ProviderError> {
        let reply = self.http.post("/ekyc/document-validation", request).await?;
        let envelope = require_success(reply)?;
        let data = envelope
            .data
            .ok_or_else(|| ProviderError::invalid_response("document validation without data"))?;
        Ok(serde_json::from_value(data)?)
    }
}

pub struct HttpBureauGateway {
    http: JsonClient,
}

impl HttpBureauGateway {
    pub fn new(config: HttpGatewayConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            http: JsonClient::new(config)?,
        })
    }
}

#[async_trait]
impl BureauGateway for HttpBureauGateway {
    async fn inquire(&self, request: &BureauRequest) -> Result<BureauResponse, ProviderError> {
        let reply = self.http.post("/bureau/inquiry", request).await?;
        if !reply.is_success() {
            return Err(ProviderError::Status {
                status: reply.status,
                message: reply.body.chars().take(200).collect(),
            });
        }
        Ok(serde_json::from_str(&reply.body)?)
    }
}

pub struct HttpAgentDirectory {
    http: JsonClient,
}

impl HttpAgentDirectory {
    pub fn new(config: HttpGatewayConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            http: JsonClient::new(config)?,
        })
    }
}

#[async_trait]
impl AgentDirectory for HttpAgentDirectory {
    async fn agent(&self, agent_id: &AgentId) -> Result<Option<AgentProfile>, ProviderError> {
        self.http.get(&format!("/agents/{}", agent_id.0)).await
    }

    async fn performance(
        &self,
        agent_id: &AgentId,
        name_type: BpkbNameType,
    ) -> Result<Option<AgentPerformance>, ProviderError> {
        self.http
            .get(&format!(
                "/agents/{}/performance?bpkb_name_type={}",
                agent_id.0,
                name_type.label()
            ))
            .await
    }
}
