//! Versioned configuration blobs consumed by the decision pipeline.
//!
//! Blobs are fetched per run and never cached here, so two runs against different
//! threshold versions may legitimately diverge for the same applicant.

mod types;

pub use types::{
    BiometricThresholds, BureauThresholds, ClusterPolicy, OverdueLimits, ProviderThresholds,
    ThresholdConfig, VerificationThresholds,
};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::cluster::FpdBand;
use super::ltv::LtvTable;

pub const FILTERING_GROUP: &str = "filtering";
pub const VERIFICATION_KEY: &str = "verification";
pub const BUREAU_KEY: &str = "bureau";
pub const CLUSTER_POLICY_KEY: &str = "cluster_policy";
pub const CLUSTER_FPD_KEY: &str = "cluster_fpd";
pub const LTV_KEY: &str = "ltv";

/// Lookup key into the threshold store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThresholdKey {
    pub group: String,
    pub line_of_business: String,
    pub key: String,
}

impl ThresholdKey {
    pub fn new(group: &str, line_of_business: &str, key: &str) -> Self {
        Self {
            group: group.to_string(),
            line_of_business: line_of_business.to_string(),
            key: key.to_string(),
        }
    }
}

impl std::fmt::Display for ThresholdKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.group, self.line_of_business, self.key)
    }
}

/// A configuration blob together with the version it was published under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedBlob {
    pub version: String,
    pub payload: Value,
}

/// External configuration store. `Ok(None)` means the key has no published blob.
#[async_trait]
pub trait ThresholdStore: Send + Sync {
    async fn fetch(&self, key: &ThresholdKey) -> Result<Option<VersionedBlob>, ThresholdError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ThresholdError {
    #[error("threshold store unavailable: {0}")]
    Unavailable(String),
    #[error("required threshold blob {key} is missing")]
    Missing { key: String },
    #[error("threshold blob {key} is malformed: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Fetch every blob a run needs and assemble one [`ThresholdConfig`].
///
/// Verification, bureau and cluster policy blobs are required. The FPD and LTV
/// tables may be absent, which the resolvers treat as "no mapping found".
pub async fn load<S>(store: &S, line_of_business: &str) -> Result<ThresholdConfig, ThresholdError>
where
    S: ThresholdStore + ?Sized,
{
    let mut versions = Vec::new();

    let verification = required(store, line_of_business, VERIFICATION_KEY, &mut versions).await?;
    let bureau = required(store, line_of_business, BUREAU_KEY, &mut versions).await?;
    let cluster = required(store, line_of_business, CLUSTER_POLICY_KEY, &mut versions).await?;
    let fpd_table: Option<Vec<FpdBand>> =
        optional(store, line_of_business, CLUSTER_FPD_KEY, &mut versions).await?;
    let ltv_table: Option<LtvTable> =
        optional(store, line_of_business, LTV_KEY, &mut versions).await?;

    let version = versions.join(";");
    debug!(%version, line_of_business, "loaded filtering thresholds");

    Ok(ThresholdConfig {
        version,
        verification,
        bureau,
        cluster,
        fpd_table: fpd_table.unwrap_or_default(),
        ltv_table: ltv_table.unwrap_or_default(),
    })
}

async fn required<S, T>(
    store: &S,
    line_of_business: &str,
    key: &str,
    versions: &mut Vec<String>,
) -> Result<T, ThresholdError>
where
    S: ThresholdStore + ?Sized,
    T: DeserializeOwned,
{
    let key = ThresholdKey::new(FILTERING_GROUP, line_of_business, key);
    optional_blob(store, &key, versions)
        .await?
        .ok_or_else(|| ThresholdError::Missing {
            key: key.to_string(),
        })
}

async fn optional<S, T>(
    store: &S,
    line_of_business: &str,
    key: &str,
    versions: &mut Vec<String>,
) -> Result<Option<T>, ThresholdError>
where
    S: ThresholdStore + ?Sized,
    T: DeserializeOwned,
{
    let key = ThresholdKey::new(FILTERING_GROUP, line_of_business, key);
    optional_blob(store, &key, versions).await
}

async fn optional_blob<S, T>(
    store: &S,
    key: &ThresholdKey,
    versions: &mut Vec<String>,
) -> Result<Option<T>, ThresholdError>
where
    S: ThresholdStore + ?Sized,
    T: DeserializeOwned,
{
    let Some(blob) = store.fetch(key).await? else {
        return Ok(None);
    };

    if blob.payload.is_null() {
        return Ok(None);
    }

    let parsed =
        serde_json::from_value(blob.payload).map_err(|source| ThresholdError::Malformed {
            key: key.to_string(),
            source,
        })?;
    versions.push(format!("{}@{}", key.key, blob.version));
    Ok(Some(parsed))
}
