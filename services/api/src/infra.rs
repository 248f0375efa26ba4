use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use loan_filtering::config::PipelineConfig;
use loan_filtering::error::AppError;
use loan_filtering::screening::cluster::InMemoryWindowStore;
use loan_filtering::screening::ltv::LtvTable;
use loan_filtering::screening::providers::{
    HttpAgentDirectory, HttpBureauGateway, HttpGatewayConfig, HttpIdentityGateway,
};
use loan_filtering::screening::thresholds::{
    ThresholdError, ThresholdKey, ThresholdStore, VersionedBlob, LTV_KEY,
};
use loan_filtering::screening::{
    DecisionRepository, FilteringDecision, ProspectId, RepositoryError, RunId, ScreeningBackends,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryDecisionRepository {
    records: Arc<Mutex<HashMap<RunId, FilteringDecision>>>,
}

impl DecisionRepository for InMemoryDecisionRepository {
    fn insert(&self, record: FilteringDecision) -> Result<FilteringDecision, RepositoryError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository lock poisoned".into()))?;
        if guard.contains_key(&record.run_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.run_id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, run_id: &RunId) -> Result<Option<FilteringDecision>, RepositoryError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository lock poisoned".into()))?;
        Ok(guard.get(run_id).cloned())
    }

    fn for_prospect(
        &self,
        prospect_id: &ProspectId,
    ) -> Result<Vec<FilteringDecision>, RepositoryError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository lock poisoned".into()))?;
        let mut records: Vec<_> = guard
            .values()
            .filter(|record| &record.prospect_id == prospect_id)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.decided_at);
        Ok(records)
    }
}

/// Threshold blobs published as files:
/// `<root>/<group>/<line_of_business>/<key>.json` holding `{version, payload}`.
///
/// The LTV table may instead be published as `ltv.csv` next to the JSON blobs;
/// its version is the file's modification time.
pub(crate) struct DirectoryThresholdStore {
    root: PathBuf,
}

impl DirectoryThresholdStore {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn blob_dir(&self, key: &ThresholdKey) -> PathBuf {
        self.root.join(&key.group).join(&key.line_of_business)
    }

    fn read_json(&self, key: &ThresholdKey, path: &Path) -> Result<VersionedBlob, ThresholdError> {
        let raw = fs::read_to_string(path).map_err(|err| unavailable(path, err))?;
        serde_json::from_str(&raw).map_err(|source| ThresholdError::Malformed {
            key: key.to_string(),
            source,
        })
    }

    fn read_ltv_csv(&self, key: &ThresholdKey, path: &Path) -> Result<VersionedBlob, ThresholdError> {
        let file = fs::File::open(path).map_err(|err| unavailable(path, err))?;
        let table = LtvTable::from_csv_reader(file)
            .map_err(|err| ThresholdError::Unavailable(format!("{key}: {err}")))?;
        let modified: DateTime<Utc> = fs::metadata(path)
            .and_then(|meta| meta.modified())
            .map_err(|err| unavailable(path, err))?
            .into();
        let payload = serde_json::to_value(table).map_err(|source| ThresholdError::Malformed {
            key: key.to_string(),
            source,
        })?;

        Ok(VersionedBlob {
            version: format!("csv-{}", modified.format("%Y%m%dT%H%M%S")),
            payload,
        })
    }
}

#[async_trait]
impl ThresholdStore for DirectoryThresholdStore {
    async fn fetch(&self, key: &ThresholdKey) -> Result<Option<VersionedBlob>, ThresholdError> {
        let dir = self.blob_dir(key);
        let json_path = dir.join(format!("{}.json", key.key));
        if json_path.is_file() {
            debug!(path = %json_path.display(), "reading threshold blob");
            return self.read_json(key, &json_path).map(Some);
        }

        if key.key == LTV_KEY {
            let csv_path = dir.join(format!("{}.csv", key.key));
            if csv_path.is_file() {
                debug!(path = %csv_path.display(), "reading ltv table export");
                return self.read_ltv_csv(key, &csv_path).map(Some);
            }
        }

        Ok(None)
    }
}

fn unavailable(path: &Path, err: io::Error) -> ThresholdError {
    ThresholdError::Unavailable(format!("{}: {err}", path.display()))
}

/// Outbound collaborators for a running service: HTTP gateways, file-backed
/// thresholds and an in-process default-window store.
pub(crate) fn http_backends(config: &PipelineConfig) -> Result<ScreeningBackends, AppError> {
    Ok(ScreeningBackends {
        thresholds: Arc::new(DirectoryThresholdStore::new(config.threshold_dir.clone())),
        identity: Arc::new(HttpIdentityGateway::new(HttpGatewayConfig::identity(
            config,
        ))?),
        bureau: Arc::new(HttpBureauGateway::new(HttpGatewayConfig::bureau(config))?),
        agents: Arc::new(HttpAgentDirectory::new(HttpGatewayConfig::identity(
            config,
        ))?),
        windows: Arc::new(InMemoryWindowStore::new()),
    })
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
