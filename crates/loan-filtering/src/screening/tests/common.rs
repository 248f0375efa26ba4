use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::config::PipelineConfig;
use crate::screening::bureau::{
    BureauRecord, BureauReport, BureauResponse, BureauResult, BureauResultClass, Category,
};
use crate::screening::cluster::{Cluster, FpdBand, InMemoryWindowStore};
use crate::screening::domain::{
    Address, AgentId, ApplicantProfile, BpkbNameType, CustomerSegment, CustomerStatus,
    Employment, FinancingRequest, Gender, Identity, MaritalStatus, PhotoReferences, ProspectId,
    RunId, Vehicle,
};
use crate::screening::ltv::{DebtBand, LtvRow, LtvTable, VehicleAgeBucket};
use crate::screening::providers::{
    AgentDirectory, AgentPerformance, AgentProfile, BiometricData, BiometricRequest,
    BureauGateway, BureauRequest, DataVerificationData, DataVerificationRequest,
    DocumentRequest, DocumentValidation, FaceMatchData, FaceMatchRequest, FaceRule,
    IdentityGateway, ProviderError, ProviderKind, ProviderReply,
};
use crate::screening::repository::{DecisionRepository, FilteringDecision, RepositoryError};
use crate::screening::thresholds::{
    BiometricThresholds, BureauThresholds, ClusterPolicy, OverdueLimits, ProviderThresholds,
    ThresholdError, ThresholdKey, ThresholdStore, VerificationThresholds, VersionedBlob,
    BUREAU_KEY, CLUSTER_FPD_KEY, CLUSTER_POLICY_KEY, LTV_KEY, VERIFICATION_KEY,
};
use crate::screening::{FilteringService, ScreeningBackends, ScreeningRequest};

pub(super) const AGENT: &str = "cmo-001";

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn as_of() -> NaiveDate {
    date(2024, 6, 1)
}

pub(super) fn identity() -> Identity {
    Identity {
        nik: "3174012501900001".to_string(),
        legal_name: "Budi Santoso".to_string(),
        birth_date: date(1990, 1, 25),
        birth_place: "Jakarta".to_string(),
        mother_name: "Siti Aminah".to_string(),
        gender: Gender::Male,
    }
}

pub(super) fn spouse() -> Identity {
    Identity {
        nik: "3174016203920002".to_string(),
        legal_name: "Dewi Lestari".to_string(),
        birth_date: date(1992, 3, 22),
        birth_place: "Bandung".to_string(),
        mother_name: "Rina Marlina".to_string(),
        gender: Gender::Female,
    }
}

pub(super) fn profile() -> ApplicantProfile {
    ApplicantProfile {
        prospect_id: ProspectId("PRS-2024-0001".to_string()),
        agent_id: AgentId(AGENT.to_string()),
        identity: identity(),
        address: Address {
            street: "Jl. Melati No. 12".to_string(),
            village: "Kebon Jeruk".to_string(),
            district: "Kebon Jeruk".to_string(),
            city: "Jakarta Barat".to_string(),
            province: "DKI Jakarta".to_string(),
            postal_code: "11530".to_string(),
        },
        marital_status: MaritalStatus::Single,
        spouse: None,
        employment: Employment {
            profession: "Karyawan".to_string(),
            years_employed: 6,
            months_employed: 3,
        },
        vehicle: Vehicle {
            bpkb_owner_name: "BUDI  SANTOSO".to_string(),
            bpkb_ownership: "K".to_string(),
            manufacture_year: 2020,
            license_plate: "B 1234 KJT".to_string(),
        },
        financing: FinancingRequest {
            tenor_months: 24,
            loan_amount: 150_000_000,
        },
        photos: PhotoReferences {
            selfie_url: "s3://ekyc/PRS-2024-0001/selfie.jpg".to_string(),
            id_card_url: "s3://ekyc/PRS-2024-0001/ktp.jpg".to_string(),
        },
        customer_status: CustomerStatus::New,
        customer_segment: CustomerSegment::Regular,
    }
}

pub(super) fn married_profile() -> ApplicantProfile {
    let mut profile = profile();
    profile.marital_status = MaritalStatus::Married;
    profile.spouse = Some(spouse());
    profile
}

pub(super) fn existing_prime(mut profile: ApplicantProfile) -> ApplicantProfile {
    profile.customer_status = CustomerStatus::RepeatOrder;
    profile.customer_segment = CustomerSegment::Prime;
    profile
}

pub(super) fn request(application: ApplicantProfile) -> ScreeningRequest {
    ScreeningRequest {
        application,
        override_to_regular_flow: false,
        prior_bureau_hit: false,
        as_of: Some(as_of()),
    }
}

pub(super) fn pipeline_config() -> PipelineConfig {
    PipelineConfig {
        alternate_owner_codes: vec!["KK".to_string()],
        ..PipelineConfig::default()
    }
}

pub(super) fn verification_thresholds() -> VerificationThresholds {
    VerificationThresholds {
        data_provider: ProviderKind::Registry,
        face_provider: ProviderKind::Registry,
        registry: ProviderThresholds {
            name_match_min: 80.0,
            address_match_min: 70.0,
            face_similarity_min: 85.0,
        },
        partner: ProviderThresholds {
            name_match_min: 75.0,
            address_match_min: 60.0,
            face_similarity_min: 80.0,
        },
        biometric: BiometricThresholds {
            name_similarity_min: 80.0,
            birth_date_similarity_min: 100.0,
            selfie_similarity_min: 75.0,
        },
    }
}

pub(super) fn bureau_thresholds() -> BureauThresholds {
    BureauThresholds {
        max_inquiries_last_month: 5,
        same_name: OverdueLimits {
            max_current_days: 30,
            max_last_12_months_days: 60,
        },
        different_name: OverdueLimits {
            max_current_days: 10,
            max_last_12_months_days: 30,
        },
        global_overdue_ceiling_days: 90,
        max_non_collateral_debt: 50_000_000.0,
        non_collateral_debt_sub_threshold: 20_000_000.0,
    }
}

pub(super) fn cluster_policy() -> ClusterPolicy {
    ClusterPolicy {
        new_agent_tenure_months: 6,
        default_window_months: 3,
        default_cluster_same_name: Cluster::from("C"),
        default_cluster_different_name: Cluster::from("D"),
    }
}

pub(super) fn fpd_table() -> Vec<FpdBand> {
    vec![
        FpdBand {
            bpkb_name_type: BpkbNameType::Same,
            fpd_min: 0.0,
            fpd_max: 2.0,
            cluster: Cluster::from("A"),
        },
        FpdBand {
            bpkb_name_type: BpkbNameType::Same,
            fpd_min: 2.0,
            fpd_max: 5.0,
            cluster: Cluster::from("B"),
        },
        FpdBand {
            bpkb_name_type: BpkbNameType::Different,
            fpd_min: 0.0,
            fpd_max: 3.0,
            cluster: Cluster::from("B"),
        },
    ]
}

pub(super) fn ltv_row(
    cluster: &str,
    bureau_result: BureauResultClass,
    tenor: (u16, u16),
    ltv_percent: f64,
) -> LtvRow {
    LtvRow {
        cluster: Cluster::from(cluster),
        bureau_result,
        tenor_start: tenor.0,
        tenor_end: tenor.1,
        bpkb_name_type: None,
        vehicle_age: None,
        debt_band: None,
        ltv_percent,
    }
}

pub(super) fn ltv_table() -> LtvTable {
    LtvTable::new(vec![
        ltv_row("A", BureauResultClass::Pass, (12, 24), 80.0),
        ltv_row("A", BureauResultClass::Pass, (25, 35), 75.0),
        LtvRow {
            bpkb_name_type: Some(BpkbNameType::Same),
            vehicle_age: Some(VehicleAgeBucket::UpTo12),
            ..ltv_row("A", BureauResultClass::Pass, (36, 48), 70.0)
        },
        LtvRow {
            bpkb_name_type: Some(BpkbNameType::Same),
            vehicle_age: Some(VehicleAgeBucket::UpTo12),
            ..ltv_row("A", BureauResultClass::Pass, (49, 60), 0.0)
        },
        ltv_row("A", BureauResultClass::NoHit, (12, 35), 70.0),
        ltv_row("C", BureauResultClass::Pass, (12, 35), 65.0),
        ltv_row("C", BureauResultClass::NoHit, (12, 35), 60.0),
        LtvRow {
            debt_band: Some(DebtBand {
                min: 0.0,
                max: Some(20_000_000.0),
            }),
            ..ltv_row("A", BureauResultClass::Reject, (12, 35), 50.0)
        },
    ])
}

pub(super) fn data_verified() -> DataVerificationData {
    DataVerificationData {
        is_valid: true,
        reason: None,
        nik_match: true,
        birth_date_match: true,
        gender_match: true,
        name_match: 100.0,
        address_match: 100.0,
    }
}

pub(super) fn face_match(similarity: f64) -> FaceMatchData {
    FaceMatchData {
        rule: FaceRule::Match,
        similarity,
    }
}

pub(super) fn clean_record(report_id: &str) -> BureauRecord {
    BureauRecord {
        report_id: report_id.to_string(),
        request_id: Some(format!("req-{report_id}")),
        score: Some("A1".to_string()),
        category: Some(Category::I),
        overdue_current: 0,
        overdue_last_12_months: 0,
        write_off_contract: false,
        write_off_with_collateral: false,
        total_non_collateral_debt: 5_000_000.0,
    }
}

pub(super) fn scored_report(category: Category) -> BureauReport {
    BureauReport {
        inquiry_last_month: 1,
        ko_category: None,
        category: Some(category),
        customer: Some(clean_record("rpt-applicant")),
        spouse: None,
    }
}

pub(super) fn scored_response(report: BureauReport) -> BureauResponse {
    BureauResponse {
        code: "200".to_string(),
        result: BureauResult::Report(report),
    }
}

pub(super) fn agent_since(join_date: NaiveDate) -> AgentProfile {
    AgentProfile {
        agent_id: AgentId(AGENT.to_string()),
        join_date,
    }
}

/// Scripted biometric provider behavior.
#[derive(Debug, Clone)]
pub(super) enum BiometricScript {
    Record(Option<BiometricData>),
    Fails(String),
}

/// Scripted eKYC gateway; replies are cloned for every call.
pub(super) struct ScriptedIdentity {
    pub(super) data: ProviderReply<DataVerificationData>,
    pub(super) face: ProviderReply<FaceMatchData>,
    pub(super) biometric: BiometricScript,
    pub(super) document: Result<DocumentValidation, String>,
    pub(super) calls: Mutex<Vec<String>>,
}

impl ScriptedIdentity {
    pub(super) fn passing() -> Self {
        Self {
            data: ProviderReply::Evaluated(data_verified()),
            face: ProviderReply::Evaluated(face_match(95.0)),
            biometric: BiometricScript::Fails("biometric offline".to_string()),
            document: Err("document validator offline".to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn with_data(mut self, reply: ProviderReply<DataVerificationData>) -> Self {
        self.data = reply;
        self
    }

    pub(super) fn with_face(mut self, reply: ProviderReply<FaceMatchData>) -> Self {
        self.face = reply;
        self
    }

    pub(super) fn with_biometric(mut self, script: BiometricScript) -> Self {
        self.biometric = script;
        self
    }

    pub(super) fn with_document(mut self, document: Result<DocumentValidation, String>) -> Self {
        self.document = document;
        self
    }

    pub(super) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls mutex poisoned").push(call);
    }
}

#[async_trait]
impl IdentityGateway for ScriptedIdentity {
    async fn verify_data(
        &self,
        provider: ProviderKind,
        _request: &DataVerificationRequest,
    ) -> ProviderReply<DataVerificationData> {
        self.record(format!("data:{provider}"));
        self.data.clone()
    }

    async fn match_face(
        &self,
        provider: ProviderKind,
        _request: &FaceMatchRequest,
    ) -> ProviderReply<FaceMatchData> {
        self.record(format!("face:{provider}"));
        self.face.clone()
    }

    async fn biometric_check(
        &self,
        _request: &BiometricRequest,
    ) -> Result<Option<BiometricData>, ProviderError> {
        self.record("biometric".to_string());
        match &self.biometric {
            BiometricScript::Record(record) => Ok(record.clone()),
            BiometricScript::Fails(message) => Err(ProviderError::invalid_response(message)),
        }
    }

    async fn validate_document(
        &self,
        _request: &DocumentRequest,
    ) -> Result<DocumentValidation, ProviderError> {
        self.record("document".to_string());
        self.document
            .clone()
            .map_err(ProviderError::invalid_response)
    }
}

pub(super) struct ScriptedBureau {
    pub(super) response: Option<BureauResponse>,
    pub(super) requests: Mutex<Vec<BureauRequest>>,
}

impl ScriptedBureau {
    pub(super) fn returning(response: BureauResponse) -> Self {
        Self {
            response: Some(response),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl BureauGateway for ScriptedBureau {
    async fn inquire(&self, request: &BureauRequest) -> Result<BureauResponse, ProviderError> {
        self.requests
            .lock()
            .expect("bureau mutex poisoned")
            .push(request.clone());
        self.response
            .clone()
            .ok_or_else(|| ProviderError::invalid_response("bureau offline"))
    }
}

#[derive(Default)]
pub(super) struct StaticAgents {
    pub(super) agents: HashMap<AgentId, AgentProfile>,
    pub(super) performance: HashMap<(AgentId, BpkbNameType), AgentPerformance>,
    pub(super) performance_lookups: AtomicUsize,
}

impl StaticAgents {
    pub(super) fn with_agent(join_date: NaiveDate) -> Self {
        let mut agents = HashMap::new();
        agents.insert(AgentId(AGENT.to_string()), agent_since(join_date));
        Self {
            agents,
            ..Self::default()
        }
    }

    pub(super) fn performing(
        mut self,
        name_type: BpkbNameType,
        fpd_rate: f64,
        accumulated_sales: u32,
    ) -> Self {
        self.performance.insert(
            (AgentId(AGENT.to_string()), name_type),
            AgentPerformance {
                fpd_rate,
                accumulated_sales,
            },
        );
        self
    }

    pub(super) fn lookups(&self) -> usize {
        self.performance_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentDirectory for StaticAgents {
    async fn agent(&self, agent_id: &AgentId) -> Result<Option<AgentProfile>, ProviderError> {
        Ok(self.agents.get(agent_id).cloned())
    }

    async fn performance(
        &self,
        agent_id: &AgentId,
        name_type: BpkbNameType,
    ) -> Result<Option<AgentPerformance>, ProviderError> {
        self.performance_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .performance
            .get(&(agent_id.clone(), name_type))
            .cloned())
    }
}

/// Threshold store backed by a map of `key -> payload`, all at version `v1`.
#[derive(Default)]
pub(super) struct StaticThresholds {
    pub(super) blobs: Mutex<HashMap<String, Value>>,
}

impl StaticThresholds {
    pub(super) fn standard() -> Self {
        let mut blobs = HashMap::new();
        blobs.insert(
            VERIFICATION_KEY.to_string(),
            serde_json::to_value(verification_thresholds()).expect("serialize thresholds"),
        );
        blobs.insert(
            BUREAU_KEY.to_string(),
            serde_json::to_value(bureau_thresholds()).expect("serialize thresholds"),
        );
        blobs.insert(
            CLUSTER_POLICY_KEY.to_string(),
            serde_json::to_value(cluster_policy()).expect("serialize thresholds"),
        );
        blobs.insert(
            CLUSTER_FPD_KEY.to_string(),
            serde_json::to_value(fpd_table()).expect("serialize thresholds"),
        );
        blobs.insert(
            LTV_KEY.to_string(),
            serde_json::to_value(ltv_table()).expect("serialize thresholds"),
        );
        Self {
            blobs: Mutex::new(blobs),
        }
    }

    pub(super) fn without(self, key: &str) -> Self {
        self.blobs
            .lock()
            .expect("threshold mutex poisoned")
            .remove(key);
        self
    }

    pub(super) fn replace(&self, key: &str, payload: Value) {
        self.blobs
            .lock()
            .expect("threshold mutex poisoned")
            .insert(key.to_string(), payload);
    }
}

#[async_trait]
impl ThresholdStore for StaticThresholds {
    async fn fetch(&self, key: &ThresholdKey) -> Result<Option<VersionedBlob>, ThresholdError> {
        let blobs = self.blobs.lock().expect("threshold mutex poisoned");
        Ok(blobs.get(&key.key).map(|payload| VersionedBlob {
            version: "v1".to_string(),
            payload: payload.clone(),
        }))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<RunId, FilteringDecision>>>,
}

impl MemoryRepository {
    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("repository mutex poisoned").len()
    }
}

impl DecisionRepository for MemoryRepository {
    fn insert(&self, record: FilteringDecision) -> Result<FilteringDecision, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.run_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.run_id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, run_id: &RunId) -> Result<Option<FilteringDecision>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(run_id).cloned())
    }

    fn for_prospect(
        &self,
        prospect_id: &ProspectId,
    ) -> Result<Vec<FilteringDecision>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| &record.prospect_id == prospect_id)
            .cloned()
            .collect())
    }
}

pub(super) struct ConflictRepository;

impl DecisionRepository for ConflictRepository {
    fn insert(&self, _record: FilteringDecision) -> Result<FilteringDecision, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn fetch(&self, _run_id: &RunId) -> Result<Option<FilteringDecision>, RepositoryError> {
        Ok(None)
    }

    fn for_prospect(
        &self,
        _prospect_id: &ProspectId,
    ) -> Result<Vec<FilteringDecision>, RepositoryError> {
        Ok(Vec::new())
    }
}

/// Collaborators for one service under test, kept so tests can inspect them.
pub(super) struct Harness {
    pub(super) thresholds: Arc<StaticThresholds>,
    pub(super) identity: Arc<ScriptedIdentity>,
    pub(super) bureau: Arc<ScriptedBureau>,
    pub(super) agents: Arc<StaticAgents>,
    pub(super) windows: Arc<InMemoryWindowStore>,
}

impl Harness {
    pub(super) fn standard() -> Self {
        Self {
            thresholds: Arc::new(StaticThresholds::standard()),
            identity: Arc::new(ScriptedIdentity::passing()),
            bureau: Arc::new(ScriptedBureau::returning(scored_response(scored_report(
                Category::I,
            )))),
            agents: Arc::new(
                StaticAgents::with_agent(date(2020, 1, 1)).performing(
                    BpkbNameType::Same,
                    1.5,
                    40,
                ),
            ),
            windows: Arc::new(InMemoryWindowStore::new()),
        }
    }

    pub(super) fn backends(&self) -> ScreeningBackends {
        ScreeningBackends {
            thresholds: self.thresholds.clone(),
            identity: self.identity.clone(),
            bureau: self.bureau.clone(),
            agents: self.agents.clone(),
            windows: self.windows.clone(),
        }
    }

    pub(super) fn service<R>(&self, repository: Arc<R>) -> FilteringService<R>
    where
        R: DecisionRepository + 'static,
    {
        FilteringService::new(repository, self.backends(), pipeline_config())
    }
}

pub(super) fn build_service() -> (FilteringService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = Harness::standard().service(repository.clone());
    (service, repository)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn request_json(application: ApplicantProfile) -> Value {
    json!({
        "application": application,
        "as_of": as_of(),
    })
}
