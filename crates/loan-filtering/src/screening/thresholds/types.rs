use serde::{Deserialize, Serialize};

use crate::screening::cluster::{Cluster, FpdBand};
use crate::screening::domain::BpkbNameType;
use crate::screening::ltv::LtvTable;
use crate::screening::providers::ProviderKind;

/// Every threshold a single run needs, fetched fresh from the store per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Concatenated blob versions, recorded on the decision for audit replay.
    pub version: String,
    pub verification: VerificationThresholds,
    pub bureau: BureauThresholds,
    pub cluster: ClusterPolicy,
    pub fpd_table: Vec<FpdBand>,
    pub ltv_table: LtvTable,
}

/// Provider selection and match cutoffs for the eKYC chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationThresholds {
    pub data_provider: ProviderKind,
    pub face_provider: ProviderKind,
    pub registry: ProviderThresholds,
    pub partner: ProviderThresholds,
    pub biometric: BiometricThresholds,
}

impl VerificationThresholds {
    pub fn for_provider(&self, provider: ProviderKind) -> &ProviderThresholds {
        match provider {
            ProviderKind::Registry => &self.registry,
            ProviderKind::Partner => &self.partner,
        }
    }
}

/// Percentage cutoffs, all inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProviderThresholds {
    pub name_match_min: f64,
    pub address_match_min: f64,
    pub face_similarity_min: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiometricThresholds {
    pub name_similarity_min: f64,
    pub birth_date_similarity_min: f64,
    pub selfie_similarity_min: f64,
}

/// Overdue ceilings (in days) for one BPKB name branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueLimits {
    pub max_current_days: u32,
    pub max_last_12_months_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BureauThresholds {
    pub max_inquiries_last_month: u32,
    pub same_name: OverdueLimits,
    pub different_name: OverdueLimits,
    pub global_overdue_ceiling_days: u32,
    pub max_non_collateral_debt: f64,
    pub non_collateral_debt_sub_threshold: f64,
}

impl BureauThresholds {
    pub fn limits_for(&self, name_type: BpkbNameType) -> OverdueLimits {
        match name_type {
            BpkbNameType::Same => self.same_name,
            BpkbNameType::Different => self.different_name,
        }
    }
}

/// Agent clustering policy; the FPD table itself is fetched separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterPolicy {
    pub new_agent_tenure_months: u32,
    #[serde(default = "default_window_months")]
    pub default_window_months: u32,
    pub default_cluster_same_name: Cluster,
    pub default_cluster_different_name: Cluster,
}

impl ClusterPolicy {
    pub fn default_cluster(&self, name_type: BpkbNameType) -> &Cluster {
        match name_type {
            BpkbNameType::Same => &self.default_cluster_same_name,
            BpkbNameType::Different => &self.default_cluster_different_name,
        }
    }
}

fn default_window_months() -> u32 {
    3
}
