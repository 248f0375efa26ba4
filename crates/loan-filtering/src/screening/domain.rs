use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Identifier for one pipeline run. Re-screening a prospect always yields a new run id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

/// Identifier of the loan prospect as issued by the origination front end.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProspectId(pub String);

/// Identifier of the CMO (credit marketing officer) who originated the application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const fn code(self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaritalStatus {
    Single,
    Married,
    Divorced,
    Widowed,
}

/// Civil identity as printed on the national ID card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub nik: String,
    pub legal_name: String,
    pub birth_date: NaiveDate,
    pub birth_place: String,
    pub mother_name: String,
    pub gender: Gender,
}

/// Residential address on the ID card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub village: String,
    pub district: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
}

impl Address {
    pub fn single_line(&self) -> String {
        [
            self.street.as_str(),
            self.village.as_str(),
            self.district.as_str(),
            self.city.as_str(),
            self.province.as_str(),
            self.postal_code.as_str(),
        ]
        .iter()
        .filter(|part| !part.trim().is_empty())
        .map(|part| part.trim())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employment {
    pub profession: String,
    pub years_employed: u8,
    pub months_employed: u8,
}

/// Collateral vehicle and its BPKB (ownership certificate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub bpkb_owner_name: String,
    /// Relation of the BPKB owner to the applicant (e.g. `K` own, `P` spouse, `KK` family).
    pub bpkb_ownership: String,
    pub manufacture_year: i32,
    pub license_plate: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancingRequest {
    pub tenor_months: u16,
    pub loan_amount: u64,
}

/// Storage references to the photos used by face matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoReferences {
    pub selfie_url: String,
    pub id_card_url: String,
}

/// Relationship of the applicant with the lender at the time of application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    New,
    /// Returning customer without an active facility.
    RepeatOrder,
    /// Returning customer that still carries an active facility.
    ActiveOrder,
}

impl CustomerStatus {
    pub const fn is_existing(self) -> bool {
        matches!(self, CustomerStatus::RepeatOrder | CustomerStatus::ActiveOrder)
    }

    pub const fn label(self) -> &'static str {
        match self {
            CustomerStatus::New => "new",
            CustomerStatus::RepeatOrder => "repeat_order",
            CustomerStatus::ActiveOrder => "active_order",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerSegment {
    Regular,
    Prime,
    Priority,
}

impl CustomerSegment {
    pub const fn is_preferred(self) -> bool {
        matches!(self, CustomerSegment::Prime | CustomerSegment::Priority)
    }
}

/// Whether the BPKB owner name equals the applicant's legal name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BpkbNameType {
    Same,
    Different,
}

impl BpkbNameType {
    pub const fn label(self) -> &'static str {
        match self {
            BpkbNameType::Same => "same",
            BpkbNameType::Different => "different",
        }
    }
}

/// Tri-state screening verdict plus the provider-specific bypass value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Pass,
    Reject,
    Contingency,
    Bypass,
}

impl Decision {
    /// Bypass is treated as a pass by every downstream stage.
    pub const fn is_pass(self) -> bool {
        matches!(self, Decision::Pass | Decision::Bypass)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Decision::Pass => "PASS",
            Decision::Reject => "REJECT",
            Decision::Contingency => "CONTINGENCY",
            Decision::Bypass => "BYPASS",
        }
    }
}

/// Applicant data the pipeline screens. Never mutated during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantProfile {
    pub prospect_id: ProspectId,
    pub agent_id: AgentId,
    pub identity: Identity,
    pub address: Address,
    pub marital_status: MaritalStatus,
    #[serde(default)]
    pub spouse: Option<Identity>,
    pub employment: Employment,
    pub vehicle: Vehicle,
    pub financing: FinancingRequest,
    pub photos: PhotoReferences,
    pub customer_status: CustomerStatus,
    pub customer_segment: CustomerSegment,
}

impl ApplicantProfile {
    /// Spouse data only participates when the applicant is married and supplied it.
    pub fn spouse_identity(&self) -> Option<&Identity> {
        match self.marital_status {
            MaritalStatus::Married => self.spouse.as_ref(),
            _ => None,
        }
    }

    pub fn bpkb_name_type(&self) -> BpkbNameType {
        if normalize_name(&self.vehicle.bpkb_owner_name)
            == normalize_name(&self.identity.legal_name)
        {
            BpkbNameType::Same
        } else {
            BpkbNameType::Different
        }
    }

    /// Vehicle age in whole years at the end of the requested tenor.
    pub fn vehicle_age_at_maturity(&self, as_of: NaiveDate) -> u16 {
        let years = as_of.year().saturating_sub(self.vehicle.manufacture_year);
        let current = u16::try_from(years.max(0)).unwrap_or(u16::MAX);
        let tenor_years = self.financing.tenor_months.div_ceil(12);
        current.saturating_add(tenor_years)
    }
}

pub(crate) fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(|part| part.to_uppercase())
        .collect::<Vec<_>>()
        .join(" ")
}
