//! Credit-bureau screening: classifies a bureau response into a decision,
//! an LTV result class and the per-subject snapshots persisted for audit.

mod response;
mod rules;
mod snapshot;

pub use response::{
    BureauRecord, BureauReport, BureauResponse, BureauResult, BureauStanding, Category, KoTag,
    UNSCORED_CODE, UNSCORED_SENTINEL,
};
pub use rules::{
    evaluate, write_off_gate, BureauContext, BureauEvaluation, BureauResultClass, WriteOffGate,
};
pub use snapshot::{collect as collect_snapshots, BureauSnapshot, SnapshotSubject};

use super::domain::{ApplicantProfile, Identity};
use super::providers::{BureauRequest, BureauSubject};

impl BureauContext {
    pub fn for_applicant(profile: &ApplicantProfile, override_to_regular_flow: bool) -> Self {
        Self {
            customer_status: profile.customer_status,
            customer_segment: profile.customer_segment,
            bpkb_name_type: profile.bpkb_name_type(),
            override_to_regular_flow,
            spouse_included: profile.spouse_identity().is_some(),
        }
    }
}

/// Inquiry payload: applicant always, spouse only when married.
pub fn inquiry_request(profile: &ApplicantProfile) -> BureauRequest {
    BureauRequest {
        prospect_id: profile.prospect_id.0.clone(),
        applicant: subject(&profile.identity),
        spouse: profile.spouse_identity().map(subject),
    }
}

fn subject(identity: &Identity) -> BureauSubject {
    BureauSubject {
        nik: identity.nik.clone(),
        legal_name: identity.legal_name.clone(),
        birth_date: identity.birth_date,
        mother_name: identity.mother_name.clone(),
    }
}
