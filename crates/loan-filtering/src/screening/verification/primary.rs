use serde::{Deserialize, Serialize};

use super::codes::RuleCode;
use crate::screening::domain::{CustomerSegment, CustomerStatus, Decision};
use crate::screening::providers::{
    DataVerificationData, FaceMatchData, FaceRule, ProviderKind, ProviderReply,
};
use crate::screening::thresholds::ProviderThresholds;

/// Transport-level classification of a primary sub-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    TimedOut,
    NotChecked,
    Evaluated,
}

/// How the data-verification mapping table treats the threshold verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataResolution {
    /// The threshold verdict stands as computed.
    Keep,
    /// Threshold mismatches on a valid record are bypassed.
    Lenient,
    /// No verdict was available but the customer is trusted.
    Bypass,
    /// No verdict was available; the face match decides.
    Contingency,
}

/// Data-verification mapping table.
pub fn resolve_data(
    status: CheckStatus,
    customer: CustomerStatus,
    segment: CustomerSegment,
    is_valid: bool,
) -> DataResolution {
    use CustomerSegment::{Prime, Priority, Regular};
    use CustomerStatus::{ActiveOrder, New, RepeatOrder};

    match (status, customer, segment, is_valid) {
        (CheckStatus::Evaluated, _, _, false) => DataResolution::Keep,
        (CheckStatus::Evaluated, RepeatOrder | ActiveOrder, Prime | Priority, true) => {
            DataResolution::Lenient
        }
        (CheckStatus::Evaluated, New, _, true)
        | (CheckStatus::Evaluated, RepeatOrder | ActiveOrder, Regular, true) => {
            DataResolution::Keep
        }
        (
            CheckStatus::TimedOut | CheckStatus::NotChecked,
            RepeatOrder | ActiveOrder,
            Prime | Priority,
            _,
        ) => DataResolution::Bypass,
        (CheckStatus::TimedOut | CheckStatus::NotChecked, New, _, _)
        | (
            CheckStatus::TimedOut | CheckStatus::NotChecked,
            RepeatOrder | ActiveOrder,
            Regular,
            _,
        ) => DataResolution::Contingency,
    }
}

/// Compare a provider's field-match report with the provider's thresholds.
///
/// Negative-match reasons win over field checks; percentages are inclusive.
pub fn assess_data(data: &DataVerificationData, thresholds: &ProviderThresholds) -> RuleCode {
    if let Some(rule) = data.reason.as_deref().and_then(negative_match_rule) {
        return rule;
    }

    if !data.nik_match {
        RuleCode::NikMismatch
    } else if !data.birth_date_match {
        RuleCode::BirthDateMismatch
    } else if !data.gender_match {
        RuleCode::GenderMismatch
    } else if data.name_match < thresholds.name_match_min {
        RuleCode::NameBelowThreshold
    } else if data.address_match < thresholds.address_match_min {
        RuleCode::AddressBelowThreshold
    } else if !data.is_valid {
        RuleCode::NotFound
    } else {
        RuleCode::DataVerified
    }
}

fn negative_match_rule(reason: &str) -> Option<RuleCode> {
    let normalized = reason
        .trim()
        .to_ascii_lowercase()
        .replace(['_', '-'], " ");
    match normalized.as_str() {
        "deceased" | "dead" => Some(RuleCode::Deceased),
        "duplicate" | "duplicate record" => Some(RuleCode::DuplicateRecord),
        "inactive" | "inactive record" => Some(RuleCode::InactiveRecord),
        "not found" | "data not found" => Some(RuleCode::NotFound),
        _ => None,
    }
}

/// Result of the data-verification sub-check after the mapping table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataCheck {
    pub provider: ProviderKind,
    pub status: CheckStatus,
    pub decision: Decision,
    pub rule: Option<RuleCode>,
    pub reason: String,
    pub error: Option<String>,
    pub response: Option<DataVerificationData>,
}

impl DataCheck {
    pub fn code(&self) -> Option<String> {
        self.rule.map(|rule| rule.code(self.provider))
    }

    pub fn state(&self) -> DataState {
        match (self.decision, self.status) {
            (Decision::Pass, _) => DataState::Verified,
            (Decision::Bypass, _) => DataState::Bypassed,
            (_, CheckStatus::TimedOut) => DataState::TimedOut,
            _ => DataState::NotChecked,
        }
    }
}

pub fn evaluate_data(
    provider: ProviderKind,
    reply: ProviderReply<DataVerificationData>,
    thresholds: &ProviderThresholds,
    customer: CustomerStatus,
    segment: CustomerSegment,
) -> DataCheck {
    let (status, response, error) = match reply {
        ProviderReply::Evaluated(data) => (CheckStatus::Evaluated, Some(data), None),
        ProviderReply::TimedOut => (
            CheckStatus::TimedOut,
            None,
            Some(format!("{provider} data verification timed out")),
        ),
        ProviderReply::NotChecked { message } => (CheckStatus::NotChecked, None, Some(message)),
    };

    let is_valid = response.as_ref().is_some_and(|data| data.is_valid);
    let assessed = response
        .as_ref()
        .map(|data| assess_data(data, thresholds));

    let (decision, rule) = match (resolve_data(status, customer, segment, is_valid), assessed) {
        (DataResolution::Keep, Some(RuleCode::DataVerified)) => {
            (Decision::Pass, Some(RuleCode::DataVerified))
        }
        (DataResolution::Keep, Some(rule)) => (Decision::Reject, Some(rule)),
        (DataResolution::Lenient, Some(RuleCode::DataVerified)) => {
            (Decision::Pass, Some(RuleCode::DataVerified))
        }
        (DataResolution::Lenient, Some(_)) | (DataResolution::Bypass, _) => {
            (Decision::Bypass, Some(RuleCode::DataBypass))
        }
        (DataResolution::Contingency, _)
        | (DataResolution::Keep, None)
        | (DataResolution::Lenient, None) => (Decision::Contingency, None),
    };

    let reason = match (rule, &error) {
        (Some(rule), _) => rule.reason().to_string(),
        (None, Some(message)) => message.clone(),
        (None, None) => "identity data not evaluated".to_string(),
    };

    DataCheck {
        provider,
        status,
        decision,
        rule,
        reason,
        error,
        response,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataState {
    Verified,
    Bypassed,
    TimedOut,
    NotChecked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceVerdict {
    Match,
    IdMismatch,
    PhotoMismatch,
}

/// A provider "match" below the similarity cutoff is a photo mismatch.
pub fn assess_face(data: &FaceMatchData, thresholds: &ProviderThresholds) -> FaceVerdict {
    match data.rule {
        FaceRule::Match if data.similarity >= thresholds.face_similarity_min => FaceVerdict::Match,
        FaceRule::Match | FaceRule::PhotoMismatch => FaceVerdict::PhotoMismatch,
        FaceRule::IdMismatch => FaceVerdict::IdMismatch,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceCheck {
    pub provider: ProviderKind,
    pub status: CheckStatus,
    pub verdict: Option<FaceVerdict>,
    pub similarity: Option<f64>,
    pub error: Option<String>,
    pub response: Option<FaceMatchData>,
}

impl FaceCheck {
    pub fn state(&self) -> FaceState {
        match (self.verdict, self.status) {
            (Some(FaceVerdict::Match), _) => FaceState::Match,
            (Some(FaceVerdict::IdMismatch), _) => FaceState::IdMismatch,
            (Some(FaceVerdict::PhotoMismatch), _) => FaceState::PhotoMismatch,
            (None, CheckStatus::TimedOut) => FaceState::TimedOut,
            (None, _) => FaceState::NotChecked,
        }
    }
}

pub fn evaluate_face(
    provider: ProviderKind,
    reply: ProviderReply<FaceMatchData>,
    thresholds: &ProviderThresholds,
) -> FaceCheck {
    match reply {
        ProviderReply::Evaluated(data) => FaceCheck {
            provider,
            status: CheckStatus::Evaluated,
            verdict: Some(assess_face(&data, thresholds)),
            similarity: Some(data.similarity),
            error: None,
            response: Some(data),
        },
        ProviderReply::TimedOut => FaceCheck {
            provider,
            status: CheckStatus::TimedOut,
            verdict: None,
            similarity: None,
            error: Some(format!("{provider} face match timed out")),
            response: None,
        },
        ProviderReply::NotChecked { message } => FaceCheck {
            provider,
            status: CheckStatus::NotChecked,
            verdict: None,
            similarity: None,
            error: Some(message),
            response: None,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceState {
    Match,
    IdMismatch,
    PhotoMismatch,
    TimedOut,
    NotChecked,
}

/// Which sub-check's provider owns the combined code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeOwner {
    Data,
    Face,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Combination {
    pub decision: Decision,
    pub rule: RuleCode,
    pub owner: CodeOwner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Standing {
    Preferred,
    Standard,
}

impl Standing {
    fn of(customer: CustomerStatus, segment: CustomerSegment) -> Self {
        if customer.is_existing() && segment.is_preferred() {
            Standing::Preferred
        } else {
            Standing::Standard
        }
    }
}

/// Combination mapping table over both sub-check states and the customer's standing.
pub fn combine(
    data: DataState,
    face: FaceState,
    customer: CustomerStatus,
    segment: CustomerSegment,
) -> Combination {
    use DataState as D;
    use FaceState as F;

    let (decision, rule, owner) = match (data, face, Standing::of(customer, segment)) {
        (_, F::IdMismatch, _) => (Decision::Reject, RuleCode::FaceIdMismatch, CodeOwner::Face),
        (_, F::PhotoMismatch, _) => (
            Decision::Reject,
            RuleCode::FacePhotoMismatch,
            CodeOwner::Face,
        ),
        (D::Verified | D::Bypassed, F::Match, _) => {
            (Decision::Pass, RuleCode::FaceMatch, CodeOwner::Face)
        }
        (D::TimedOut | D::NotChecked, F::Match, Standing::Preferred) => (
            Decision::Pass,
            RuleCode::FacePassDataUnverified,
            CodeOwner::Face,
        ),
        (D::TimedOut | D::NotChecked, F::Match, Standing::Standard) => (
            Decision::Contingency,
            RuleCode::DataUnavailable,
            CodeOwner::Data,
        ),
        (D::Verified, F::TimedOut | F::NotChecked, Standing::Preferred) => {
            (Decision::Pass, RuleCode::DataVerified, CodeOwner::Data)
        }
        (D::Verified, F::TimedOut | F::NotChecked, Standing::Standard) => (
            Decision::Contingency,
            RuleCode::FaceUnavailable,
            CodeOwner::Face,
        ),
        (D::Bypassed, F::TimedOut | F::NotChecked, _) => {
            (Decision::Pass, RuleCode::DataBypass, CodeOwner::Data)
        }
        (D::TimedOut, F::TimedOut, _) => (
            Decision::Contingency,
            RuleCode::BothTimedOut,
            CodeOwner::Data,
        ),
        (D::TimedOut | D::NotChecked, F::TimedOut | F::NotChecked, _) => (
            Decision::Contingency,
            RuleCode::BothUnavailable,
            CodeOwner::Data,
        ),
    };

    Combination {
        decision,
        rule,
        owner,
    }
}

/// Verdict of the primary stage as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryOutcome {
    pub provider: ProviderKind,
    pub decision: Decision,
    pub code: String,
    pub reason: String,
    pub similarity: Option<f64>,
    /// Tagged `CONTINGENCY - <provider>` marker when the stage could not decide.
    pub error: Option<String>,
}

impl PrimaryOutcome {
    pub(crate) fn rejected_by_data(data: &DataCheck) -> Self {
        let rule = data.rule.unwrap_or(RuleCode::NotFound);
        Self {
            provider: data.provider,
            decision: Decision::Reject,
            code: rule.code(data.provider),
            reason: data.reason.clone(),
            similarity: None,
            error: None,
        }
    }

    pub(crate) fn from_combination(
        combination: Combination,
        data: &DataCheck,
        face: &FaceCheck,
    ) -> Self {
        let provider = match combination.owner {
            CodeOwner::Data => data.provider,
            CodeOwner::Face => face.provider,
        };
        let error = (combination.decision == Decision::Contingency)
            .then(|| format!("{} - {}", Decision::Contingency.label(), provider));

        Self {
            provider,
            decision: combination.decision,
            code: combination.rule.code(provider),
            reason: combination.rule.reason().to_string(),
            similarity: face.similarity.filter(|_| combination.decision.is_pass()),
            error,
        }
    }
}
