use serde::{Deserialize, Serialize};

use crate::screening::providers::ProviderKind;

/// Primary-stage rule codes. The numeric code depends on the provider that
/// produced the verdict: partner codes sit 40 above their registry twins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCode {
    DataVerified,
    NikMismatch,
    NameBelowThreshold,
    BirthDateMismatch,
    AddressBelowThreshold,
    GenderMismatch,
    Deceased,
    DuplicateRecord,
    InactiveRecord,
    NotFound,
    FaceMatch,
    FaceIdMismatch,
    FacePhotoMismatch,
    DataBypass,
    FacePassDataUnverified,
    BothTimedOut,
    DataUnavailable,
    FaceUnavailable,
    BothUnavailable,
}

impl RuleCode {
    const fn base(self) -> u16 {
        match self {
            RuleCode::DataVerified => 1611,
            RuleCode::NikMismatch => 1612,
            RuleCode::NameBelowThreshold => 1613,
            RuleCode::BirthDateMismatch => 1614,
            RuleCode::AddressBelowThreshold => 1615,
            RuleCode::GenderMismatch => 1616,
            RuleCode::Deceased => 1617,
            RuleCode::DuplicateRecord => 1618,
            RuleCode::InactiveRecord => 1619,
            RuleCode::NotFound => 1620,
            RuleCode::FaceMatch => 1621,
            RuleCode::FaceIdMismatch => 1622,
            RuleCode::FacePhotoMismatch => 1623,
            RuleCode::DataBypass => 1624,
            RuleCode::FacePassDataUnverified => 1625,
            RuleCode::BothTimedOut => 1626,
            RuleCode::DataUnavailable => 1627,
            RuleCode::FaceUnavailable => 1628,
            RuleCode::BothUnavailable => 1629,
        }
    }

    pub fn code(self, provider: ProviderKind) -> String {
        let offset = match provider {
            ProviderKind::Registry => 0,
            ProviderKind::Partner => 40,
        };
        (self.base() + offset).to_string()
    }

    pub const fn reason(self) -> &'static str {
        match self {
            RuleCode::DataVerified => "identity data verified",
            RuleCode::NikMismatch => "NIK does not match registry",
            RuleCode::NameBelowThreshold => "legal name match below threshold",
            RuleCode::BirthDateMismatch => "birth date does not match registry",
            RuleCode::AddressBelowThreshold => "address match below threshold",
            RuleCode::GenderMismatch => "gender does not match registry",
            RuleCode::Deceased => "identity registered as deceased",
            RuleCode::DuplicateRecord => "identity has duplicate registry records",
            RuleCode::InactiveRecord => "identity record inactive",
            RuleCode::NotFound => "identity not found",
            RuleCode::FaceMatch => "identity data and face verified",
            RuleCode::FaceIdMismatch => "face match: ID does not match",
            RuleCode::FacePhotoMismatch => "face match: photo does not match",
            RuleCode::DataBypass => "identity data bypassed for existing preferred customer",
            RuleCode::FacePassDataUnverified => "face verified, identity data unavailable",
            RuleCode::BothTimedOut => "identity data and face match timed out",
            RuleCode::DataUnavailable => "identity data unavailable",
            RuleCode::FaceUnavailable => "face match unavailable",
            RuleCode::BothUnavailable => "identity data and face match unavailable",
        }
    }
}

/// Codes produced by the biometric and document-validator fallback stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackCode {
    BiometricPass,
    BiometricNotFound,
    BiometricName,
    BiometricBirthDate,
    BiometricSelfie,
    DocumentPass,
    DocumentReject,
    DocumentOverride,
}

impl FallbackCode {
    pub const fn code(self) -> &'static str {
        match self {
            FallbackCode::BiometricPass => "1631",
            FallbackCode::BiometricNotFound => "1632",
            FallbackCode::BiometricName => "1633",
            FallbackCode::BiometricBirthDate => "1634",
            FallbackCode::BiometricSelfie => "1635",
            FallbackCode::DocumentPass => "1641",
            FallbackCode::DocumentReject => "1642",
            FallbackCode::DocumentOverride => "1643",
        }
    }

    pub const fn reason(self) -> &'static str {
        match self {
            FallbackCode::BiometricPass => "biometric cross-check passed",
            FallbackCode::BiometricNotFound => "biometric record not found",
            FallbackCode::BiometricName => "biometric name similarity below threshold",
            FallbackCode::BiometricBirthDate => "biometric birth date similarity below threshold",
            FallbackCode::BiometricSelfie => "biometric selfie similarity below threshold",
            FallbackCode::DocumentPass => "document validation passed",
            FallbackCode::DocumentReject => "document validation rejected",
            FallbackCode::DocumentOverride => "document validation overridden",
        }
    }
}
