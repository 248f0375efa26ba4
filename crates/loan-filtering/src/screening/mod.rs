//! Loan-application screening: identity verification, bureau rules, agent
//! clustering and LTV lookup, composed by [`FilteringService`].

pub mod bureau;
pub mod cluster;
pub mod domain;
pub mod ltv;
pub mod providers;
pub mod repository;
pub mod router;
pub mod service;
pub mod thresholds;
pub mod verification;

#[cfg(test)]
mod tests;

pub use domain::{
    Address, AgentId, ApplicantProfile, BpkbNameType, CustomerSegment, CustomerStatus, Decision,
    Employment, FinancingRequest, Gender, Identity, MaritalStatus, PhotoReferences, ProspectId,
    RunId, Vehicle,
};
pub use repository::{DecisionRepository, DecisionView, FilteringDecision, RepositoryError};
pub use router::filtering_router;
pub use service::{FilteringError, FilteringService, ScreeningBackends, ScreeningRequest};
