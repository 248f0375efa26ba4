use serde::{Deserialize, Serialize};

use super::response::{BureauRecord, BureauReport, Category};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSubject {
    Applicant,
    Spouse,
}

/// Immutable per-subject bureau detail row persisted with the decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BureauSnapshot {
    pub subject: SnapshotSubject,
    pub score: Option<String>,
    pub category: Option<Category>,
    pub overdue_current: u32,
    pub overdue_last_12_months: u32,
    pub write_off_contract: bool,
    pub write_off_with_collateral: bool,
    pub total_non_collateral_debt: f64,
    pub report_id: String,
    pub request_id: Option<String>,
}

impl BureauSnapshot {
    fn from_record(subject: SnapshotSubject, record: &BureauRecord) -> Self {
        Self {
            subject,
            score: record.score.clone(),
            category: record.category,
            overdue_current: record.overdue_current,
            overdue_last_12_months: record.overdue_last_12_months,
            write_off_contract: record.write_off_contract,
            write_off_with_collateral: record.write_off_with_collateral,
            total_non_collateral_debt: record.total_non_collateral_debt,
            report_id: record.report_id.clone(),
            request_id: record.request_id.clone(),
        }
    }
}

/// Applicant row whenever a record exists; spouse row only when the spouse took part.
pub fn collect(report: &BureauReport, spouse_included: bool) -> Vec<BureauSnapshot> {
    let applicant = report
        .customer
        .as_ref()
        .map(|record| BureauSnapshot::from_record(SnapshotSubject::Applicant, record));
    let spouse = report
        .spouse
        .as_ref()
        .filter(|_| spouse_included)
        .map(|record| BureauSnapshot::from_record(SnapshotSubject::Spouse, record));

    applicant.into_iter().chain(spouse).collect()
}

/// Worst-case view over every included subject.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Exposure {
    pub overdue_current: u32,
    pub overdue_last_12_months: u32,
    pub write_off_contract: bool,
    pub write_off_with_collateral: bool,
    pub total_non_collateral_debt: f64,
}

impl Exposure {
    pub(crate) fn of(snapshots: &[BureauSnapshot]) -> Self {
        snapshots.iter().fold(Self::default(), |acc, row| Self {
            overdue_current: acc.overdue_current.max(row.overdue_current),
            overdue_last_12_months: acc.overdue_last_12_months.max(row.overdue_last_12_months),
            write_off_contract: acc.write_off_contract || row.write_off_contract,
            write_off_with_collateral: acc.write_off_with_collateral
                || row.write_off_with_collateral,
            total_non_collateral_debt: acc.total_non_collateral_debt
                + row.total_non_collateral_debt,
        })
    }

    pub(crate) fn has_write_off(&self) -> bool {
        self.write_off_contract || self.write_off_with_collateral
    }
}
