use serde::{Deserialize, Serialize};

use super::response::{BureauReport, BureauResponse, BureauStanding, Category, KoTag};
use super::snapshot::{self, BureauSnapshot, Exposure};
use crate::screening::domain::{BpkbNameType, CustomerSegment, CustomerStatus, Decision};
use crate::screening::thresholds::BureauThresholds;

/// Applicant facts the rules branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BureauContext {
    pub customer_status: CustomerStatus,
    pub customer_segment: CustomerSegment,
    pub bpkb_name_type: BpkbNameType,
    /// Forces an existing preferred customer through the regular inquiry ceiling.
    pub override_to_regular_flow: bool,
    pub spouse_included: bool,
}

/// Bureau class used to select LTV rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BureauResultClass {
    Pass,
    Reject,
    NoHit,
}

impl BureauResultClass {
    pub const fn label(self) -> &'static str {
        match self {
            BureauResultClass::Pass => "PASS",
            BureauResultClass::Reject => "REJECT",
            BureauResultClass::NoHit => "NO_HIT",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "PASS" => Some(BureauResultClass::Pass),
            "REJECT" => Some(BureauResultClass::Reject),
            "NO_HIT" | "NOHIT" => Some(BureauResultClass::NoHit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BureauEvaluation {
    pub decision: Decision,
    pub result_class: BureauResultClass,
    pub code: String,
    pub reason: String,
    pub next_process: bool,
    pub snapshots: Vec<BureauSnapshot>,
    pub total_non_collateral_debt: f64,
}

/// Write-off matrix outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOffGate {
    Continue,
    Stop,
}

/// Write-off matrix for one BPKB branch.
pub fn write_off_gate(
    name_type: BpkbNameType,
    write_off_contract: bool,
    write_off_with_collateral: bool,
    status: CustomerStatus,
) -> WriteOffGate {
    use BpkbNameType::{Different, Same};
    use CustomerStatus::{ActiveOrder, New, RepeatOrder};
    use WriteOffGate::{Continue, Stop};

    match (name_type, write_off_contract, write_off_with_collateral, status) {
        (_, false, false, _) => Continue,
        (Same, true, false, New) => Stop,
        (Same, true, false, RepeatOrder | ActiveOrder) => Continue,
        (Same, false, true, New | RepeatOrder) => Stop,
        (Same, false, true, ActiveOrder) => Continue,
        (Different, true, false, New | RepeatOrder) => Stop,
        (Different, true, false, ActiveOrder) => Continue,
        (Different, false, true, _) => Stop,
        (_, true, true, _) => Stop,
    }
}

/// Classify a bureau response. Unscored responses carry no report, so that
/// check runs before the report-driven steps.
pub fn evaluate(
    response: &BureauResponse,
    context: &BureauContext,
    thresholds: &BureauThresholds,
) -> BureauEvaluation {
    let standing = response.standing();
    let report = match (standing, response.report()) {
        (BureauStanding::Unscored, _) => return unscored(context),
        (_, None) => return no_category(context),
        (_, Some(report)) => report,
    };

    let snapshots = snapshot::collect(report, context.spouse_included);
    let exposure = Exposure::of(&snapshots);

    if exceeds_inquiry_ceiling(report, context, thresholds) {
        return reject(
            "2100",
            format!(
                "{} bureau inquiries last month exceed the ceiling of {}",
                report.inquiry_last_month, thresholds.max_inquiries_last_month
            ),
            snapshots,
            exposure,
        );
    }

    if let Some(tag) = report.ko_category.as_deref().and_then(KoTag::parse) {
        return reject(tag.code(), tag.reason().to_string(), snapshots, exposure);
    }

    let Some(category) = report.category else {
        return no_category(context);
    };

    let scored = score_category(category, &exposure, context.bpkb_name_type, thresholds);

    if context.bpkb_name_type == BpkbNameType::Different
        && (exposure.overdue_current > thresholds.global_overdue_ceiling_days
            || exposure.overdue_last_12_months > thresholds.global_overdue_ceiling_days)
    {
        return reject(
            "2116",
            format!(
                "overdue above global ceiling of {} days with different BPKB name",
                thresholds.global_overdue_ceiling_days
            ),
            snapshots,
            exposure,
        );
    }

    if scored.rejected {
        return reject(scored.code, scored.reason, snapshots, exposure);
    }

    if !exposure.has_write_off() {
        return BureauEvaluation {
            decision: Decision::Pass,
            result_class: BureauResultClass::Pass,
            code: scored.code.to_string(),
            reason: scored.reason,
            next_process: true,
            snapshots,
            total_non_collateral_debt: exposure.total_non_collateral_debt,
        };
    }

    let gate = write_off_gate(
        context.bpkb_name_type,
        exposure.write_off_contract,
        exposure.write_off_with_collateral,
        context.customer_status,
    );
    let debt = exposure.total_non_collateral_debt;

    match gate {
        WriteOffGate::Stop => reject(
            "2114",
            format!(
                "write-off on record ({}) stops {} customer with {} BPKB name",
                write_off_label(&exposure),
                context.customer_status.label(),
                context.bpkb_name_type.label()
            ),
            snapshots,
            exposure,
        ),
        WriteOffGate::Continue if debt <= thresholds.max_non_collateral_debt => {
            let band = if debt <= thresholds.non_collateral_debt_sub_threshold {
                format!(
                    "non-collateral debt {debt:.0} within sub-threshold {:.0}",
                    thresholds.non_collateral_debt_sub_threshold
                )
            } else {
                format!(
                    "non-collateral debt {debt:.0} above sub-threshold {:.0} but within ceiling {:.0}",
                    thresholds.non_collateral_debt_sub_threshold,
                    thresholds.max_non_collateral_debt
                )
            };
            BureauEvaluation {
                decision: Decision::Pass,
                result_class: BureauResultClass::Reject,
                code: "2117".to_string(),
                reason: format!(
                    "{}; write-off ({}) tolerated: {band}",
                    scored.reason,
                    write_off_label(&exposure)
                ),
                next_process: true,
                snapshots,
                total_non_collateral_debt: debt,
            }
        }
        WriteOffGate::Continue => reject(
            "2115",
            format!(
                "non-collateral debt {debt:.0} above ceiling {:.0}",
                thresholds.max_non_collateral_debt
            ),
            snapshots,
            exposure,
        ),
    }
}

fn exceeds_inquiry_ceiling(
    report: &BureauReport,
    context: &BureauContext,
    thresholds: &BureauThresholds,
) -> bool {
    let exempt = context.customer_status.is_existing()
        && context.customer_segment.is_preferred()
        && !context.override_to_regular_flow;
    !exempt && report.inquiry_last_month > thresholds.max_inquiries_last_month
}

struct ScoredCategory {
    rejected: bool,
    code: &'static str,
    reason: String,
}

fn score_category(
    category: Category,
    exposure: &Exposure,
    name_type: BpkbNameType,
    thresholds: &BureauThresholds,
) -> ScoredCategory {
    let limits = thresholds.limits_for(name_type);
    let current_exceeded = exposure.overdue_current > limits.max_current_days;
    let yearly_exceeded = exposure.overdue_last_12_months > limits.max_last_12_months_days;

    let overdue = match (current_exceeded, yearly_exceeded) {
        (false, false) => "overdue within limits".to_string(),
        (true, false) => format!(
            "current overdue {} days above {}",
            exposure.overdue_current, limits.max_current_days
        ),
        (false, true) => format!(
            "12-month overdue {} days above {}",
            exposure.overdue_last_12_months, limits.max_last_12_months_days
        ),
        (true, true) => format!(
            "current overdue {} days and 12-month overdue {} days above limits",
            exposure.overdue_current, exposure.overdue_last_12_months
        ),
    };
    let reason = format!(
        "category {category}, {} BPKB name, {overdue}",
        name_type.label()
    );

    let exceeded = current_exceeded || yearly_exceeded;
    let (rejected, code) = match (name_type, category.is_worst_tier(), exceeded) {
        (BpkbNameType::Same, true, _) => (true, "2111"),
        (BpkbNameType::Same, false, true) => (true, "2112"),
        (BpkbNameType::Different, _, true) => (true, "2113"),
        (_, _, false) => (false, "2110"),
    };

    ScoredCategory {
        rejected,
        code,
        reason,
    }
}

fn write_off_label(exposure: &Exposure) -> &'static str {
    match (exposure.write_off_contract, exposure.write_off_with_collateral) {
        (true, true) => "contract and collateral",
        (true, false) => "contract",
        (false, true) => "collateral",
        (false, false) => "none",
    }
}

fn reject(
    code: &str,
    reason: String,
    snapshots: Vec<BureauSnapshot>,
    exposure: Exposure,
) -> BureauEvaluation {
    BureauEvaluation {
        decision: Decision::Reject,
        result_class: BureauResultClass::Reject,
        code: code.to_string(),
        reason,
        next_process: false,
        snapshots,
        total_non_collateral_debt: exposure.total_non_collateral_debt,
    }
}

fn no_category(context: &BureauContext) -> BureauEvaluation {
    let code = match context.customer_status {
        CustomerStatus::New => "2120",
        CustomerStatus::RepeatOrder => "2121",
        CustomerStatus::ActiveOrder => "2122",
    };
    no_hit(
        code,
        format!("no bureau category for {} customer", context.customer_status.label()),
    )
}

fn unscored(context: &BureauContext) -> BureauEvaluation {
    let code = if context.customer_status.is_existing() {
        "2131"
    } else {
        "2130"
    };
    no_hit(
        code,
        format!("bureau unscored for {} customer", context.customer_status.label()),
    )
}

fn no_hit(code: &str, reason: String) -> BureauEvaluation {
    BureauEvaluation {
        decision: Decision::Pass,
        result_class: BureauResultClass::NoHit,
        code: code.to_string(),
        reason,
        next_process: true,
        snapshots: Vec::new(),
        total_non_collateral_debt: 0.0,
    }
}
