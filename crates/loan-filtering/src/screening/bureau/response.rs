use std::fmt;

use serde::{Deserialize, Serialize};

pub const UNSCORED_CODE: &str = "201";
pub const UNSCORED_SENTINEL: &str = "UNSCORED";

/// Envelope returned by the bureau inquiry endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BureauResponse {
    pub code: String,
    pub result: BureauResult,
}

/// `result` is either a structured report or a bare string sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BureauResult {
    Report(BureauReport),
    Sentinel(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BureauStanding {
    Scored,
    NoHit,
    Unscored,
}

impl BureauResponse {
    pub fn standing(&self) -> BureauStanding {
        if self.code == UNSCORED_CODE {
            return BureauStanding::Unscored;
        }

        match &self.result {
            BureauResult::Sentinel(value) if value.eq_ignore_ascii_case(UNSCORED_SENTINEL) => {
                BureauStanding::Unscored
            }
            BureauResult::Sentinel(_) => BureauStanding::NoHit,
            BureauResult::Report(report) if report.category.is_some() => BureauStanding::Scored,
            BureauResult::Report(_) => BureauStanding::NoHit,
        }
    }

    pub fn report(&self) -> Option<&BureauReport> {
        match &self.result {
            BureauResult::Report(report) => Some(report),
            BureauResult::Sentinel(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BureauReport {
    #[serde(default)]
    pub inquiry_last_month: u32,
    /// "New KO rule" tag attached by the bureau, if any.
    #[serde(default)]
    pub ko_category: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub customer: Option<BureauRecord>,
    #[serde(default)]
    pub spouse: Option<BureauRecord>,
}

/// Per-subject facility summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BureauRecord {
    pub report_id: String,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub score: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub overdue_current: u32,
    #[serde(default)]
    pub overdue_last_12_months: u32,
    #[serde(default)]
    pub write_off_contract: bool,
    #[serde(default)]
    pub write_off_with_collateral: bool,
    #[serde(default)]
    pub total_non_collateral_debt: f64,
}

/// Bureau collectability category, I being the best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Category {
    I,
    II,
    III,
    IV,
}

impl Category {
    pub const fn roman(self) -> &'static str {
        match self {
            Category::I => "I",
            Category::II => "II",
            Category::III => "III",
            Category::IV => "IV",
        }
    }

    pub const fn is_worst_tier(self) -> bool {
        matches!(self, Category::III | Category::IV)
    }
}

impl TryFrom<u8> for Category {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Category::I),
            2 => Ok(Category::II),
            3 => Ok(Category::III),
            4 => Ok(Category::IV),
            other => Err(format!("unknown bureau category {other}")),
        }
    }
}

impl From<Category> for u8 {
    fn from(value: Category) -> Self {
        match value {
            Category::I => 1,
            Category::II => 2,
            Category::III => 3,
            Category::IV => 4,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.roman())
    }
}

/// Knock-out tags that reject immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KoTag {
    PayoffDiscount,
    TransferredSold,
    WrittenOff,
    Repossessed,
    Restructured,
}

impl KoTag {
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw
            .trim()
            .to_ascii_lowercase()
            .replace([' ', '-', '/'], "_");
        match normalized.as_str() {
            "payoff_discount" | "discounted_payoff" => Some(KoTag::PayoffDiscount),
            "transferred_sold" | "transferred" | "sold" => Some(KoTag::TransferredSold),
            "written_off" | "write_off" => Some(KoTag::WrittenOff),
            "repossessed" => Some(KoTag::Repossessed),
            "restructured" => Some(KoTag::Restructured),
            _ => None,
        }
    }

    pub const fn code(self) -> &'static str {
        match self {
            KoTag::PayoffDiscount => "2101",
            KoTag::TransferredSold => "2102",
            KoTag::WrittenOff => "2103",
            KoTag::Repossessed => "2104",
            KoTag::Restructured => "2105",
        }
    }

    pub const fn reason(self) -> &'static str {
        match self {
            KoTag::PayoffDiscount => "facility settled with payoff discount",
            KoTag::TransferredSold => "facility transferred or sold",
            KoTag::WrittenOff => "facility written off",
            KoTag::Repossessed => "collateral repossessed",
            KoTag::Restructured => "facility restructured",
        }
    }
}
