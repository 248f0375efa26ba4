//! Loan-to-value lookup over the cluster × bureau class × tenor table.

use std::io::Read;

use serde::{Deserialize, Serialize};

use super::bureau::BureauResultClass;
use super::cluster::Cluster;
use super::domain::BpkbNameType;

/// Tenors from this many months up also match on BPKB type and vehicle age.
pub const LONG_TENOR_MONTHS: u16 = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleAgeBucket {
    UpTo12,
    Over12,
}

impl VehicleAgeBucket {
    pub fn of(years: u16) -> Self {
        if years <= 12 {
            VehicleAgeBucket::UpTo12
        } else {
            VehicleAgeBucket::Over12
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "up_to_12" | "<=12" | "le12" => Some(VehicleAgeBucket::UpTo12),
            "over_12" | ">12" | "gt12" => Some(VehicleAgeBucket::Over12),
            _ => None,
        }
    }
}

/// Inclusive debt range; an open `max` has no ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DebtBand {
    pub min: f64,
    pub max: Option<f64>,
}

impl DebtBand {
    pub fn contains(&self, debt: f64) -> bool {
        self.min <= debt && self.max.map_or(true, |max| debt <= max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LtvRow {
    pub cluster: Cluster,
    pub bureau_result: BureauResultClass,
    pub tenor_start: u16,
    pub tenor_end: u16,
    #[serde(default)]
    pub bpkb_name_type: Option<BpkbNameType>,
    #[serde(default)]
    pub vehicle_age: Option<VehicleAgeBucket>,
    #[serde(default)]
    pub debt_band: Option<DebtBand>,
    pub ltv_percent: f64,
}

/// Facts the LTV lookup keys on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LtvQuery {
    pub cluster: Cluster,
    pub bureau_result: BureauResultClass,
    pub tenor_months: u16,
    pub bpkb_name_type: BpkbNameType,
    pub vehicle_age_years: u16,
    pub total_non_collateral_debt: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LtvOutcome {
    Available { ltv_percent: f64, max_tenor: u16 },
    /// Product exists only for shorter tenors.
    AdjustTenor { max_tenor: u16 },
    NoProduct,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LtvTable {
    pub rows: Vec<LtvRow>,
}

impl LtvTable {
    pub fn new(rows: Vec<LtvRow>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Parse the flat CSV export of the table. Blank optional columns mean "any".
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, LtvTableError> {
        let mut table = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut rows = Vec::new();

        for (index, record) in table.deserialize::<CsvRow>().enumerate() {
            let line = index + 2;
            let record = record.map_err(|source| LtvTableError::Csv { line, source })?;
            rows.push(record.into_row(line)?);
        }

        Ok(Self { rows })
    }

    /// Last matching row wins; max tenor spans every non-zero row that could
    /// supply an LTV for the same cluster, class and dimensions.
    pub fn elaborate(&self, query: &LtvQuery) -> LtvOutcome {
        let age = VehicleAgeBucket::of(query.vehicle_age_years);
        let qualifies = |row: &&LtvRow| {
            row.cluster == query.cluster
                && row.bureau_result == query.bureau_result
                && debt_matches(row, query)
        };

        let ltv_percent = self
            .rows
            .iter()
            .filter(qualifies)
            .filter(|row| {
                row.tenor_start <= query.tenor_months
                    && query.tenor_months <= row.tenor_end
                    && dimensions_match(row, query.tenor_months, query.bpkb_name_type, age)
            })
            .last()
            .map_or(0.0, |row| row.ltv_percent);

        let max_tenor = self
            .rows
            .iter()
            .filter(qualifies)
            .filter(|row| {
                row.ltv_percent > 0.0
                    && dimensions_match(row, row.tenor_start, query.bpkb_name_type, age)
            })
            .map(|row| row.tenor_end)
            .max()
            .unwrap_or(0);

        match (ltv_percent > 0.0, max_tenor > 0) {
            (true, _) => LtvOutcome::Available {
                ltv_percent,
                max_tenor,
            },
            (false, true) => LtvOutcome::AdjustTenor { max_tenor },
            (false, false) => LtvOutcome::NoProduct,
        }
    }
}

/// Short tenors ignore the row's name type and age bucket; long tenors need
/// both to equal the applicant's.
fn dimensions_match(
    row: &LtvRow,
    tenor_months: u16,
    bpkb_name_type: BpkbNameType,
    age: VehicleAgeBucket,
) -> bool {
    tenor_months < LONG_TENOR_MONTHS
        || (row.bpkb_name_type == Some(bpkb_name_type) && row.vehicle_age == Some(age))
}

fn debt_matches(row: &LtvRow, query: &LtvQuery) -> bool {
    match query.bureau_result {
        BureauResultClass::Reject => row
            .debt_band
            .map_or(true, |band| band.contains(query.total_non_collateral_debt)),
        BureauResultClass::Pass | BureauResultClass::NoHit => true,
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    cluster: String,
    bureau_result: String,
    tenor_start: u16,
    tenor_end: u16,
    #[serde(default)]
    bpkb_name_type: Option<String>,
    #[serde(default)]
    vehicle_age: Option<String>,
    #[serde(default)]
    debt_min: Option<f64>,
    #[serde(default)]
    debt_max: Option<f64>,
    ltv_percent: f64,
}

impl CsvRow {
    fn into_row(self, line: usize) -> Result<LtvRow, LtvTableError> {
        let invalid = |column: &'static str, value: &str| LtvTableError::InvalidValue {
            line,
            column,
            value: value.to_string(),
        };

        let bureau_result = BureauResultClass::parse(&self.bureau_result)
            .ok_or_else(|| invalid("bureau_result", &self.bureau_result))?;

        let bpkb_name_type = match non_blank(self.bpkb_name_type.as_deref()) {
            None => None,
            Some(raw) => Some(match raw.to_ascii_lowercase().as_str() {
                "same" => BpkbNameType::Same,
                "different" => BpkbNameType::Different,
                _ => return Err(invalid("bpkb_name_type", raw)),
            }),
        };

        let vehicle_age = match non_blank(self.vehicle_age.as_deref()) {
            None => None,
            Some(raw) => {
                Some(VehicleAgeBucket::parse(raw).ok_or_else(|| invalid("vehicle_age", raw))?)
            }
        };

        let debt_band = match (self.debt_min, self.debt_max) {
            (None, None) => None,
            (min, max) => Some(DebtBand {
                min: min.unwrap_or(0.0),
                max,
            }),
        };

        Ok(LtvRow {
            cluster: Cluster::from(self.cluster.as_str()),
            bureau_result,
            tenor_start: self.tenor_start,
            tenor_end: self.tenor_end,
            bpkb_name_type,
            vehicle_age,
            debt_band,
            ltv_percent: self.ltv_percent,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[derive(Debug, thiserror::Error)]
pub enum LtvTableError {
    #[error("ltv table line {line}: {source}")]
    Csv { line: usize, source: csv::Error },
    #[error("ltv table line {line}: invalid {column} '{value}'")]
    InvalidValue {
        line: usize,
        column: &'static str,
        value: String,
    },
}
