//! Output data model of the extraction engine.
//!
//! Everything here is plain data: one immutable `ParseResult` per upload,
//! handed to the persistence collaborator and discarded. The collaborator is
//! expected to find-or-create one stored model per `ModelBlock` name, upsert
//! the workbook-wide `InputParameters` onto each, and upsert one stored
//! period per `Period` keyed by (model, fiscal year-end), overwriting only
//! fields present in `values` and preserving stored values for absent ones.

use chrono::Datelike;
use chrono::NaiveDate;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;

/// Financial fields a period row can map to.
///
/// The per-segment EBITDA entries mirror the segment reporting used in the
/// source workbooks (managed services, consulting, software); each concrete
/// profit field has a margin sibling so bare "% margin" rows can attach to
/// the line item directly above them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancialField {
    Revenue,
    RevenueGrowth,
    RecurringRevenue,
    AnnualRecurringRevenue,
    GrossProfit,
    GrossMargin,
    PersonnelCosts,
    OtherOperatingExpenses,
    OperatingExpenses,
    Ebitda,
    EbitdaMargin,
    EbitdaManagedServices,
    EbitdaManagedServicesMargin,
    EbitdaConsulting,
    EbitdaConsultingMargin,
    EbitdaSoftware,
    EbitdaSoftwareMargin,
    Depreciation,
    Amortization,
    Ebit,
    EbitMargin,
    NetFinancialItems,
    ProfitBeforeTax,
    Tax,
    NetIncome,
    Capex,
    NetWorkingCapital,
    ChangeInWorkingCapital,
    OperatingCashFlow,
    FreeCashFlow,
    CashConversion,
    DividendsPaid,
    Cash,
    GrossDebt,
    NetDebt,
    Leverage,
    EnterpriseValue,
    EquityValue,
    PreferredEquity,
    ShareholderLoans,
    MinorityInterest,
    TransactionCosts,
    SharesOutstanding,
    DilutedShares,
    FullTimeEmployees,
}

impl FinancialField {
    /// The margin field belonging to a concrete profit field, where one
    /// exists. Bare "% margin" rows resolve through this.
    pub fn margin_sibling(&self) -> Option<FinancialField> {
        match self {
            Self::GrossProfit => Some(Self::GrossMargin),
            Self::Ebitda => Some(Self::EbitdaMargin),
            Self::EbitdaManagedServices => Some(Self::EbitdaManagedServicesMargin),
            Self::EbitdaConsulting => Some(Self::EbitdaConsultingMargin),
            Self::EbitdaSoftware => Some(Self::EbitdaSoftwareMargin),
            Self::Ebit => Some(Self::EbitMargin),
            _ => None,
        }
    }
}

/// Classification of a period relative to the year the parse runs in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Actual,
    Budget,
    Forecast,
}

impl PeriodKind {
    /// Past years are actuals, the current year is the running budget,
    /// future years are forecast.
    pub fn classify(year: i32, current_year: i32) -> PeriodKind {
        if year < current_year {
            PeriodKind::Actual
        } else if year == current_year {
            PeriodKind::Budget
        } else {
            PeriodKind::Forecast
        }
    }
}

/// One fiscal year of extracted values within a model block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    /// Fiscal year
    pub year: i32,
    /// Fiscal year-end date (December 31 of `year`)
    pub fiscal_year_end: NaiveDate,
    /// Display label as written in the year header cell (e.g. "2026B")
    pub label: String,
    /// Actual/budget/forecast classification
    pub kind: PeriodKind,
    /// Extracted field values; absent keys mean "not present in the upload"
    pub values: BTreeMap<FinancialField, f64>,
}

impl Period {
    pub fn new(year: i32, label: &str) -> Period {
        Period {
            year,
            fiscal_year_end: NaiveDate::from_ymd_opt(year, 12, 31).expect("Dec 31 exists"),
            label: label.to_owned(),
            kind: PeriodKind::classify(year, Utc::now().year()),
            values: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, field: FinancialField, value: f64) {
        self.values.insert(field, value);
    }

    pub fn get(&self, field: FinancialField) -> Option<f64> {
        self.values.get(&field).copied()
    }

    /// A period that picked up no values at all is never surfaced.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Where in the workbook a model block was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub sheet: String,
    /// First row of the block (0-based, inclusive)
    pub row_lower: usize,
    /// Last row of the block (0-based, inclusive)
    pub row_upper: usize,
}

impl Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "sheet '{}' rows {}-{}",
            self.sheet,
            self.row_lower + 1,
            self.row_upper + 1
        )
    }
}

/// One self-contained forecast variant extracted from the workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBlock {
    /// Block name (marker text, heading, sheet or file name)
    pub name: String,
    /// Periods in ascending fiscal-year order, one per distinct year
    pub periods: Vec<Period>,
    /// Labels of rows that carried numeric data but matched no known field
    pub unmapped_rows: Vec<String>,
    /// Block location for diagnostics
    pub source: SourceRef,
}

/// Workbook-wide deal constants, not tied to any single model block.
/// Sparse by design: absent parameters simply were not present or not
/// recognized in the upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputParameters {
    /// Share count at the signing reference date
    pub shares_at_signing: Option<f64>,
    /// Share count at the closing reference date
    pub shares_at_closing: Option<f64>,
    /// First warrant tranche: count and strike
    pub warrant_count_1: Option<f64>,
    pub warrant_strike_1: Option<f64>,
    /// Second warrant tranche: count and strike
    pub warrant_count_2: Option<f64>,
    pub warrant_strike_2: Option<f64>,
    /// Management ownership program share, as a fraction
    pub ownership_program_pct: Option<f64>,
    /// Acquisition EV/EBITDA multiple for bolt-on acquisitions
    pub acquisition_multiple: Option<f64>,
    /// Share of acquisition consideration settled in shares, as a fraction
    pub share_settled_acquisition_pct: Option<f64>,
    /// EV/EBITDA multiple paid at entry
    pub entry_ev_multiple: Option<f64>,
    /// Annual accrual rate on preferred equity, as a fraction
    pub preferred_return_rate: Option<f64>,
}

impl InputParameters {
    pub fn is_empty(&self) -> bool {
        *self == InputParameters::default()
    }
}

/// The complete extraction result for one uploaded workbook.
///
/// Constructed once per upload and immutable afterwards. Partial success is
/// normal: anything that could not be extracted is described in `warnings`
/// rather than raised, and the accept/reject decision stays with the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    /// Extracted model blocks, in workbook order
    pub models: Vec<ModelBlock>,
    /// Workbook-wide constants shared by every model
    pub input_parameters: InputParameters,
    /// Human-readable notes on skipped blocks, unmapped rows, and ambiguous
    /// detections, in processing order
    pub warnings: Vec<String>,
}
