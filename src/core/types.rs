use serde::Serialize;

use super::brackets::{BandRow, BracketSchedule};
use super::inversion::BisectionConfig;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TaxStatus {
    Resident,
    NonResident,
    NonResidentAtResidentRate,
}

impl TaxStatus {
    pub fn taxed_as_resident(self) -> bool {
        matches!(self, Self::Resident | Self::NonResidentAtResidentRate)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum IncomeCategory {
    Salary,
    Deposit,
    Dividends,
    Prize,
    Other,
    Manual { rate: f64 },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AmountMode {
    Gross,
    Net,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InversionMethod {
    ClosedForm,
    Bisection,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaxScheme {
    Progressive,
    DividendProgressive,
    DepositFlat,
    NonResidentFlat,
    NonResidentDividendFlat,
    PrizeFlat,
    ManualFlat,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RegionalAdjustment {
    pub regional_coefficient: f64,
    pub northern_percent: f64,
}

impl RegionalAdjustment {
    pub fn multiplier(self) -> f64 {
        self.regional_coefficient * (1.0 + self.northern_percent / 100.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DepositLimit {
    pub reference_base: f64,
    pub key_rate_pct: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DepositRules {
    pub non_taxable_base: f64,
    pub key_rate_pct_default: f64,
    pub uses_progressive: bool,
}

impl DepositRules {
    pub fn default_limit(&self) -> DepositLimit {
        DepositLimit {
            reference_base: self.non_taxable_base,
            key_rate_pct: self.key_rate_pct_default,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct YearRules {
    pub scheme_name: String,
    pub resident_brackets: BracketSchedule,
    pub dividend_brackets: BracketSchedule,
    pub non_resident_rate: f64,
    pub non_resident_dividend_rate: f64,
    pub prize_rate: f64,
    pub deposit: DepositRules,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TaxContext {
    pub status: TaxStatus,
    pub category: IncomeCategory,
    pub deduction: f64,
    pub regional: Option<RegionalAdjustment>,
    pub deposit_limit: Option<DepositLimit>,
}

impl TaxContext {
    pub fn new(status: TaxStatus, category: IncomeCategory) -> Self {
        Self {
            status,
            category,
            deduction: 0.0,
            regional: None,
            deposit_limit: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TaxRequest {
    pub amount: f64,
    pub mode: AmountMode,
    pub context: TaxContext,
    pub inversion: InversionMethod,
    pub bisection: BisectionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxComputation {
    pub gross: f64,
    pub gross_before_adjustment: f64,
    pub tax: f64,
    pub net: f64,
    pub taxable_base: f64,
    pub effective_rate: f64,
    pub scheme: TaxScheme,
    pub scheme_name: String,
    pub non_taxable_limit: Option<f64>,
    pub breakdown: Vec<BandRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuePoint {
    pub year: i32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InflationAdjustment {
    pub from_year: i32,
    pub to_year: i32,
    pub amount: f64,
    pub adjusted: f64,
    pub difference: f64,
    pub percent_change: f64,
    pub multiplier: f64,
    pub midpoint: ValuePoint,
    pub series: Option<Vec<ValuePoint>>,
}
