mod brackets;
mod engine;
mod error;
mod inversion;
mod rate_chain;
mod types;

pub use brackets::{
    Allocation, BandRow, Bracket, BracketSchedule, deposit_non_taxable_limit,
    deposit_taxable_base, flat_tax,
};
pub use engine::{adjust_for_inflation, compute_tax};
pub use error::CalcError;
pub use inversion::{
    BisectionConfig, DEFAULT_BISECTION_ITERATIONS, DEFAULT_TOLERANCE, MAX_BISECTION_ITERATIONS,
    MAX_EXPANSIONS, seed_upper_bound, solve_gross_for_target_net,
};
pub use rate_chain::{RateTable, SeriesPoint, chained_multiplier, chained_series};
pub use types::{
    AmountMode, DepositLimit, DepositRules, IncomeCategory, InflationAdjustment, InversionMethod,
    RegionalAdjustment, TaxComputation, TaxContext, TaxRequest, TaxScheme, TaxStatus, ValuePoint,
    YearRules,
};
