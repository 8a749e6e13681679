mod report;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    AmountMode, BisectionConfig, CalcError, DEFAULT_BISECTION_ITERATIONS, DEFAULT_TOLERANCE,
    DepositLimit, IncomeCategory, InflationAdjustment, InversionMethod, MAX_BISECTION_ITERATIONS,
    RegionalAdjustment, TaxComputation, TaxContext, TaxRequest, TaxStatus, adjust_for_inflation,
    compute_tax,
};
use crate::data::{InflationDataset, SeriesSummary, TaxRules, YearSummary};

pub use report::{format_money, render_inflation_text, render_tax_text};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliTaxStatus {
    Resident,
    NonResident,
    NonResidentResidentRate,
}

impl From<CliTaxStatus> for TaxStatus {
    fn from(value: CliTaxStatus) -> Self {
        match value {
            CliTaxStatus::Resident => TaxStatus::Resident,
            CliTaxStatus::NonResident => TaxStatus::NonResident,
            CliTaxStatus::NonResidentResidentRate => TaxStatus::NonResidentAtResidentRate,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliIncomeType {
    Salary,
    Deposit,
    Dividends,
    Prize,
    Other,
    Manual,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliAmountMode {
    Gross,
    Net,
}

impl From<CliAmountMode> for AmountMode {
    fn from(value: CliAmountMode) -> Self {
        match value {
            CliAmountMode::Gross => AmountMode::Gross,
            CliAmountMode::Net => AmountMode::Net,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliInversion {
    ClosedForm,
    Bisection,
}

impl From<CliInversion> for InversionMethod {
    fn from(value: CliInversion) -> Self {
        match value {
            CliInversion::ClosedForm => InversionMethod::ClosedForm,
            CliInversion::Bisection => InversionMethod::Bisection,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiTaxStatus {
    Resident,
    #[serde(alias = "nonResident", alias = "nonresident", alias = "non_resident")]
    NonResident,
    #[serde(
        alias = "nonResidentResidentRate",
        alias = "nonresident_resident_rate",
        alias = "non_resident_resident_rate"
    )]
    NonResidentResidentRate,
}

impl From<ApiTaxStatus> for CliTaxStatus {
    fn from(value: ApiTaxStatus) -> Self {
        match value {
            ApiTaxStatus::Resident => CliTaxStatus::Resident,
            ApiTaxStatus::NonResident => CliTaxStatus::NonResident,
            ApiTaxStatus::NonResidentResidentRate => CliTaxStatus::NonResidentResidentRate,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiIncomeType {
    Salary,
    #[serde(alias = "deposits")]
    Deposit,
    Dividends,
    Prize,
    Other,
    Manual,
}

impl From<ApiIncomeType> for CliIncomeType {
    fn from(value: ApiIncomeType) -> Self {
        match value {
            ApiIncomeType::Salary => CliIncomeType::Salary,
            ApiIncomeType::Deposit => CliIncomeType::Deposit,
            ApiIncomeType::Dividends => CliIncomeType::Dividends,
            ApiIncomeType::Prize => CliIncomeType::Prize,
            ApiIncomeType::Other => CliIncomeType::Other,
            ApiIncomeType::Manual => CliIncomeType::Manual,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiAmountMode {
    Gross,
    Net,
}

impl From<ApiAmountMode> for CliAmountMode {
    fn from(value: ApiAmountMode) -> Self {
        match value {
            ApiAmountMode::Gross => CliAmountMode::Gross,
            ApiAmountMode::Net => CliAmountMode::Net,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiInversion {
    #[serde(alias = "closedForm", alias = "closed_form")]
    ClosedForm,
    Bisection,
}

impl From<ApiInversion> for CliInversion {
    fn from(value: ApiInversion) -> Self {
        match value {
            ApiInversion::ClosedForm => CliInversion::ClosedForm,
            ApiInversion::Bisection => CliInversion::Bisection,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct TaxArgs {
    #[arg(long, help = "Gross income, or target net income with --mode net")]
    pub amount: f64,
    #[arg(long, value_enum, default_value_t = CliAmountMode::Gross)]
    pub mode: CliAmountMode,
    #[arg(long, help = "Tax year; defaults to the rules file default")]
    pub year: Option<i32>,
    #[arg(long, value_enum, default_value_t = CliTaxStatus::Resident)]
    pub status: CliTaxStatus,
    #[arg(long, value_enum, default_value_t = CliIncomeType::Salary)]
    pub income_type: CliIncomeType,
    #[arg(long, default_value_t = 0.0, help = "Deduction subtracted from the taxable base")]
    pub deduction: f64,
    #[arg(
        long,
        help = "Flat rate in percent, used when --income-type=manual (default 13)"
    )]
    pub manual_rate: Option<f64>,
    #[arg(
        long,
        help = "Regional wage coefficient, e.g. 1.15; salary only, off when omitted"
    )]
    pub regional_coefficient: Option<f64>,
    #[arg(
        long,
        help = "Northern allowance in percent; salary only, off when omitted"
    )]
    pub northern_percent: Option<f64>,
    #[arg(
        long,
        help = "Key rate in percent for the deposit allowance; defaults to the year's value"
    )]
    pub key_rate: Option<f64>,
    #[arg(
        long,
        help = "Reference base for the deposit allowance; defaults to the year's value"
    )]
    pub limit_base: Option<f64>,
    #[arg(long, value_enum, default_value_t = CliInversion::ClosedForm)]
    pub inversion: CliInversion,
    #[arg(long, default_value_t = DEFAULT_BISECTION_ITERATIONS)]
    pub bisection_iterations: u32,
}

#[derive(Args, Debug, Clone)]
pub struct InflationArgs {
    #[arg(long)]
    pub amount: f64,
    #[arg(long, help = "Year the amount is priced in")]
    pub from: i32,
    #[arg(long, help = "Year to express the amount in")]
    pub to: i32,
    #[arg(long, help = "Series id; defaults to the dataset's total series")]
    pub series: Option<String>,
    #[arg(long, help = "Include the year-by-year values")]
    pub chart: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TaxPayload {
    amount: Option<f64>,
    mode: Option<ApiAmountMode>,
    year: Option<i32>,
    status: Option<ApiTaxStatus>,
    income_type: Option<ApiIncomeType>,
    deduction: Option<f64>,
    manual_rate: Option<f64>,
    regional_coefficient: Option<f64>,
    northern_percent: Option<f64>,
    key_rate: Option<f64>,
    limit_base: Option<f64>,
    inversion: Option<ApiInversion>,
    bisection_iterations: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct InflationPayload {
    amount: Option<f64>,
    from_year: Option<i32>,
    to_year: Option<i32>,
    series: Option<String>,
    chart: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaxCommand {
    pub year: i32,
    pub request: TaxRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InflationCommand {
    pub series_id: String,
    pub amount: f64,
    pub from: i32,
    pub to: i32,
    pub with_series: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxResponse {
    pub year: i32,
    #[serde(flatten)]
    pub result: TaxComputation,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InflationResponse {
    pub series_id: String,
    pub series_name: String,
    #[serde(flatten)]
    pub result: InflationAdjustment,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaxYearsResponse {
    default_year: i32,
    years: Vec<YearSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SeriesListResponse {
    default_series: String,
    series: Vec<SeriesSummary>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Clone)]
pub struct AppState {
    rules: Arc<TaxRules>,
    inflation: Arc<InflationDataset>,
}

impl AppState {
    pub fn new(rules: TaxRules, inflation: InflationDataset) -> Self {
        Self {
            rules: Arc::new(rules),
            inflation: Arc::new(inflation),
        }
    }
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Calc(#[from] CalcError),
}

pub fn build_tax_command(args: &TaxArgs, rules: &TaxRules) -> Result<TaxCommand, String> {
    if !args.amount.is_finite() || args.amount < 0.0 {
        return Err("--amount must be >= 0".to_string());
    }

    if !args.deduction.is_finite() || args.deduction < 0.0 {
        return Err("--deduction must be >= 0".to_string());
    }

    let year = args.year.unwrap_or_else(|| rules.default_year());
    let year_rules = rules
        .year(year)
        .map_err(|_| format!("--year {year} has no tax rules"))?;

    let category = match args.income_type {
        CliIncomeType::Salary => IncomeCategory::Salary,
        CliIncomeType::Deposit => IncomeCategory::Deposit,
        CliIncomeType::Dividends => IncomeCategory::Dividends,
        CliIncomeType::Prize => IncomeCategory::Prize,
        CliIncomeType::Other => IncomeCategory::Other,
        CliIncomeType::Manual => {
            let rate = args.manual_rate.unwrap_or(13.0);
            if !(0.0..=100.0).contains(&rate) {
                return Err("--manual-rate must be between 0 and 100".to_string());
            }
            IncomeCategory::Manual { rate: rate / 100.0 }
        }
    };

    let regional = match (args.regional_coefficient, args.northern_percent) {
        (None, None) => None,
        (coefficient, northern) => {
            let regional_coefficient = coefficient.unwrap_or(1.0);
            let northern_percent = northern.unwrap_or(0.0);
            if !regional_coefficient.is_finite() || regional_coefficient <= 0.0 {
                return Err("--regional-coefficient must be > 0".to_string());
            }
            if !northern_percent.is_finite() || northern_percent < 0.0 {
                return Err("--northern-percent must be >= 0".to_string());
            }
            Some(RegionalAdjustment {
                regional_coefficient,
                northern_percent,
            })
        }
    };

    let deposit_limit = match (args.limit_base, args.key_rate) {
        (None, None) => None,
        (base, key_rate) => {
            let defaults = year_rules.deposit.default_limit();
            let reference_base = base.unwrap_or(defaults.reference_base);
            let key_rate_pct = key_rate.unwrap_or(defaults.key_rate_pct);
            if !reference_base.is_finite() || reference_base < 0.0 {
                return Err("--limit-base must be >= 0".to_string());
            }
            if !(0.0..=100.0).contains(&key_rate_pct) {
                return Err("--key-rate must be between 0 and 100".to_string());
            }
            Some(DepositLimit {
                reference_base,
                key_rate_pct,
            })
        }
    };

    if args.bisection_iterations == 0 || args.bisection_iterations > MAX_BISECTION_ITERATIONS {
        return Err(format!(
            "--bisection-iterations must be between 1 and {MAX_BISECTION_ITERATIONS}"
        ));
    }

    Ok(TaxCommand {
        year,
        request: TaxRequest {
            amount: args.amount,
            mode: args.mode.into(),
            context: TaxContext {
                status: args.status.into(),
                category,
                deduction: args.deduction,
                regional,
                deposit_limit,
            },
            inversion: args.inversion.into(),
            bisection: BisectionConfig {
                iterations: args.bisection_iterations,
                tolerance: DEFAULT_TOLERANCE,
            },
        },
    })
}

pub fn build_inflation_command(
    args: &InflationArgs,
    dataset: &InflationDataset,
) -> Result<InflationCommand, String> {
    if !args.amount.is_finite() || args.amount < 0.0 {
        return Err("--amount must be >= 0".to_string());
    }

    let series = match &args.series {
        Some(id) => dataset
            .series(id)
            .map_err(|_| format!("--series `{id}` is not in the dataset"))?,
        None => dataset.default_series(),
    };

    if let Some((first, last)) = series.year_span() {
        for (flag, year) in [("--from", args.from), ("--to", args.to)] {
            if !(first..=last).contains(&year) {
                return Err(format!("{flag} must be between {first} and {last}"));
            }
        }
    }

    Ok(InflationCommand {
        series_id: series.id.clone(),
        amount: args.amount,
        from: args.from,
        to: args.to,
        with_series: args.chart,
    })
}

pub fn run_tax(args: &TaxArgs, rules: &TaxRules) -> Result<TaxResponse, RequestError> {
    let command = build_tax_command(args, rules).map_err(RequestError::Invalid)?;
    let year_rules = rules
        .year(command.year)
        .map_err(|e| RequestError::Invalid(e.to_string()))?;
    let result = compute_tax(year_rules, &command.request)?;
    Ok(TaxResponse {
        year: command.year,
        result,
    })
}

pub fn run_inflation(
    args: &InflationArgs,
    dataset: &InflationDataset,
) -> Result<InflationResponse, RequestError> {
    let command = build_inflation_command(args, dataset).map_err(RequestError::Invalid)?;
    let series = dataset
        .series(&command.series_id)
        .map_err(|e| RequestError::Invalid(e.to_string()))?;
    let result = adjust_for_inflation(
        &series.rates,
        command.amount,
        command.from,
        command.to,
        command.with_series,
    )?;
    Ok(InflationResponse {
        series_id: series.id.clone(),
        series_name: series.name.clone(),
        result,
    })
}

pub async fn run_http_server(port: u16, state: AppState) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/tax", get(tax_get_handler).post(tax_post_handler))
        .route(
            "/api/inflation",
            get(inflation_get_handler).post(inflation_post_handler),
        )
        .route("/api/tax-years", get(tax_years_handler))
        .route("/api/series", get(series_handler))
        .fallback(not_found_handler)
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "calculator HTTP API listening");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn tax_get_handler(
    State(state): State<AppState>,
    Query(payload): Query<TaxPayload>,
) -> Response {
    tax_handler_impl(&state, payload)
}

async fn tax_post_handler(
    State(state): State<AppState>,
    Json(payload): Json<TaxPayload>,
) -> Response {
    tax_handler_impl(&state, payload)
}

async fn inflation_get_handler(
    State(state): State<AppState>,
    Query(payload): Query<InflationPayload>,
) -> Response {
    inflation_handler_impl(&state, payload)
}

async fn inflation_post_handler(
    State(state): State<AppState>,
    Json(payload): Json<InflationPayload>,
) -> Response {
    inflation_handler_impl(&state, payload)
}

async fn tax_years_handler(State(state): State<AppState>) -> Response {
    json_response(
        StatusCode::OK,
        TaxYearsResponse {
            default_year: state.rules.default_year(),
            years: state.rules.summaries(),
        },
    )
}

async fn series_handler(State(state): State<AppState>) -> Response {
    json_response(
        StatusCode::OK,
        SeriesListResponse {
            default_series: state.inflation.default_series().id.clone(),
            series: state
                .inflation
                .all_series()
                .iter()
                .map(|s| s.summary())
                .collect(),
        },
    )
}

fn tax_handler_impl(state: &AppState, payload: TaxPayload) -> Response {
    let args = tax_args_from_payload(payload);
    match run_tax(&args, &state.rules) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => request_error_response(err),
    }
}

fn inflation_handler_impl(state: &AppState, payload: InflationPayload) -> Response {
    let args = inflation_args_from_payload(payload, &state.inflation);
    match run_inflation(&args, &state.inflation) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => request_error_response(err),
    }
}

fn request_error_response(err: RequestError) -> Response {
    warn!(error = %err, "request rejected");
    let status = match err {
        RequestError::Invalid(_) => StatusCode::BAD_REQUEST,
        RequestError::Calc(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    error_response(status, &err.to_string())
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn default_tax_args() -> TaxArgs {
    TaxArgs {
        amount: 100_000.0,
        mode: CliAmountMode::Gross,
        year: None,
        status: CliTaxStatus::Resident,
        income_type: CliIncomeType::Salary,
        deduction: 0.0,
        manual_rate: None,
        regional_coefficient: None,
        northern_percent: None,
        key_rate: None,
        limit_base: None,
        inversion: CliInversion::ClosedForm,
        bisection_iterations: DEFAULT_BISECTION_ITERATIONS,
    }
}

fn tax_args_from_payload(payload: TaxPayload) -> TaxArgs {
    let mut args = default_tax_args();

    if let Some(v) = payload.amount {
        args.amount = v;
    }
    if let Some(v) = payload.mode {
        args.mode = v.into();
    }
    if let Some(v) = payload.year {
        args.year = Some(v);
    }
    if let Some(v) = payload.status {
        args.status = v.into();
    }
    if let Some(v) = payload.income_type {
        args.income_type = v.into();
    }
    if let Some(v) = payload.deduction {
        args.deduction = v;
    }
    if let Some(v) = payload.manual_rate {
        args.manual_rate = Some(v);
    }
    if let Some(v) = payload.regional_coefficient {
        args.regional_coefficient = Some(v);
    }
    if let Some(v) = payload.northern_percent {
        args.northern_percent = Some(v);
    }
    if let Some(v) = payload.key_rate {
        args.key_rate = Some(v);
    }
    if let Some(v) = payload.limit_base {
        args.limit_base = Some(v);
    }
    if let Some(v) = payload.inversion {
        args.inversion = v.into();
    }
    if let Some(v) = payload.bisection_iterations {
        args.bisection_iterations = v;
    }

    args
}

fn inflation_args_from_payload(payload: InflationPayload, dataset: &InflationDataset) -> InflationArgs {
    let span = payload
        .series
        .as_deref()
        .and_then(|id| dataset.series(id).ok())
        .unwrap_or_else(|| dataset.default_series())
        .year_span()
        .unwrap_or((2020, 2025));

    InflationArgs {
        amount: payload.amount.unwrap_or(100_000.0),
        from: payload.from_year.unwrap_or(span.1.saturating_sub(5).max(span.0)),
        to: payload.to_year.unwrap_or(span.1),
        series: payload.series,
        chart: payload.chart.unwrap_or(false),
    }
}

#[cfg(test)]
fn tax_args_from_json(json: &str) -> Result<TaxArgs, String> {
    let payload = serde_json::from_str::<TaxPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    Ok(tax_args_from_payload(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TaxScheme;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn rules() -> TaxRules {
        TaxRules::embedded().expect("embedded rules")
    }

    fn dataset() -> InflationDataset {
        InflationDataset::embedded().expect("embedded inflation data")
    }

    fn sample_args() -> TaxArgs {
        default_tax_args()
    }

    fn sample_inflation_args() -> InflationArgs {
        InflationArgs {
            amount: 100_000.0,
            from: 2020,
            to: 2025,
            series: None,
            chart: false,
        }
    }

    #[test]
    fn build_tax_command_defaults_year_from_rules() {
        let command = build_tax_command(&sample_args(), &rules()).expect("valid args");
        assert_eq!(command.year, 2025);
        assert_eq!(command.request.mode, AmountMode::Gross);
        assert_eq!(command.request.context.regional, None);
        assert_eq!(command.request.context.deposit_limit, None);
    }

    #[test]
    fn build_tax_command_rejects_unknown_year() {
        let mut args = sample_args();
        args.year = Some(1990);
        let err = build_tax_command(&args, &rules()).expect_err("no 1990 rules");
        assert!(err.contains("--year"));
    }

    #[test]
    fn build_tax_command_rejects_negative_amounts() {
        let mut args = sample_args();
        args.amount = -5.0;
        assert!(build_tax_command(&args, &rules())
            .expect_err("negative amount")
            .contains("--amount"));

        let mut args = sample_args();
        args.deduction = -1.0;
        assert!(build_tax_command(&args, &rules())
            .expect_err("negative deduction")
            .contains("--deduction"));
    }

    #[test]
    fn build_tax_command_converts_manual_percent() {
        let mut args = sample_args();
        args.income_type = CliIncomeType::Manual;
        args.manual_rate = Some(9.0);
        let command = build_tax_command(&args, &rules()).expect("valid args");
        assert_eq!(
            command.request.context.category,
            IncomeCategory::Manual { rate: 0.09 }
        );

        args.manual_rate = Some(130.0);
        assert!(build_tax_command(&args, &rules())
            .expect_err("above 100")
            .contains("--manual-rate"));
    }

    #[test]
    fn build_tax_command_enables_regional_when_either_part_is_set() {
        let mut args = sample_args();
        args.northern_percent = Some(30.0);
        let command = build_tax_command(&args, &rules()).expect("valid args");
        let regional = command.request.context.regional.expect("enabled");
        assert_approx(regional.regional_coefficient, 1.0);
        assert_approx(regional.northern_percent, 30.0);

        args.regional_coefficient = Some(0.0);
        assert!(build_tax_command(&args, &rules())
            .expect_err("zero coefficient")
            .contains("--regional-coefficient"));
    }

    #[test]
    fn build_tax_command_fills_deposit_limit_from_year_defaults() {
        let mut args = sample_args();
        args.income_type = CliIncomeType::Deposit;
        args.key_rate = Some(16.0);
        let command = build_tax_command(&args, &rules()).expect("valid args");
        let limit = command.request.context.deposit_limit.expect("override");
        assert_approx(limit.reference_base, 1_000_000.0);
        assert_approx(limit.key_rate_pct, 16.0);
    }

    #[test]
    fn build_tax_command_caps_bisection_iterations() {
        let mut args = sample_args();
        args.bisection_iterations = MAX_BISECTION_ITERATIONS + 1;
        assert!(build_tax_command(&args, &rules())
            .expect_err("above cap")
            .contains("--bisection-iterations"));
    }

    #[test]
    fn tax_args_from_json_parses_web_keys() {
        let json = r#"{
          "amount": 87000,
          "mode": "net",
          "year": 2024,
          "status": "nonresident_resident_rate",
          "incomeType": "deposits",
          "deduction": 1000,
          "keyRate": 16,
          "limitBase": 1000000,
          "inversion": "bisection",
          "bisectionIterations": 70
        }"#;
        let args = tax_args_from_json(json).expect("json should parse");
        assert_approx(args.amount, 87_000.0);
        assert_eq!(args.mode, CliAmountMode::Net);
        assert_eq!(args.year, Some(2024));
        assert_eq!(args.status, CliTaxStatus::NonResidentResidentRate);
        assert_eq!(args.income_type, CliIncomeType::Deposit);
        assert_approx(args.deduction, 1_000.0);
        assert_eq!(args.key_rate, Some(16.0));
        assert_eq!(args.inversion, CliInversion::Bisection);
        assert_eq!(args.bisection_iterations, 70);
    }

    #[test]
    fn tax_args_from_json_rejects_unknown_status() {
        assert!(tax_args_from_json(r#"{ "status": "citizen" }"#).is_err());
    }

    #[test]
    fn run_tax_matches_hand_calculation() {
        let mut args = sample_args();
        args.amount = 3_000_000.0;
        let response = run_tax(&args, &rules()).expect("computes");
        assert_eq!(response.year, 2025);
        assert_eq!(response.result.scheme, TaxScheme::Progressive);
        assert_approx(response.result.tax, 402_000.0);
    }

    #[test]
    fn run_tax_in_2024_uses_two_band_scale() {
        let mut args = sample_args();
        args.amount = 6_000_000.0;
        args.year = Some(2024);
        let response = run_tax(&args, &rules()).expect("computes");
        assert_approx(response.result.tax, 650_000.0 + 150_000.0);
    }

    #[test]
    fn tax_response_serialization_flattens_result() {
        let response = run_tax(&sample_args(), &rules()).expect("computes");
        let json = serde_json::to_string(&response).expect("serializes");
        assert!(json.contains("\"year\":2025"));
        assert!(json.contains("\"grossBeforeAdjustment\""));
        assert!(json.contains("\"effectiveRate\""));
        assert!(json.contains("\"scheme\":\"progressive\""));
        assert!(json.contains("\"breakdown\""));
        assert!(json.contains("\"rangeTo\""));
    }

    #[test]
    fn build_inflation_command_checks_series_and_years() {
        let data = dataset();
        let command = build_inflation_command(&sample_inflation_args(), &data).expect("valid");
        assert_eq!(command.series_id, "cpi_total");

        let mut args = sample_inflation_args();
        args.series = Some("unknown".to_string());
        assert!(build_inflation_command(&args, &data)
            .expect_err("unknown series")
            .contains("--series"));

        let mut args = sample_inflation_args();
        args.to = 2030;
        assert!(build_inflation_command(&args, &data)
            .expect_err("out of range")
            .contains("--to"));
    }

    #[test]
    fn run_inflation_reports_series_name_and_multiplier() {
        let mut args = sample_inflation_args();
        args.chart = true;
        let response = run_inflation(&args, &dataset()).expect("computes");
        assert_eq!(response.series_name, "Consumer prices, total");
        assert!((response.result.multiplier - 1.4964).abs() < 1e-3);
        assert_eq!(response.result.series.as_ref().map(Vec::len), Some(6));

        let json = serde_json::to_string(&response).expect("serializes");
        assert!(json.contains("\"seriesId\":\"cpi_total\""));
        assert!(json.contains("\"percentChange\""));
        assert!(json.contains("\"midpoint\""));
    }

    #[test]
    fn inflation_payload_defaults_to_latest_five_years() {
        let data = dataset();
        let args = inflation_args_from_payload(InflationPayload::default(), &data);
        assert_eq!((args.from, args.to), (2020, 2025));
        assert_approx(args.amount, 100_000.0);
        assert!(!args.chart);
    }

    #[test]
    fn run_inflation_prices_a_food_basket() {
        let args = InflationArgs {
            amount: 1_000.0,
            from: 2022,
            to: 2024,
            series: Some("cpi_food".to_string()),
            chart: false,
        };
        let response = run_inflation(&args, &dataset()).expect("computes");
        assert_eq!(response.series_name, "Food products");
        assert_approx(response.result.adjusted, 1_000.0 * 1.103 * 1.082);
    }

    #[test]
    fn request_error_wraps_engine_error() {
        let err: RequestError = CalcError::MissingRateData { year: 1990 }.into();
        assert!(matches!(err, RequestError::Calc(_)));
        assert_eq!(err.to_string(), "no rate data for year 1990");
        assert!(std::error::Error::source(&err).is_none());

        let invalid = RequestError::Invalid("--amount must be >= 0".to_string());
        assert_eq!(invalid.to_string(), "--amount must be >= 0");
    }

    #[test]
    fn request_errors_map_to_distinct_statuses() {
        let invalid = request_error_response(RequestError::Invalid("bad".to_string()));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let calc = request_error_response(RequestError::Calc(CalcError::MissingRateData {
            year: 1990,
        }));
        assert_eq!(calc.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            calc.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );
    }
}
