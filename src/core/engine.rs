use tracing::debug;

use super::brackets::{BracketSchedule, deposit_non_taxable_limit, deposit_taxable_base};
use super::error::CalcError;
use super::inversion::solve_gross_for_target_net;
use super::rate_chain::{RateTable, chained_series};
use super::types::{
    AmountMode, IncomeCategory, InflationAdjustment, InversionMethod, TaxComputation, TaxContext,
    TaxRequest, TaxScheme, ValuePoint, YearRules,
};

#[derive(Debug)]
struct SelectedScheme {
    scheme: TaxScheme,
    name: String,
    schedule: BracketSchedule,
}

#[derive(Debug, Clone, Copy)]
struct BaseRule {
    multiplier: f64,
    deduction: f64,
    non_taxable_limit: Option<f64>,
}

impl BaseRule {
    fn adjusted_gross(self, entered_gross: f64) -> f64 {
        entered_gross * self.multiplier
    }

    fn taxable_base(self, adjusted_gross: f64) -> f64 {
        let after_limit = match self.non_taxable_limit {
            Some(limit) => deposit_taxable_base(adjusted_gross, limit),
            None => adjusted_gross,
        };
        (after_limit - self.deduction).max(0.0)
    }

    fn untaxed_offset(self) -> f64 {
        self.deduction + self.non_taxable_limit.unwrap_or(0.0)
    }
}

pub fn compute_tax(rules: &YearRules, request: &TaxRequest) -> Result<TaxComputation, CalcError> {
    validate_request(request)?;

    let context = &request.context;
    let selected = select_scheme(rules, context)?;
    let base_rule = base_rule(rules, context)?;

    let entered_gross = match request.mode {
        AmountMode::Gross => request.amount,
        AmountMode::Net => solve_entered_gross(request, &selected.schedule, base_rule)?,
    };

    let gross = base_rule.adjusted_gross(entered_gross);
    let taxable_base = base_rule.taxable_base(gross);
    let allocation = selected.schedule.allocate(taxable_base)?;
    let tax = allocation.total;
    let net = gross - tax;
    let effective_rate = if gross > 0.0 { tax / gross } else { 0.0 };

    Ok(TaxComputation {
        gross,
        gross_before_adjustment: entered_gross,
        tax,
        net,
        taxable_base,
        effective_rate,
        scheme: selected.scheme,
        scheme_name: selected.name,
        non_taxable_limit: base_rule.non_taxable_limit,
        breakdown: allocation.rows,
    })
}

fn validate_request(request: &TaxRequest) -> Result<(), CalcError> {
    if !request.amount.is_finite() || request.amount < 0.0 {
        return Err(CalcError::invalid("amount", "must be finite and >= 0"));
    }
    let context = &request.context;
    if !context.deduction.is_finite() || context.deduction < 0.0 {
        return Err(CalcError::invalid("deduction", "must be finite and >= 0"));
    }
    if let Some(regional) = context.regional {
        if !regional.regional_coefficient.is_finite() || regional.regional_coefficient <= 0.0 {
            return Err(CalcError::invalid("regional_coefficient", "must be > 0"));
        }
        if !regional.northern_percent.is_finite() || regional.northern_percent < 0.0 {
            return Err(CalcError::invalid("northern_percent", "must be >= 0"));
        }
    }
    if let IncomeCategory::Manual { rate } = context.category {
        if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
            return Err(CalcError::invalid("manual_rate", "must be between 0 and 1"));
        }
    }
    Ok(())
}

fn select_scheme(rules: &YearRules, context: &TaxContext) -> Result<SelectedScheme, CalcError> {
    let flat = |scheme: TaxScheme, rate: f64, name: String| -> Result<SelectedScheme, CalcError> {
        Ok(SelectedScheme {
            scheme,
            name,
            schedule: BracketSchedule::flat(rate)?,
        })
    };

    if let IncomeCategory::Manual { rate } = context.category {
        return flat(
            TaxScheme::ManualFlat,
            rate,
            format!("manual rate {:.1}%", rate * 100.0),
        );
    }

    if !context.status.taxed_as_resident() {
        return if context.category == IncomeCategory::Dividends {
            flat(
                TaxScheme::NonResidentDividendFlat,
                rules.non_resident_dividend_rate,
                format!(
                    "non-resident {:.0}% (dividends)",
                    rules.non_resident_dividend_rate * 100.0
                ),
            )
        } else {
            flat(
                TaxScheme::NonResidentFlat,
                rules.non_resident_rate,
                format!("non-resident {:.0}%", rules.non_resident_rate * 100.0),
            )
        };
    }

    match context.category {
        IncomeCategory::Prize => flat(
            TaxScheme::PrizeFlat,
            rules.prize_rate,
            format!("prizes {:.0}%", rules.prize_rate * 100.0),
        ),
        IncomeCategory::Dividends => Ok(SelectedScheme {
            scheme: TaxScheme::DividendProgressive,
            name: "dividend scale".to_string(),
            schedule: rules.dividend_brackets.clone(),
        }),
        IncomeCategory::Deposit if !rules.deposit.uses_progressive => {
            let rate = rules.resident_brackets.first_rate();
            flat(
                TaxScheme::DepositFlat,
                rate,
                format!("deposit interest {:.0}%", rate * 100.0),
            )
        }
        _ => Ok(SelectedScheme {
            scheme: TaxScheme::Progressive,
            name: rules.scheme_name.clone(),
            schedule: rules.resident_brackets.clone(),
        }),
    }
}

fn base_rule(rules: &YearRules, context: &TaxContext) -> Result<BaseRule, CalcError> {
    let multiplier = match (context.category, context.regional) {
        (IncomeCategory::Salary, Some(regional)) => regional.multiplier(),
        (category, Some(_)) => {
            debug!(?category, "regional adjustment only applies to salary; ignored");
            1.0
        }
        (_, None) => 1.0,
    };

    let non_taxable_limit = if context.category == IncomeCategory::Deposit {
        let limit = context
            .deposit_limit
            .unwrap_or_else(|| rules.deposit.default_limit());
        Some(deposit_non_taxable_limit(
            limit.reference_base,
            limit.key_rate_pct,
        )?)
    } else {
        None
    };

    Ok(BaseRule {
        multiplier,
        deduction: context.deduction,
        non_taxable_limit,
    })
}

fn solve_entered_gross(
    request: &TaxRequest,
    schedule: &BracketSchedule,
    base_rule: BaseRule,
) -> Result<f64, CalcError> {
    let target_net = request.amount;
    match request.inversion {
        InversionMethod::ClosedForm => {
            let adjusted = schedule.gross_for_net(base_rule.untaxed_offset(), target_net)?;
            Ok(adjusted / base_rule.multiplier)
        }
        InversionMethod::Bisection => {
            let net_fn = |entered: f64| {
                let gross = base_rule.adjusted_gross(entered);
                schedule
                    .allocate(base_rule.taxable_base(gross))
                    .map_or(f64::NAN, |allocation| gross - allocation.total)
            };
            solve_gross_for_target_net(target_net, net_fn, request.bisection)
        }
    }
}

pub fn adjust_for_inflation(
    rates: &RateTable,
    amount: f64,
    from: i32,
    to: i32,
    with_series: bool,
) -> Result<InflationAdjustment, CalcError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(CalcError::invalid("amount", "must be finite and >= 0"));
    }

    let points = chained_series(rates, from, to)?;
    let values: Vec<ValuePoint> = points
        .iter()
        .map(|point| ValuePoint {
            year: point.year,
            value: amount * point.multiplier,
        })
        .collect();

    let multiplier = points.last().map_or(1.0, |point| point.multiplier);
    let adjusted = amount * multiplier;
    let difference = adjusted - amount;
    let percent_change = if amount > 0.0 {
        difference / amount * 100.0
    } else {
        0.0
    };
    let midpoint = values[values.len() / 2];

    Ok(InflationAdjustment {
        from_year: from,
        to_year: to,
        amount,
        adjusted,
        difference,
        percent_change,
        multiplier,
        midpoint,
        series: with_series.then_some(values),
    })
}
