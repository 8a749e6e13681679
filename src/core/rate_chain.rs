//! Compounded year-over-year multipliers over an annual rate table.
//!
//! `rates[y]` is the percentage change during year `y`. An amount "in year y
//! prices" sits at the start of year `y`, so moving from `from` to `to` walks
//! the half-open year set `[min(from, to), max(from, to))`. Forward chains
//! multiply by `1 + r/100` for each of those years, and backward chains divide
//! by the same factors.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, trace};

use super::error::CalcError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    rates: BTreeMap<i32, f64>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from a December-over-December index where 100 means no
    /// change (e.g. 107.4 for 7.4%).
    pub fn from_yoy_index<I>(index: I) -> Self
    where
        I: IntoIterator<Item = (i32, f64)>,
    {
        index
            .into_iter()
            .map(|(year, value)| (year, value - 100.0))
            .collect()
    }

    pub fn insert(&mut self, year: i32, rate_pct: f64) -> Option<f64> {
        self.rates.insert(year, rate_pct)
    }

    pub fn get(&self, year: i32) -> Option<f64> {
        self.rates.get(&year).copied()
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.rates.keys().copied()
    }

    pub fn first_year(&self) -> Option<i32> {
        self.rates.keys().next().copied()
    }

    pub fn last_year(&self) -> Option<i32> {
        self.rates.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    fn growth_factor(&self, year: i32) -> Result<f64, CalcError> {
        let Some(rate) = self.get(year) else {
            debug!(year, "rate table has no entry");
            return Err(CalcError::MissingRateData { year });
        };
        let factor = 1.0 + rate / 100.0;
        if !factor.is_finite() || factor <= 0.0 {
            return Err(CalcError::invalid(
                "rate",
                format!("rate {rate}% for {year} must be finite and above -100%"),
            ));
        }
        Ok(factor)
    }
}

impl FromIterator<(i32, f64)> for RateTable {
    fn from_iter<T: IntoIterator<Item = (i32, f64)>>(iter: T) -> Self {
        Self {
            rates: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub year: i32,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Copy)]
struct Step {
    rate_year: i32,
    landing_year: i32,
    forward: bool,
}

fn steps(from: i32, to: i32) -> impl Iterator<Item = Step> {
    let forward = from < to;
    let count = from.abs_diff(to);
    // Every year visited lies between `from` and `to`, so the wrapping ops
    // never actually wrap.
    (0..count).map(move |i| {
        if forward {
            Step {
                rate_year: from.wrapping_add_unsigned(i),
                landing_year: from.wrapping_add_unsigned(i + 1),
                forward,
            }
        } else {
            let year = from.wrapping_sub_unsigned(i + 1);
            Step {
                rate_year: year,
                landing_year: year,
                forward,
            }
        }
    })
}

fn apply_step(rates: &RateTable, cumulative: f64, step: Step) -> Result<f64, CalcError> {
    let factor = rates.growth_factor(step.rate_year)?;
    Ok(if step.forward {
        cumulative * factor
    } else {
        cumulative / factor
    })
}

pub fn chained_multiplier(rates: &RateTable, from: i32, to: i32) -> Result<f64, CalcError> {
    if from == to {
        return Ok(1.0);
    }
    steps(from, to).try_fold(1.0, |cumulative, step| apply_step(rates, cumulative, step))
}

/// Starts at `(from, 1.0)`. A gap anywhere fails the whole series.
pub fn chained_series(
    rates: &RateTable,
    from: i32,
    to: i32,
) -> Result<Vec<SeriesPoint>, CalcError> {
    let span = usize::try_from(from.abs_diff(to)).unwrap_or(usize::MAX);
    let mut points = Vec::with_capacity(span.min(rates.len()) + 1);
    points.push(SeriesPoint {
        year: from,
        multiplier: 1.0,
    });

    let mut cumulative = 1.0;
    for step in steps(from, to) {
        cumulative = apply_step(rates, cumulative, step)?;
        trace!(year = step.landing_year, cumulative, "series step");
        points.push(SeriesPoint {
            year: step.landing_year,
            multiplier: cumulative,
        });
    }
    Ok(points)
}
