use serde::{Deserialize, Serialize};

use super::error::CalcError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bracket {
    #[serde(default)]
    pub upper_bound: Option<f64>,
    pub rate: f64,
}

impl Bracket {
    pub const fn capped(upper_bound: f64, rate: f64) -> Self {
        Self {
            upper_bound: Some(upper_bound),
            rate,
        }
    }

    pub const fn unbounded(rate: f64) -> Self {
        Self {
            upper_bound: None,
            rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BracketSchedule {
    brackets: Vec<Bracket>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandRow {
    pub range_from: f64,
    pub range_to: Option<f64>,
    pub base: f64,
    pub rate: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub total: f64,
    pub rows: Vec<BandRow>,
}

impl BracketSchedule {
    pub fn new(brackets: Vec<Bracket>) -> Result<Self, CalcError> {
        if brackets.is_empty() {
            return Err(CalcError::invalid("brackets", "at least one bracket is required"));
        }

        let last = brackets.len() - 1;
        let mut prev_bound = 0.0;
        for (i, bracket) in brackets.iter().enumerate() {
            if !bracket.rate.is_finite() || !(0.0..=1.0).contains(&bracket.rate) {
                return Err(CalcError::invalid(
                    "brackets",
                    format!("rate {} at position {i} must be between 0 and 1", bracket.rate),
                ));
            }
            match (bracket.upper_bound, i == last) {
                (None, true) => {}
                (None, false) => {
                    return Err(CalcError::invalid(
                        "brackets",
                        format!("unbounded bracket at position {i} must be last"),
                    ));
                }
                (Some(_), true) => {
                    return Err(CalcError::invalid(
                        "brackets",
                        "last bracket must be unbounded",
                    ));
                }
                (Some(bound), false) => {
                    if !bound.is_finite() || bound <= prev_bound {
                        return Err(CalcError::invalid(
                            "brackets",
                            format!(
                                "upper bound {bound} at position {i} must be finite and above {prev_bound}"
                            ),
                        ));
                    }
                    prev_bound = bound;
                }
            }
        }

        Ok(Self { brackets })
    }

    pub fn flat(rate: f64) -> Result<Self, CalcError> {
        Self::new(vec![Bracket::unbounded(rate)])
    }

    pub fn brackets(&self) -> &[Bracket] {
        &self.brackets
    }

    pub fn first_rate(&self) -> f64 {
        self.brackets[0].rate
    }

    pub fn allocate(&self, base: f64) -> Result<Allocation, CalcError> {
        if !base.is_finite() || base < 0.0 {
            return Err(CalcError::invalid(
                "base",
                format!("taxable base {base} must be finite and >= 0"),
            ));
        }

        let mut rows = Vec::new();
        let mut remaining = base;
        let mut lower = 0.0;
        for bracket in &self.brackets {
            if remaining <= 0.0 {
                break;
            }
            let width = bracket.upper_bound.map_or(f64::INFINITY, |upper| upper - lower);
            let chunk = remaining.min(width);
            if chunk > 0.0 {
                rows.push(BandRow {
                    range_from: lower,
                    range_to: bracket.upper_bound,
                    base: chunk,
                    rate: bracket.rate,
                    amount: chunk * bracket.rate,
                });
            }
            remaining -= chunk;
            if let Some(upper) = bracket.upper_bound {
                lower = upper;
            }
        }

        let total = rows.iter().map(|row| row.amount).sum();
        Ok(Allocation { total, rows })
    }

    /// Closed-form inverse of `net(g) = g - tax(max(0, g - offset))`.
    ///
    /// Below `offset` nothing is taxed, so net equals gross. Above it each band
    /// contributes net at slope `1 - rate`, which lets the target be located
    /// band by band without iterating.
    pub fn gross_for_net(&self, offset: f64, target_net: f64) -> Result<f64, CalcError> {
        if !offset.is_finite() || offset < 0.0 {
            return Err(CalcError::invalid("offset", "untaxed offset must be finite and >= 0"));
        }
        if !target_net.is_finite() || target_net < 0.0 {
            return Err(CalcError::invalid(
                "target_net",
                format!("target net {target_net} must be finite and >= 0"),
            ));
        }
        if target_net <= offset {
            return Ok(target_net);
        }

        let mut remaining = target_net - offset;
        let mut lower = 0.0;
        for bracket in &self.brackets {
            let slope = 1.0 - bracket.rate;
            match bracket.upper_bound {
                Some(upper) => {
                    let gain = (upper - lower) * slope;
                    if remaining <= gain && slope > 0.0 {
                        return Ok(offset + lower + remaining / slope);
                    }
                    remaining -= gain;
                    lower = upper;
                }
                None => {
                    if slope <= 0.0 {
                        return Err(CalcError::invalid(
                            "target_net",
                            "net income cannot grow past a 100% top band",
                        ));
                    }
                    return Ok(offset + lower + remaining / slope);
                }
            }
        }

        Err(CalcError::invalid("brackets", "schedule has no unbounded band"))
    }
}

pub fn flat_tax(base: f64, rate: f64) -> Result<Allocation, CalcError> {
    BracketSchedule::flat(rate)?.allocate(base)
}

pub fn deposit_non_taxable_limit(reference_base: f64, key_rate_pct: f64) -> Result<f64, CalcError> {
    if !reference_base.is_finite() || reference_base < 0.0 {
        return Err(CalcError::invalid("limit_base", "reference base must be >= 0"));
    }
    if !key_rate_pct.is_finite() || !(0.0..=100.0).contains(&key_rate_pct) {
        return Err(CalcError::invalid("key_rate", "key rate must be between 0 and 100"));
    }
    Ok(reference_base * key_rate_pct / 100.0)
}

pub fn deposit_taxable_base(gross_interest: f64, non_taxable_limit: f64) -> f64 {
    (gross_interest - non_taxable_limit).max(0.0)
}
