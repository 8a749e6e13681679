use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{DataError, EMBEDDED_RULES, parse_year, read_file};
use crate::core::{Bracket, BracketSchedule, DepositRules, YearRules};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RulesFile {
    #[serde(default)]
    defaults: RulesDefaults,
    years: BTreeMap<String, RawYearRules>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RulesDefaults {
    tax_year: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawYearRules {
    scheme_name: String,
    resident_brackets: Vec<Bracket>,
    dividend_brackets: Vec<Bracket>,
    non_resident_rate: f64,
    non_resident_dividend_rate: f64,
    prize_rate: f64,
    deposit: RawDepositRules,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDepositRules {
    non_taxable_base: f64,
    key_rate_pct_default: f64,
    #[serde(default = "default_true")]
    uses_progressive: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSummary {
    pub year: i32,
    pub scheme_name: String,
    pub resident_brackets: Vec<Bracket>,
    pub non_resident_rate: f64,
    pub deposit_non_taxable_base: f64,
    pub deposit_key_rate_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaxRules {
    default_year: i32,
    years: BTreeMap<i32, YearRules>,
}

impl TaxRules {
    pub fn embedded() -> Result<Self, DataError> {
        Self::from_json(EMBEDDED_RULES)
    }

    pub fn from_path(path: &Path) -> Result<Self, DataError> {
        debug!(path = %path.display(), "loading tax rules");
        Self::from_json(&read_file(path)?)
    }

    pub fn from_json(json: &str) -> Result<Self, DataError> {
        let file: RulesFile = serde_json::from_str(json)?;

        let mut years = BTreeMap::new();
        for (key, raw) in file.years {
            let year = parse_year(&key)?;
            let rules = build_year(raw).map_err(|reason| {
                DataError::Invalid(format!("tax rules for {year}: {reason}"))
            })?;
            years.insert(year, rules);
        }

        let Some(&latest) = years.keys().next_back() else {
            return Err(DataError::Invalid("tax rules contain no years".to_string()));
        };
        let default_year = match file.defaults.tax_year {
            Some(year) if years.contains_key(&year) => year,
            Some(year) => return Err(DataError::UnknownYear(year)),
            None => latest,
        };

        Ok(Self {
            default_year,
            years,
        })
    }

    pub fn default_year(&self) -> i32 {
        self.default_year
    }

    pub fn year(&self, year: i32) -> Result<&YearRules, DataError> {
        self.years.get(&year).ok_or(DataError::UnknownYear(year))
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.keys().copied()
    }

    pub fn summaries(&self) -> Vec<YearSummary> {
        self.years
            .iter()
            .map(|(year, rules)| YearSummary {
                year: *year,
                scheme_name: rules.scheme_name.clone(),
                resident_brackets: rules.resident_brackets.brackets().to_vec(),
                non_resident_rate: rules.non_resident_rate,
                deposit_non_taxable_base: rules.deposit.non_taxable_base,
                deposit_key_rate_pct: rules.deposit.key_rate_pct_default,
            })
            .collect()
    }
}

fn build_year(raw: RawYearRules) -> Result<YearRules, String> {
    for (name, rate) in [
        ("nonResidentRate", raw.non_resident_rate),
        ("nonResidentDividendRate", raw.non_resident_dividend_rate),
        ("prizeRate", raw.prize_rate),
    ] {
        if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
            return Err(format!("{name} must be between 0 and 1"));
        }
    }

    let deposit = raw.deposit;
    if !deposit.non_taxable_base.is_finite() || deposit.non_taxable_base < 0.0 {
        return Err("deposit.nonTaxableBase must be >= 0".to_string());
    }
    if !(0.0..=100.0).contains(&deposit.key_rate_pct_default) {
        return Err("deposit.keyRatePctDefault must be between 0 and 100".to_string());
    }

    Ok(YearRules {
        scheme_name: raw.scheme_name,
        resident_brackets: BracketSchedule::new(raw.resident_brackets)
            .map_err(|e| format!("residentBrackets: {e}"))?,
        dividend_brackets: BracketSchedule::new(raw.dividend_brackets)
            .map_err(|e| format!("dividendBrackets: {e}"))?,
        non_resident_rate: raw.non_resident_rate,
        non_resident_dividend_rate: raw.non_resident_dividend_rate,
        prize_rate: raw.prize_rate,
        deposit: DepositRules {
            non_taxable_base: deposit.non_taxable_base,
            key_rate_pct_default: deposit.key_rate_pct_default,
            uses_progressive: deposit.uses_progressive,
        },
    })
}
