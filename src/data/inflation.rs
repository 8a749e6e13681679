use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{DataError, EMBEDDED_INFLATION, parse_year, read_file};
use crate::core::RateTable;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct InflationFile {
    meta: BTreeMap<String, String>,
    defaults: SeriesDefaults,
    series: Vec<RawSeries>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SeriesDefaults {
    total: Option<String>,
    food: Option<String>,
    nonfood: Option<String>,
    services: Option<String>,
}

impl SeriesDefaults {
    fn ranked(&self) -> impl Iterator<Item = &str> {
        [&self.total, &self.food, &self.nonfood, &self.services]
            .into_iter()
            .filter_map(|id| id.as_deref())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSeries {
    id: String,
    name: String,
    #[serde(default)]
    inflation_pct: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    yoy_index: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InflationSeries {
    pub id: String,
    pub name: String,
    pub rates: RateTable,
}

impl InflationSeries {
    /// Rates describe change during a year, so the last priceable year is one
    /// past the last rate.
    pub fn year_span(&self) -> Option<(i32, i32)> {
        Some((self.rates.first_year()?, self.rates.last_year()?.checked_add(1)?))
    }

    pub fn summary(&self) -> SeriesSummary {
        let span = self.year_span();
        SeriesSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            first_year: span.map(|(first, _)| first),
            last_year: span.map(|(_, last)| last),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSummary {
    pub id: String,
    pub name: String,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InflationDataset {
    pub meta: BTreeMap<String, String>,
    default_id: String,
    series: Vec<InflationSeries>,
}

impl InflationDataset {
    pub fn embedded() -> Result<Self, DataError> {
        Self::from_json(EMBEDDED_INFLATION)
    }

    pub fn from_path(path: &Path) -> Result<Self, DataError> {
        debug!(path = %path.display(), "loading inflation dataset");
        Self::from_json(&read_file(path)?)
    }

    pub fn from_json(json: &str) -> Result<Self, DataError> {
        let file: InflationFile = serde_json::from_str(json)?;
        if file.series.is_empty() {
            return Err(DataError::Invalid("inflation dataset has no series".to_string()));
        }

        let mut seen = HashSet::new();
        let mut series = Vec::with_capacity(file.series.len());
        for raw in file.series {
            if !seen.insert(raw.id.clone()) {
                return Err(DataError::Invalid(format!("duplicate series id `{}`", raw.id)));
            }
            series.push(build_series(raw)?);
        }

        // Named defaults lead in total, food, nonfood, services order.
        let mut ordered = Vec::with_capacity(series.len());
        for id in file.defaults.ranked() {
            let Some(pos) = series.iter().position(|s| s.id == id) else {
                if ordered.iter().any(|s: &InflationSeries| s.id == id) {
                    continue;
                }
                return Err(DataError::UnknownSeries(id.to_string()));
            };
            ordered.push(series.remove(pos));
        }
        ordered.append(&mut series);
        let series = ordered;

        let default_id = file
            .defaults
            .total
            .clone()
            .unwrap_or_else(|| series[0].id.clone());

        Ok(Self {
            meta: file.meta,
            default_id,
            series,
        })
    }

    pub fn series(&self, id: &str) -> Result<&InflationSeries, DataError> {
        self.series
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| DataError::UnknownSeries(id.to_string()))
    }

    pub fn default_series(&self) -> &InflationSeries {
        self.series
            .iter()
            .find(|s| s.id == self.default_id)
            .unwrap_or(&self.series[0])
    }

    pub fn all_series(&self) -> &[InflationSeries] {
        &self.series
    }
}

fn build_series(raw: RawSeries) -> Result<InflationSeries, DataError> {
    let rates = match (raw.inflation_pct, raw.yoy_index) {
        (Some(pct), None) => pct
            .iter()
            .map(|(year, rate)| Ok((parse_year(year)?, *rate)))
            .collect::<Result<RateTable, DataError>>()?,
        (None, Some(index)) => RateTable::from_yoy_index(
            index
                .iter()
                .map(|(year, value)| Ok((parse_year(year)?, *value)))
                .collect::<Result<Vec<_>, DataError>>()?,
        ),
        _ => {
            return Err(DataError::Invalid(format!(
                "series `{}` needs exactly one of inflationPct or yoyIndex",
                raw.id
            )));
        }
    };

    if rates.is_empty() {
        return Err(DataError::Invalid(format!("series `{}` has no data", raw.id)));
    }
    for year in rates.years() {
        let rate = rates.get(year).unwrap_or_default();
        if !rate.is_finite() || rate <= -100.0 {
            return Err(DataError::Invalid(format!(
                "series `{}` has unusable rate {rate} for {year}",
                raw.id
            )));
        }
    }

    Ok(InflationSeries {
        id: raw.id,
        name: raw.name,
        rates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chained_multiplier;

    #[test]
    fn embedded_dataset_loads_with_default_series() {
        let dataset = InflationDataset::embedded().expect("embedded data is valid");
        assert_eq!(dataset.meta.get("source").map(String::as_str), Some("Rosstat"));
        let total = dataset.default_series();
        assert_eq!(total.id, "cpi_total");
        assert_eq!(total.year_span(), Some((1991, 2025)));
        assert_eq!(total.rates.get(2024), Some(9.5));
    }

    #[test]
    fn embedded_series_chains_recent_years() {
        let dataset = InflationDataset::embedded().expect("embedded data is valid");
        let rates = &dataset.default_series().rates;
        let mul = chained_multiplier(rates, 2020, 2025).expect("data present");
        assert!((mul - 1.4964).abs() < 1e-3, "got {mul}");
    }

    #[test]
    fn embedded_categories_follow_default_ranking() {
        let dataset = InflationDataset::embedded().expect("embedded data is valid");
        let ids: Vec<&str> = dataset.all_series().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["cpi_total", "cpi_food", "cpi_nonfood", "cpi_services"]);

        let food = dataset.series("cpi_food").expect("present");
        assert!((food.rates.get(2024).expect("2024") - 11.1).abs() < 1e-9);
        assert_eq!(food.year_span(), Some((2015, 2025)));
        let mul = chained_multiplier(&food.rates, 2022, 2024).expect("data present");
        assert!((mul - 1.103 * 1.082).abs() < 1e-9, "got {mul}");
    }

    #[test]
    fn unranked_series_keep_file_order_after_defaults() {
        let json = r#"{
          "defaults": { "total": "all", "services": "svc" },
          "series": [
            { "id": "misc", "name": "Misc", "inflationPct": { "2000": 1.0 } },
            { "id": "svc", "name": "Services", "inflationPct": { "2000": 2.0 } },
            { "id": "all", "name": "Total", "inflationPct": { "2000": 3.0 } }
          ]
        }"#;
        let dataset = InflationDataset::from_json(json).expect("valid");
        let ids: Vec<&str> = dataset.all_series().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["all", "svc", "misc"]);
        assert_eq!(dataset.default_series().id, "all");
    }

    #[test]
    fn span_of_series_ending_at_max_year_is_unknown() {
        let series = InflationSeries {
            id: "edge".to_string(),
            name: "Edge".to_string(),
            rates: [(i32::MAX, 1.0)].into_iter().collect(),
        };
        assert_eq!(series.year_span(), None);
        assert_eq!(series.summary().last_year, None);
    }

    #[test]
    fn yoy_index_series_is_converted() {
        let json = r#"{
          "series": [
            { "id": "food", "name": "Food", "yoyIndex": { "2022": 110.0, "2023": 105.0 } }
          ]
        }"#;
        let dataset = InflationDataset::from_json(json).expect("valid");
        let food = dataset.series("food").expect("present");
        assert!((food.rates.get(2022).expect("2022") - 10.0).abs() < 1e-9);
        assert_eq!(dataset.default_series().id, "food");
    }

    #[test]
    fn unknown_series_lookup_fails() {
        let dataset = InflationDataset::embedded().expect("embedded data is valid");
        assert!(matches!(
            dataset.series("nope"),
            Err(DataError::UnknownSeries(id)) if id == "nope"
        ));
    }

    #[test]
    fn malformed_datasets_are_rejected() {
        for json in [
            r#"{ "series": [] }"#,
            r#"{ "series": [ { "id": "a", "name": "A" } ] }"#,
            r#"{ "series": [ { "id": "a", "name": "A", "inflationPct": { "x": 1.0 } } ] }"#,
            r#"{ "series": [ { "id": "a", "name": "A", "inflationPct": { "2000": -100.0 } } ] }"#,
            r#"{ "defaults": { "total": "b" }, "series": [ { "id": "a", "name": "A", "inflationPct": { "2000": 1.0 } } ] }"#,
            r#"{ "defaults": { "food": "b" }, "series": [ { "id": "a", "name": "A", "inflationPct": { "2000": 1.0 } } ] }"#,
            r#"{ "series": [
                { "id": "a", "name": "A", "inflationPct": { "2000": 1.0 } },
                { "id": "a", "name": "A2", "inflationPct": { "2000": 2.0 } }
            ] }"#,
        ] {
            assert!(InflationDataset::from_json(json).is_err(), "accepted {json}");
        }
    }

    #[test]
    fn missing_file_reports_path() {
        let err = InflationDataset::from_path(Path::new("/nonexistent/inflation.json"))
            .expect_err("file is absent");
        assert!(err.to_string().contains("/nonexistent/inflation.json"));
    }
}
