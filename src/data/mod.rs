mod inflation;
mod rules;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use inflation::{InflationDataset, InflationSeries, SeriesSummary};
pub use rules::{TaxRules, YearSummary};

pub const EMBEDDED_INFLATION: &str = include_str!("../../data/inflation_ru.json");
pub const EMBEDDED_RULES: &str = include_str!("../../data/ndfl_rules.json");

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown series `{0}`")]
    UnknownSeries(String),

    #[error("no tax rules for year {0}")]
    UnknownYear(i32),

    #[error("invalid dataset: {0}")]
    Invalid(String),
}

fn read_file(path: &Path) -> Result<String, DataError> {
    std::fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_year(key: &str) -> Result<i32, DataError> {
    key.trim()
        .parse::<i32>()
        .map_err(|_| DataError::Invalid(format!("`{key}` is not a year")))
}
