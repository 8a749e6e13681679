use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CalcError {
    #[error("no rate data for year {year}")]
    MissingRateData {
        year: i32,
    },

    #[error("invalid {field}: {reason}")]
    InvalidInput {
        field: &'static str,
        reason: String,
    },

    #[error("bisection did not converge after {iterations} iterations (gap {gap})")]
    NonConvergence {
        iterations: u32,
        gap: f64,
    },
}

impl CalcError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}
