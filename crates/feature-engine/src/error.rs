//! Calculator and Registry Error Types

use thiserror::Error;

/// Errors raised by a single calculator invocation on one series
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalculatorError {
    /// Series too short for the statistic
    #[error("need at least {needed} values, got {actual}")]
    InsufficientData { needed: usize, actual: usize },

    /// Series contains NaN or infinite values
    #[error("input contains non-finite values")]
    NonFiniteInput,

    /// Required parameter absent from the parameter set
    #[error("missing required parameter: {0}")]
    MissingParameter(String),

    /// Parameter present but unusable
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Statistic undefined for this input (e.g. zero variance)
    #[error("degenerate input: {0}")]
    Degenerate(String),
}

/// Errors raised while building or validating against a registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("calculator already registered: {0}")]
    Duplicate(String),

    #[error("invalid calculator name: {0:?}")]
    InvalidName(String),

    #[error("unknown calculators: {}", .0.join(", "))]
    UnknownCalculators(Vec<String>),

    #[error("invalid parameter name {param:?} for calculator {calculator}")]
    InvalidParameterName { calculator: String, param: String },
}
