//! Combiner Calculators over Sorted Values and Trends
//!
//! Combiners share one expensive pass (a sort, a regression) across every
//! parameter set they are handed.

use crate::error::CalculatorError;
use crate::params::ParamSet;
use crate::registry::Calculator;
use crate::statistics::{quantile_param, require_finite, sorted_copy, sorted_quantile, DEFAULT_QUANTILES};

/// Attributes reported by [`linear_trend`]
const TREND_ATTRIBUTES: [&str; 4] = ["slope", "intercept", "rvalue", "stderr"];

/// Least-squares fit of the values against their position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub rvalue: f64,
    /// Standard error of the slope
    pub stderr: f64,
}

impl LinearFit {
    /// Fit y = slope * i + intercept over i = 0..n
    pub fn fit(values: &[f64]) -> Result<Self, CalculatorError> {
        require_finite(values, 2)?;

        let n = values.len() as f64;
        let x_mean = (n - 1.0) / 2.0;
        let y_mean = values.iter().sum::<f64>() / n;

        let mut sxx = 0.0;
        let mut sxy = 0.0;
        let mut syy = 0.0;
        for (i, &y) in values.iter().enumerate() {
            let dx = i as f64 - x_mean;
            let dy = y - y_mean;
            sxx += dx * dx;
            sxy += dx * dy;
            syy += dy * dy;
        }

        let slope = sxy / sxx;
        let intercept = y_mean - slope * x_mean;
        // A flat series fits perfectly
        let rvalue = if syy > 0.0 { sxy / (sxx * syy).sqrt() } else { 0.0 };
        let stderr = if values.len() > 2 {
            let residual = (syy - slope * sxy).max(0.0);
            (residual / (n - 2.0) / sxx).sqrt()
        } else {
            0.0
        };

        Ok(Self {
            slope,
            intercept,
            rvalue,
            stderr,
        })
    }

    fn attribute(&self, attr: &str) -> Result<f64, CalculatorError> {
        match attr {
            "slope" => Ok(self.slope),
            "intercept" => Ok(self.intercept),
            "rvalue" => Ok(self.rvalue),
            "stderr" => Ok(self.stderr),
            other => Err(CalculatorError::InvalidParameter {
                name: "attr".to_string(),
                reason: format!("unknown attribute {other:?}"),
            }),
        }
    }
}

/// Quantiles for every `{q}` set from a single sort
pub fn quantiles(values: &[f64], params: &[ParamSet]) -> Result<Vec<(String, f64)>, CalculatorError> {
    require_finite(values, 1)?;
    let sorted = sorted_copy(values);
    params
        .iter()
        .map(|set| Ok((set.canonical_key(), sorted_quantile(&sorted, quantile_param(set)?))))
        .collect()
}

/// Linear trend attributes for every `{attr}` set from a single fit
pub fn linear_trend(values: &[f64], params: &[ParamSet]) -> Result<Vec<(String, f64)>, CalculatorError> {
    let fit = LinearFit::fit(values)?;
    params
        .iter()
        .map(|set| Ok((set.canonical_key(), fit.attribute(set.text("attr")?)?)))
        .collect()
}

pub(crate) fn calculators() -> Vec<Calculator> {
    vec![
        Calculator::combiner("quantiles", quantiles).with_defaults(
            DEFAULT_QUANTILES
                .iter()
                .map(|&q| ParamSet::new().with("q", q))
                .collect(),
        ),
        Calculator::combiner("linear_trend", linear_trend).with_defaults(
            TREND_ATTRIBUTES
                .iter()
                .map(|&attr| ParamSet::new().with("attr", attr))
                .collect(),
        ),
    ]
}
