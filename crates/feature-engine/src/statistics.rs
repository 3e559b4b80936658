//! Statistical Calculators
//!
//! Simple calculators over a single series. Moments are population moments.

use crate::error::CalculatorError;
use crate::params::{ParamSet, ParamValue};
use crate::registry::Calculator;

/// Deciles used as quantile defaults
pub(crate) const DEFAULT_QUANTILES: [f64; 8] = [0.1, 0.2, 0.3, 0.4, 0.6, 0.7, 0.8, 0.9];

/// Reject empty or non-finite input
pub(crate) fn require_finite(values: &[f64], needed: usize) -> Result<(), CalculatorError> {
    if values.len() < needed.max(1) {
        return Err(CalculatorError::InsufficientData {
            needed: needed.max(1),
            actual: values.len(),
        });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(CalculatorError::NonFiniteInput);
    }
    Ok(())
}

/// Central moments of a series
#[derive(Debug, Clone, Copy, Default)]
pub struct Moments {
    /// Mean value
    pub mean: f64,
    /// Population variance
    pub variance: f64,
    /// Third central moment
    pub m3: f64,
    /// Fourth central moment
    pub m4: f64,
}

impl Moments {
    /// Compute moments from a non-empty slice
    pub fn compute(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;

        let mut m2 = 0.0;
        let mut m3 = 0.0;
        let mut m4 = 0.0;
        for &v in values {
            let d = v - mean;
            m2 += d * d;
            m3 += d * d * d;
            m4 += d * d * d * d;
        }

        Self {
            mean,
            variance: m2 / n,
            m3: m3 / n,
            m4: m4 / n,
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }

    /// E[(X-μ)³] / σ³, zero for a constant series
    pub fn skewness(&self) -> f64 {
        let std_dev = self.std_dev();
        if std_dev > 0.0 {
            self.m3 / (std_dev * std_dev * std_dev)
        } else {
            0.0
        }
    }

    /// Excess kurtosis E[(X-μ)⁴] / σ⁴ - 3, zero for a constant series
    pub fn kurtosis(&self) -> f64 {
        if self.variance > 0.0 {
            self.m4 / (self.variance * self.variance) - 3.0
        } else {
            0.0
        }
    }
}

/// Linear-interpolated quantile of already sorted values
pub(crate) fn sorted_quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub(crate) fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

pub(crate) fn quantile_param(params: &ParamSet) -> Result<f64, CalculatorError> {
    let q = params.f64("q")?;
    if !(0.0..=1.0).contains(&q) {
        return Err(CalculatorError::InvalidParameter {
            name: "q".to_string(),
            reason: format!("{q} is outside [0, 1]"),
        });
    }
    Ok(q)
}

pub fn mean(values: &[f64]) -> Result<f64, CalculatorError> {
    require_finite(values, 1)?;
    Ok(Moments::compute(values).mean)
}

pub fn median(values: &[f64]) -> Result<f64, CalculatorError> {
    require_finite(values, 1)?;
    Ok(sorted_quantile(&sorted_copy(values), 0.5))
}

pub fn sum_values(values: &[f64]) -> Result<f64, CalculatorError> {
    require_finite(values, 1)?;
    Ok(values.iter().sum())
}

pub fn variance(values: &[f64]) -> Result<f64, CalculatorError> {
    require_finite(values, 1)?;
    Ok(Moments::compute(values).variance)
}

pub fn standard_deviation(values: &[f64]) -> Result<f64, CalculatorError> {
    require_finite(values, 1)?;
    Ok(Moments::compute(values).std_dev())
}

pub fn maximum(values: &[f64]) -> Result<f64, CalculatorError> {
    require_finite(values, 1)?;
    Ok(values.iter().cloned().fold(f64::MIN, f64::max))
}

pub fn minimum(values: &[f64]) -> Result<f64, CalculatorError> {
    require_finite(values, 1)?;
    Ok(values.iter().cloned().fold(f64::MAX, f64::min))
}

pub fn skewness(values: &[f64]) -> Result<f64, CalculatorError> {
    require_finite(values, 3)?;
    Ok(Moments::compute(values).skewness())
}

pub fn kurtosis(values: &[f64]) -> Result<f64, CalculatorError> {
    require_finite(values, 4)?;
    Ok(Moments::compute(values).kurtosis())
}

pub fn abs_energy(values: &[f64]) -> Result<f64, CalculatorError> {
    require_finite(values, 1)?;
    Ok(values.iter().map(|v| v * v).sum())
}

/// Average absolute step between neighbours
pub fn mean_abs_change(values: &[f64]) -> Result<f64, CalculatorError> {
    require_finite(values, 2)?;
    let total: f64 = values.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    Ok(total / (values.len() - 1) as f64)
}

/// Average signed step between neighbours
pub fn mean_change(values: &[f64]) -> Result<f64, CalculatorError> {
    require_finite(values, 2)?;
    Ok((values[values.len() - 1] - values[0]) / (values.len() - 1) as f64)
}

pub fn count_above_mean(values: &[f64]) -> Result<f64, CalculatorError> {
    require_finite(values, 1)?;
    let mean = Moments::compute(values).mean;
    Ok(values.iter().filter(|&&v| v > mean).count() as f64)
}

pub fn count_below_mean(values: &[f64]) -> Result<f64, CalculatorError> {
    require_finite(values, 1)?;
    let mean = Moments::compute(values).mean;
    Ok(values.iter().filter(|&&v| v < mean).count() as f64)
}

/// Number of times the series crosses level `m`
pub fn number_crossing_m(values: &[f64], params: &ParamSet) -> Result<f64, CalculatorError> {
    require_finite(values, 1)?;
    let m = params.f64("m")?;
    let crossings = values
        .windows(2)
        .filter(|w| (w[0] > m) != (w[1] > m))
        .count();
    Ok(crossings as f64)
}

/// Autocorrelation at `lag`, normalized by the series variance
pub fn autocorrelation(values: &[f64], params: &ParamSet) -> Result<f64, CalculatorError> {
    let lag = params.usize("lag")?;
    require_finite(values, lag + 1)?;

    let moments = Moments::compute(values);
    if moments.variance == 0.0 {
        return Err(CalculatorError::Degenerate("zero variance".to_string()));
    }

    let n = values.len();
    let sum: f64 = (0..n - lag)
        .map(|i| (values[i] - moments.mean) * (values[i + lag] - moments.mean))
        .sum();
    Ok(sum / ((n - lag) as f64 * moments.variance))
}

pub fn quantile(values: &[f64], params: &ParamSet) -> Result<f64, CalculatorError> {
    require_finite(values, 1)?;
    let q = quantile_param(params)?;
    Ok(sorted_quantile(&sorted_copy(values), q))
}

fn unary(name: &str, f: fn(&[f64]) -> Result<f64, CalculatorError>) -> Calculator {
    Calculator::simple(name, move |values, _| f(values))
}

fn sets<V: Into<ParamValue> + Copy>(name: &str, values: &[V]) -> Vec<ParamSet> {
    values.iter().map(|&v| ParamSet::new().with(name, v)).collect()
}

/// Simple calculators shipped with the registry
pub(crate) fn calculators() -> Vec<Calculator> {
    let lags: Vec<i64> = (0..10).collect();
    vec![
        unary("mean", mean),
        unary("median", median),
        unary("sum_values", sum_values),
        Calculator::simple("length", |values, _| Ok(values.len() as f64)),
        unary("standard_deviation", standard_deviation),
        unary("variance", variance),
        unary("maximum", maximum),
        unary("minimum", minimum),
        unary("skewness", skewness),
        unary("kurtosis", kurtosis),
        unary("abs_energy", abs_energy),
        unary("mean_abs_change", mean_abs_change),
        unary("mean_change", mean_change),
        unary("count_above_mean", count_above_mean),
        unary("count_below_mean", count_below_mean),
        Calculator::simple("number_crossing_m", number_crossing_m)
            .with_defaults(sets("m", &[-1, 0, 1])),
        Calculator::simple("autocorrelation", autocorrelation).with_defaults(sets("lag", lags.as_slice())),
        Calculator::simple("quantile", quantile).with_defaults(sets("q", &DEFAULT_QUANTILES)),
    ]
}
