//! FFT-based Frequency Calculators

use crate::error::CalculatorError;
use crate::params::ParamSet;
use crate::registry::Calculator;
use crate::statistics::require_finite;
use rustfft::{num_complex::Complex, FftPlanner};

/// Attributes reported by [`fft_coefficient`]
const COEFFICIENT_ATTRIBUTES: [&str; 4] = ["real", "imag", "abs", "angle"];

/// Default frequency bands (Hz) for [`spectral_band_power`]
const DEFAULT_BANDS: [(f64, f64); 3] = [(0.0, 2.0), (2.0, 5.0), (5.0, 10.0)];

/// Default sampling frequency (Hz) for [`spectral_band_power`]
const DEFAULT_SAMPLE_RATE: f64 = 20.0;

/// Forward FFT of a real signal
fn spectrum(signal: &[f64]) -> Vec<Complex<f64>> {
    let mut buffer: Vec<Complex<f64>> = signal.iter().map(|&v| Complex::new(v, 0.0)).collect();
    let fft = FftPlanner::new().plan_fft_forward(buffer.len());
    fft.process(&mut buffer);
    buffer
}

/// Apply Hamming window to reduce spectral leakage
fn apply_hamming_window(signal: &mut [f64]) {
    let n = signal.len();
    if n < 2 {
        return;
    }
    for (i, v) in signal.iter_mut().enumerate() {
        let window = 0.54 - 0.46 * (2.0 * std::f64::consts::PI * i as f64 / (n - 1) as f64).cos();
        *v *= window;
    }
}

/// Fourier coefficients of the one-sided spectrum.
///
/// Each set names a `coeff` index and an `attr` (`real`, `imag`, `abs`,
/// `angle` in degrees). Indices past the one-sided spectrum yield NaN.
pub fn fft_coefficient(values: &[f64], params: &[ParamSet]) -> Result<Vec<(String, f64)>, CalculatorError> {
    require_finite(values, 1)?;
    let spectrum = spectrum(values);
    let one_sided = values.len() / 2 + 1;

    params
        .iter()
        .map(|set| {
            let coeff = set.usize("coeff")?;
            let attr = set.text("attr")?;
            let value = match spectrum.get(coeff).filter(|_| coeff < one_sided) {
                None => f64::NAN,
                Some(c) => match attr {
                    "real" => c.re,
                    "imag" => c.im,
                    "abs" => c.norm(),
                    "angle" => c.arg().to_degrees(),
                    other => {
                        return Err(CalculatorError::InvalidParameter {
                            name: "attr".to_string(),
                            reason: format!("unknown attribute {other:?}"),
                        })
                    }
                },
            };
            Ok((set.canonical_key(), value))
        })
        .collect()
}

/// Power of the Hamming-windowed signal inside `[low, high)` Hz.
///
/// Every set carries `low`, `high` and `sample_rate`.
pub fn spectral_band_power(values: &[f64], params: &[ParamSet]) -> Result<Vec<(String, f64)>, CalculatorError> {
    require_finite(values, 2)?;

    let n = values.len();
    let mut windowed = values.to_vec();
    apply_hamming_window(&mut windowed);

    // Power spectrum over positive frequencies, normalized
    let power_spectrum: Vec<f64> = spectrum(&windowed)
        .iter()
        .take(n / 2)
        .map(|c| c.norm_sqr() / n as f64)
        .collect();

    params
        .iter()
        .map(|set| {
            let low = set.f64("low")?;
            let high = set.f64("high")?;
            let sample_rate = set.f64("sample_rate")?;
            if sample_rate <= 0.0 || high <= low {
                return Err(CalculatorError::InvalidParameter {
                    name: "low/high/sample_rate".to_string(),
                    reason: format!("band [{low}, {high}) at {sample_rate} Hz is empty"),
                });
            }

            let freq_resolution = sample_rate / n as f64;
            let power: f64 = power_spectrum
                .iter()
                .enumerate()
                .filter(|(i, _)| {
                    let freq = *i as f64 * freq_resolution;
                    freq >= low && freq < high
                })
                .map(|(_, p)| p)
                .sum();
            Ok((set.canonical_key(), power))
        })
        .collect()
}

pub(crate) fn calculators() -> Vec<Calculator> {
    let coefficients = (0..10)
        .flat_map(|coeff| {
            COEFFICIENT_ATTRIBUTES
                .iter()
                .map(move |&attr| ParamSet::new().with("coeff", coeff).with("attr", attr))
        })
        .collect();
    let bands = DEFAULT_BANDS
        .iter()
        .map(|&(low, high)| {
            ParamSet::new()
                .with("low", low)
                .with("high", high)
                .with("sample_rate", DEFAULT_SAMPLE_RATE)
        })
        .collect();

    vec![
        Calculator::combiner("fft_coefficient", fft_coefficient).with_defaults(coefficients),
        Calculator::combiner("spectral_band_power", spectral_band_power).with_defaults(bands),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, sample_rate: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_band_power_sine_wave() {
        // 2 Hz sine wave sampled at 100 Hz
        let signal: Vec<f64> = (0..256)
            .map(|i| (2.0 * std::f64::consts::PI * 2.0 * i as f64 / 100.0).sin())
            .collect();
        let params = vec![
            ParamSet::new().with("low", 0.0).with("high", 5.0).with("sample_rate", 100.0),
            ParamSet::new().with("low", 20.0).with("high", 50.0).with("sample_rate", 100.0),
        ];

        let out = spectral_band_power(&signal, &params).unwrap();
        assert_eq!(out.len(), 2);
        // Most power should be in the low band
        assert!(out[0].1 > out[1].1);
    }

    #[test]
    fn test_band_power_rejects_empty_band() {
        let params = vec![ParamSet::new().with("low", 5.0).with("high", 5.0).with("sample_rate", 10.0)];
        assert!(spectral_band_power(&[1.0, 2.0, 3.0], &params).is_err());
    }

    #[test]
    fn test_fft_dc_coefficient_is_sum() {
        let values = vec![1.0, 2.0, 3.0, 4.0];
        let params = vec![
            ParamSet::new().with("coeff", 0).with("attr", "real"),
            ParamSet::new().with("coeff", 0).with("attr", "imag"),
        ];
        let out = fft_coefficient(&values, &params).unwrap();
        assert!((out[0].1 - 10.0).abs() < 1e-9);
        assert!(out[1].1.abs() < 1e-9);
        assert_eq!(out[0].0, "attr_\"real\"__coeff_0");
    }

    #[test]
    fn test_fft_peak_at_signal_frequency() {
        // 8 cycles over 64 samples → bin 8
        let signal = sine(8.0, 64.0, 64);
        let params: Vec<ParamSet> = (0..10)
            .map(|c| ParamSet::new().with("coeff", c).with("attr", "abs"))
            .collect();
        let out = fft_coefficient(&signal, &params).unwrap();
        let peak = out
            .iter()
            .enumerate()
            .max_by(|a, b| a.1 .1.total_cmp(&b.1 .1))
            .map(|(i, _)| i);
        assert_eq!(peak, Some(8));
    }

    #[test]
    fn test_fft_out_of_range_is_nan() {
        let params = vec![ParamSet::new().with("coeff", 9).with("attr", "abs")];
        let out = fft_coefficient(&[1.0, 2.0, 3.0], &params).unwrap();
        assert!(out[0].1.is_nan());
    }

    #[test]
    fn test_fft_unknown_attribute() {
        let params = vec![ParamSet::new().with("coeff", 0).with("attr", "phase")];
        assert!(fft_coefficient(&[1.0, 2.0], &params).is_err());
    }
}
