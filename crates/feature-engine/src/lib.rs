//! Feature Calculator Library
//!
//! Parameter sets, parameter catalogs and a statically built registry of
//! named statistical calculators, each tagged as simple or combiner.

mod catalog;
mod error;
mod fft;
mod params;
mod registry;
mod statistics;
mod trend;

pub use catalog::{KindOverrides, ParameterCatalog};
pub use error::{CalculatorError, RegistryError};
pub use params::{is_valid_name, ParamSet, ParamValue, NAME_SEPARATOR};
pub use registry::{Calculator, CalculatorFn, CalculatorKind, CalculatorRegistry, CombinerFn, SimpleFn};
pub use statistics::Moments;
pub use trend::LinearFit;
