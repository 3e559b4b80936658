//! Calculator Registry
//!
//! Static name → calculator mapping, built once at startup and validated
//! against catalogs before any series is touched.

use crate::catalog::ParameterCatalog;
use crate::error::{CalculatorError, RegistryError};
use crate::params::{is_valid_name, ParamSet};
use crate::{fft, statistics, trend};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Signature of a simple calculator: one parameter set in, one value out
pub type SimpleFn = dyn Fn(&[f64], &ParamSet) -> Result<f64, CalculatorError> + Send + Sync;

/// Signature of a combiner: the whole parameter list in, keyed values out
pub type CombinerFn =
    dyn Fn(&[f64], &[ParamSet]) -> Result<Vec<(String, f64)>, CalculatorError> + Send + Sync;

/// How a calculator must be invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculatorKind {
    /// Called once per parameter set
    Simple,
    /// Called once with every parameter set
    Combiner,
}

/// Typed calculator function
#[derive(Clone)]
pub enum CalculatorFn {
    Simple(Arc<SimpleFn>),
    Combiner(Arc<CombinerFn>),
}

/// A registered calculator
#[derive(Clone)]
pub struct Calculator {
    name: String,
    function: CalculatorFn,
    /// Parameter sets used by the comprehensive catalog
    defaults: Vec<ParamSet>,
}

impl Calculator {
    /// Create a simple calculator
    pub fn simple<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[f64], &ParamSet) -> Result<f64, CalculatorError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            function: CalculatorFn::Simple(Arc::new(f)),
            defaults: Vec::new(),
        }
    }

    /// Create a combiner calculator
    pub fn combiner<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[f64], &[ParamSet]) -> Result<Vec<(String, f64)>, CalculatorError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            function: CalculatorFn::Combiner(Arc::new(f)),
            defaults: Vec::new(),
        }
    }

    /// Attach default parameter sets
    pub fn with_defaults(mut self, defaults: Vec<ParamSet>) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> CalculatorKind {
        match self.function {
            CalculatorFn::Simple(_) => CalculatorKind::Simple,
            CalculatorFn::Combiner(_) => CalculatorKind::Combiner,
        }
    }

    pub fn function(&self) -> &CalculatorFn {
        &self.function
    }

    pub fn defaults(&self) -> &[ParamSet] {
        &self.defaults
    }
}

impl fmt::Debug for Calculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Calculator")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("defaults", &self.defaults.len())
            .finish()
    }
}

/// Registry of calculators keyed by name
#[derive(Debug, Clone, Default)]
pub struct CalculatorRegistry {
    calculators: HashMap<String, Calculator>,
    /// Registration order, used for the comprehensive catalog
    order: Vec<String>,
}

impl CalculatorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in calculator library
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for calculator in statistics::calculators()
            .into_iter()
            .chain(trend::calculators())
            .chain(fft::calculators())
        {
            registry.insert(calculator);
        }
        debug!("Built-in registry holds {} calculators", registry.len());
        registry
    }

    fn insert(&mut self, calculator: Calculator) {
        let name = calculator.name.clone();
        if self.calculators.insert(name.clone(), calculator).is_none() {
            self.order.push(name);
        }
    }

    /// Register a calculator, rejecting malformed and duplicate names
    pub fn register(&mut self, calculator: Calculator) -> Result<(), RegistryError> {
        if !is_valid_name(&calculator.name) {
            return Err(RegistryError::InvalidName(calculator.name));
        }
        if self.calculators.contains_key(&calculator.name) {
            return Err(RegistryError::Duplicate(calculator.name));
        }
        self.insert(calculator);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Calculator> {
        self.calculators.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.calculators.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.calculators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calculators.is_empty()
    }

    /// Names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Check that every calculator in the catalog is registered and every
    /// parameter name is well formed.
    pub fn validate(&self, catalog: &ParameterCatalog) -> Result<(), RegistryError> {
        let unknown: Vec<String> = catalog
            .names()
            .filter(|name| !self.contains(name))
            .map(str::to_string)
            .collect();
        if !unknown.is_empty() {
            return Err(RegistryError::UnknownCalculators(unknown));
        }

        for (name, sets) in catalog.iter() {
            if let Some(param) = sets.iter().find_map(ParamSet::invalid_name) {
                return Err(RegistryError::InvalidParameterName {
                    calculator: name.to_string(),
                    param: param.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Catalog with every registered calculator and its defaults
    pub fn default_catalog(&self) -> ParameterCatalog {
        self.order
            .iter()
            .filter_map(|name| self.calculators.get(name))
            .map(|c| (c.name.clone(), c.defaults.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(value: f64) -> Calculator {
        Calculator::simple("constant", move |_, _| Ok(value))
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = CalculatorRegistry::new();
        registry.register(constant(1.0)).unwrap();
        let calc = registry.get("constant").unwrap();
        assert_eq!(calc.kind(), CalculatorKind::Simple);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = CalculatorRegistry::new();
        registry.register(constant(1.0)).unwrap();
        assert_eq!(
            registry.register(constant(2.0)),
            Err(RegistryError::Duplicate("constant".into()))
        );
    }

    #[test]
    fn test_malformed_name_rejected() {
        let mut registry = CalculatorRegistry::new();
        let bad = Calculator::simple("bad__name", |_, _| Ok(0.0));
        assert!(matches!(registry.register(bad), Err(RegistryError::InvalidName(_))));
    }

    #[test]
    fn test_validate_reports_all_unknown_names() {
        let registry = CalculatorRegistry::builtin();
        let catalog = ParameterCatalog::new()
            .with("mean", vec![])
            .with("nope", vec![])
            .with("also_nope", vec![]);
        assert_eq!(
            registry.validate(&catalog),
            Err(RegistryError::UnknownCalculators(vec!["nope".into(), "also_nope".into()]))
        );
    }

    #[test]
    fn test_validate_rejects_bad_parameter_names() {
        let registry = CalculatorRegistry::builtin();
        let catalog = ParameterCatalog::new().with("quantile", vec![ParamSet::new().with("q__x", 0.5)]);
        assert!(matches!(
            registry.validate(&catalog),
            Err(RegistryError::InvalidParameterName { .. })
        ));
    }

    #[test]
    fn test_builtin_names_are_valid_and_unique() {
        let registry = CalculatorRegistry::builtin();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names.len(), registry.len());
        assert!(names.iter().all(|n| is_valid_name(n)));
        assert_eq!(registry.get("quantiles").map(Calculator::kind), Some(CalculatorKind::Combiner));
    }

    #[test]
    fn test_default_catalog_validates() {
        let registry = CalculatorRegistry::builtin();
        let catalog = registry.default_catalog();
        assert_eq!(catalog.len(), registry.len());
        assert!(registry.validate(&catalog).is_ok());
    }
}
