//! Chunk Processor
//!
//! The function dispatched once per chunk. It picks the effective catalog
//! for the chunk's kind, runs every calculator in catalog order and turns
//! each produced (key, value) pair into a feature record.

use crate::error::ConfigurationError;
use feature_engine::{
    CalculatorError, CalculatorFn, CalculatorRegistry, KindOverrides, ParamSet, ParameterCatalog,
    NAME_SEPARATOR,
};
use serde::{Serialize, Serializer};
use series_grouper::{Chunk, EntityId};
use std::fmt;
use tracing::debug;

/// One emitted scalar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord<I> {
    pub entity_id: I,
    /// `kind__calculator[__key]`
    pub variable: String,
    pub value: f64,
}

/// A calculator call that failed on one chunk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculatorFault {
    pub entity_key: String,
    pub kind: String,
    pub calculator: String,
    /// Canonical key of the failing parameter set; `None` for a combiner,
    /// which fails as a whole
    pub param_key: Option<String>,
    #[serde(serialize_with = "display")]
    pub error: CalculatorError,
}

impl fmt::Display for CalculatorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed on ({}, {:?})", self.calculator, self.entity_key, self.kind)?;
        if let Some(key) = self.param_key.as_deref().filter(|k| !k.is_empty()) {
            write!(f, " with {key}")?;
        }
        write!(f, ": {}", self.error)
    }
}

fn display<T: fmt::Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Output of processing one chunk
#[derive(Debug, Clone, PartialEq)]
pub enum Emission<I> {
    Record(FeatureRecord<I>),
    Fault(CalculatorFault),
}

/// Feature name for a calculator result on a kind
pub fn variable_name(kind: &str, calculator: &str, key: &str) -> String {
    let mut name = String::with_capacity(kind.len() + calculator.len() + key.len() + 4);
    name.push_str(kind);
    name.push_str(NAME_SEPARATOR);
    name.push_str(calculator);
    if !key.is_empty() {
        name.push_str(NAME_SEPARATOR);
        name.push_str(key);
    }
    name
}

/// Applies the effective catalog to single chunks.
///
/// Borrows the registry and catalogs read-only, so one processor is shared
/// by every worker of a run.
#[derive(Debug, Clone, Copy)]
pub struct ChunkProcessor<'a> {
    registry: &'a CalculatorRegistry,
    default_catalog: &'a ParameterCatalog,
    overrides: &'a KindOverrides,
}

impl<'a> ChunkProcessor<'a> {
    /// Validate both catalogs against the registry
    pub fn new(
        registry: &'a CalculatorRegistry,
        default_catalog: &'a ParameterCatalog,
        overrides: &'a KindOverrides,
    ) -> Result<Self, ConfigurationError> {
        validate_catalogs(registry, default_catalog, overrides)?;
        Ok(Self {
            registry,
            default_catalog,
            overrides,
        })
    }

    /// Override for `kind` if present, otherwise the default catalog
    pub fn catalog_for(&self, kind: &str) -> &'a ParameterCatalog {
        self.overrides.get(kind).unwrap_or(self.default_catalog)
    }

    /// Run the effective catalog over one chunk
    pub fn process<I: EntityId>(&self, chunk: &Chunk<I>) -> Vec<Emission<I>> {
        let catalog = self.catalog_for(&chunk.kind);
        let mut out = Vec::new();

        for (name, sets) in catalog.iter() {
            // Every name was checked against the registry in `new`
            let Some(calculator) = self.registry.get(name) else {
                continue;
            };

            match calculator.function() {
                CalculatorFn::Combiner(f) => match f(chunk.values.as_slice(), sets) {
                    Ok(pairs) => {
                        for (key, value) in pairs {
                            out.push(self.record(chunk, name, &key, value));
                        }
                    }
                    Err(error) => out.push(self.fault(chunk, name, None, error)),
                },
                CalculatorFn::Simple(f) => {
                    let empty = [ParamSet::new()];
                    let sets = if sets.is_empty() { &empty[..] } else { sets };
                    for set in sets {
                        let key = set.canonical_key();
                        match f(chunk.values.as_slice(), set) {
                            Ok(value) => out.push(self.record(chunk, name, &key, value)),
                            Err(error) => out.push(self.fault(chunk, name, Some(key), error)),
                        }
                    }
                }
            }
        }

        out
    }

    fn record<I: EntityId>(&self, chunk: &Chunk<I>, calculator: &str, key: &str, value: f64) -> Emission<I> {
        Emission::Record(FeatureRecord {
            entity_id: chunk.entity_id.clone(),
            variable: variable_name(&chunk.kind, calculator, key),
            value,
        })
    }

    fn fault<I: EntityId>(
        &self,
        chunk: &Chunk<I>,
        calculator: &str,
        param_key: Option<String>,
        error: CalculatorError,
    ) -> Emission<I> {
        debug!(
            "{} failed on ({}, {}): {}",
            calculator, chunk.entity_key, chunk.kind, error
        );
        Emission::Fault(CalculatorFault {
            entity_key: chunk.entity_key.clone(),
            kind: chunk.kind.clone(),
            calculator: calculator.to_string(),
            param_key,
            error,
        })
    }
}

/// Check the default catalog and every override against the registry
pub fn validate_catalogs(
    registry: &CalculatorRegistry,
    default_catalog: &ParameterCatalog,
    overrides: &KindOverrides,
) -> Result<(), ConfigurationError> {
    registry
        .validate(default_catalog)
        .map_err(|source| ConfigurationError::Catalog {
            scope: "default".to_string(),
            source,
        })?;
    for (kind, catalog) in overrides {
        registry
            .validate(catalog)
            .map_err(|source| ConfigurationError::Catalog {
                scope: format!("override for kind {kind:?}"),
                source,
            })?;
    }
    Ok(())
}
