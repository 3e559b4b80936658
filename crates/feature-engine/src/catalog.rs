//! Parameter Catalogs
//!
//! A catalog maps calculator names to the parameter sets each one runs with.
//! Insertion order is kept and decides emission order within a chunk.

use crate::params::ParamSet;
use crate::registry::CalculatorRegistry;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Per-kind catalogs; a present kind fully replaces the default catalog
pub type KindOverrides = BTreeMap<String, ParameterCatalog>;

/// Names of the minimal preset
const MINIMAL: [&str; 8] = [
    "sum_values",
    "median",
    "mean",
    "length",
    "standard_deviation",
    "variance",
    "maximum",
    "minimum",
];

/// Ordered mapping from calculator name to parameter sets.
///
/// An empty list of parameter sets means "call once without parameters".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterCatalog {
    entries: Vec<(String, Vec<ParamSet>)>,
}

impl ParameterCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, sets: Vec<ParamSet>) -> Self {
        self.insert(name, sets);
        self
    }

    /// Insert or replace an entry; a replaced entry keeps its position
    pub fn insert(&mut self, name: impl Into<String>, sets: Vec<ParamSet>) -> Option<Vec<ParamSet>> {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, sets)),
            None => {
                self.entries.push((name, sets));
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<ParamSet>> {
        let pos = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn get(&self, name: &str) -> Option<&[ParamSet]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, sets)| sets.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ParamSet])> {
        self.entries.iter().map(|(n, sets)| (n.as_str(), sets.as_slice()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cheap summary statistics only
    pub fn minimal() -> Self {
        MINIMAL.iter().map(|name| (name.to_string(), Vec::new())).collect()
    }

    /// Every built-in calculator with its default parameter sets
    pub fn comprehensive() -> Self {
        CalculatorRegistry::builtin().default_catalog()
    }
}

impl FromIterator<(String, Vec<ParamSet>)> for ParameterCatalog {
    fn from_iter<T: IntoIterator<Item = (String, Vec<ParamSet>)>>(iter: T) -> Self {
        let mut catalog = Self::new();
        for (name, sets) in iter {
            catalog.insert(name, sets);
        }
        catalog
    }
}

impl Serialize for ParameterCatalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, sets) in &self.entries {
            map.serialize_entry(name, sets)?;
        }
        map.end()
    }
}

struct CatalogVisitor;

impl<'de> Visitor<'de> for CatalogVisitor {
    type Value = ParameterCatalog;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of calculator names to lists of parameter sets")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut catalog = ParameterCatalog::new();
        while let Some((name, sets)) = access.next_entry::<String, Option<Vec<ParamSet>>>()? {
            if catalog.get(&name).is_some() {
                return Err(serde::de::Error::custom(format!(
                    "calculator {name} listed twice"
                )));
            }
            // `null` reads as "no parameters"
            catalog.insert(name, sets.unwrap_or_default());
        }
        Ok(catalog)
    }
}

impl<'de> Deserialize<'de> for ParameterCatalog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(CatalogVisitor)
    }
}
