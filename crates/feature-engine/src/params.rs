//! Parameter Sets and Canonical Keys
//!
//! A parameter set is a name-sorted map of values. Its canonical key is the
//! string appended to feature names, so equal sets always produce the same key
//! and distinct sets never share one.

use crate::error::CalculatorError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Separator between the parts of a feature name
pub const NAME_SEPARATOR: &str = "__";

/// Check a calculator or parameter name.
///
/// Valid names are non-empty ASCII alphanumerics and underscores, never
/// contain the `__` separator and never start or end with `_`.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.contains(NAME_SEPARATOR)
        && !name.starts_with('_')
        && !name.ends_with('_')
}

/// A single parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<ParamValue>),
}

impl ParamValue {
    fn encode_into(&self, out: &mut String) {
        match self {
            ParamValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            ParamValue::Int(i) => {
                let _ = write!(out, "{i}");
            }
            // Debug keeps a '.' or exponent, so 1.0 never encodes like Int(1).
            // -0.0 == 0.0, so both encode as 0.0.
            ParamValue::Float(f) => {
                let f = if *f == 0.0 { 0.0 } else { *f };
                let _ = write!(out, "{f:?}");
            }
            ParamValue::Text(s) => {
                let _ = write!(out, "\"{}\"", s.escape_default());
            }
            ParamValue::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.encode_into(out);
                }
                out.push(']');
            }
        }
    }

    /// Numeric view (ints widen to f64)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// One set of named parameters for a calculator call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, ParamValue>);

impl ParamSet {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Option<ParamValue> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// First parameter name that is not a valid name, if any
    pub fn invalid_name(&self) -> Option<&str> {
        self.0.keys().map(String::as_str).find(|name| !is_valid_name(name))
    }

    /// Deterministic key for this set: `name_value` pairs in name order,
    /// joined by `__`. Empty for an empty set.
    pub fn canonical_key(&self) -> String {
        let mut out = String::new();
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                out.push_str(NAME_SEPARATOR);
            }
            out.push_str(name);
            out.push('_');
            value.encode_into(&mut out);
        }
        out
    }

    fn require(&self, name: &str) -> Result<&ParamValue, CalculatorError> {
        self.0
            .get(name)
            .ok_or_else(|| CalculatorError::MissingParameter(name.to_string()))
    }

    /// Numeric parameter (ints accepted)
    pub fn f64(&self, name: &str) -> Result<f64, CalculatorError> {
        self.require(name)?
            .as_f64()
            .ok_or_else(|| CalculatorError::InvalidParameter {
                name: name.to_string(),
                reason: "expected a number".to_string(),
            })
    }

    /// Non-negative integer parameter
    pub fn usize(&self, name: &str) -> Result<usize, CalculatorError> {
        match self.require(name)? {
            ParamValue::Int(i) if *i >= 0 => Ok(*i as usize),
            _ => Err(CalculatorError::InvalidParameter {
                name: name.to_string(),
                reason: "expected a non-negative integer".to_string(),
            }),
        }
    }

    /// Text parameter
    pub fn text(&self, name: &str) -> Result<&str, CalculatorError> {
        match self.require(name)? {
            ParamValue::Text(s) => Ok(s.as_str()),
            _ => Err(CalculatorError::InvalidParameter {
                name: name.to_string(),
                reason: "expected text".to_string(),
            }),
        }
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParamSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_has_empty_key() {
        assert_eq!(ParamSet::new().canonical_key(), "");
    }

    #[test]
    fn test_key_is_name_sorted() {
        let a = ParamSet::new().with("q", 0.1).with("attr", "abs");
        let b = ParamSet::new().with("attr", "abs").with("q", 0.1);
        assert_eq!(a.canonical_key(), "attr_\"abs\"__q_0.1");
        assert_eq!(a.canonical_key(), b.canonical_key());
    }

    #[test]
    fn test_int_and_float_keys_differ() {
        let int = ParamSet::new().with("lag", 1);
        let float = ParamSet::new().with("lag", 1.0);
        assert_eq!(int.canonical_key(), "lag_1");
        assert_eq!(float.canonical_key(), "lag_1.0");
    }

    #[test]
    fn test_signed_zeros_share_a_key() {
        let positive = ParamSet::new().with("m", 0.0);
        let negative = ParamSet::new().with("m", -0.0);
        assert_eq!(positive, negative);
        assert_eq!(negative.canonical_key(), "m_0.0");
        assert_eq!(positive.canonical_key(), negative.canonical_key());
    }

    #[test]
    fn test_text_is_quoted_and_escaped() {
        let nan_text = ParamSet::new().with("m", "NaN");
        let nan_float = ParamSet::new().with("m", f64::NAN);
        assert_ne!(nan_text.canonical_key(), nan_float.canonical_key());

        let tricky = ParamSet::new().with("a", "x\"__b_1");
        assert_eq!(tricky.canonical_key(), "a_\"x\\\"__b_1\"");
    }

    #[test]
    fn test_list_encoding() {
        let set = ParamSet::new().with("coeffs", ParamValue::List(vec![1.into(), 2.into()]));
        assert_eq!(set.canonical_key(), "coeffs_[1, 2]");
    }

    #[test]
    fn test_name_rules() {
        assert!(is_valid_name("lag"));
        assert!(is_valid_name("sample_rate"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("a__b"));
        assert!(!is_valid_name("_a"));
        assert!(!is_valid_name("a_"));
        assert!(!is_valid_name("a-b"));
    }

    #[test]
    fn test_typed_accessors() {
        let set = ParamSet::new().with("lag", 3).with("q", 0.5).with("attr", "real");
        assert_eq!(set.usize("lag"), Ok(3));
        assert_eq!(set.f64("lag"), Ok(3.0));
        assert_eq!(set.f64("q"), Ok(0.5));
        assert_eq!(set.text("attr"), Ok("real"));
        assert!(matches!(set.f64("missing"), Err(CalculatorError::MissingParameter(_))));
        assert!(matches!(set.usize("q"), Err(CalculatorError::InvalidParameter { .. })));
    }

    #[test]
    fn test_deserialize_from_json() {
        let set: ParamSet = serde_json::from_str(r#"{"q": 0.1, "lag": 2, "attr": "abs"}"#).unwrap();
        assert_eq!(set.get("q"), Some(&ParamValue::Float(0.1)));
        assert_eq!(set.get("lag"), Some(&ParamValue::Int(2)));
        assert_eq!(set.get("attr"), Some(&ParamValue::Text("abs".into())));
    }

    mod injectivity {
        use super::*;
        use proptest::prelude::*;

        fn leaf() -> impl Strategy<Value = ParamValue> {
            prop_oneof![
                any::<bool>().prop_map(ParamValue::Bool),
                (-100i64..100).prop_map(ParamValue::Int),
                (-100i64..100).prop_map(|i| ParamValue::Float(i as f64)),
                (-1.0e6..1.0e6f64).prop_map(ParamValue::Float),
                "[a-z\"_ ,\\\\]{0,6}".prop_map(ParamValue::Text),
            ]
        }

        fn value() -> impl Strategy<Value = ParamValue> {
            prop_oneof![
                4 => leaf(),
                1 => prop::collection::vec(leaf(), 0..3).prop_map(ParamValue::List),
            ]
        }

        fn set() -> impl Strategy<Value = ParamSet> {
            prop::collection::btree_map("[a-z]{1,3}(_[a-z]{1,2})?", value(), 0..4).prop_map(ParamSet)
        }

        proptest! {
            #[test]
            fn distinct_sets_never_share_a_key(a in set(), b in set()) {
                prop_assume!(a != b);
                prop_assert_ne!(a.canonical_key(), b.canonical_key());
            }

            #[test]
            fn equal_sets_share_a_key(a in set()) {
                let b = a.clone();
                prop_assert_eq!(a.canonical_key(), b.canonical_key());
            }
        }
    }
}
