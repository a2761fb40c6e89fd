/*
 * value.rs
 * Copyright (c) 2026 Stencil Contributors
 */

//! Template value model and view bag.
//!
//! [`TemplateValue`] is the tagged value type flowing between callers and
//! compiled templates: models are converted into it (typically from JSON)
//! and library functions consume and produce it. [`ViewBag`] is the
//! loosely-typed side channel next to the model: an explicit mapping from
//! string key to value with get/set/enumerate operations, no reflective
//! member binding.

use std::collections::HashMap;

/// A value usable in template execution.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    /// A string value.
    String(String),

    /// A boolean value.
    Bool(bool),

    /// A numeric value.
    Number(f64),

    /// A list of values.
    List(Vec<TemplateValue>),

    /// A map of string keys to values.
    Map(HashMap<String, TemplateValue>),

    /// A null/missing value.
    Null,
}

impl TemplateValue {
    /// Check if this value is "truthy" for conditional evaluation.
    ///
    /// Any non-empty string (even "false"), any non-zero number, any list
    /// containing at least one truthy value and any non-empty map are
    /// truthy. `Bool` is itself; `Null` is falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            TemplateValue::Bool(b) => *b,
            TemplateValue::String(s) => !s.is_empty(),
            TemplateValue::Number(n) => *n != 0.0,
            TemplateValue::List(items) => items.iter().any(|v| v.is_truthy()),
            TemplateValue::Map(m) => !m.is_empty(),
            TemplateValue::Null => false,
        }
    }

    /// Get a nested field by path.
    ///
    /// `get_path(&["employee", "salary"])` on a map containing
    /// `{"employee": {"salary": 50000}}` returns the salary value.
    pub fn get_path(&self, path: &[&str]) -> Option<&TemplateValue> {
        if path.is_empty() {
            return Some(self);
        }

        match self {
            TemplateValue::Map(m) => {
                let first = path[0];
                m.get(first).and_then(|v| v.get_path(&path[1..]))
            }
            _ => None,
        }
    }

    /// Render this value as a string for output.
    ///
    /// Numbers that hold an integral value render without a fractional
    /// part. `Bool(false)`, `Null` and empty structures render empty.
    pub fn render(&self) -> String {
        match self {
            TemplateValue::String(s) => s.clone(),
            TemplateValue::Bool(true) => "true".to_string(),
            TemplateValue::Bool(false) => String::new(),
            TemplateValue::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            TemplateValue::List(items) => items.iter().map(|v| v.render()).collect(),
            TemplateValue::Map(_) => "true".to_string(),
            TemplateValue::Null => String::new(),
        }
    }
}

impl Default for TemplateValue {
    fn default() -> Self {
        TemplateValue::Null
    }
}

impl From<&str> for TemplateValue {
    fn from(s: &str) -> Self {
        TemplateValue::String(s.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(s: String) -> Self {
        TemplateValue::String(s)
    }
}

impl From<bool> for TemplateValue {
    fn from(b: bool) -> Self {
        TemplateValue::Bool(b)
    }
}

impl From<f64> for TemplateValue {
    fn from(n: f64) -> Self {
        TemplateValue::Number(n)
    }
}

impl From<i64> for TemplateValue {
    fn from(n: i64) -> Self {
        TemplateValue::Number(n as f64)
    }
}

impl From<serde_json::Value> for TemplateValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => TemplateValue::Null,
            serde_json::Value::Bool(b) => TemplateValue::Bool(b),
            serde_json::Value::Number(n) => {
                TemplateValue::Number(n.as_f64().unwrap_or(f64::NAN))
            }
            serde_json::Value::String(s) => TemplateValue::String(s),
            serde_json::Value::Array(items) => {
                TemplateValue::List(items.into_iter().map(TemplateValue::from).collect())
            }
            serde_json::Value::Object(fields) => TemplateValue::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, TemplateValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// A mapping from string key to value, passed alongside the model.
///
/// The view bag deliberately exposes only read-by-name, write-by-name and
/// enumerate-names; there is no dynamic member binding.
#[derive(Debug, Clone, Default)]
pub struct ViewBag {
    values: HashMap<String, TemplateValue>,
}

impl ViewBag {
    /// Create an empty view bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value by name.
    pub fn get(&self, key: &str) -> Option<&TemplateValue> {
        self.values.get(key)
    }

    /// Set a value by name, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: TemplateValue) {
        self.values.insert(key.into(), value);
    }

    /// Enumerate the names currently present.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, TemplateValue)> for ViewBag {
    fn from_iter<T: IntoIterator<Item = (String, TemplateValue)>>(iter: T) -> Self {
        ViewBag {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_truthiness() {
        assert!(TemplateValue::Bool(true).is_truthy());
        assert!(!TemplateValue::Bool(false).is_truthy());

        assert!(TemplateValue::String("hello".to_string()).is_truthy());
        assert!(TemplateValue::String("false".to_string()).is_truthy()); // "false" string is truthy!
        assert!(!TemplateValue::String(String::new()).is_truthy());

        assert!(TemplateValue::Number(1.5).is_truthy());
        assert!(!TemplateValue::Number(0.0).is_truthy());

        assert!(TemplateValue::List(vec![TemplateValue::Bool(true)]).is_truthy());
        assert!(!TemplateValue::List(vec![]).is_truthy());
        assert!(!TemplateValue::Null.is_truthy());
    }

    #[test]
    fn test_get_path() {
        let mut inner = HashMap::new();
        inner.insert("salary".to_string(), TemplateValue::Number(50000.0));

        let mut outer = HashMap::new();
        outer.insert("employee".to_string(), TemplateValue::Map(inner));

        let value = TemplateValue::Map(outer);

        assert_eq!(
            value.get_path(&["employee", "salary"]),
            Some(&TemplateValue::Number(50000.0))
        );
        assert_eq!(value.get_path(&["employee", "name"]), None);
        assert_eq!(value.get_path(&["nonexistent"]), None);
    }

    #[test]
    fn test_render_numbers() {
        assert_eq!(TemplateValue::Number(42.0).render(), "42");
        assert_eq!(TemplateValue::Number(1.5).render(), "1.5");
        assert_eq!(TemplateValue::Null.render(), "");
    }

    #[test]
    fn test_from_json() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"name": "World", "tags": ["a", "b"], "n": 3}"#).unwrap();
        let value = TemplateValue::from(json);

        assert_eq!(
            value.get_path(&["name"]),
            Some(&TemplateValue::String("World".to_string()))
        );
        assert_eq!(value.get_path(&["n"]), Some(&TemplateValue::Number(3.0)));
        match value.get_path(&["tags"]) {
            Some(TemplateValue::List(items)) => assert_eq!(items.len(), 2),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_view_bag_get_set_enumerate() {
        let mut bag = ViewBag::new();
        assert!(bag.is_empty());

        bag.set("title", TemplateValue::from("Home"));
        bag.set("count", TemplateValue::from(2i64));
        bag.set("title", TemplateValue::from("Index")); // overwrite

        assert_eq!(bag.len(), 2);
        assert_eq!(bag.get("title"), Some(&TemplateValue::from("Index")));
        assert!(bag.get("missing").is_none());

        let mut keys: Vec<&str> = bag.keys().collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["count", "title"]);
    }
}
