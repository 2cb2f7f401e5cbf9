//! Feature order, defaulting policy and per-request feature rows.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::LoadError;

/// Column order the model was trained on. Fixed once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureOrder {
    names: Vec<String>,
}

// `new` rejects empty lists.
#[allow(clippy::len_without_is_empty)]
impl FeatureOrder {
    pub fn new(names: Vec<String>) -> Result<Self, LoadError> {
        if names.is_empty() {
            return Err(LoadError::EmptyFeatureOrder);
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(LoadError::DuplicateFeature(name.clone()));
            }
        }

        Ok(Self { names })
    }

    /// Reads a flat JSON array of field names.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let names: Vec<String> = serde_json::from_str(&raw).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(names)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.names.iter().any(|name| name == field)
    }
}

/// Value substituted for a field the client left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Text(&'static str),
    Number(i64),
}

impl DefaultValue {
    pub fn to_json(self) -> Value {
        match self {
            DefaultValue::Text(text) => Value::from(text),
            DefaultValue::Number(n) => Value::from(n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultRule {
    pub field: &'static str,
    pub value: DefaultValue,
}

const STANDARD_RULES: &[DefaultRule] = &[
    DefaultRule {
        field: "date",
        value: DefaultValue::Text("2025-01-01"),
    },
    DefaultRule {
        field: "country",
        value: DefaultValue::Text("unknown"),
    },
    DefaultRule {
        field: "occupation",
        value: DefaultValue::Text("unknown"),
    },
];

/// Table of exact-name rules with a fallback for every other field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultPolicy {
    rules: &'static [DefaultRule],
    fallback: DefaultValue,
}

impl DefaultPolicy {
    pub const fn new(rules: &'static [DefaultRule], fallback: DefaultValue) -> Self {
        Self { rules, fallback }
    }

    /// `date` gets a fixed date, `country` and `occupation` get "unknown",
    /// everything else gets 0.
    pub const fn standard() -> Self {
        Self::new(STANDARD_RULES, DefaultValue::Number(0))
    }

    pub fn rules(&self) -> &[DefaultRule] {
        self.rules
    }

    pub fn default_for(&self, field: &str) -> DefaultValue {
        self.rules
            .iter()
            .find(|rule| rule.field == field)
            .map(|rule| rule.value)
            .unwrap_or(self.fallback)
    }
}

/// One complete model input: exactly the feature-order fields, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureRow(Map<String, Value>);

impl FeatureRow {
    /// Takes each field from `raw` when present, otherwise from `policy`.
    /// Fields of `raw` outside the feature order are dropped.
    pub fn assemble(
        order: &FeatureOrder,
        raw: &Map<String, Value>,
        policy: &DefaultPolicy,
    ) -> Self {
        let mut row = Map::new();
        for field in order.names() {
            let value = match raw.get(field) {
                Some(value) => value.clone(),
                None => policy.default_for(field).to_json(),
            };
            row.insert(field.clone(), value);
        }
        FeatureRow(row)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn order() -> FeatureOrder {
        FeatureOrder::new(
            ["id", "date", "country", "occupation", "age", "gender", "smoke"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
        .unwrap()
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn policy_table_covers_named_fields() {
        let policy = DefaultPolicy::standard();
        assert_eq!(policy.default_for("date"), DefaultValue::Text("2025-01-01"));
        assert_eq!(policy.default_for("country"), DefaultValue::Text("unknown"));
        assert_eq!(policy.default_for("occupation"), DefaultValue::Text("unknown"));
        assert_eq!(policy.default_for("cholesterol"), DefaultValue::Number(0));
        assert_eq!(policy.default_for("Date"), DefaultValue::Number(0));
        assert_eq!(policy.rules().len(), 3);
    }

    #[test]
    fn empty_request_is_all_defaults() {
        let row = FeatureRow::assemble(&order(), &Map::new(), &DefaultPolicy::standard());
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            json!({
                "id": 0,
                "date": "2025-01-01",
                "country": "unknown",
                "occupation": "unknown",
                "age": 0,
                "gender": 0,
                "smoke": 0
            })
        );
    }

    #[test]
    fn row_follows_feature_order_and_drops_extras() {
        let raw = object(json!({
            "smoke": 1,
            "nickname": "bob",
            "age": "45",
            "country": "India"
        }));
        let row = FeatureRow::assemble(&order(), &raw, &DefaultPolicy::standard());

        let keys: Vec<&str> = row.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, order().names().iter().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(row.get("age"), Some(&json!("45")));
        assert_eq!(row.get("country"), Some(&json!("India")));
        assert_eq!(row.get("occupation"), Some(&json!("unknown")));
        assert!(row.get("nickname").is_none());
    }

    #[test]
    fn present_null_is_passed_through() {
        let raw = object(json!({ "date": null }));
        let row = FeatureRow::assemble(&order(), &raw, &DefaultPolicy::standard());
        assert_eq!(row.get("date"), Some(&Value::Null));
    }

    #[test]
    fn rejects_empty_and_duplicate_orders() {
        assert!(matches!(FeatureOrder::new(vec![]), Err(LoadError::EmptyFeatureOrder)));
        assert!(matches!(
            FeatureOrder::new(vec!["age".into(), "age".into()]),
            Err(LoadError::DuplicateFeature(name)) if name == "age"
        ));
    }

    #[test]
    fn loads_order_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"["age", "gender", "date"]"#).unwrap();

        let order = FeatureOrder::load(file.path()).unwrap();
        assert_eq!(order.names(), ["age", "gender", "date"]);
        assert!(order.contains("gender"));
        assert!(!order.contains("weight"));
    }

    #[test]
    fn load_rejects_non_list() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"age": 0}}"#).unwrap();
        assert!(matches!(FeatureOrder::load(file.path()), Err(LoadError::Json { .. })));

        let missing = file.path().with_extension("missing");
        assert!(matches!(FeatureOrder::load(missing), Err(LoadError::Io { .. })));
    }
}
