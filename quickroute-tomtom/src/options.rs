//! Search tuning options: validation of loosely-typed input and defaulting.
//!
//! Numeric options follow "zero or absent means default": an explicit `0`
//! for `limit` or a fuzzy level is replaced by the default rather than sent.
//! Any other JSON number is accepted as given and forwarded to the provider,
//! which owns range checking.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

pub const DEFAULT_LIMIT: f64 = 5.0;
pub const DEFAULT_MIN_FUZZY_LEVEL: f64 = 1.0;
pub const DEFAULT_MAX_FUZZY_LEVEL: f64 = 2.0;

const GEO_BIAS: &str = "geoBias";

/// Recognised counter options and their defaults, in wire order.
const COUNT_FIELDS: &[(&str, f64)] = &[
    ("limit", DEFAULT_LIMIT),
    ("minFuzzyLevel", DEFAULT_MIN_FUZZY_LEVEL),
    ("maxFuzzyLevel", DEFAULT_MAX_FUZZY_LEVEL),
];

/// A point used to rank nearby results higher. Not range-checked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoBias {
    pub lat: f64,
    pub lon: f64,
}

/// Fully-defaulted search options.
///
/// ```
/// use quickroute_tomtom::SearchOptions;
///
/// let opts = SearchOptions::default().with_limit(10).with_geo_bias(-37.8136, 144.9631);
/// assert_eq!(opts.limit(), 10.0);
/// assert_eq!(opts.min_fuzzy_level(), 1.0);
/// assert_eq!(opts.max_fuzzy_level(), 2.0);
///
/// // zero falls back to the default
/// assert_eq!(SearchOptions::default().with_limit(0).limit(), 5.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    limit: f64,
    min_fuzzy_level: f64,
    max_fuzzy_level: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    geo_bias: Option<GeoBias>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            min_fuzzy_level: DEFAULT_MIN_FUZZY_LEVEL,
            max_fuzzy_level: DEFAULT_MAX_FUZZY_LEVEL,
            geo_bias: None,
        }
    }
}

fn or_default(value: f64, default: f64) -> f64 {
    if value == 0.0 { default } else { value }
}

impl SearchOptions {
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = or_default(f64::from(limit), DEFAULT_LIMIT);
        self
    }

    pub fn with_fuzzy_levels(mut self, min: u32, max: u32) -> Self {
        self.min_fuzzy_level = or_default(f64::from(min), DEFAULT_MIN_FUZZY_LEVEL);
        self.max_fuzzy_level = or_default(f64::from(max), DEFAULT_MAX_FUZZY_LEVEL);
        self
    }

    pub fn with_geo_bias(mut self, lat: f64, lon: f64) -> Self {
        self.geo_bias = Some(GeoBias { lat, lon });
        self
    }

    pub fn limit(&self) -> f64 {
        self.limit
    }

    pub fn min_fuzzy_level(&self) -> f64 {
        self.min_fuzzy_level
    }

    pub fn max_fuzzy_level(&self) -> f64 {
        self.max_fuzzy_level
    }

    pub fn geo_bias(&self) -> Option<GeoBias> {
        self.geo_bias
    }

    /// Validate a loosely-typed options object and apply defaults.
    ///
    /// Every recognised field is checked and all problems are reported
    /// together. Unknown fields are ignored; `null` counts as absent.
    ///
    /// ```
    /// use quickroute_tomtom::{IssueKind, SearchOptions};
    /// use serde_json::json;
    ///
    /// let opts = SearchOptions::from_value(&json!({ "limit": 10 })).unwrap();
    /// assert_eq!(opts.limit(), 10.0);
    ///
    /// let err = SearchOptions::from_value(&json!({ "limit": "ten" })).unwrap_err();
    /// assert_eq!(err.issues[0].path, vec!["limit"]);
    /// assert_eq!(err.issues[0].kind, IssueKind::InvalidType);
    /// ```
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let empty = Map::new();
        let obj = match value {
            Value::Null => &empty,
            Value::Object(obj) => obj,
            other => {
                return Err(ValidationError {
                    issues: vec![ValidationIssue::new(
                        &[],
                        IssueKind::InvalidShape,
                        "object",
                        json_type_name(other),
                    )],
                });
            }
        };

        let mut issues = Vec::new();
        let mut counts = [0.0f64; 3];
        for (slot, (name, default)) in counts.iter_mut().zip(COUNT_FIELDS) {
            *slot = match present(obj, name) {
                None => *default,
                Some(v) => match v.as_f64() {
                    Some(n) => or_default(n, *default),
                    None => {
                        issues.push(ValidationIssue::new(
                            &[*name],
                            IssueKind::InvalidType,
                            "number",
                            json_type_name(v),
                        ));
                        *default
                    }
                },
            };
        }

        let geo_bias = match present(obj, GEO_BIAS) {
            None => None,
            Some(v) => read_geo_bias(v, &mut issues),
        };

        if !issues.is_empty() {
            return Err(ValidationError { issues });
        }

        let [limit, min_fuzzy_level, max_fuzzy_level] = counts;
        Ok(Self {
            limit,
            min_fuzzy_level,
            max_fuzzy_level,
            geo_bias,
        })
    }
}

fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn read_geo_bias(v: &Value, issues: &mut Vec<ValidationIssue>) -> Option<GeoBias> {
    let Value::Object(point) = v else {
        issues.push(ValidationIssue::new(
            &[GEO_BIAS],
            IssueKind::InvalidType,
            "object",
            json_type_name(v),
        ));
        return None;
    };

    let mut coord = |key: &str| match present(point, key) {
        None => {
            issues.push(ValidationIssue::new(
                &[GEO_BIAS, key],
                IssueKind::MissingField,
                "number",
                "undefined",
            ));
            None
        }
        Some(Value::Number(n)) => n.as_f64(),
        Some(other) => {
            issues.push(ValidationIssue::new(
                &[GEO_BIAS, key],
                IssueKind::InvalidType,
                "number",
                json_type_name(other),
            ));
            None
        }
    };
    let lat = coord("lat");
    let lon = coord("lon");
    Some(GeoBias {
        lat: lat?,
        lon: lon?,
    })
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    InvalidType,
    InvalidShape,
    MissingField,
}

impl IssueKind {
    pub fn code(self) -> &'static str {
        match self {
            IssueKind::InvalidType => "invalid_type",
            IssueKind::InvalidShape => "invalid_shape",
            IssueKind::MissingField => "missing_field",
        }
    }
}

/// One offending field, addressed by its path from the options root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: Vec<String>,
    pub kind: IssueKind,
    pub expected: &'static str,
    pub received: &'static str,
    pub message: String,
}

impl ValidationIssue {
    fn new(path: &[&str], kind: IssueKind, expected: &'static str, received: &'static str) -> Self {
        Self {
            path: path.iter().map(|s| s.to_string()).collect(),
            kind,
            expected,
            received,
            message: "Invalid input".to_string(),
        }
    }

    /// Dotted path, or `<root>` for the options object itself.
    pub fn dotted_path(&self) -> String {
        if self.path.is_empty() {
            "<root>".to_string()
        } else {
            self.path.join(".")
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({}, expected {}, received {})",
            self.dotted_path(),
            self.message,
            self.kind.code(),
            self.expected,
            self.received
        )
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid search options: {}", join_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    /// First issue reported at `path`, if any.
    pub fn issue_at(&self, path: &[&str]) -> Option<&ValidationIssue> {
        self.issues.iter().find(|i| i.path == path)
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
