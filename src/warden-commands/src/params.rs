//! Typed parameter values.
//!
//! Requests arrive as loosely typed JSON and definitions declare parameter
//! types as strings. Both are turned into [`ParamValue`]s: caller values when
//! the request is decoded, declared defaults once when the definition is
//! loaded.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Kind of host definition a [`ParamValue::DefRef`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefKind {
    Thing,
    PawnKind,
}

/// A parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    /// Name of a host definition, looked up by the host when used.
    DefRef { kind: DefKind, name: String },
}

impl ParamValue {
    /// Convert a JSON value. `null` yields `None`; arrays and objects are
    /// kept as their JSON text.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Self::Int(i)),
                None => n.as_f64().map(Self::Float),
            },
            Value::String(s) => Some(Self::Text(s.clone())),
            other => Some(Self::Text(other.to_string())),
        }
    }

    /// Infer a value from raw text: integer, then float, then bool, else text.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return Self::Int(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return Self::Float(f);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => Self::Text(raw.to_string()),
        }
    }

    /// Integer view. Floats are rounded and numeric text is parsed.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.is_finite() => Some(f.round() as i64),
            Self::Float(_) => None,
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.round() as i64))
            }
            Self::DefRef { .. } => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Bool(_) | Self::DefRef { .. } => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(i) => Some(*i != 0),
            Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            Self::Float(_) | Self::DefRef { .. } => None,
        }
    }

    /// Definition name, for `DefRef` values and plain text.
    pub fn def_name(&self) -> Option<&str> {
        match self {
            Self::DefRef { name, .. } => Some(name),
            Self::Text(s) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(s) => f.write_str(s),
            Self::DefRef { name, .. } => f.write_str(name),
        }
    }
}

/// Declared parameter type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Int,
    Float,
    Bool,
    ThingDef,
    PawnKindDef,
    #[default]
    Text,
}

impl ParamKind {
    /// Parse a declared type name. Unknown names are treated as text.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => Self::Int,
            "float" | "double" | "number" => Self::Float,
            "bool" | "boolean" => Self::Bool,
            "thingdef" | "thing_def" => Self::ThingDef,
            "pawnkinddef" | "pawn_kind_def" => Self::PawnKindDef,
            _ => Self::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::ThingDef => "thing_def",
            Self::PawnKindDef => "pawn_kind_def",
            Self::Text => "string",
        }
    }

    /// Coerce a declared default. Unparseable numbers become zero and
    /// anything but `true` becomes `false`.
    pub fn coerce(&self, raw: &str) -> ParamValue {
        let trimmed = raw.trim();
        match self {
            Self::Int => ParamValue::Int(trimmed.parse().unwrap_or(0)),
            Self::Float => ParamValue::Float(trimmed.parse().unwrap_or(0.0)),
            Self::Bool => ParamValue::Bool(trimmed.eq_ignore_ascii_case("true")),
            Self::ThingDef => ParamValue::DefRef {
                kind: DefKind::Thing,
                name: trimmed.to_string(),
            },
            Self::PawnKindDef => ParamValue::DefRef {
                kind: DefKind::PawnKind,
                name: trimmed.to_string(),
            },
            Self::Text => ParamValue::Text(raw.to_string()),
        }
    }

    /// Convert a caller-supplied value to this kind, if it fits.
    pub fn convert(&self, value: &ParamValue) -> Option<ParamValue> {
        match self {
            Self::Int => value.as_int().map(ParamValue::Int),
            Self::Float => value.as_float().map(ParamValue::Float),
            Self::Bool => value.as_bool().map(ParamValue::Bool),
            Self::ThingDef => self.def_ref(value, DefKind::Thing),
            Self::PawnKindDef => self.def_ref(value, DefKind::PawnKind),
            Self::Text => Some(ParamValue::Text(value.to_string())),
        }
    }

    fn def_ref(&self, value: &ParamValue, kind: DefKind) -> Option<ParamValue> {
        match value {
            ParamValue::DefRef { kind: k, .. } if *k == kind => Some(value.clone()),
            ParamValue::DefRef { .. } => None,
            other => other.def_name().map(|name| ParamValue::DefRef {
                kind,
                name: name.to_string(),
            }),
        }
    }

    /// Value used when nothing else can be bound. Definition references
    /// have none.
    pub fn zero(&self) -> Option<ParamValue> {
        match self {
            Self::Int => Some(ParamValue::Int(0)),
            Self::Float => Some(ParamValue::Float(0.0)),
            Self::Bool => Some(ParamValue::Bool(false)),
            Self::Text => Some(ParamValue::Text(String::new())),
            Self::ThingDef | Self::PawnKindDef => None,
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named parameters passed to a command.
///
/// Lookups try the exact name first and then fall back to a
/// case-insensitive match.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Parameters {
    values: BTreeMap<String, ParamValue>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a request's JSON. Anything but an object yields no
    /// parameters; `null` members are dropped.
    pub fn from_json(value: Option<&Value>) -> Self {
        let Some(Value::Object(map)) = value else {
            return Self::default();
        };

        map.iter()
            .filter_map(|(k, v)| ParamValue::from_json(v).map(|v| (k.clone(), v)))
            .collect()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) -> Option<ParamValue> {
        self.values.insert(name.into(), value)
    }

    /// Insert `value` only when `name` has no value yet.
    pub fn fill_default(&mut self, name: &str, value: &ParamValue) {
        if !self.contains(name) {
            self.values.insert(name.to_string(), value.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name).or_else(|| {
            self.values
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ParamValue::as_int)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParamValue::as_float)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ParamValue::as_bool)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).map(ToString::to_string)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, ParamValue)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
