use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDateTime;

/// Wire format of `dateTime.iso8601` values.
pub const DATETIME_FORMAT: &str = "%Y%m%dT%H:%M:%S";

/// A single XML-RPC value.
///
/// Integers are widened to `i64` regardless of whether the peer sent `<int>`, `<i4>` or
/// `<i8>`. Structs keep their members ordered by name, which makes encoded output stable.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Double(f64),
    String(String),
    DateTime(NaiveDateTime),
    Base64(Vec<u8>),
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
    Nil,
}

impl Value {
    /// Build an array value from anything convertible into values.
    pub fn array<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    /// Build a struct value from `(name, value)` pairs.
    pub fn structure<I, K, T>(members: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Into<Value>,
    {
        Value::Struct(
            members
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// XML-RPC type name of this value, as it appears on the wire.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Bool(_) => "boolean",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::DateTime(_) => "dateTime.iso8601",
            Value::Base64(_) => "base64",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
            Value::Nil => "nil",
        }
    }

    /// `true` for arrays and structs, the two compound shapes a server can return.
    #[must_use]
    pub fn is_array_like(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Struct(_))
    }

    /// `true` for numbers and for strings holding a plain decimal number such as `"42"` or
    /// `" -1.5e3"`.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        match self {
            Value::Int(_) | Value::Double(_) => true,
            Value::String(s) => is_numeric_str(s),
            _ => false,
        }
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_struct(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Struct(v) => Some(v),
            _ => None,
        }
    }

    /// Member lookup on a struct; `None` for any other shape.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_struct().and_then(|members| members.get(key))
    }

    /// Lossy conversion to JSON, used for display.
    ///
    /// Datetimes become wire-format strings, binary data becomes standard base64 and
    /// non-finite doubles become `null`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Int(v) => serde_json::Value::from(*v),
            Value::Bool(v) => serde_json::Value::Bool(*v),
            Value::Double(v) => serde_json::Number::from_f64(*v)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(v) => serde_json::Value::String(v.clone()),
            Value::DateTime(v) => {
                serde_json::Value::String(v.format(DATETIME_FORMAT).to_string())
            }
            Value::Base64(v) => serde_json::Value::String(STANDARD.encode(v)),
            Value::Array(items) => items.iter().map(Value::to_json).collect(),
            Value::Struct(members) => serde_json::Value::Object(
                members
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Nil => serde_json::Value::Null,
        }
    }
}

fn is_numeric_str(s: &str) -> bool {
    let trimmed = s.trim();
    !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        && trimmed.parse::<f64>().is_ok()
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::String(v.clone())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::array(v)
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(v: [T; N]) -> Self {
        Value::array(v)
    }
}

impl<T: Into<Value>> From<BTreeMap<String, T>> for Value {
    fn from(v: BTreeMap<String, T>) -> Self {
        Value::structure(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Nil, Into::into)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::Array(iter.into_iter().collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Nil, Value::Double),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => items.into_iter().map(Value::from).collect(),
            serde_json::Value::Object(members) => Value::Struct(
                members
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_strings_follow_plain_decimal_rules() {
        assert!(Value::from("42").is_numeric());
        assert!(Value::from(" -1.5e3 ").is_numeric());
        assert!(Value::from(7).is_numeric());
        assert!(!Value::from("inf").is_numeric());
        assert!(!Value::from("NaN").is_numeric());
        assert!(!Value::from("12abc").is_numeric());
        assert!(!Value::from("").is_numeric());
        assert!(!Value::array([1]).is_numeric());
    }

    #[test]
    fn array_like_covers_arrays_and_structs_only() {
        assert!(Value::array(Vec::<Value>::new()).is_array_like());
        assert!(Value::structure([("a", 1)]).is_array_like());
        assert!(!Value::Int(1).is_array_like());
        assert!(!Value::Nil.is_array_like());
    }

    #[test]
    fn json_conversion_maps_shapes() {
        let v = Value::from(json!({"name": "Bob", "ids": [1, 2], "ratio": 0.5, "x": null}));
        assert_eq!(v.get("name"), Some(&Value::from("Bob")));
        assert_eq!(v.get("ids"), Some(&Value::array([1, 2])));
        assert_eq!(v.get("ratio"), Some(&Value::Double(0.5)));
        assert_eq!(v.get("x"), Some(&Value::Nil));

        assert_eq!(
            v.to_json(),
            json!({"name": "Bob", "ids": [1, 2], "ratio": 0.5, "x": null})
        );
    }

    #[test]
    fn option_none_is_nil() {
        assert_eq!(Value::from(None::<i64>), Value::Nil);
        assert_eq!(Value::from(Some("a")), Value::from("a"));
    }
}
