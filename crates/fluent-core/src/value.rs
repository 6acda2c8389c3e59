//! Column values and the row mapping every statement produces.
//!
//! A [`Row`] is an untyped bucket of `column -> Value`. Typed access happens
//! through [`FromValue`], which backends rely on to undo their storage
//! encoding (SQLite, for example, hands booleans back as integers and
//! timestamps back as RFC 3339 text).

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::schema::ColumnType;

/// One database row: column name to value.
pub type Row = BTreeMap<String, Value>;

/// A single column value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
  Null,
  Integer(i64),
  Real(f64),
  Text(String),
  Boolean(bool),
  Timestamp(DateTime<Utc>),
}

impl Value {
  pub fn is_null(&self) -> bool { matches!(self, Self::Null) }

  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Self::Integer(i) => Some(*i),
      Self::Boolean(b) => Some(i64::from(*b)),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Self::Text(s) => Some(s),
      _ => None,
    }
  }

  /// Accepts native timestamps and RFC 3339 text.
  pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
    match self {
      Self::Timestamp(dt) => Some(*dt),
      Self::Text(s) => DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc)),
      _ => None,
    }
  }

  /// Canonical string used to group rows by key value during eager loading.
  ///
  /// Integer-valued text and integers compare equal here, since pivot
  /// columns are not always declared with the same affinity as the keys they
  /// point at.
  pub(crate) fn group_key(&self) -> Option<String> {
    match self {
      Self::Null => None,
      Self::Integer(i) => Some(i.to_string()),
      Self::Boolean(b) => Some(i64::from(*b).to_string()),
      Self::Real(f) => Some(f.to_string()),
      Self::Text(s) => Some(s.clone()),
      Self::Timestamp(dt) => Some(dt.to_rfc3339()),
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Null => f.write_str("NULL"),
      Self::Integer(i) => write!(f, "{i}"),
      Self::Real(r) => write!(f, "{r}"),
      Self::Text(s) => write!(f, "{s:?}"),
      Self::Boolean(b) => write!(f, "{b}"),
      Self::Timestamp(dt) => write!(f, "{}", dt.to_rfc3339()),
    }
  }
}

// ─── Conversions into Value ──────────────────────────────────────────────────

impl From<i64> for Value {
  fn from(v: i64) -> Self { Self::Integer(v) }
}

impl From<i32> for Value {
  fn from(v: i32) -> Self { Self::Integer(i64::from(v)) }
}

impl From<f64> for Value {
  fn from(v: f64) -> Self { Self::Real(v) }
}

impl From<bool> for Value {
  fn from(v: bool) -> Self { Self::Boolean(v) }
}

impl From<String> for Value {
  fn from(v: String) -> Self { Self::Text(v) }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self { Self::Text(v.to_owned()) }
}

impl From<DateTime<Utc>> for Value {
  fn from(v: DateTime<Utc>) -> Self { Self::Timestamp(v) }
}

impl From<serde_json::Value> for Value {
  fn from(v: serde_json::Value) -> Self { Self::Text(v.to_string()) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(v: Option<T>) -> Self { v.map_or(Self::Null, Into::into) }
}

// ─── Typed projection ────────────────────────────────────────────────────────

/// A Rust type a column value can be projected into.
///
/// `accepts` is checked once, when an [`Accessor`](crate::model::Accessor) is
/// built against a model definition; `from_value` runs on every read.
pub trait FromValue: Sized {
  /// Whether a column declared with `ty` can be read as `Self`.
  fn accepts(ty: ColumnType) -> bool;

  fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for i64 {
  fn accepts(ty: ColumnType) -> bool {
    matches!(ty, ColumnType::Integer | ColumnType::BigInteger)
  }

  fn from_value(value: &Value) -> Option<Self> { value.as_i64() }
}

impl FromValue for f64 {
  fn accepts(ty: ColumnType) -> bool {
    matches!(
      ty,
      ColumnType::Real | ColumnType::Integer | ColumnType::BigInteger
    )
  }

  fn from_value(value: &Value) -> Option<Self> {
    match value {
      Value::Real(r) => Some(*r),
      Value::Integer(i) => Some(*i as f64),
      _ => None,
    }
  }
}

impl FromValue for bool {
  fn accepts(ty: ColumnType) -> bool { matches!(ty, ColumnType::Boolean) }

  fn from_value(value: &Value) -> Option<Self> {
    match value {
      Value::Boolean(b) => Some(*b),
      Value::Integer(0) => Some(false),
      Value::Integer(1) => Some(true),
      _ => None,
    }
  }
}

impl FromValue for String {
  fn accepts(ty: ColumnType) -> bool {
    matches!(
      ty,
      ColumnType::Text | ColumnType::String(_) | ColumnType::Json
    )
  }

  fn from_value(value: &Value) -> Option<Self> {
    value.as_str().map(str::to_owned)
  }
}

impl FromValue for DateTime<Utc> {
  fn accepts(ty: ColumnType) -> bool { matches!(ty, ColumnType::Timestamp) }

  fn from_value(value: &Value) -> Option<Self> { value.as_timestamp() }
}

impl FromValue for serde_json::Value {
  fn accepts(ty: ColumnType) -> bool { matches!(ty, ColumnType::Json) }

  fn from_value(value: &Value) -> Option<Self> {
    value.as_str().and_then(|s| serde_json::from_str(s).ok())
  }
}

impl<T: FromValue> FromValue for Option<T> {
  fn accepts(ty: ColumnType) -> bool { T::accepts(ty) }

  fn from_value(value: &Value) -> Option<Self> {
    if value.is_null() {
      Some(None)
    } else {
      T::from_value(value).map(Some)
    }
  }
}
