//! Scalar values and runtime coercion.
//!
//! The bridge between loosely-typed wire scalars (JSON booleans,
//! numbers, strings) and the strongly-typed values the metadata layer
//! traffics in. Design goals:
//! - One closed [`ScalarKind`] set; anything else is not a scalar.
//! - Kind and nullability are facts of the Rust type, decided at
//!   compile time through [`ApiScalar`] associated consts.
//! - Coercions are explicit and fallible; nothing widens silently
//!   except the lossless numeric directions.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use once_cell::sync::Lazy;
use ordered_float::OrderedFloat;

use crate::error::{Error, Result};

/// The closed set of scalar kinds the document schema traffics in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    String,
    Int,
    Uint,
    Float,
    DateTime,
}

impl ScalarKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::String => "string",
            ScalarKind::Int => "int",
            ScalarKind::Uint => "uint",
            ScalarKind::Float => "float",
            ScalarKind::DateTime => "datetime",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ScalarKind::Int | ScalarKind::Uint | ScalarKind::Float)
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, ScalarKind::DateTime)
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed scalar value.
///
/// Floats ride in [`OrderedFloat`] so the whole enum is `Eq`/`Hash` and
/// DOM structural equality stays derivable.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScalarValue {
    Bool(bool),
    String(String),
    Int(i64),
    Uint(u64),
    Float(OrderedFloat<f64>),
    DateTime(DateTime<FixedOffset>),
}

static EPOCH: Lazy<DateTime<FixedOffset>> = Lazy::new(|| {
    DateTime::from_timestamp(0, 0)
        .expect("epoch timestamp is representable")
        .fixed_offset()
});

impl ScalarValue {
    pub fn kind(&self) -> ScalarKind {
        match self {
            ScalarValue::Bool(_) => ScalarKind::Bool,
            ScalarValue::String(_) => ScalarKind::String,
            ScalarValue::Int(_) => ScalarKind::Int,
            ScalarValue::Uint(_) => ScalarKind::Uint,
            ScalarValue::Float(_) => ScalarKind::Float,
            ScalarValue::DateTime(_) => ScalarKind::DateTime,
        }
    }

    pub fn float(value: f64) -> Self {
        ScalarValue::Float(OrderedFloat(value))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Canonical text form. Datetimes render RFC 3339.
    pub fn format(&self) -> String {
        match self {
            ScalarValue::Bool(b) => b.to_string(),
            ScalarValue::String(s) => s.clone(),
            ScalarValue::Int(i) => i.to_string(),
            ScalarValue::Uint(u) => u.to_string(),
            ScalarValue::Float(f) => f.0.to_string(),
            ScalarValue::DateTime(dt) => dt.to_rfc3339(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ScalarValue::Bool(b) => serde_json::Value::from(*b),
            ScalarValue::String(s) => serde_json::Value::from(s.clone()),
            ScalarValue::Int(i) => serde_json::Value::from(*i),
            ScalarValue::Uint(u) => serde_json::Value::from(*u),
            ScalarValue::Float(f) => serde_json::Value::from(f.0),
            ScalarValue::DateTime(dt) => serde_json::Value::from(dt.to_rfc3339()),
        }
    }
}

/// The "empty" sentinel for a kind: what a freshly constructed domain
/// object's id compares equal to before anyone assigned it.
pub fn default_scalar(kind: ScalarKind) -> ScalarValue {
    match kind {
        ScalarKind::Bool => ScalarValue::Bool(false),
        ScalarKind::String => ScalarValue::String(String::new()),
        ScalarKind::Int => ScalarValue::Int(0),
        ScalarKind::Uint => ScalarValue::Uint(0),
        ScalarKind::Float => ScalarValue::float(0.0),
        ScalarKind::DateTime => ScalarValue::DateTime(*EPOCH),
    }
}

// ------------------------------ Coercion ---------------------------------- //

/// Whether `coerce` can ever succeed for this pair of kinds.
pub fn can_coerce(from: ScalarKind, to: ScalarKind) -> bool {
    if from == to {
        return true;
    }
    match (from, to) {
        // every kind has a canonical text form, and text parses back
        (_, ScalarKind::String) | (ScalarKind::String, _) => true,
        (ScalarKind::Int, ScalarKind::Uint) | (ScalarKind::Uint, ScalarKind::Int) => true,
        (ScalarKind::Int, ScalarKind::Float) | (ScalarKind::Uint, ScalarKind::Float) => true,
        (ScalarKind::Float, ScalarKind::Int) | (ScalarKind::Float, ScalarKind::Uint) => true,
        _ => false,
    }
}

/// Convert `value` to the requested kind.
///
/// Numeric directions are range-checked; float to integer requires an
/// integral value; strings parse via [`parse_scalar`].
pub fn coerce(value: &ScalarValue, to: ScalarKind) -> Result<ScalarValue> {
    let from = value.kind();
    if from == to {
        return Ok(value.clone());
    }
    let fail = |detail: String| Error::Coerce { from, to, detail };

    match (value, to) {
        (_, ScalarKind::String) => Ok(ScalarValue::String(value.format())),
        (ScalarValue::String(s), _) => parse_scalar(s, to),

        (ScalarValue::Int(i), ScalarKind::Uint) => u64::try_from(*i)
            .map(ScalarValue::Uint)
            .map_err(|_| fail(format!("{i} is negative"))),
        (ScalarValue::Uint(u), ScalarKind::Int) => i64::try_from(*u)
            .map(ScalarValue::Int)
            .map_err(|_| fail(format!("{u} exceeds i64::MAX"))),
        (ScalarValue::Int(i), ScalarKind::Float) => Ok(ScalarValue::float(*i as f64)),
        (ScalarValue::Uint(u), ScalarKind::Float) => Ok(ScalarValue::float(*u as f64)),

        (ScalarValue::Float(f), ScalarKind::Int) => {
            let v = f.0;
            if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
                Ok(ScalarValue::Int(v as i64))
            } else {
                Err(fail(format!("{v} is not an integral i64")))
            }
        }
        (ScalarValue::Float(f), ScalarKind::Uint) => {
            let v = f.0;
            if v.is_finite() && v.fract() == 0.0 && v >= 0.0 && v <= u64::MAX as f64 {
                Ok(ScalarValue::Uint(v as u64))
            } else {
                Err(fail(format!("{v} is not an integral u64")))
            }
        }

        _ => Err(fail("no conversion between these kinds".into())),
    }
}

/// Parse canonical text into the requested kind.
pub fn parse_scalar(text: &str, kind: ScalarKind) -> Result<ScalarValue> {
    let fail = || Error::Parse {
        text: text.to_owned(),
        kind,
    };
    match kind {
        ScalarKind::Bool => match text {
            "true" => Ok(ScalarValue::Bool(true)),
            "false" => Ok(ScalarValue::Bool(false)),
            _ => Err(fail()),
        },
        ScalarKind::String => Ok(ScalarValue::String(text.to_owned())),
        ScalarKind::Int => text.parse().map(ScalarValue::Int).map_err(|_| fail()),
        ScalarKind::Uint => text.parse().map(ScalarValue::Uint).map_err(|_| fail()),
        ScalarKind::Float => text
            .parse()
            .map(ScalarValue::float)
            .map_err(|_| fail()),
        ScalarKind::DateTime => parse_datetime(text)
            .map(ScalarValue::DateTime)
            .ok_or_else(fail),
    }
}

/// RFC 3339 first; bare (offset-less) timestamps are taken as UTC.
fn parse_datetime(text: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt);
    }
    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Some(naive.and_utc().fixed_offset())
}

// ------------------------------ ApiScalar --------------------------------- //

/// A Rust type that maps onto exactly one scalar kind.
///
/// `KIND` and `NULLABLE` are the per-type facts the value layer needs
/// when deciding null-vs-value emission; `Option<T>` is the nullable
/// instantiation of `T`.
pub trait ApiScalar: Sized {
    const KIND: ScalarKind;
    const NULLABLE: bool = false;

    fn into_scalar(self) -> Option<ScalarValue>;
    fn from_scalar(value: ScalarValue) -> Option<Self>;

    /// What an explicit null decodes to; `None` means "not accepted".
    fn from_null() -> Option<Self> {
        None
    }
}

impl ApiScalar for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    fn into_scalar(self) -> Option<ScalarValue> {
        Some(ScalarValue::Bool(self))
    }

    fn from_scalar(value: ScalarValue) -> Option<Self> {
        match coerce(&value, Self::KIND).ok()? {
            ScalarValue::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl ApiScalar for i64 {
    const KIND: ScalarKind = ScalarKind::Int;

    fn into_scalar(self) -> Option<ScalarValue> {
        Some(ScalarValue::Int(self))
    }

    fn from_scalar(value: ScalarValue) -> Option<Self> {
        match coerce(&value, Self::KIND).ok()? {
            ScalarValue::Int(i) => Some(i),
            _ => None,
        }
    }
}

impl ApiScalar for u64 {
    const KIND: ScalarKind = ScalarKind::Uint;

    fn into_scalar(self) -> Option<ScalarValue> {
        Some(ScalarValue::Uint(self))
    }

    fn from_scalar(value: ScalarValue) -> Option<Self> {
        match coerce(&value, Self::KIND).ok()? {
            ScalarValue::Uint(u) => Some(u),
            _ => None,
        }
    }
}

impl ApiScalar for f64 {
    const KIND: ScalarKind = ScalarKind::Float;

    fn into_scalar(self) -> Option<ScalarValue> {
        Some(ScalarValue::float(self))
    }

    fn from_scalar(value: ScalarValue) -> Option<Self> {
        match coerce(&value, Self::KIND).ok()? {
            ScalarValue::Float(f) => Some(f.0),
            _ => None,
        }
    }
}

impl ApiScalar for String {
    const KIND: ScalarKind = ScalarKind::String;

    fn into_scalar(self) -> Option<ScalarValue> {
        Some(ScalarValue::String(self))
    }

    fn from_scalar(value: ScalarValue) -> Option<Self> {
        match coerce(&value, Self::KIND).ok()? {
            ScalarValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl ApiScalar for DateTime<FixedOffset> {
    const KIND: ScalarKind = ScalarKind::DateTime;

    fn into_scalar(self) -> Option<ScalarValue> {
        Some(ScalarValue::DateTime(self))
    }

    fn from_scalar(value: ScalarValue) -> Option<Self> {
        match coerce(&value, Self::KIND).ok()? {
            ScalarValue::DateTime(dt) => Some(dt),
            _ => None,
        }
    }
}

impl ApiScalar for NaiveDateTime {
    const KIND: ScalarKind = ScalarKind::DateTime;

    fn into_scalar(self) -> Option<ScalarValue> {
        Some(ScalarValue::DateTime(self.and_utc().fixed_offset()))
    }

    fn from_scalar(value: ScalarValue) -> Option<Self> {
        match coerce(&value, Self::KIND).ok()? {
            ScalarValue::DateTime(dt) => Some(dt.naive_utc()),
            _ => None,
        }
    }
}

impl<T: ApiScalar> ApiScalar for Option<T> {
    const KIND: ScalarKind = T::KIND;
    const NULLABLE: bool = true;

    fn into_scalar(self) -> Option<ScalarValue> {
        self.and_then(T::into_scalar)
    }

    fn from_scalar(value: ScalarValue) -> Option<Self> {
        T::from_scalar(value).map(Some)
    }

    fn from_null() -> Option<Self> {
        Some(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nullable_is_a_fact_of_the_type() {
        assert!(!<i64 as ApiScalar>::NULLABLE);
        assert!(<Option<i64> as ApiScalar>::NULLABLE);
        assert_eq!(<Option<i64> as ApiScalar>::KIND, ScalarKind::Int);
    }

    #[test]
    fn string_round_trips_every_kind() {
        let values = [
            ScalarValue::Bool(true),
            ScalarValue::Int(-7),
            ScalarValue::Uint(7),
            ScalarValue::float(2.5),
            parse_scalar("2024-05-01T12:30:00+02:00", ScalarKind::DateTime).unwrap(),
        ];
        for v in values {
            let text = coerce(&v, ScalarKind::String).unwrap();
            let back = coerce(&text, v.kind()).unwrap();
            assert_eq!(back, v);
        }
    }

    #[test]
    fn float_to_int_requires_integral() {
        assert_eq!(
            coerce(&ScalarValue::float(3.0), ScalarKind::Int).unwrap(),
            ScalarValue::Int(3)
        );
        assert!(coerce(&ScalarValue::float(3.5), ScalarKind::Int).is_err());
        assert!(coerce(&ScalarValue::float(-1.0), ScalarKind::Uint).is_err());
    }

    #[test]
    fn negative_int_does_not_become_uint() {
        assert!(coerce(&ScalarValue::Int(-1), ScalarKind::Uint).is_err());
    }

    #[test]
    fn can_coerce_matches_the_conversion_table() {
        assert!(can_coerce(ScalarKind::Int, ScalarKind::Float));
        assert!(can_coerce(ScalarKind::DateTime, ScalarKind::String));
        assert!(can_coerce(ScalarKind::String, ScalarKind::DateTime));
        assert!(!can_coerce(ScalarKind::Bool, ScalarKind::Int));
        assert!(!can_coerce(ScalarKind::DateTime, ScalarKind::Float));
    }

    #[test]
    fn offsetless_datetime_is_utc() {
        let parsed = parse_scalar("2024-05-01T00:00:00", ScalarKind::DateTime).unwrap();
        let ScalarValue::DateTime(dt) = parsed else {
            panic!("expected datetime")
        };
        assert_eq!(dt.offset().local_minus_utc(), 0);
    }

    #[test]
    fn default_sentinels() {
        assert_eq!(default_scalar(ScalarKind::Int), ScalarValue::Int(0));
        assert_eq!(
            default_scalar(ScalarKind::String),
            ScalarValue::String(String::new())
        );
    }

    #[test]
    fn option_scalar_accepts_null() {
        assert_eq!(<Option<i64> as ApiScalar>::from_null(), Some(None));
        assert_eq!(<i64 as ApiScalar>::from_null(), None);
    }
}
