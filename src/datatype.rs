// used for persistence
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};

// used for decimal numbers
use bigdecimal::BigDecimal;
// used for the JSON boundary
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

// used when parsing text cells into numbers
use std::str::FromStr;
// used to print out readable forms of a data type
use std::fmt;

use crate::error::{Error, Result};

/// A scalar that can sit inside a [`Null`] wrapper.
///
/// `convert` is only ever handed non-null cells, `storage_value` is only
/// asked for when the wrapper is valid.
pub trait Scalar:
    fmt::Debug + fmt::Display + Clone + Default + PartialEq + Serialize + DeserializeOwned
{
    const DATA_TYPE: &'static str;
    fn convert(value: &ValueRef) -> Result<Self>;
    fn storage_value(&self) -> Value;
    /// Rejects values JSON cannot represent.
    fn check_json(&self) -> Result<()> {
        Ok(())
    }
}

// ------------- Scalars --------------
impl Scalar for i64 {
    const DATA_TYPE: &'static str = "i64";
    fn convert(value: &ValueRef) -> Result<i64> {
        match *value {
            ValueRef::Integer(i) => Ok(i),
            ValueRef::Real(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                Ok(f as i64)
            }
            ValueRef::Text(_) | ValueRef::Blob(_) => {
                let s = text(value, Self::DATA_TYPE)?;
                s.parse::<i64>()
                    .map_err(|e| Error::conversion(Self::DATA_TYPE, format!("{s:?} ({e})")))
            }
            other => Err(unsupported(&other, Self::DATA_TYPE)),
        }
    }
    fn storage_value(&self) -> Value {
        Value::Integer(*self)
    }
}
impl Scalar for f64 {
    const DATA_TYPE: &'static str = "f64";
    fn convert(value: &ValueRef) -> Result<f64> {
        match *value {
            ValueRef::Integer(i) => Ok(i as f64),
            ValueRef::Real(f) => Ok(f),
            ValueRef::Text(_) | ValueRef::Blob(_) => {
                let s = text(value, Self::DATA_TYPE)?;
                s.parse::<f64>()
                    .map_err(|e| Error::conversion(Self::DATA_TYPE, format!("{s:?} ({e})")))
            }
            other => Err(unsupported(&other, Self::DATA_TYPE)),
        }
    }
    fn storage_value(&self) -> Value {
        Value::Real(*self)
    }
    fn check_json(&self) -> Result<()> {
        if self.is_finite() {
            Ok(())
        } else {
            Err(Error::conversion("JSON number", self.to_string()))
        }
    }
}
impl Scalar for bool {
    const DATA_TYPE: &'static str = "bool";
    fn convert(value: &ValueRef) -> Result<bool> {
        match *value {
            ValueRef::Integer(1) => Ok(true),
            ValueRef::Integer(0) => Ok(false),
            ValueRef::Text(_) | ValueRef::Blob(_) => {
                let s = text(value, Self::DATA_TYPE)?;
                match s {
                    "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
                    "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
                    _ => Err(Error::conversion(Self::DATA_TYPE, format!("{s:?}"))),
                }
            }
            other => Err(unsupported(&other, Self::DATA_TYPE)),
        }
    }
    fn storage_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }
}
impl Scalar for String {
    const DATA_TYPE: &'static str = "String";
    fn convert(value: &ValueRef) -> Result<String> {
        match *value {
            ValueRef::Integer(i) => Ok(i.to_string()),
            ValueRef::Real(f) => Ok(f.to_string()),
            ValueRef::Text(_) | ValueRef::Blob(_) => Ok(text(value, Self::DATA_TYPE)?.to_string()),
            other => Err(unsupported(&other, Self::DATA_TYPE)),
        }
    }
    fn storage_value(&self) -> Value {
        Value::Text(self.clone())
    }
}
impl Scalar for BigDecimal {
    const DATA_TYPE: &'static str = "Decimal";
    fn convert(value: &ValueRef) -> Result<BigDecimal> {
        match *value {
            ValueRef::Integer(i) => Ok(BigDecimal::from(i)),
            ValueRef::Real(f) => BigDecimal::from_str(&f.to_string())
                .map_err(|e| Error::conversion(Self::DATA_TYPE, format!("{f} ({e})"))),
            // decimals arrive as raw bytes which have to be ASCII digits
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                if !bytes.is_ascii() {
                    return Err(Error::conversion(Self::DATA_TYPE, "non-ASCII bytes"));
                }
                let s = text(value, Self::DATA_TYPE)?;
                BigDecimal::from_str(s)
                    .map_err(|e| Error::conversion(Self::DATA_TYPE, format!("{s:?} ({e})")))
            }
            other => Err(unsupported(&other, Self::DATA_TYPE)),
        }
    }
    fn storage_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

fn text<'a>(value: &ValueRef<'a>, target: &'static str) -> Result<&'a str> {
    match *value {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => std::str::from_utf8(bytes)
            .map_err(|e| Error::conversion(target, format!("invalid UTF-8 ({e})"))),
        other => Err(unsupported(&other, target)),
    }
}

pub(crate) fn unsupported(value: &ValueRef, target: &'static str) -> Error {
    Error::conversion(target, format!("a {} cell", value.data_type()))
}

// ------------- Nullable wrapper --------------

/// A value paired with a validity flag.
///
/// An invalid `Null` always holds the zero value of `T`, and both the
/// database and the JSON boundary see it as NULL.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Null<T> {
    value: T,
    valid: bool,
}

pub type NullInt64 = Null<i64>;
pub type NullFloat64 = Null<f64>;
pub type NullBool = Null<bool>;
pub type NullString = Null<String>;
pub type NullDecimal = Null<BigDecimal>;

impl<T: Scalar> Null<T> {
    pub fn new(value: T) -> Self {
        Self { value, valid: true }
    }
    pub fn null() -> Self {
        Self {
            value: T::default(),
            valid: false,
        }
    }
    pub fn value(&self) -> &T {
        &self.value
    }
    pub fn is_valid(&self) -> bool {
        self.valid
    }
    pub fn as_option(&self) -> Option<&T> {
        self.valid.then_some(&self.value)
    }
    pub fn into_option(self) -> Option<T> {
        self.valid.then_some(self.value)
    }
    /// Reads a database cell. NULL is not an error, it leaves the value invalid.
    pub fn scan(&mut self, raw: ValueRef<'_>) -> Result<()> {
        if let ValueRef::Null = raw {
            *self = Self::null();
            return Ok(());
        }
        match T::convert(&raw) {
            Ok(value) => {
                *self = Self::new(value);
                Ok(())
            }
            Err(e) => {
                warn!(data_type = T::DATA_TYPE, error = %e, "could not scan value");
                *self = Self::null();
                Err(e)
            }
        }
    }
    pub fn to_storage_value(&self) -> Value {
        if self.valid {
            self.value.storage_value()
        } else {
            Value::Null
        }
    }
    /// `null` when invalid. A valid value JSON cannot hold, such as NaN, is
    /// an error rather than `null`.
    pub fn marshal_json(&self) -> Result<String> {
        if let Some(value) = self.as_option() {
            value.check_json().map_err(|e| {
                warn!(data_type = T::DATA_TYPE, error = %e, "could not marshal JSON");
                e
            })?;
        }
        Ok(serde_json::to_string(self)?)
    }
    pub fn unmarshal_json(&mut self, bytes: &[u8]) -> Result<()> {
        match serde_json::from_slice::<Self>(bytes) {
            Ok(decoded) => {
                *self = decoded;
                Ok(())
            }
            Err(e) => {
                warn!(data_type = T::DATA_TYPE, error = %e, "could not unmarshal JSON");
                *self = Self::null();
                Err(e.into())
            }
        }
    }
}

impl<T: Scalar> From<Option<T>> for Null<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::new(v),
            None => Self::null(),
        }
    }
}
impl<T: Scalar> From<Null<T>> for Option<T> {
    fn from(value: Null<T>) -> Self {
        value.into_option()
    }
}
impl<T: Scalar> fmt::Display for Null<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.as_option() {
            Some(v) => write!(f, "{}", v),
            None => write!(f, "NULL"),
        }
    }
}
impl<T: Scalar> ToSql for Null<T> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(self.to_storage_value()))
    }
}
impl<T: Scalar> FromSql for Null<T> {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let mut scanned = Self::null();
        scanned
            .scan(value)
            .map_err(|e| FromSqlError::Other(Box::new(e)))?;
        Ok(scanned)
    }
}
impl<T: Scalar> Serialize for Null<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if let Some(value) = self.as_option() {
            value.check_json().map_err(serde::ser::Error::custom)?;
        }
        self.as_option().serialize(serializer)
    }
}
impl<'de, T: Scalar> Deserialize<'de> for Null<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Self::from)
    }
}
