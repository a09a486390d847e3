//! Form submission to struct mapping.
//!
//! Every mappable type declares a [`FormSchema`] once: an ordered list of
//! fields, each with a `db` tag, an optional `form` tag and an accessor for
//! the struct field. The form key is the `form` tag when present, the `db`
//! tag otherwise, and a key of `-` leaves the field alone.
//!
//! ```
//! use lazy_static::lazy_static;
//! use sqlkit::datatype::NullString;
//! use sqlkit::form::{populate, FormSchema, FormValues, FromForm, Tags};
//!
//! #[derive(Default)]
//! struct Signup {
//!     email: NullString,
//!     age: i64,
//! }
//!
//! impl FromForm for Signup {
//!     fn form_schema() -> &'static FormSchema<Self> {
//!         lazy_static! {
//!             static ref SCHEMA: FormSchema<Signup> = FormSchema::new()
//!                 .field(Tags::db("email").form("userEmail"), |s: &mut Signup| &mut s.email)
//!                 .field(Tags::db("age"), |s: &mut Signup| &mut s.age);
//!         }
//!         &SCHEMA
//!     }
//! }
//!
//! let mut form = FormValues::new();
//! form.insert("userEmail".into(), vec!["ada@example.com".into()]);
//! let mut signup = Signup::default();
//! populate(&mut signup, &form, false, None).unwrap();
//! assert_eq!(signup.email.value(), "ada@example.com");
//! ```

use bigdecimal::BigDecimal;
use chrono_tz::Tz;
use tracing::{debug, trace};

use std::collections::HashMap;
use std::str::FromStr;

use crate::datatype::{Null, NullBool, NullDecimal, NullFloat64, NullInt64, NullString};
use crate::datetime::{parse_date_multi, NullTime, DEFAULT_ZONE};
use crate::error::Result;

/// Submitted form, every key with all of its values in submission order.
pub type FormValues = HashMap<String, Vec<String>>;

mod sealed {
    pub trait Sealed {}
}

/// A field type the mapper knows how to fill from a submitted string.
pub trait FormValue: sealed::Sealed + Sized {
    fn from_form(raw: &str, zone: Tz) -> Self;
    /// Value assigned when the key is missing and all keys are processed.
    fn absent() -> Self;
}

macro_rules! parsed_form_value {
    ($($ty:ty),+) => {
        $(
            impl sealed::Sealed for $ty {}
            impl FormValue for $ty {
                fn from_form(raw: &str, _zone: Tz) -> Self {
                    raw.trim().parse().unwrap_or_default()
                }
                fn absent() -> Self {
                    <$ty>::default()
                }
            }
        )+
    };
}

parsed_form_value!(i32, i64, f32, f64);

impl sealed::Sealed for String {}
impl FormValue for String {
    fn from_form(raw: &str, _zone: Tz) -> Self {
        raw.to_string()
    }
    fn absent() -> Self {
        String::new()
    }
}

impl sealed::Sealed for NullString {}
impl FormValue for NullString {
    fn from_form(raw: &str, _zone: Tz) -> Self {
        Null::new(raw.to_string())
    }
    fn absent() -> Self {
        Null::null()
    }
}

impl sealed::Sealed for NullInt64 {}
impl FormValue for NullInt64 {
    fn from_form(raw: &str, zone: Tz) -> Self {
        Null::new(i64::from_form(raw, zone))
    }
    fn absent() -> Self {
        Null::null()
    }
}

impl sealed::Sealed for NullFloat64 {}
impl FormValue for NullFloat64 {
    fn from_form(raw: &str, zone: Tz) -> Self {
        Null::new(f64::from_form(raw, zone))
    }
    fn absent() -> Self {
        Null::null()
    }
}

impl sealed::Sealed for NullBool {}
impl FormValue for NullBool {
    fn from_form(raw: &str, _zone: Tz) -> Self {
        Null::new(form_bool(raw))
    }
    fn absent() -> Self {
        Null::null()
    }
}

impl sealed::Sealed for NullDecimal {}
impl FormValue for NullDecimal {
    fn from_form(raw: &str, _zone: Tz) -> Self {
        Null::new(BigDecimal::from_str(raw.trim()).unwrap_or_default())
    }
    fn absent() -> Self {
        Null::null()
    }
}

impl sealed::Sealed for NullTime {}
impl FormValue for NullTime {
    fn from_form(raw: &str, zone: Tz) -> Self {
        match parse_date_multi(raw, zone) {
            Some(time) => NullTime::new(time, Some(zone)),
            None => NullTime::null().with_location(zone),
        }
    }
    fn absent() -> Self {
        NullTime::null()
    }
}

/// Checkbox style truthiness: `1`, `t`, `true`, `on`, `yes` and `y`.
pub fn form_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "t" | "true" | "on" | "yes" | "y"
    )
}

/// The `db` and `form` tags of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tags {
    db: &'static str,
    form: Option<&'static str>,
}

impl Tags {
    pub const fn db(name: &'static str) -> Self {
        Self {
            db: name,
            form: None,
        }
    }
    pub const fn form(self, name: &'static str) -> Self {
        Self {
            db: self.db,
            form: Some(name),
        }
    }
    /// The form key, `None` when the field is skipped.
    pub fn key(&self) -> Option<&'static str> {
        let key = match self.form {
            Some(form) if !form.is_empty() => form,
            _ => self.db,
        };
        (!key.is_empty() && key != "-").then_some(key)
    }
}

type Assign<T> = Box<dyn Fn(&mut T, Option<&str>, Tz) + Send + Sync>;

struct FormField<T> {
    tags: Tags,
    kind: &'static str,
    assign: Assign<T>,
}

/// Ordered field list of one struct type.
pub struct FormSchema<T> {
    fields: Vec<FormField<T>>,
}

impl<T: 'static> Default for FormSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> FormSchema<T> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }
    pub fn field<V: FormValue + 'static>(mut self, tags: Tags, access: fn(&mut T) -> &mut V) -> Self {
        self.fields.push(FormField {
            tags,
            kind: std::any::type_name::<V>(),
            assign: Box::new(move |target: &mut T, raw: Option<&str>, zone: Tz| {
                *access(target) = match raw {
                    Some(raw) => V::from_form(raw, zone),
                    None => V::absent(),
                };
            }),
        });
        self
    }
    /// Resolved form keys in declaration order, skipped fields left out.
    pub fn keys(&self) -> Vec<&'static str> {
        self.fields.iter().filter_map(|f| f.tags.key()).collect()
    }
    pub fn populate(
        &self,
        target: &mut T,
        form: &FormValues,
        process_all_keys: bool,
        location: Option<Tz>,
    ) -> Result<()> {
        let zone = location.unwrap_or(DEFAULT_ZONE);
        let mut populated = 0;
        for field in &self.fields {
            let Some(key) = field.tags.key() else {
                continue;
            };
            let raw = match form.get(key) {
                Some(values) => match values.first() {
                    Some(raw) => Some(raw.as_str()),
                    None => continue,
                },
                None if process_all_keys => None,
                None => continue,
            };
            trace!(key, kind = field.kind, present = raw.is_some(), "populating field");
            (field.assign)(target, raw, zone);
            populated += 1;
        }
        debug!(populated, fields = self.fields.len(), "populated struct from form");
        Ok(())
    }
}

/// A struct that can be filled from a submitted form.
pub trait FromForm: Sized + 'static {
    /// The schema of the type, built once.
    fn form_schema() -> &'static FormSchema<Self>;
}

/// Fills `destination` from `form`.
///
/// Keys missing from the form are skipped unless `process_all_keys` is set,
/// in which case their fields are reset to zero or NULL (unchecked
/// checkboxes send nothing). Timestamps are read in `location`, defaulting to
/// [`DEFAULT_ZONE`].
pub fn populate<T: FromForm>(
    destination: &mut T,
    form: &FormValues,
    process_all_keys: bool,
    location: Option<Tz>,
) -> Result<()> {
    T::form_schema().populate(destination, form, process_all_keys, location)
}
