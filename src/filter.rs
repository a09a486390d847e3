// used to validate field names before they are spliced into SQL
use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

lazy_static! {
    static ref IDENTIFIER: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl FromStr for Conjunction {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Self::And),
            "OR" => Ok(Self::Or),
            _ => Err(Error::Filter(format!("unknown conjunction {s:?}"))),
        }
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

/// One `field = value` clause. The conjunction joins it to the filter before
/// it and is ignored on the first filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub value: String,
    pub conjunction: Conjunction,
}

impl Filter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            conjunction: Conjunction::And,
        }
    }
    pub fn or(mut self) -> Self {
        self.conjunction = Conjunction::Or;
        self
    }
}

/// Builds a WHERE clause body with `?` placeholders and the values to bind,
/// in placeholder order.
pub fn prep_where(filters: &[Filter]) -> Result<(String, Vec<String>)> {
    let mut clause = String::new();
    let mut args = Vec::with_capacity(filters.len());
    for (i, filter) in filters.iter().enumerate() {
        if !IDENTIFIER.is_match(&filter.field) {
            warn!(field = %filter.field, "rejected filter field");
            return Err(Error::Filter(format!("invalid field name {:?}", filter.field)));
        }
        if i > 0 {
            clause.push_str(&format!(" {} ", filter.conjunction));
        }
        clause.push_str(&filter.field);
        clause.push_str(" = ?");
        args.push(filter.value.clone());
    }
    Ok((clause, args))
}
