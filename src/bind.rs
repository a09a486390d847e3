//! Placeholder plumbing: named arguments, `IN (?)` expansion and dialect
//! rebinding of positional placeholders.

use lazy_static::lazy_static;
use regex::{NoExpand, Regex};
use rusqlite::types::Value;
use rusqlite::{Statement, ToSql};

use std::collections::HashMap;

use crate::error::{Error, Result};

lazy_static! {
    static ref IN_PLACEHOLDER: Regex = Regex::new(r"(?i)\bIN\s*\(\s*\?\s*\)").unwrap();
}

/// Supplies the values for `:name` placeholders.
///
/// Names are given without the leading colon, the way a column would be
/// named. Names the statement does not mention are ignored.
pub trait NamedArgs {
    fn named_args(&self) -> Vec<(&str, &dyn ToSql)>;
}

impl NamedArgs for HashMap<String, Value> {
    fn named_args(&self) -> Vec<(&str, &dyn ToSql)> {
        self.iter()
            .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
            .collect()
    }
}

impl<const N: usize> NamedArgs for [(&str, &dyn ToSql); N] {
    fn named_args(&self) -> Vec<(&str, &dyn ToSql)> {
        self.to_vec()
    }
}

/// Binds every placeholder of `statement` from `args`.
pub fn bind_named(statement: &mut Statement<'_>, args: &dyn NamedArgs) -> Result<()> {
    let named = args.named_args();
    for index in 1..=statement.parameter_count() {
        let placeholder = statement
            .parameter_name(index)
            .map(str::to_owned)
            .ok_or_else(|| Error::MissingNamedArg(format!("?{index}")))?;
        let name = placeholder.trim_start_matches([':', '@', '$']);
        let value = named
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, value)| *value)
            .ok_or_else(|| Error::MissingNamedArg(placeholder.clone()))?;
        statement.raw_bind_parameter(index, value)?;
    }
    Ok(())
}

/// Placeholder syntax understood by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bindvar {
    /// `?`
    Question,
    /// `?1`, `?2`, ...
    QuestionNumbered,
    /// `$1`, `$2`, ...
    Dollar,
    /// `@p1`, `@p2`, ...
    At,
    /// `:arg1`, `:arg2`, ...
    Named,
}

/// Rewrites `?` placeholders outside single quoted literals into `bindvar`.
pub fn rebind(bindvar: Bindvar, sql: &str) -> String {
    if bindvar == Bindvar::Question {
        return sql.to_string();
    }
    let mut rebound = String::with_capacity(sql.len() + 16);
    let mut quoted = false;
    let mut n = 0;
    for c in sql.chars() {
        match c {
            '\'' => {
                quoted = !quoted;
                rebound.push(c);
            }
            '?' if !quoted => {
                n += 1;
                let placeholder = match bindvar {
                    Bindvar::Question => "?".to_string(),
                    Bindvar::QuestionNumbered => format!("?{n}"),
                    Bindvar::Dollar => format!("${n}"),
                    Bindvar::At => format!("@p{n}"),
                    Bindvar::Named => format!(":arg{n}"),
                };
                rebound.push_str(&placeholder);
            }
            _ => rebound.push(c),
        }
    }
    rebound
}

/// Expands the single `IN (?)` of `sql` into `count` placeholders.
pub fn expand_in(sql: &str, count: usize) -> Result<String> {
    if count == 0 {
        return Err(Error::InClause("empty value list passed to IN query".into()));
    }
    let found = IN_PLACEHOLDER.find_iter(sql).count();
    if found != 1 {
        return Err(Error::InClause(format!(
            "expected exactly one IN (?) placeholder, found {found}"
        )));
    }
    let replacement = format!("IN ({})", question_marks(count));
    Ok(IN_PLACEHOLDER
        .replace(sql, NoExpand(&replacement))
        .into_owned())
}

/// `"?, ?, ?"` for a count of three.
pub fn question_marks(count: usize) -> String {
    vec!["?"; count].join(", ")
}
