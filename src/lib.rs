//! sqlkit – nullable SQL scalars, batched statement execution and
//! form-to-struct mapping on top of `rusqlite`.
//!
//! ## Modules
//! * [`datatype`] – The [`datatype::Null`] wrapper and its scalar instantiations
//!   (`NullInt64`, `NullFloat64`, `NullBool`, `NullString`, `NullDecimal`).
//! * [`datetime`] – Variable precision timestamp parsing and [`datetime::NullTime`].
//! * [`db`] – The [`db::Db`] handle: single, batched and transactional
//!   execution plus row-callback queries.
//! * [`bind`] – Named arguments, `IN (?)` expansion and placeholder rebinding.
//! * [`filter`] – Parameterized WHERE clauses from equality filters.
//! * [`form`] – Filling structs from submitted forms through a per-type schema.
//! * [`extract`] – An axum extractor running the form mapper on request bodies.
//! * [`settings`] – Configuration loaded with the `config` crate.
//! * [`storage`] – Fixed point integer helpers.
//!
//! ## Nullable values
//! Every nullable type pairs a value with a validity flag. Scanning a NULL
//! cell is not an error, it leaves the value invalid, and an invalid value
//! is written back as NULL and marshalled as JSON `null`.
//!
//! ## Quick Start
//! ```
//! use sqlkit::datatype::{NullInt64, NullString};
//! use sqlkit::db::Db;
//! use sqlkit::rusqlite::params;
//!
//! let db = Db::open_in_memory().unwrap();
//! db.exec_batch(&[
//!     "create table person (name text, age integer)",
//!     "insert into person values ('Alice', null)",
//! ]).unwrap();
//! let people = db.query_rows("select name, age from person", params![], |rows| {
//!     let mut people = Vec::new();
//!     while let Some(row) = rows.next()? {
//!         people.push((row.get::<_, NullString>(0)?, row.get::<_, NullInt64>(1)?));
//!     }
//!     Ok(people)
//! }).unwrap();
//! assert_eq!(people[0].0.value(), "Alice");
//! assert!(!people[0].1.is_valid());
//! assert_eq!(people[0].1.marshal_json().unwrap(), "null");
//! ```

pub mod bind;
pub mod datatype;
pub mod datetime;
pub mod db;
pub mod error;
pub mod extract;
pub mod filter;
pub mod form;
pub mod settings;
pub mod storage;

pub use error::{Error, Result};
// callers bind and read rows with the same driver version
pub use rusqlite;
