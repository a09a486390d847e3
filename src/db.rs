//! Statement execution on top of a single SQLite connection.
//!
//! Batches come in two flavours. Independent batches keep going past a
//! failing statement and report every failure in a [`BatchOutcome`].
//! Transactional batches stop at the first failure, roll back and return
//! that failure as the error of the call.

use rusqlite::{params_from_iter, Connection, Params, Rows, ToSql, Transaction};
use tracing::{debug, error, info, warn};

use std::fmt;
use std::time::Duration;

use crate::bind::{bind_named, expand_in, rebind, Bindvar, NamedArgs};
use crate::error::{Error, Result};
use crate::settings::DatabaseSettings;

/// Statements per multi-statement call in [`Db::exec_batch`].
pub const CHUNK_SIZE: usize = 200;
/// Ceiling for [`Db::exec_named_batch`].
pub const MAX_NAMED_BATCH: usize = 20;
/// Ceiling for [`Db::exec_batch_in_transaction`].
pub const MAX_TRANSACTION_BATCH: usize = 20;

/// SQL with `:name` placeholders and the value that fills them.
pub struct Named<'a> {
    pub sql: String,
    pub args: &'a dyn NamedArgs,
}

impl<'a> Named<'a> {
    pub fn new(sql: impl Into<String>, args: &'a dyn NamedArgs) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

impl fmt::Debug for Named<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Named").field("sql", &self.sql).finish_non_exhaustive()
    }
}

/// SQL with positional placeholders and its arguments in order.
pub struct Prepared {
    pub sql: String,
    pub args: Vec<Box<dyn ToSql>>,
}

impl Prepared {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }
    pub fn arg<V: ToSql + 'static>(mut self, value: V) -> Self {
        self.args.push(Box::new(value));
        self
    }
}

impl fmt::Debug for Prepared {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Prepared")
            .field("sql", &self.sql)
            .field("args", &self.args.len())
            .finish()
    }
}

/// One failed statement (or chunk) of a batch.
#[derive(Debug)]
pub struct BatchFailure {
    pub index: usize,
    pub error: Error,
}

/// What an independent batch did.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Statements, or chunks for [`Db::exec_batch`], that were sent to the driver.
    pub attempted: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failures.len()
    }
}

/// Handle around an optional connection. A closed handle rejects every call
/// with [`Error::NoConnection`].
pub struct Db {
    conn: Option<Connection>,
}

impl Db {
    pub fn new(conn: Connection) -> Self {
        Self { conn: Some(conn) }
    }
    pub fn open(settings: &DatabaseSettings) -> Result<Self> {
        let conn = match &settings.path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        conn.busy_timeout(Duration::from_millis(settings.busy_timeout_ms))?;
        if settings.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }
        info!(
            path = settings.path.as_deref().unwrap_or(":memory:"),
            busy_timeout_ms = settings.busy_timeout_ms,
            "opened database"
        );
        Ok(Self::new(conn))
    }
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&DatabaseSettings::default())
    }
    pub fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| {
                error!(error = %e, "could not close database");
                Error::from(e)
            })?;
        }
        Ok(())
    }
    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }
    pub fn connection(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or_else(|| {
            warn!("database connection is closed");
            Error::NoConnection
        })
    }
    /// Placeholder syntax of the driver.
    pub fn bindvar(&self) -> Bindvar {
        Bindvar::QuestionNumbered
    }
    pub fn rebind(&self, sql: &str) -> String {
        rebind(self.bindvar(), sql)
    }

    // ------------- Single statements -------------

    /// Executes one positional statement, returning the affected row count.
    pub fn exec<P: Params>(&self, sql: &str, params: P) -> Result<usize> {
        let conn = self.connection()?;
        conn.execute(sql, params).map_err(|e| {
            warn!(%sql, error = %e, "could not execute statement");
            Error::from(e)
        })
    }
    /// Executes one named statement, returning the affected row count.
    pub fn exec_named(&self, sql: &str, args: &dyn NamedArgs) -> Result<usize> {
        let conn = self.connection()?;
        exec_named_on(conn, sql, args).map_err(|e| {
            warn!(%sql, error = %e, "named exec error");
            e
        })
    }

    // ------------- Batches -------------

    /// Runs `statements` in chunks of [`CHUNK_SIZE`], one multi-statement call
    /// per chunk. Every statement gets a terminator of its own, so one that
    /// already ends in `;` just adds an empty statement. A failing chunk is
    /// recorded and the next chunk still runs.
    pub fn exec_batch<S: AsRef<str>>(&self, statements: &[S]) -> Result<BatchOutcome> {
        let conn = self.connection()?;
        let mut outcome = BatchOutcome::default();
        for chunk in statements.chunks(CHUNK_SIZE) {
            let mut script = String::new();
            for statement in chunk {
                let statement = statement.as_ref().trim_end();
                script.push_str(statement);
                // on its own line, a trailing `--` comment would swallow it
                script.push_str("\n;\n");
            }
            let index = outcome.attempted;
            outcome.attempted += 1;
            match conn.execute_batch(&script) {
                Ok(()) => debug!(chunk = index, statements = chunk.len(), "executed chunk"),
                Err(e) => {
                    warn!(chunk = index, statements = chunk.len(), error = %e, "could not execute chunk");
                    debug!(sql = %script, "failed chunk");
                    outcome.failures.push(BatchFailure {
                        index,
                        error: e.into(),
                    });
                }
            }
        }
        Ok(outcome)
    }

    /// Runs up to [`MAX_NAMED_BATCH`] named statements.
    ///
    /// Without a transaction every statement is attempted and failures are
    /// collected. With one, the first failure rolls everything back and is
    /// returned.
    pub fn exec_named_batch(
        &self,
        statements: &[Named<'_>],
        as_transaction: bool,
    ) -> Result<BatchOutcome> {
        check_ceiling(statements.len(), MAX_NAMED_BATCH)?;
        let conn = self.connection()?;
        if as_transaction {
            in_transaction(conn, statements.len(), |tx, index| {
                let named = &statements[index];
                exec_named_on(tx, &named.sql, named.args).map(|_| ()).map_err(|e| {
                    warn!(index, sql = %named.sql, error = %e, "named statement failed");
                    e
                })
            })?;
            return Ok(BatchOutcome {
                attempted: statements.len(),
                failures: Vec::new(),
            });
        }
        let mut outcome = BatchOutcome::default();
        for (index, named) in statements.iter().enumerate() {
            outcome.attempted += 1;
            if let Err(e) = exec_named_on(conn, &named.sql, named.args) {
                warn!(index, sql = %named.sql, error = %e, "named statement failed");
                outcome.failures.push(BatchFailure { index, error: e });
            }
        }
        Ok(outcome)
    }

    /// Runs up to [`MAX_TRANSACTION_BATCH`] plain statements all or nothing.
    pub fn exec_batch_in_transaction<S: AsRef<str>>(&self, statements: &[S]) -> Result<()> {
        check_ceiling(statements.len(), MAX_TRANSACTION_BATCH)?;
        let conn = self.connection()?;
        in_transaction(conn, statements.len(), |tx, index| {
            let sql = statements[index].as_ref();
            tx.execute_batch(sql).map_err(|e| {
                warn!(index, %sql, error = %e, "statement failed");
                Error::from(e)
            })
        })
    }

    /// Runs positional statements in order and stops at the first failure,
    /// which is returned. Statements before it keep their effect.
    pub fn exec_prepared_batch(&self, statements: &[Prepared]) -> Result<usize> {
        let conn = self.connection()?;
        for (index, prepared) in statements.iter().enumerate() {
            conn.execute(&prepared.sql, params_from_iter(prepared.args.iter()))
                .map_err(|e| {
                    error!(index, sql = %prepared.sql, error = %e, "prepared statement failed, stopping batch");
                    Error::from(e)
                })?;
        }
        Ok(statements.len())
    }

    // ------------- Queries -------------

    /// Hands the cursor of `sql` to `parse_rows`. The cursor is released when
    /// this returns, whatever `parse_rows` did.
    pub fn query_rows<P, F, R>(&self, sql: &str, params: P, parse_rows: F) -> Result<R>
    where
        P: Params,
        F: FnOnce(&mut Rows<'_>) -> Result<R>,
    {
        let conn = self.connection()?;
        check_sql(sql)?;
        let mut statement = conn.prepare(sql).map_err(|e| query_error(sql, e))?;
        let mut rows = statement.query(params).map_err(|e| query_error(sql, e))?;
        parse_rows(&mut rows)
    }

    /// Like [`Db::query_rows`] with arguments bound from `:name` placeholders.
    pub fn query_rows_filtered<F, R>(
        &self,
        sql: &str,
        args: &dyn NamedArgs,
        parse_rows: F,
    ) -> Result<R>
    where
        F: FnOnce(&mut Rows<'_>) -> Result<R>,
    {
        let conn = self.connection()?;
        check_sql(sql)?;
        let mut statement = conn.prepare(sql).map_err(|e| query_error(sql, e))?;
        bind_named(&mut statement, args).map_err(|e| {
            warn!(%sql, error = %e, "could not bind named arguments");
            e
        })?;
        let mut rows = statement.raw_query();
        parse_rows(&mut rows)
    }

    /// Expands the `IN (?)` of `sql` to fit `values`, rebinds it for the
    /// driver and hands the cursor to `parse_rows`.
    pub fn query_rows_with_in_clause<V, F, R>(
        &self,
        sql: &str,
        values: &[V],
        parse_rows: F,
    ) -> Result<R>
    where
        V: ToSql,
        F: FnOnce(&mut Rows<'_>) -> Result<R>,
    {
        self.connection()?;
        check_sql(sql)?;
        let expanded = expand_in(sql, values.len()).map_err(|e| {
            warn!(%sql, error = %e, "could not expand IN clause");
            e
        })?;
        self.query_rows(&self.rebind(&expanded), params_from_iter(values.iter()), parse_rows)
    }

    /// Reads the first column of the first row as an integer.
    pub fn scalar_i64<P: Params>(&self, sql: &str, params: P) -> Result<i64> {
        let conn = self.connection()?;
        check_sql(sql)?;
        match conn.query_row(sql, params, |row| row.get::<_, i64>(0)) {
            Ok(value) => Ok(value),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                warn!(%sql, "no rows in scalar");
                Err(Error::NoRows)
            }
            Err(e) => Err(query_error(sql, e)),
        }
    }
}

fn exec_named_on(conn: &Connection, sql: &str, args: &dyn NamedArgs) -> Result<usize> {
    let mut statement = conn.prepare(sql)?;
    bind_named(&mut statement, args)?;
    Ok(statement.raw_execute()?)
}

fn in_transaction<F>(conn: &Connection, statements: usize, mut run: F) -> Result<()>
where
    F: FnMut(&Transaction<'_>, usize) -> Result<()>,
{
    let tx = conn.unchecked_transaction()?;
    for index in 0..statements {
        if let Err(e) = run(&tx, index) {
            if let Err(rollback) = tx.rollback() {
                error!(error = %rollback, "rollback failed");
            }
            warn!(index, "transaction rolled back");
            return Err(e);
        }
    }
    // a failed commit rolls back when the transaction drops
    tx.commit().map_err(|e| {
        error!(error = %e, "commit failed, transaction rolled back");
        Error::from(e)
    })
}

fn check_ceiling(count: usize, limit: usize) -> Result<()> {
    if count > limit {
        warn!(count, limit, "batch too large, aborting");
        return Err(Error::BatchTooLarge { count, limit });
    }
    Ok(())
}

fn check_sql(sql: &str) -> Result<()> {
    if sql.trim().is_empty() {
        warn!("SQL was blank");
        return Err(Error::EmptySql);
    }
    Ok(())
}

fn query_error(sql: &str, e: rusqlite::Error) -> Error {
    warn!(%sql, error = %e, "query failed");
    Error::from(e)
}
