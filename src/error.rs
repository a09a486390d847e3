use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Conversion error: cannot convert {message} into {target}")]
    Conversion { target: &'static str, message: String },
    #[error("Parse error: {message} (input {input:?})")]
    Parse { input: String, message: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Database connection is closed")]
    NoConnection,
    #[error("SQL was blank")]
    EmptySql,
    #[error("Batch of {count} statements exceeds the limit of {limit}")]
    BatchTooLarge { count: usize, limit: usize },
    #[error("No rows returned")]
    NoRows,
    #[error("Named argument missing for placeholder {0}")]
    MissingNamedArg(String),
    #[error("IN clause error: {0}")]
    InClause(String),
    #[error("Filter error: {0}")]
    Filter(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn conversion(target: &'static str, message: impl Into<String>) -> Self {
        Self::Conversion {
            target,
            message: message.into(),
        }
    }
    pub(crate) fn parse(input: &str, message: impl Into<String>) -> Self {
        Self::Parse {
            input: input.to_string(),
            message: message.into(),
        }
    }
}

// Helper conversions
impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
