use std::path::PathBuf;

use sqlx::error::ErrorKind;
use thiserror::Error;

/// Startup configuration failures. All of them are fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("not found {} in the project folder {}", .path.display(), .cwd.display())]
    NotFound { path: PathBuf, cwd: PathBuf },
    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("incorrect key or value in credentials file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("incorrect environment configuration: {0}")]
    Env(#[from] envy::Error),
    #[error("incorrect database url: {0}")]
    Url(String),
}

/// Failures surfaced by the contact store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("could not connect to database: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("uniqueness violation: {message}")]
    UniqueViolation {
        constraint: Option<String>,
        message: String,
    },
    #[error("foreign-key violation: {message}")]
    ForeignKeyViolation {
        constraint: Option<String>,
        message: String,
    },
    #[error("not-null violation: {message}")]
    NotNullViolation { message: String },
    #[error("client {client_id} has {} phone numbers; the number to replace must be given", .numbers.len())]
    AmbiguousPhone {
        client_id: i32,
        numbers: Vec<String>,
    },
    #[error("phone number {0} not found")]
    PhoneNotFound(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let Some(db_err) = err.as_database_error() else {
            return StoreError::Database(err);
        };

        let message = db_err.message().to_owned();
        let constraint = db_err.constraint().map(str::to_owned);
        match db_err.kind() {
            ErrorKind::UniqueViolation => StoreError::UniqueViolation {
                constraint,
                message,
            },
            ErrorKind::ForeignKeyViolation => StoreError::ForeignKeyViolation {
                constraint,
                message,
            },
            ErrorKind::NotNullViolation => StoreError::NotNullViolation { message },
            _ => StoreError::Database(err),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
