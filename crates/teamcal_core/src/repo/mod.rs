//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define data access contracts for users, calendars and events.
//! - Isolate SQLite query details from rights evaluation and services.
//!
//! # Invariants
//! - Repository writes validate the model before persistence.
//! - Repository reads reject invalid persisted rows instead of masking them.
//! - `try_new` constructors refuse connections that are not fully migrated.

use crate::db::{DbError, SchemaProblem};
use crate::model::ModelValidationError;
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod cal_event_repo;
pub mod team_cal_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error shared by all repositories.
#[derive(Debug)]
pub enum RepoError {
    Validation(ModelValidationError),
    Db(DbError),
    /// Target row does not exist (or is soft-deleted where that matters).
    NotFound { entity: &'static str, id: i64 },
    /// Write collides with a unique constraint, e.g. a duplicate username.
    Conflict(String),
    /// Connection is not usable by this repository.
    Schema(SchemaProblem),
    /// Persisted data cannot be converted to a valid model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::Schema(problem) => write!(f, "{problem}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } | Self::Conflict(_) | Self::Schema(_) | Self::InvalidData(_) => {
                None
            }
        }
    }
}

impl From<ModelValidationError> for RepoError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Maps a unique-constraint failure to `Conflict`, everything else to `Db`.
pub(crate) fn map_unique_violation(err: rusqlite::Error, message: impl Into<String>) -> RepoError {
    if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
        return RepoError::Conflict(message.into());
    }
    err.into()
}

pub(crate) fn ensure_schema(
    conn: &rusqlite::Connection,
    tables: &[(&'static str, &[&'static str])],
) -> RepoResult<()> {
    match crate::db::probe_schema(conn, tables)? {
        Some(problem) => Err(RepoError::Schema(problem)),
        None => Ok(()),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}
