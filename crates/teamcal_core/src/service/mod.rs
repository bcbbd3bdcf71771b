//! Core use-case services.
//!
//! # Responsibility
//! - Combine repositories with access rights into use-case level APIs.
//! - Keep CLI layers decoupled from storage and rights details.
//!
//! # Invariants
//! - Every read or write on behalf of a user passes through a right.
//! - Denials are logged as `event=access_denied` before being returned.

use crate::access::AccessError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod cal_event_service;
pub mod team_cal_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for calendar and event use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// The acting user lacks the required right.
    Access(AccessError),
    /// Target record does not exist or is soft-deleted.
    NotFound { entity: &'static str, id: i64 },
    /// Request contradicts an invariant the caller controls.
    InvalidRequest(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Access(err) => write!(f, "access denied: {err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidRequest(message) => write!(f, "invalid request: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Access(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::NotFound { .. } | Self::InvalidRequest(_) => None,
        }
    }
}

impl From<AccessError> for ServiceError {
    fn from(value: AccessError) -> Self {
        Self::Access(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Validation(err) => Self::InvalidRequest(err.to_string()),
            other => Self::Repo(other),
        }
    }
}

pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
