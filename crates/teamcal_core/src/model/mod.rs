//! Domain model for users, team calendars and calendar events.
//!
//! # Responsibility
//! - Define the persisted records shared by repositories, rights and services.
//! - Keep validation rules next to the data they constrain.
//!
//! # Invariants
//! - Every persisted record is identified by a stable integer id.
//! - Deletion is represented by soft-delete tombstones, not hard delete.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod calendar;
pub mod event;
pub mod user;

/// Validation errors raised before a model is written to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    EmptyUsername,
    InvalidUsername(String),
    EmptyGroupName,
    EmptyCalendarTitle,
    MissingSubscriptionUrl,
    UnexpectedSubscriptionUrl,
    EmptyEventSubject,
    InvalidEventRange { start_ms: i64, end_ms: i64 },
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUsername => write!(f, "username must not be empty"),
            Self::InvalidUsername(value) => {
                write!(f, "username must not contain whitespace: `{value}`")
            }
            Self::EmptyGroupName => write!(f, "group name must not be empty"),
            Self::EmptyCalendarTitle => write!(f, "calendar title must not be empty"),
            Self::MissingSubscriptionUrl => {
                write!(f, "external subscription calendar requires a subscription url")
            }
            Self::UnexpectedSubscriptionUrl => write!(
                f,
                "subscription url is only allowed on external subscription calendars"
            ),
            Self::EmptyEventSubject => write!(f, "event subject must not be empty"),
            Self::InvalidEventRange { start_ms, end_ms } => write!(
                f,
                "event end {end_ms} must not be earlier than start {start_ms}"
            ),
        }
    }
}

impl Error for ModelValidationError {}
