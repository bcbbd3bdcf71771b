//! Access rights for team calendars and calendar events.
//!
//! # Responsibility
//! - Evaluate who may select, insert, update, delete or inspect the history
//!   of a calendar event, based on the owning calendar's ACL.
//! - Keep evaluation pure: callers load the calendar, rights only read it.
//!
//! # Invariants
//! - The calendar owner always has select, update and history access unless
//!   the calendar is an external subscription (then only select/history).
//! - External subscription calendars never grant insert, update or delete.
//! - Group grants are resolved through `AccessChecker`, never by querying
//!   storage from inside a right.

use crate::model::calendar::TeamCalId;
use crate::model::user::UserId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod cal_event_right;
pub mod checker;
pub mod team_cal_right;

/// Operation guarded by a right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    Select,
    Insert,
    Update,
    Delete,
    History,
}

impl OperationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::History => "history",
        }
    }
}

/// Raised when a right answers `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    Denied {
        user_id: UserId,
        operation: OperationType,
        calendar_id: Option<TeamCalId>,
    },
}

impl Display for AccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Denied {
                user_id,
                operation,
                calendar_id: Some(calendar_id),
            } => write!(
                f,
                "user {user_id} has no {} access to calendar {calendar_id}",
                operation.as_str()
            ),
            Self::Denied {
                user_id,
                operation,
                calendar_id: None,
            } => write!(f, "user {user_id} has no {} access", operation.as_str()),
        }
    }
}

impl Error for AccessError {}
