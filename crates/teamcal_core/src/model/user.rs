//! User and group records.
//!
//! Groups only matter to access checks: a calendar ACL may grant a level to
//! a whole group, and membership is resolved through `UserGroupCache`.

use super::ModelValidationError;
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type GroupId = i64;

/// A person that can own calendars and be granted access to others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Storage id. `0` until the record has been persisted.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    pub display_name: Option<String>,
    pub is_deleted: bool,
}

impl User {
    /// Creates an unsaved user.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: 0,
            username: username.into(),
            display_name: None,
            is_deleted: false,
        }
    }

    /// Rejects blank usernames and usernames containing whitespace.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.username.trim().is_empty() {
            return Err(ModelValidationError::EmptyUsername);
        }
        if self.username.chars().any(char::is_whitespace) {
            return Err(ModelValidationError::InvalidUsername(self.username.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.name.trim().is_empty() {
            return Err(ModelValidationError::EmptyGroupName);
        }
        Ok(())
    }
}
