//! Team calendar model and its access control list.
//!
//! # Responsibility
//! - Describe who owns a calendar and which users/groups were granted which
//!   access level.
//! - Flag calendars that mirror an external subscription (read-only feeds).
//!
//! # Invariants
//! - `title` is never blank.
//! - `external_subscription_url` is set iff `external_subscription` is true.
//! - ACL sets are ordered (`BTreeSet`) so persisted rows and listings stay
//!   deterministic.

use super::user::{GroupId, UserId};
use super::ModelValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type TeamCalId = i64;

/// Access level that can be granted to a user or group on a calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Read and write every field.
    Full,
    /// Read every field, no writes.
    Readonly,
    /// See that a slot is taken; subject, location and note are hidden.
    Minimal,
}

impl AccessLevel {
    /// Stable storage/CLI string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Readonly => "readonly",
            Self::Minimal => "minimal",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "full" => Some(Self::Full),
            "readonly" => Some(Self::Readonly),
            "minimal" => Some(Self::Minimal),
            _ => None,
        }
    }
}

/// Effective access of one user on one calendar, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarAccessType {
    Owner,
    Full,
    Readonly,
    Minimal,
    None,
}

impl CalendarAccessType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Full => "full",
            Self::Readonly => "readonly",
            Self::Minimal => "minimal",
            Self::None => "none",
        }
    }
}

/// Per-level user and group grants of one calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarAcl {
    pub full_access_users: BTreeSet<UserId>,
    pub full_access_groups: BTreeSet<GroupId>,
    pub readonly_access_users: BTreeSet<UserId>,
    pub readonly_access_groups: BTreeSet<GroupId>,
    pub minimal_access_users: BTreeSet<UserId>,
    pub minimal_access_groups: BTreeSet<GroupId>,
}

impl CalendarAcl {
    pub fn users(&self, level: AccessLevel) -> &BTreeSet<UserId> {
        match level {
            AccessLevel::Full => &self.full_access_users,
            AccessLevel::Readonly => &self.readonly_access_users,
            AccessLevel::Minimal => &self.minimal_access_users,
        }
    }

    pub fn groups(&self, level: AccessLevel) -> &BTreeSet<GroupId> {
        match level {
            AccessLevel::Full => &self.full_access_groups,
            AccessLevel::Readonly => &self.readonly_access_groups,
            AccessLevel::Minimal => &self.minimal_access_groups,
        }
    }

    /// Grants `level` to a user. Existing grants on other levels are kept;
    /// the strongest level wins during evaluation.
    pub fn grant_user(&mut self, level: AccessLevel, user_id: UserId) {
        self.users_mut(level).insert(user_id);
    }

    pub fn grant_group(&mut self, level: AccessLevel, group_id: GroupId) {
        self.groups_mut(level).insert(group_id);
    }

    /// Removes the user from every level.
    pub fn revoke_user(&mut self, user_id: UserId) {
        self.full_access_users.remove(&user_id);
        self.readonly_access_users.remove(&user_id);
        self.minimal_access_users.remove(&user_id);
    }

    /// Removes the group from every level.
    pub fn revoke_group(&mut self, group_id: GroupId) {
        self.full_access_groups.remove(&group_id);
        self.readonly_access_groups.remove(&group_id);
        self.minimal_access_groups.remove(&group_id);
    }

    pub fn is_empty(&self) -> bool {
        [AccessLevel::Full, AccessLevel::Readonly, AccessLevel::Minimal]
            .into_iter()
            .all(|level| self.users(level).is_empty() && self.groups(level).is_empty())
    }

    fn users_mut(&mut self, level: AccessLevel) -> &mut BTreeSet<UserId> {
        match level {
            AccessLevel::Full => &mut self.full_access_users,
            AccessLevel::Readonly => &mut self.readonly_access_users,
            AccessLevel::Minimal => &mut self.minimal_access_users,
        }
    }

    fn groups_mut(&mut self, level: AccessLevel) -> &mut BTreeSet<GroupId> {
        match level {
            AccessLevel::Full => &mut self.full_access_groups,
            AccessLevel::Readonly => &mut self.readonly_access_groups,
            AccessLevel::Minimal => &mut self.minimal_access_groups,
        }
    }
}

/// A calendar shared by a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamCal {
    /// Storage id. `0` until the record has been persisted.
    pub id: TeamCalId,
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    /// Events are mirrored from an external feed and must not be edited.
    pub external_subscription: bool,
    pub external_subscription_url: Option<String>,
    pub acl: CalendarAcl,
    pub is_deleted: bool,
}

impl TeamCal {
    /// Creates an unsaved, non-subscription calendar with an empty ACL.
    pub fn new(owner_id: UserId, title: impl Into<String>) -> Self {
        Self {
            id: 0,
            owner_id,
            title: title.into(),
            description: None,
            external_subscription: false,
            external_subscription_url: None,
            acl: CalendarAcl::default(),
            is_deleted: false,
        }
    }

    /// Creates an unsaved calendar mirroring the feed at `url`.
    pub fn subscription(owner_id: UserId, title: impl Into<String>, url: impl Into<String>) -> Self {
        let mut calendar = Self::new(owner_id, title);
        calendar.external_subscription = true;
        calendar.external_subscription_url = Some(url.into());
        calendar
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.title.trim().is_empty() {
            return Err(ModelValidationError::EmptyCalendarTitle);
        }
        let has_url = self
            .external_subscription_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty());
        match (self.external_subscription, has_url) {
            (true, false) => Err(ModelValidationError::MissingSubscriptionUrl),
            (false, true) => Err(ModelValidationError::UnexpectedSubscriptionUrl),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessLevel, CalendarAcl, TeamCal};
    use crate::model::ModelValidationError;

    #[test]
    fn access_level_strings_are_stable() {
        for level in [AccessLevel::Full, AccessLevel::Readonly, AccessLevel::Minimal] {
            assert_eq!(AccessLevel::parse(level.as_str()), Some(level));
        }
        assert_eq!(AccessLevel::parse("owner"), None);
    }

    #[test]
    fn revoke_user_clears_every_level() {
        let mut acl = CalendarAcl::default();
        acl.grant_user(AccessLevel::Full, 7);
        acl.grant_user(AccessLevel::Minimal, 7);
        acl.grant_group(AccessLevel::Readonly, 3);
        acl.revoke_user(7);
        assert!(acl.full_access_users.is_empty());
        assert!(acl.minimal_access_users.is_empty());
        assert!(!acl.is_empty());
        acl.revoke_group(3);
        assert!(acl.is_empty());
    }

    #[test]
    fn subscription_url_must_match_flag() {
        let mut calendar = TeamCal::new(1, "Holidays");
        assert!(calendar.validate().is_ok());

        calendar.external_subscription = true;
        assert_eq!(
            calendar.validate(),
            Err(ModelValidationError::MissingSubscriptionUrl)
        );

        let mut plain = TeamCal::new(1, "Team");
        plain.external_subscription_url = Some("https://example.org/feed.ics".to_string());
        assert_eq!(
            plain.validate(),
            Err(ModelValidationError::UnexpectedSubscriptionUrl)
        );

        let feed = TeamCal::subscription(1, "Feed", "https://example.org/feed.ics");
        assert!(feed.validate().is_ok());
    }

    #[test]
    fn blank_title_is_rejected() {
        assert_eq!(
            TeamCal::new(1, " ").validate(),
            Err(ModelValidationError::EmptyCalendarTitle)
        );
    }
}
