//! Rights on the calendar itself and the ACL level evaluation shared with
//! event rights.
//!
//! Levels are exclusive during evaluation: a user that is both listed as
//! full and minimal is treated as full only, so `has_readonly_access` and
//! `has_minimal_access` answer `false` for them.

use super::checker::AccessChecker;
use crate::model::calendar::{AccessLevel, CalendarAccessType, TeamCal};
use crate::model::user::{User, UserId};

/// Evaluates ACL levels of one calendar for one user.
pub struct TeamCalRight<'a, C: AccessChecker + ?Sized> {
    checker: &'a C,
}

impl<'a, C: AccessChecker + ?Sized> TeamCalRight<'a, C> {
    pub fn new(checker: &'a C) -> Self {
        Self { checker }
    }

    pub fn checker(&self) -> &'a C {
        self.checker
    }

    pub fn is_owner(&self, calendar: &TeamCal, user_id: UserId) -> bool {
        calendar.owner_id == user_id
    }

    /// Owner, listed full-access user or member of a full-access group.
    pub fn has_full_access(&self, calendar: &TeamCal, user_id: UserId) -> bool {
        self.is_owner(calendar, user_id) || self.is_granted(calendar, AccessLevel::Full, user_id)
    }

    /// Read-only grant, unless full access already applies.
    pub fn has_readonly_access(&self, calendar: &TeamCal, user_id: UserId) -> bool {
        if self.has_full_access(calendar, user_id) {
            return false;
        }
        self.is_granted(calendar, AccessLevel::Readonly, user_id)
    }

    /// Minimal grant, unless full or read-only access already applies.
    pub fn has_minimal_access(&self, calendar: &TeamCal, user_id: UserId) -> bool {
        if self.has_full_access(calendar, user_id) || self.has_readonly_access(calendar, user_id) {
            return false;
        }
        self.is_granted(calendar, AccessLevel::Minimal, user_id)
    }

    /// Strongest access type of the user on the calendar.
    pub fn access_type(&self, calendar: &TeamCal, user_id: UserId) -> CalendarAccessType {
        if self.is_owner(calendar, user_id) {
            CalendarAccessType::Owner
        } else if self.has_full_access(calendar, user_id) {
            CalendarAccessType::Full
        } else if self.has_readonly_access(calendar, user_id) {
            CalendarAccessType::Readonly
        } else if self.has_minimal_access(calendar, user_id) {
            CalendarAccessType::Minimal
        } else {
            CalendarAccessType::None
        }
    }

    /// Anyone with some level of access may see the calendar.
    pub fn has_select_access(&self, user: &User, calendar: &TeamCal) -> bool {
        self.access_type(calendar, user.id) != CalendarAccessType::None
    }

    /// Every user may create calendars; they become the owner.
    pub fn has_insert_access(&self, _user: &User) -> bool {
        true
    }

    /// Calendar settings and ACL belong to the owner.
    pub fn has_update_access(&self, user: &User, calendar: &TeamCal) -> bool {
        self.is_owner(calendar, user.id)
    }

    pub fn has_delete_access(&self, user: &User, calendar: &TeamCal) -> bool {
        self.is_owner(calendar, user.id)
    }

    fn is_granted(&self, calendar: &TeamCal, level: AccessLevel, user_id: UserId) -> bool {
        calendar.acl.users(level).contains(&user_id)
            || self
                .checker
                .is_member_of_any_group(user_id, calendar.acl.groups(level))
    }
}
