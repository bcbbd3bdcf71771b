//! Rights on calendar events.
//!
//! An event has no ACL of its own: every decision is delegated to the
//! calendar the event lives in. Callers pass that calendar in; `None` stands
//! for a calendar that could not be resolved.
//!
//! | access type        | select | insert/update/delete | history |
//! |--------------------|--------|----------------------|---------|
//! | owner              | yes    | yes                  | yes     |
//! | full               | yes    | yes                  | yes     |
//! | readonly           | yes    | demo user only       | yes     |
//! | minimal (redacted) | yes    | demo user only       | no      |
//! | none               | no     | demo user only       | no      |
//!
//! Writes to external subscription calendars are refused for everybody.

use super::checker::AccessChecker;
use super::team_cal_right::TeamCalRight;
use super::{AccessError, OperationType};
use crate::model::calendar::TeamCal;
use crate::model::event::CalEvent;
use crate::model::user::{User, UserId};

/// Event-level rights backed by [`TeamCalRight`].
pub struct CalEventRight<'a, C: AccessChecker + ?Sized> {
    team_cal_right: TeamCalRight<'a, C>,
}

impl<'a, C: AccessChecker + ?Sized> CalEventRight<'a, C> {
    pub fn new(checker: &'a C) -> Self {
        Self {
            team_cal_right: TeamCalRight::new(checker),
        }
    }

    pub fn team_cal_right(&self) -> &TeamCalRight<'a, C> {
        &self.team_cal_right
    }

    /// General select access: listing events is open to everybody, each
    /// event is filtered by [`Self::has_select_access_to`].
    pub fn has_select_access(&self, _user: &User) -> bool {
        true
    }

    /// Owner, full, read-only and minimal access holders may see the event.
    /// Minimal holders only get [`CalEvent::minimal_copy`].
    pub fn has_select_access_to(
        &self,
        user: &User,
        _event: &CalEvent,
        calendar: Option<&TeamCal>,
    ) -> bool {
        let Some(calendar) = calendar else {
            return false;
        };
        if self.team_cal_right.is_owner(calendar, user.id) {
            return true;
        }
        self.team_cal_right.has_full_access(calendar, user.id)
            || self.team_cal_right.has_readonly_access(calendar, user.id)
            || self.team_cal_right.has_minimal_access(calendar, user.id)
    }

    /// General insert access.
    pub fn has_insert_access(&self, _user: &User) -> bool {
        true
    }

    /// Same as [`Self::has_update_access`] without a previous version.
    pub fn has_insert_access_to(
        &self,
        user: &User,
        event: &CalEvent,
        calendar: Option<&TeamCal>,
    ) -> bool {
        self.has_update_access(user, Some(event), None, calendar)
    }

    /// Update access is decided by the calendar of `event`; `old_event` is
    /// accepted for symmetry with delete and is not consulted.
    pub fn has_update_access(
        &self,
        user: &User,
        event: Option<&CalEvent>,
        _old_event: Option<&CalEvent>,
        calendar: Option<&TeamCal>,
    ) -> bool {
        if event.is_none() {
            return false;
        }
        match calendar {
            Some(calendar) => self.has_update_access_to_calendar(user, calendar),
            None => false,
        }
    }

    /// Owners and full-access users may write; demo users may write too.
    /// Nobody writes to an external subscription.
    pub fn has_update_access_to_calendar(&self, user: &User, calendar: &TeamCal) -> bool {
        if calendar.external_subscription {
            return false;
        }
        if self.team_cal_right.is_owner(calendar, user.id) {
            return true;
        }
        self.team_cal_right.has_full_access(calendar, user.id)
            || self.team_cal_right.checker().is_demo_user(user)
    }

    /// Same as [`Self::has_update_access`].
    pub fn has_delete_access(
        &self,
        user: &User,
        event: Option<&CalEvent>,
        old_event: Option<&CalEvent>,
        calendar: Option<&TeamCal>,
    ) -> bool {
        self.has_update_access(user, event, old_event, calendar)
    }

    /// Owner, full and read-only holders may read the change history.
    /// Without an event (general history access) the answer is `true`.
    pub fn has_history_access(
        &self,
        user: &User,
        event: Option<&CalEvent>,
        calendar: Option<&TeamCal>,
    ) -> bool {
        if event.is_none() {
            return true;
        }
        let Some(calendar) = calendar else {
            return false;
        };
        if self.team_cal_right.is_owner(calendar, user.id) {
            return true;
        }
        self.team_cal_right.has_full_access(calendar, user.id)
            || self.team_cal_right.has_readonly_access(calendar, user.id)
    }

    /// True when the reader must get a redacted copy. An unresolved
    /// calendar is treated as minimal so nothing leaks.
    pub fn has_minimal_access(&self, calendar: Option<&TeamCal>, user_id: UserId) -> bool {
        match calendar {
            Some(calendar) => self.team_cal_right.has_minimal_access(calendar, user_id),
            None => true,
        }
    }

    /// Evaluates `operation` and turns a refusal into [`AccessError`].
    ///
    /// `old_event` only matters for update/delete.
    pub fn check(
        &self,
        user: &User,
        operation: OperationType,
        event: &CalEvent,
        old_event: Option<&CalEvent>,
        calendar: Option<&TeamCal>,
    ) -> Result<(), AccessError> {
        let allowed = match operation {
            OperationType::Select => self.has_select_access_to(user, event, calendar),
            OperationType::Insert => self.has_insert_access_to(user, event, calendar),
            OperationType::Update => self.has_update_access(user, Some(event), old_event, calendar),
            OperationType::Delete => self.has_delete_access(user, Some(event), old_event, calendar),
            OperationType::History => self.has_history_access(user, Some(event), calendar),
        };
        if allowed {
            return Ok(());
        }
        Err(AccessError::Denied {
            user_id: user.id,
            operation,
            calendar_id: calendar.map(|calendar| calendar.id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::CalEventRight;
    use crate::access::checker::UserGroupCache;
    use crate::access::{AccessError, OperationType};
    use crate::model::calendar::{AccessLevel, TeamCal};
    use crate::model::event::CalEvent;
    use crate::model::user::User;

    fn user(id: i64, username: &str) -> User {
        let mut user = User::new(username);
        user.id = id;
        user
    }

    fn calendar() -> TeamCal {
        let mut calendar = TeamCal::new(1, "Team");
        calendar.id = 10;
        calendar.acl.grant_user(AccessLevel::Full, 2);
        calendar.acl.grant_user(AccessLevel::Readonly, 3);
        calendar.acl.grant_user(AccessLevel::Minimal, 4);
        calendar
    }

    #[test]
    fn unresolved_calendar_denies_everything_but_general_history() {
        let cache = UserGroupCache::new(None);
        let right = CalEventRight::new(&cache);
        let owner = user(1, "owner");
        let event = CalEvent::new(10, "Planning", 0, 10);

        assert!(!right.has_select_access_to(&owner, &event, None));
        assert!(!right.has_update_access(&owner, Some(&event), None, None));
        assert!(!right.has_history_access(&owner, Some(&event), None));
        assert!(right.has_history_access(&owner, None, None));
        assert!(right.has_minimal_access(None, 1));
    }

    #[test]
    fn missing_event_denies_update() {
        let cache = UserGroupCache::new(None);
        let right = CalEventRight::new(&cache);
        let calendar = calendar();
        assert!(!right.has_update_access(&user(1, "owner"), None, None, Some(&calendar)));
    }

    #[test]
    fn check_reports_operation_and_calendar() {
        let cache = UserGroupCache::new(None);
        let right = CalEventRight::new(&cache);
        let calendar = calendar();
        let event = CalEvent::new(10, "Planning", 0, 10);

        let err = right
            .check(
                &user(3, "reader"),
                OperationType::Update,
                &event,
                None,
                Some(&calendar),
            )
            .expect_err("readonly user must not update");
        assert_eq!(
            err,
            AccessError::Denied {
                user_id: 3,
                operation: OperationType::Update,
                calendar_id: Some(10),
            }
        );
        right
            .check(
                &user(3, "reader"),
                OperationType::History,
                &event,
                None,
                Some(&calendar),
            )
            .expect("readonly user reads history");
    }

    #[test]
    fn demo_user_writes_but_not_to_subscriptions() {
        let cache = UserGroupCache::new(Some("demo".to_string()));
        let right = CalEventRight::new(&cache);
        let demo = user(9, "demo");

        assert!(right.has_update_access_to_calendar(&demo, &calendar()));

        let mut feed = TeamCal::subscription(1, "Feed", "https://example.org/feed.ics");
        feed.id = 11;
        assert!(!right.has_update_access_to_calendar(&demo, &feed));
        assert!(!right.has_update_access_to_calendar(&user(1, "owner"), &feed));
    }
}
