//! Calendar event use-case service.
//!
//! # Responsibility
//! - Gate every event read/write through `CalEventRight`.
//! - Redact events for minimal-access readers.
//! - Append one history entry per successful write.
//!
//! # Invariants
//! - Moving an event needs update access on the target calendar and delete
//!   access on the source calendar.
//! - An event's `uid` never changes after creation.
//! - Listing never fails because of a single invisible event; such events
//!   are dropped from the result before `offset` and `limit` apply.

use crate::access::cal_event_right::CalEventRight;
use crate::access::checker::AccessChecker;
use crate::access::{AccessError, OperationType};
use crate::model::calendar::{TeamCal, TeamCalId};
use crate::model::event::{CalEvent, CalEventId, EventHistoryEntry};
use crate::model::user::User;
use crate::repo::cal_event_repo::{CalEventListQuery, CalEventRepository, EventChange};
use crate::repo::team_cal_repo::TeamCalRepository;
use crate::service::{now_epoch_ms, ServiceError, ServiceResult};
use log::{info, warn};
use std::collections::BTreeMap;

/// Event service facade over event/calendar repositories and an access
/// checker.
pub struct CalEventService<E: CalEventRepository, T: TeamCalRepository, C: AccessChecker> {
    events: E,
    calendars: T,
    checker: C,
}

impl<E, T, C> CalEventService<E, T, C>
where
    E: CalEventRepository,
    T: TeamCalRepository,
    C: AccessChecker,
{
    pub fn new(events: E, calendars: T, checker: C) -> Self {
        Self {
            events,
            calendars,
            checker,
        }
    }

    /// Loads one active event as seen by `user`.
    ///
    /// Returns `Ok(None)` for unknown or deleted events and an access error
    /// when the event exists but is not visible.
    pub fn get_event(&self, user: &User, id: CalEventId) -> ServiceResult<Option<CalEvent>> {
        let Some(event) = self.events.get_event(id, false)? else {
            return Ok(None);
        };
        let calendar = self.calendars.get_calendar(event.calendar_id, false)?;
        let right = CalEventRight::new(&self.checker);
        self.check(&right, user, OperationType::Select, &event, None, calendar.as_ref())?;

        if right.has_minimal_access(calendar.as_ref(), user.id) {
            return Ok(Some(event.minimal_copy()));
        }
        Ok(Some(event))
    }

    /// Lists events matching `query` that `user` may see, redacting those
    /// seen through minimal access. `offset` and `limit` count visible
    /// events only.
    pub fn list_events(&self, user: &User, query: &CalEventListQuery) -> ServiceResult<Vec<CalEvent>> {
        let right = CalEventRight::new(&self.checker);
        if !right.has_select_access(user) {
            return Err(self.denied(user, OperationType::Select, None));
        }

        let unpaged = CalEventListQuery {
            limit: None,
            offset: 0,
            ..query.clone()
        };
        let mut skip = query.offset;
        let limit = query.limit.map(|limit| limit as usize);
        let mut calendars: BTreeMap<TeamCalId, Option<TeamCal>> = BTreeMap::new();
        let mut visible = Vec::new();
        for event in self.events.list_events(&unpaged)? {
            if limit.is_some_and(|limit| visible.len() >= limit) {
                break;
            }
            if !calendars.contains_key(&event.calendar_id) {
                let calendar = self.calendars.get_calendar(event.calendar_id, false)?;
                calendars.insert(event.calendar_id, calendar);
            }
            let calendar = calendars.get(&event.calendar_id).and_then(Option::as_ref);

            if !right.has_select_access_to(user, &event, calendar) {
                continue;
            }
            if skip > 0 {
                skip -= 1;
                continue;
            }
            if right.has_minimal_access(calendar, user.id) {
                visible.push(event.minimal_copy());
            } else {
                visible.push(event);
            }
        }
        Ok(visible)
    }

    /// Creates `event` and returns its id.
    pub fn create_event(&self, user: &User, event: &CalEvent) -> ServiceResult<CalEventId> {
        let calendar = self.require_calendar(event.calendar_id)?;
        let right = CalEventRight::new(&self.checker);
        self.check(&right, user, OperationType::Insert, event, None, Some(&calendar))?;

        let id = self.events.write_with_history(
            EventChange::Insert(event),
            user.id,
            now_epoch_ms(),
        )?;
        info!(
            "event=cal_event_create module=service status=ok event_id={id} calendar_id={} user_id={}",
            calendar.id, user.id
        );
        Ok(id)
    }

    /// Replaces an active event. Returns the changed field names; an empty
    /// list means nothing was written.
    pub fn update_event(&self, user: &User, event: &CalEvent) -> ServiceResult<Vec<String>> {
        let current = self.require_event(event.id)?;
        if event.uid != current.uid {
            return Err(ServiceError::InvalidRequest(format!(
                "uid of event {} cannot be changed",
                event.id
            )));
        }
        if event.is_deleted {
            return Err(ServiceError::InvalidRequest(
                "use delete_event to delete an event".to_string(),
            ));
        }

        let right = CalEventRight::new(&self.checker);
        let target = self.require_calendar(event.calendar_id)?;
        self.check(
            &right,
            user,
            OperationType::Update,
            event,
            Some(&current),
            Some(&target),
        )?;
        if current.calendar_id != event.calendar_id {
            let source = self.calendars.get_calendar(current.calendar_id, false)?;
            self.check(
                &right,
                user,
                OperationType::Delete,
                &current,
                None,
                source.as_ref(),
            )?;
        }

        let changed_fields = event.changed_fields(&current);
        if changed_fields.is_empty() {
            return Ok(changed_fields);
        }
        self.events.write_with_history(
            EventChange::Update {
                event,
                changed_fields: &changed_fields,
            },
            user.id,
            now_epoch_ms(),
        )?;
        info!(
            "event=cal_event_update module=service status=ok event_id={} user_id={} changed={}",
            event.id,
            user.id,
            changed_fields.join(",")
        );
        Ok(changed_fields)
    }

    /// Soft-deletes an active event.
    pub fn delete_event(&self, user: &User, id: CalEventId) -> ServiceResult<()> {
        let current = self.require_event(id)?;
        let calendar = self.calendars.get_calendar(current.calendar_id, false)?;
        let right = CalEventRight::new(&self.checker);
        self.check(
            &right,
            user,
            OperationType::Delete,
            &current,
            Some(&current),
            calendar.as_ref(),
        )?;

        self.events
            .write_with_history(EventChange::Delete(id), user.id, now_epoch_ms())?;
        info!(
            "event=cal_event_delete module=service status=ok event_id={id} user_id={}",
            user.id
        );
        Ok(())
    }

    /// Restores a soft-deleted event. Needs the same right as deleting it.
    pub fn restore_event(&self, user: &User, id: CalEventId) -> ServiceResult<()> {
        let current = self
            .events
            .get_event(id, true)?
            .ok_or(ServiceError::NotFound { entity: "event", id })?;
        if !current.is_deleted {
            return Err(ServiceError::InvalidRequest(format!(
                "event {id} is not deleted"
            )));
        }
        let calendar = self.calendars.get_calendar(current.calendar_id, false)?;
        let right = CalEventRight::new(&self.checker);
        self.check(
            &right,
            user,
            OperationType::Delete,
            &current,
            Some(&current),
            calendar.as_ref(),
        )?;

        self.events
            .write_with_history(EventChange::Restore(id), user.id, now_epoch_ms())?;
        info!(
            "event=cal_event_restore module=service status=ok event_id={id} user_id={}",
            user.id
        );
        Ok(())
    }

    /// Returns the write history of an event, including deleted events.
    pub fn event_history(
        &self,
        user: &User,
        id: CalEventId,
    ) -> ServiceResult<Vec<EventHistoryEntry>> {
        let event = self
            .events
            .get_event(id, true)?
            .ok_or(ServiceError::NotFound { entity: "event", id })?;
        let calendar = self.calendars.get_calendar(event.calendar_id, true)?;
        let right = CalEventRight::new(&self.checker);
        self.check(&right, user, OperationType::History, &event, None, calendar.as_ref())?;

        Ok(self.events.list_history(id)?)
    }

    fn require_event(&self, id: CalEventId) -> ServiceResult<CalEvent> {
        self.events
            .get_event(id, false)?
            .ok_or(ServiceError::NotFound { entity: "event", id })
    }

    fn require_calendar(&self, id: TeamCalId) -> ServiceResult<TeamCal> {
        self.calendars
            .get_calendar(id, false)?
            .ok_or(ServiceError::NotFound {
                entity: "calendar",
                id,
            })
    }

    fn check(
        &self,
        right: &CalEventRight<'_, C>,
        user: &User,
        operation: OperationType,
        event: &CalEvent,
        old_event: Option<&CalEvent>,
        calendar: Option<&TeamCal>,
    ) -> ServiceResult<()> {
        right
            .check(user, operation, event, old_event, calendar)
            .map_err(|err| {
                self.log_denied(user, operation, calendar.map(|calendar| calendar.id));
                ServiceError::Access(err)
            })
    }

    fn denied(
        &self,
        user: &User,
        operation: OperationType,
        calendar_id: Option<TeamCalId>,
    ) -> ServiceError {
        self.log_denied(user, operation, calendar_id);
        ServiceError::Access(AccessError::Denied {
            user_id: user.id,
            operation,
            calendar_id,
        })
    }

    fn log_denied(&self, user: &User, operation: OperationType, calendar_id: Option<TeamCalId>) {
        warn!(
            "event=access_denied module=service target=event operation={} user_id={} calendar_id={}",
            operation.as_str(),
            user.id,
            calendar_id.map_or_else(|| "-".to_string(), |id| id.to_string())
        );
    }
}
