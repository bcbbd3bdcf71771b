//! Team calendar use-case service.
//!
//! # Invariants
//! - The creating user becomes the owner; the owner never changes afterwards.
//! - Only calendars with some access level are returned to a user.

use crate::access::checker::AccessChecker;
use crate::access::team_cal_right::TeamCalRight;
use crate::access::{AccessError, OperationType};
use crate::model::calendar::{CalendarAccessType, TeamCal, TeamCalId};
use crate::model::user::User;
use crate::repo::team_cal_repo::TeamCalRepository;
use crate::service::{ServiceError, ServiceResult};
use log::{info, warn};

/// Calendar service facade over a repository and an access checker.
pub struct TeamCalService<R: TeamCalRepository, C: AccessChecker> {
    repo: R,
    checker: C,
}

impl<R: TeamCalRepository, C: AccessChecker> TeamCalService<R, C> {
    pub fn new(repo: R, checker: C) -> Self {
        Self { repo, checker }
    }

    /// Persists `calendar` with `user` as owner and returns the new id.
    pub fn create_calendar(&self, user: &User, calendar: &TeamCal) -> ServiceResult<TeamCalId> {
        let right = TeamCalRight::new(&self.checker);
        if !right.has_insert_access(user) {
            return Err(denied(user, OperationType::Insert, None));
        }

        let mut owned = calendar.clone();
        owned.owner_id = user.id;
        let id = self.repo.create_calendar(&owned)?;
        info!(
            "event=team_cal_create module=service status=ok calendar_id={id} user_id={}",
            user.id
        );
        Ok(id)
    }

    /// Replaces title, description, subscription settings and ACL.
    pub fn update_calendar(&self, user: &User, calendar: &TeamCal) -> ServiceResult<()> {
        let current = self.require_calendar(calendar.id)?;
        let right = TeamCalRight::new(&self.checker);
        if !right.has_update_access(user, &current) {
            return Err(denied(user, OperationType::Update, Some(current.id)));
        }
        if calendar.owner_id != current.owner_id {
            return Err(ServiceError::InvalidRequest(format!(
                "owner of calendar {} cannot be changed",
                calendar.id
            )));
        }

        self.repo.update_calendar(calendar)?;
        info!(
            "event=team_cal_update module=service status=ok calendar_id={} user_id={}",
            calendar.id, user.id
        );
        Ok(())
    }

    /// Returns the calendar when `user` has any access to it.
    pub fn get_calendar(&self, user: &User, id: TeamCalId) -> ServiceResult<Option<TeamCal>> {
        let Some(calendar) = self.repo.get_calendar(id, false)? else {
            return Ok(None);
        };
        let right = TeamCalRight::new(&self.checker);
        if !right.has_select_access(user, &calendar) {
            return Err(denied(user, OperationType::Select, Some(id)));
        }
        Ok(Some(calendar))
    }

    /// Lists active calendars visible to `user` with the user's access type.
    pub fn list_calendars(&self, user: &User) -> ServiceResult<Vec<(TeamCal, CalendarAccessType)>> {
        let right = TeamCalRight::new(&self.checker);
        let visible = self
            .repo
            .list_calendars(false)?
            .into_iter()
            .filter_map(|calendar| {
                let access_type = right.access_type(&calendar, user.id);
                (access_type != CalendarAccessType::None).then_some((calendar, access_type))
            })
            .collect();
        Ok(visible)
    }

    /// Strongest access type of `user` on calendar `id`.
    pub fn access_type(&self, user: &User, id: TeamCalId) -> ServiceResult<CalendarAccessType> {
        let calendar = self.require_calendar(id)?;
        Ok(TeamCalRight::new(&self.checker).access_type(&calendar, user.id))
    }

    /// Soft-deletes the calendar. Owner only.
    pub fn delete_calendar(&self, user: &User, id: TeamCalId) -> ServiceResult<()> {
        let calendar = self.require_calendar(id)?;
        let right = TeamCalRight::new(&self.checker);
        if !right.has_delete_access(user, &calendar) {
            return Err(denied(user, OperationType::Delete, Some(id)));
        }

        self.repo.soft_delete_calendar(id)?;
        info!(
            "event=team_cal_delete module=service status=ok calendar_id={id} user_id={}",
            user.id
        );
        Ok(())
    }

    fn require_calendar(&self, id: TeamCalId) -> ServiceResult<TeamCal> {
        self.repo
            .get_calendar(id, false)?
            .ok_or(ServiceError::NotFound {
                entity: "calendar",
                id,
            })
    }
}

fn denied(user: &User, operation: OperationType, calendar_id: Option<TeamCalId>) -> ServiceError {
    warn!(
        "event=access_denied module=service target=calendar operation={} user_id={} calendar_id={}",
        operation.as_str(),
        user.id,
        calendar_id.map_or_else(|| "-".to_string(), |id| id.to_string())
    );
    ServiceError::Access(AccessError::Denied {
        user_id: user.id,
        operation,
        calendar_id,
    })
}
