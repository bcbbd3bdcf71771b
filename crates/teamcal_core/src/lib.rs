//! Core domain logic for TeamCal.
//! This crate is the single source of truth for calendar access rules.

pub mod access;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use access::cal_event_right::CalEventRight;
pub use access::checker::{AccessChecker, UserGroupCache};
pub use access::team_cal_right::TeamCalRight;
pub use access::{AccessError, OperationType};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::calendar::{AccessLevel, CalendarAccessType, CalendarAcl, TeamCal, TeamCalId};
pub use model::event::{CalEvent, CalEventId, EventHistoryEntry, EventOperation};
pub use model::user::{Group, GroupId, User, UserId};
pub use model::ModelValidationError;
pub use repo::cal_event_repo::{
    CalEventListQuery, CalEventRepository, EventChange, SqliteCalEventRepository,
};
pub use repo::team_cal_repo::{SqliteTeamCalRepository, TeamCalRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::cal_event_service::CalEventService;
pub use service::team_cal_service::TeamCalService;
pub use service::{ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
