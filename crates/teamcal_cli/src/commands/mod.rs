pub mod access;
pub mod calendar;
pub mod event;
pub mod user;

use anyhow::{anyhow, bail, Context, Result};
use rusqlite::Connection;
use std::path::Path;
use teamcal_core::db::open_db;
use teamcal_core::{
    CalEventService, SqliteCalEventRepository, SqliteTeamCalRepository, SqliteUserRepository,
    TeamCalService, User, UserGroupCache, UserRepository,
};

/// One open database plus the settings every command needs.
pub struct Session {
    conn: Connection,
    demo_username: Option<String>,
}

impl Session {
    pub fn open(database: &Path, demo_username: Option<String>) -> Result<Self> {
        let conn = open_db(database)
            .with_context(|| format!("failed to open database {}", database.display()))?;
        Ok(Self {
            conn,
            demo_username,
        })
    }

    pub fn users(&self) -> Result<SqliteUserRepository<'_>> {
        Ok(SqliteUserRepository::try_new(&self.conn)?)
    }

    /// Looks up the user a command acts on behalf of. Deleted users cannot act.
    pub fn acting_user(&self, username: &str) -> Result<User> {
        let user = self
            .users()?
            .find_user_by_username(username)?
            .ok_or_else(|| anyhow!("unknown user `{username}`"))?;
        if user.is_deleted {
            bail!("user `{username}` is deleted");
        }
        Ok(user)
    }

    pub fn checker(&self) -> Result<UserGroupCache> {
        Ok(UserGroupCache::load(
            &self.users()?,
            self.demo_username.clone(),
        )?)
    }

    pub fn calendar_service(
        &self,
    ) -> Result<TeamCalService<SqliteTeamCalRepository<'_>, UserGroupCache>> {
        Ok(TeamCalService::new(
            SqliteTeamCalRepository::try_new(&self.conn)?,
            self.checker()?,
        ))
    }

    pub fn event_service(
        &self,
    ) -> Result<
        CalEventService<SqliteCalEventRepository<'_>, SqliteTeamCalRepository<'_>, UserGroupCache>,
    > {
        Ok(CalEventService::new(
            SqliteCalEventRepository::try_new(&self.conn)?,
            SqliteTeamCalRepository::try_new(&self.conn)?,
            self.checker()?,
        ))
    }

    pub fn calendars(&self) -> Result<SqliteTeamCalRepository<'_>> {
        Ok(SqliteTeamCalRepository::try_new(&self.conn)?)
    }

    pub fn events(&self) -> Result<SqliteCalEventRepository<'_>> {
        Ok(SqliteCalEventRepository::try_new(&self.conn)?)
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
