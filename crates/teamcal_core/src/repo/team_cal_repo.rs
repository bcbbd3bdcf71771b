//! Team calendar repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist calendars together with their ACL rows.
//! - Keep calendar row and ACL rows consistent inside one transaction.
//!
//! # Invariants
//! - `team_cal_access` always mirrors `TeamCal::acl` after a write.
//! - Listing order is `id ASC`.

use crate::model::calendar::{AccessLevel, CalendarAcl, TeamCal, TeamCalId};
use crate::repo::{bool_to_int, ensure_schema, int_to_bool, RepoError, RepoResult};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const TEAM_CAL_SELECT_SQL: &str = "SELECT
    id,
    owner_id,
    title,
    description,
    external_subscription,
    external_subscription_url,
    is_deleted
FROM team_cals";

const TEAM_CAL_COLUMNS: &[&str] = &[
    "id",
    "owner_id",
    "title",
    "description",
    "external_subscription",
    "external_subscription_url",
    "is_deleted",
];
const ACCESS_COLUMNS: &[&str] = &["calendar_id", "level", "principal_kind", "principal_id"];

const PRINCIPAL_USER: &str = "user";
const PRINCIPAL_GROUP: &str = "group";

/// Repository interface for team calendars.
pub trait TeamCalRepository {
    fn create_calendar(&self, calendar: &TeamCal) -> RepoResult<TeamCalId>;
    /// Replaces the calendar row and its full ACL.
    fn update_calendar(&self, calendar: &TeamCal) -> RepoResult<()>;
    fn get_calendar(&self, id: TeamCalId, include_deleted: bool) -> RepoResult<Option<TeamCal>>;
    fn list_calendars(&self, include_deleted: bool) -> RepoResult<Vec<TeamCal>>;
    fn soft_delete_calendar(&self, id: TeamCalId) -> RepoResult<()>;
}

/// SQLite-backed team calendar repository.
pub struct SqliteTeamCalRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTeamCalRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema(
            conn,
            &[
                ("team_cals", TEAM_CAL_COLUMNS),
                ("team_cal_access", ACCESS_COLUMNS),
            ],
        )?;
        Ok(Self { conn })
    }

    fn load_acl(&self, calendar_id: TeamCalId) -> RepoResult<CalendarAcl> {
        let mut stmt = self.conn.prepare(
            "SELECT level, principal_kind, principal_id
             FROM team_cal_access
             WHERE calendar_id = ?1;",
        )?;
        let mut rows = stmt.query([calendar_id])?;
        let mut acl = CalendarAcl::default();
        while let Some(row) = rows.next()? {
            let level_text: String = row.get(0)?;
            let level = AccessLevel::parse(&level_text).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid access level `{level_text}` in team_cal_access.level"
                ))
            })?;
            let kind: String = row.get(1)?;
            let principal_id: i64 = row.get(2)?;
            match kind.as_str() {
                PRINCIPAL_USER => acl.grant_user(level, principal_id),
                PRINCIPAL_GROUP => acl.grant_group(level, principal_id),
                other => {
                    return Err(RepoError::InvalidData(format!(
                        "invalid principal kind `{other}` in team_cal_access.principal_kind"
                    )));
                }
            }
        }
        Ok(acl)
    }
}

impl TeamCalRepository for SqliteTeamCalRepository<'_> {
    fn create_calendar(&self, calendar: &TeamCal) -> RepoResult<TeamCalId> {
        calendar.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO team_cals (
                owner_id,
                title,
                description,
                external_subscription,
                external_subscription_url,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                calendar.owner_id,
                calendar.title.as_str(),
                calendar.description.as_deref(),
                bool_to_int(calendar.external_subscription),
                calendar.external_subscription_url.as_deref(),
                bool_to_int(calendar.is_deleted),
            ],
        )?;
        let id = tx.last_insert_rowid();
        write_acl(&tx, id, &calendar.acl)?;
        tx.commit()?;

        Ok(id)
    }

    fn update_calendar(&self, calendar: &TeamCal) -> RepoResult<()> {
        calendar.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE team_cals
             SET
                owner_id = ?1,
                title = ?2,
                description = ?3,
                external_subscription = ?4,
                external_subscription_url = ?5,
                is_deleted = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?7;",
            params![
                calendar.owner_id,
                calendar.title.as_str(),
                calendar.description.as_deref(),
                bool_to_int(calendar.external_subscription),
                calendar.external_subscription_url.as_deref(),
                bool_to_int(calendar.is_deleted),
                calendar.id,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "calendar",
                id: calendar.id,
            });
        }

        tx.execute(
            "DELETE FROM team_cal_access WHERE calendar_id = ?1;",
            [calendar.id],
        )?;
        write_acl(&tx, calendar.id, &calendar.acl)?;
        tx.commit()?;

        Ok(())
    }

    fn get_calendar(&self, id: TeamCalId, include_deleted: bool) -> RepoResult<Option<TeamCal>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TEAM_CAL_SELECT_SQL}
             WHERE id = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;
        let mut rows = stmt.query(params![id, bool_to_int(include_deleted)])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let mut calendar = parse_team_cal_row(row)?;
        calendar.acl = self.load_acl(calendar.id)?;
        Ok(Some(calendar))
    }

    fn list_calendars(&self, include_deleted: bool) -> RepoResult<Vec<TeamCal>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TEAM_CAL_SELECT_SQL}
             WHERE (?1 = 1 OR is_deleted = 0)
             ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([bool_to_int(include_deleted)])?;
        let mut calendars = Vec::new();
        while let Some(row) = rows.next()? {
            calendars.push(parse_team_cal_row(row)?);
        }
        for calendar in &mut calendars {
            calendar.acl = self.load_acl(calendar.id)?;
        }
        Ok(calendars)
    }

    fn soft_delete_calendar(&self, id: TeamCalId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE team_cals
             SET
                is_deleted = 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            [id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "calendar",
                id,
            });
        }
        Ok(())
    }
}

fn write_acl(tx: &Transaction<'_>, calendar_id: TeamCalId, acl: &CalendarAcl) -> RepoResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO team_cal_access (calendar_id, level, principal_kind, principal_id)
         VALUES (?1, ?2, ?3, ?4);",
    )?;
    for level in [AccessLevel::Full, AccessLevel::Readonly, AccessLevel::Minimal] {
        for user_id in acl.users(level) {
            stmt.execute(params![calendar_id, level.as_str(), PRINCIPAL_USER, user_id])?;
        }
        for group_id in acl.groups(level) {
            stmt.execute(params![calendar_id, level.as_str(), PRINCIPAL_GROUP, group_id])?;
        }
    }
    Ok(())
}

fn parse_team_cal_row(row: &Row<'_>) -> RepoResult<TeamCal> {
    let calendar = TeamCal {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        external_subscription: int_to_bool(
            row.get("external_subscription")?,
            "team_cals.external_subscription",
        )?,
        external_subscription_url: row.get("external_subscription_url")?,
        acl: CalendarAcl::default(),
        is_deleted: int_to_bool(row.get("is_deleted")?, "team_cals.is_deleted")?,
    };
    calendar.validate().map_err(|err| {
        RepoError::InvalidData(format!("calendar {} failed validation: {err}", calendar.id))
    })?;
    Ok(calendar)
}
