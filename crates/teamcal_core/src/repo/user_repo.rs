//! User/group repository contracts and SQLite implementation.

use crate::model::user::{Group, GroupId, User, UserId};
use crate::repo::{
    bool_to_int, ensure_schema, int_to_bool, map_unique_violation, RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_SELECT_SQL: &str = "SELECT id, username, display_name, is_deleted FROM users";

const USER_COLUMNS: &[&str] = &["id", "username", "display_name", "is_deleted"];
const GROUP_COLUMNS: &[&str] = &["id", "name"];
const MEMBER_COLUMNS: &[&str] = &["group_id", "user_id"];

/// Repository interface for users and group membership.
pub trait UserRepository {
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    fn list_users(&self) -> RepoResult<Vec<User>>;
    fn create_group(&self, group: &Group) -> RepoResult<GroupId>;
    fn find_group_by_name(&self, name: &str) -> RepoResult<Option<Group>>;
    /// Adds a membership. Adding an existing membership is a no-op.
    fn add_group_member(&self, group_id: GroupId, user_id: UserId) -> RepoResult<()>;
    fn remove_group_member(&self, group_id: GroupId, user_id: UserId) -> RepoResult<()>;
    /// Returns `(user_id, group_id)` pairs ordered by user then group.
    fn list_memberships(&self) -> RepoResult<Vec<(UserId, GroupId)>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema(
            conn,
            &[
                ("users", USER_COLUMNS),
                ("user_groups", GROUP_COLUMNS),
                ("group_members", MEMBER_COLUMNS),
            ],
        )?;
        Ok(Self { conn })
    }

    fn ensure_user_exists(&self, user_id: UserId) -> RepoResult<()> {
        if self.get_user(user_id)?.is_none() {
            return Err(RepoError::NotFound {
                entity: "user",
                id: user_id,
            });
        }
        Ok(())
    }

    fn ensure_group_exists(&self, group_id: GroupId) -> RepoResult<()> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM user_groups WHERE id = ?1;",
                [group_id],
                |row| row.get(0),
            )
            .optional()?;
        if found.is_none() {
            return Err(RepoError::NotFound {
                entity: "group",
                id: group_id,
            });
        }
        Ok(())
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        user.validate()?;

        self.conn
            .execute(
                "INSERT INTO users (username, display_name, is_deleted) VALUES (?1, ?2, ?3);",
                params![
                    user.username.trim(),
                    user.display_name.as_deref(),
                    bool_to_int(user.is_deleted),
                ],
            )
            .map_err(|err| {
                map_unique_violation(err, format!("username already taken: {}", user.username))
            })?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_user_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE username = ?1;"))?;
        let mut rows = stmt.query([username.trim()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_user_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_users(&self) -> RepoResult<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }

    fn create_group(&self, group: &Group) -> RepoResult<GroupId> {
        group.validate()?;

        self.conn
            .execute(
                "INSERT INTO user_groups (name) VALUES (?1);",
                [group.name.trim()],
            )
            .map_err(|err| {
                map_unique_violation(err, format!("group already exists: {}", group.name))
            })?;

        Ok(self.conn.last_insert_rowid())
    }

    fn find_group_by_name(&self, name: &str) -> RepoResult<Option<Group>> {
        let group = self
            .conn
            .query_row(
                "SELECT id, name FROM user_groups WHERE name = ?1;",
                [name.trim()],
                |row| {
                    Ok(Group {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(group)
    }

    fn add_group_member(&self, group_id: GroupId, user_id: UserId) -> RepoResult<()> {
        self.ensure_group_exists(group_id)?;
        self.ensure_user_exists(user_id)?;

        self.conn.execute(
            "INSERT OR IGNORE INTO group_members (group_id, user_id) VALUES (?1, ?2);",
            params![group_id, user_id],
        )?;
        Ok(())
    }

    fn remove_group_member(&self, group_id: GroupId, user_id: UserId) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM group_members WHERE group_id = ?1 AND user_id = ?2;",
            params![group_id, user_id],
        )?;
        Ok(())
    }

    fn list_memberships(&self) -> RepoResult<Vec<(UserId, GroupId)>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, group_id
             FROM group_members
             ORDER BY user_id ASC, group_id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut memberships = Vec::new();
        while let Some(row) = rows.next()? {
            memberships.push((row.get(0)?, row.get(1)?));
        }
        Ok(memberships)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let user = User {
        id: row.get("id")?,
        username: row.get("username")?,
        display_name: row.get("display_name")?,
        is_deleted: int_to_bool(row.get("is_deleted")?, "users.is_deleted")?,
    };
    user.validate().map_err(|err| {
        RepoError::InvalidData(format!("user {} failed validation: {err}", user.id))
    })?;
    Ok(user)
}
