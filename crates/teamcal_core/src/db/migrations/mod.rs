//! Schema migrations, tracked through `PRAGMA user_version`.
//!
//! Versions are contiguous starting at 1. A database is either at
//! [`latest_version`] or gets every missing step applied inside one
//! immediate transaction, so two CLI processes never half-migrate a file.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, Transaction, TransactionBehavior};

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "users",
        sql: include_str!("0001_users.sql"),
    },
    Migration {
        version: 2,
        name: "team_cals",
        sql: include_str!("0002_team_cals.sql"),
    },
    Migration {
        version: 3,
        name: "cal_events",
        sql: include_str!("0003_cal_events.sql"),
    },
];

/// Returns the schema version this build migrates databases to.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

/// Brings `conn` up to [`latest_version`].
///
/// # Errors
/// - [`DbError::UnsupportedSchemaVersion`] when the file was written by a
///   newer build.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = current_user_version(conn)?;
    let pending = pending_since(from)?;
    if pending.is_empty() {
        return Ok(());
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    // Re-read under the write lock: another process may have migrated meanwhile.
    let locked_from = current_user_version(&tx)?;
    for migration in pending_since(locked_from)? {
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", migration.version)?;
        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;
    Ok(())
}

fn pending_since(version: u32) -> DbResult<&'static [Migration]> {
    let latest = latest_version();
    if version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: version,
            latest_supported: latest,
        });
    }
    let applied = MIGRATIONS
        .iter()
        .take_while(|migration| migration.version <= version)
        .count();
    Ok(&MIGRATIONS[applied..])
}

#[cfg(test)]
mod tests {
    use super::{latest_version, pending_since, MIGRATIONS};
    use crate::db::DbError;

    #[test]
    fn versions_are_contiguous_from_one() {
        for (index, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, index + 1, "{}", migration.name);
        }
    }

    #[test]
    fn pending_steps_follow_current_version() {
        assert_eq!(pending_since(0).unwrap().len(), MIGRATIONS.len());
        assert_eq!(pending_since(1).unwrap()[0].name, "team_cals");
        assert!(pending_since(latest_version()).unwrap().is_empty());
        assert!(matches!(
            pending_since(latest_version() + 1),
            Err(DbError::UnsupportedSchemaVersion { .. })
        ));
    }
}
