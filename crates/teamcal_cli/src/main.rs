//! `teamcal` command line entry point.
//!
//! # Responsibility
//! - Resolve the base directory, load `teamcal.toml` and start logging.
//! - Dispatch subcommands to `commands::*` on behalf of an acting user.
//! - Turn any failure into a logged, boxed error report and a failing exit code.

mod commands;
mod config;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use commands::calendar::Grantee;
use commands::event::NewEvent;
use commands::Session;
use config::{resolve_base_dir, BaseDirSources, TeamCalConfig};
use log::{error, info};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use teamcal_core::db::DbError;
use teamcal_core::{default_log_level, init_logging, CalEventListQuery};

const LOG_DIR_NAME: &str = "logs";

#[derive(Parser)]
#[command(name = "teamcal", version)]
#[command(about = "Team calendars with per-calendar access rights")]
struct Cli {
    /// Directory holding teamcal.toml, the database and logs
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error (overrides teamcal.toml)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Create the base directory when it does not exist yet
    #[arg(long, global = true)]
    init: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
    /// Manage groups and memberships
    Group {
        #[command(subcommand)]
        command: GroupCommand,
    },
    /// Manage team calendars and their access lists
    Calendar {
        #[command(subcommand)]
        command: CalendarCommand,
    },
    /// Manage calendar events
    Event {
        #[command(subcommand)]
        command: EventCommand,
    },
    /// Show what a user may do with an event
    Access {
        #[command(flatten)]
        actor: Actor,
        event_id: i64,
    },
}

#[derive(Args)]
struct Actor {
    /// Username the command acts for
    #[arg(long = "as", value_name = "USERNAME")]
    username: String,
}

#[derive(Subcommand)]
enum UserCommand {
    Add {
        username: String,
        #[arg(long)]
        display_name: Option<String>,
    },
}

#[derive(Subcommand)]
enum GroupCommand {
    Add { name: String },
    Join { group: String, username: String },
}

#[derive(Subcommand)]
enum CalendarCommand {
    Add {
        #[command(flatten)]
        actor: Actor,
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Makes the calendar a read-only external subscription
        #[arg(long)]
        subscription_url: Option<String>,
    },
    /// Set the access level of a user or group; `none` removes it
    Grant {
        #[command(flatten)]
        actor: Actor,
        calendar_id: i64,
        /// full|readonly|minimal|none
        #[arg(long)]
        level: String,
        #[arg(long, conflicts_with = "group", required_unless_present = "group")]
        user: Option<String>,
        #[arg(long)]
        group: Option<String>,
    },
    List {
        #[command(flatten)]
        actor: Actor,
    },
}

#[derive(Subcommand)]
enum EventCommand {
    Add {
        #[command(flatten)]
        actor: Actor,
        calendar_id: i64,
        subject: String,
        /// Start, epoch milliseconds
        #[arg(long)]
        start: i64,
        /// End, epoch milliseconds (default: one hour after start)
        #[arg(long)]
        end: Option<i64>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        note: Option<String>,
        #[arg(long)]
        all_day: bool,
    },
    Show {
        #[command(flatten)]
        actor: Actor,
        id: i64,
    },
    List {
        #[command(flatten)]
        actor: Actor,
        /// Only these calendars (repeatable)
        #[arg(long = "calendar")]
        calendars: Vec<i64>,
        /// Events ending at or after this epoch millisecond
        #[arg(long)]
        from: Option<i64>,
        /// Events starting before this epoch millisecond
        #[arg(long)]
        until: Option<i64>,
        #[arg(long)]
        limit: Option<u32>,
    },
    Delete {
        #[command(flatten)]
        actor: Actor,
        id: i64,
    },
    Restore {
        #[command(flatten)]
        actor: Actor,
        id: i64,
    },
    History {
        #[command(flatten)]
        actor: Actor,
        id: i64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=app_run module=cli status=error error={err:#}");
            eprintln!("{}", render_error_banner(&err));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let sources = BaseDirSources::from_process(cli.base_dir)?;
    let base_dir = resolve_base_dir(&sources, cli.init)?;
    let config = TeamCalConfig::load(&base_dir)?;

    let level = cli
        .log_level
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| default_log_level().to_string());
    init_logging(&level, base_dir.join(LOG_DIR_NAME)).context("failed to start logging")?;
    info!(
        "event=app_run module=cli status=start base_dir={}",
        base_dir.display()
    );

    let session = Session::open(&config.database_path(&base_dir), config.demo_username.clone())?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    dispatch(&session, cli.command, &mut out)?;
    out.flush()?;

    info!("event=app_run module=cli status=ok");
    Ok(())
}

fn dispatch(session: &Session, command: Commands, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::User {
            command:
                UserCommand::Add {
                    username,
                    display_name,
                },
        } => commands::user::add_user(session, &username, display_name, out),
        Commands::Group { command } => match command {
            GroupCommand::Add { name } => commands::user::add_group(session, &name, out),
            GroupCommand::Join { group, username } => {
                commands::user::join_group(session, &group, &username, out)
            }
        },
        Commands::Calendar { command } => match command {
            CalendarCommand::Add {
                actor,
                title,
                description,
                subscription_url,
            } => commands::calendar::add_calendar(
                session,
                &actor.username,
                &title,
                description,
                subscription_url,
                out,
            ),
            CalendarCommand::Grant {
                actor,
                calendar_id,
                level,
                user,
                group,
            } => {
                let grantee = match (&user, &group) {
                    (Some(user), _) => Grantee::User(user),
                    (None, Some(group)) => Grantee::Group(group),
                    (None, None) => anyhow::bail!("either --user or --group is required"),
                };
                commands::calendar::grant(
                    session,
                    &actor.username,
                    calendar_id,
                    &level,
                    grantee,
                    out,
                )
            }
            CalendarCommand::List { actor } => {
                commands::calendar::list_calendars(session, &actor.username, out)
            }
        },
        Commands::Event { command } => match command {
            EventCommand::Add {
                actor,
                calendar_id,
                subject,
                start,
                end,
                location,
                note,
                all_day,
            } => commands::event::add_event(
                session,
                &actor.username,
                NewEvent {
                    calendar_id,
                    subject,
                    start_ms: start,
                    end_ms: end,
                    location,
                    note,
                    all_day,
                },
                out,
            ),
            EventCommand::Show { actor, id } => {
                commands::event::show_event(session, &actor.username, id, out)
            }
            EventCommand::List {
                actor,
                calendars,
                from,
                until,
                limit,
            } => {
                let query = CalEventListQuery {
                    calendar_ids: calendars,
                    from_ms: from,
                    until_ms: until,
                    limit,
                    ..CalEventListQuery::default()
                };
                commands::event::list_events(session, &actor.username, &query, out)
            }
            EventCommand::Delete { actor, id } => {
                commands::event::delete_event(session, &actor.username, id, out)
            }
            EventCommand::Restore { actor, id } => {
                commands::event::restore_event(session, &actor.username, id, out)
            }
            EventCommand::History { actor, id } => {
                commands::event::history(session, &actor.username, id, out)
            }
        },
        Commands::Access { actor, event_id } => {
            commands::access::show_access(session, &actor.username, event_id, out)
        }
    }
}

fn is_database_busy(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<DbError>())
        .any(DbError::is_busy)
}

fn render_error_banner(err: &anyhow::Error) -> String {
    let mut lines = vec!["teamcal failed".to_string(), String::new()];
    lines.extend(err.chain().map(|cause| cause.to_string()));
    if is_database_busy(err) {
        lines.push(String::new());
        lines.push("hint: the database is locked; another teamcal process may be using it".into());
    }

    let width = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0);
    let border = format!("+{}+", "-".repeat(width + 2));
    let mut banner = vec![border.clone()];
    banner.extend(
        lines
            .iter()
            .map(|line| format!("| {line}{} |", " ".repeat(width - line.chars().count()))),
    );
    banner.push(border);
    banner.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{is_database_busy, render_error_banner, Cli};
    use clap::{CommandFactory, Parser};
    use teamcal_core::db::DbError;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn grant_needs_a_grantee() {
        let parsed = Cli::try_parse_from([
            "teamcal", "calendar", "grant", "--as", "anna", "1", "--level", "full",
        ]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from([
            "teamcal", "calendar", "grant", "--as", "anna", "1", "--level", "full", "--user",
            "ben", "--group", "crew",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "teamcal",
            "event",
            "list",
            "--as",
            "anna",
            "--calendar",
            "1",
            "--calendar",
            "2",
            "--base-dir",
            "/tmp/tc",
            "--init",
        ])
        .unwrap();
        assert!(cli.init);
        assert_eq!(cli.base_dir.as_deref(), Some(std::path::Path::new("/tmp/tc")));
    }

    #[test]
    fn banner_boxes_every_cause() {
        let err = anyhow::anyhow!("inner").context("outer");
        let banner = render_error_banner(&err);
        let lines: Vec<&str> = banner.lines().collect();
        assert!(lines.first().unwrap().starts_with("+-"));
        assert!(banner.contains("| outer"));
        assert!(banner.contains("| inner"));
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|line| line.chars().count() == width));
        assert!(!banner.contains("hint:"));
    }

    #[test]
    fn busy_database_gets_a_hint() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        let err = anyhow::Error::new(DbError::Sqlite(busy)).context("failed to open database");
        assert!(is_database_busy(&err));
        assert!(render_error_banner(&err).contains("another teamcal process"));
    }
}
