use super::Session;
use anyhow::{anyhow, bail, Result};
use std::io::Write;
use teamcal_core::{AccessLevel, TeamCal, TeamCalId, UserRepository};

/// Who a grant applies to.
pub enum Grantee<'a> {
    User(&'a str),
    Group(&'a str),
}

pub fn add_calendar(
    session: &Session,
    as_user: &str,
    title: &str,
    description: Option<String>,
    subscription_url: Option<String>,
    out: &mut impl Write,
) -> Result<()> {
    let owner = session.acting_user(as_user)?;
    let mut calendar = match subscription_url {
        Some(url) => TeamCal::subscription(owner.id, title, url),
        None => TeamCal::new(owner.id, title),
    };
    calendar.description = description;

    let id = session
        .calendar_service()?
        .create_calendar(&owner, &calendar)?;
    writeln!(out, "created calendar {id} `{title}`")?;
    Ok(())
}

/// Sets the level of a user or group on a calendar. `none` removes it.
pub fn grant(
    session: &Session,
    as_user: &str,
    calendar_id: TeamCalId,
    level: &str,
    grantee: Grantee<'_>,
    out: &mut impl Write,
) -> Result<()> {
    let level = match level.trim() {
        "none" => None,
        other => Some(AccessLevel::parse(other).ok_or_else(|| {
            anyhow!("unknown access level `{other}`; expected full|readonly|minimal|none")
        })?),
    };

    let actor = session.acting_user(as_user)?;
    let service = session.calendar_service()?;
    let Some(mut calendar) = service.get_calendar(&actor, calendar_id)? else {
        bail!("calendar {calendar_id} not found");
    };

    let label = match grantee {
        Grantee::User(username) => {
            let user = session.acting_user(username)?;
            calendar.acl.revoke_user(user.id);
            if let Some(level) = level {
                calendar.acl.grant_user(level, user.id);
            }
            format!("user `{username}`")
        }
        Grantee::Group(name) => {
            let group = session
                .users()?
                .find_group_by_name(name)?
                .ok_or_else(|| anyhow!("unknown group `{name}`"))?;
            calendar.acl.revoke_group(group.id);
            if let Some(level) = level {
                calendar.acl.grant_group(level, group.id);
            }
            format!("group `{name}`")
        }
    };

    service.update_calendar(&actor, &calendar)?;
    writeln!(
        out,
        "calendar {calendar_id}: {label} -> {}",
        level.map_or("none", AccessLevel::as_str)
    )?;
    Ok(())
}

pub fn list_calendars(session: &Session, as_user: &str, out: &mut impl Write) -> Result<()> {
    let user = session.acting_user(as_user)?;
    let calendars = session.calendar_service()?.list_calendars(&user)?;
    if calendars.is_empty() {
        writeln!(out, "no calendars")?;
        return Ok(());
    }
    for (calendar, access) in calendars {
        let marker = if calendar.external_subscription {
            " [subscription]"
        } else {
            ""
        };
        writeln!(
            out,
            "{}\t{}\t{}{marker}",
            calendar.id,
            access.as_str(),
            calendar.title
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{add_calendar, grant, list_calendars, Grantee};
    use crate::commands::user::{add_group, add_user, join_group};
    use crate::commands::Session;

    fn session(dir: &tempfile::TempDir) -> Session {
        let session = Session::open(&dir.path().join("teamcal.db"), None).unwrap();
        let mut sink = Vec::new();
        for name in ["anna", "ben", "cleo"] {
            add_user(&session, name, None, &mut sink).unwrap();
        }
        add_calendar(&session, "anna", "Team", None, None, &mut sink).unwrap();
        session
    }

    fn listing(session: &Session, user: &str) -> String {
        let mut out = Vec::new();
        list_calendars(session, user, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn grant_replaces_previous_level() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(&dir);
        let mut out = Vec::new();

        grant(&session, "anna", 1, "minimal", Grantee::User("ben"), &mut out).unwrap();
        assert_eq!(listing(&session, "ben"), "1\tminimal\tTeam\n");

        grant(&session, "anna", 1, "readonly", Grantee::User("ben"), &mut out).unwrap();
        assert_eq!(listing(&session, "ben"), "1\treadonly\tTeam\n");

        grant(&session, "anna", 1, "none", Grantee::User("ben"), &mut out).unwrap();
        assert_eq!(listing(&session, "ben"), "no calendars\n");
    }

    #[test]
    fn group_grant_reaches_members() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(&dir);
        let mut out = Vec::new();
        add_group(&session, "crew", &mut out).unwrap();
        join_group(&session, "crew", "cleo", &mut out).unwrap();

        grant(&session, "anna", 1, "full", Grantee::Group("crew"), &mut out).unwrap();
        assert_eq!(listing(&session, "cleo"), "1\tfull\tTeam\n");
        assert_eq!(listing(&session, "anna"), "1\towner\tTeam\n");
    }

    #[test]
    fn only_owner_may_grant() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(&dir);
        let mut out = Vec::new();
        grant(&session, "anna", 1, "full", Grantee::User("ben"), &mut out).unwrap();

        let err = grant(&session, "ben", 1, "full", Grantee::User("cleo"), &mut out).unwrap_err();
        assert!(err.to_string().contains("access denied"));

        let err = grant(&session, "anna", 1, "admin", Grantee::User("cleo"), &mut out).unwrap_err();
        assert!(err.to_string().contains("unknown access level"));
    }

    #[test]
    fn subscriptions_are_marked() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(&dir);
        let mut out = Vec::new();
        add_calendar(
            &session,
            "anna",
            "Holidays",
            None,
            Some("https://example.org/h.ics".to_string()),
            &mut out,
        )
        .unwrap();

        assert_eq!(
            listing(&session, "anna"),
            "1\towner\tTeam\n2\towner\tHolidays [subscription]\n"
        );
    }
}
