use super::{yes_no, Session};
use anyhow::{bail, Result};
use std::io::Write;
use teamcal_core::{CalEventId, CalEventRepository, CalEventRight, TeamCalRepository};

/// Prints what `as_user` may do with event `id`, without touching it.
pub fn show_access(
    session: &Session,
    as_user: &str,
    id: CalEventId,
    out: &mut impl Write,
) -> Result<()> {
    let user = session.acting_user(as_user)?;
    let Some(event) = session.events()?.get_event(id, true)? else {
        bail!("event {id} not found");
    };
    let calendar = session.calendars()?.get_calendar(event.calendar_id, false)?;
    let checker = session.checker()?;
    let right = CalEventRight::new(&checker);
    let calendar = calendar.as_ref();

    let access_type = calendar.map_or("none", |calendar| {
        right
            .team_cal_right()
            .access_type(calendar, user.id)
            .as_str()
    });
    let write = right.has_update_access(&user, Some(&event), Some(&event), calendar);

    writeln!(out, "user:     {}", user.username)?;
    writeln!(out, "event:    {id}")?;
    writeln!(out, "calendar: {}", event.calendar_id)?;
    writeln!(out, "access:   {access_type}")?;
    writeln!(
        out,
        "select:   {}",
        yes_no(right.has_select_access_to(&user, &event, calendar))
    )?;
    writeln!(
        out,
        "insert:   {}",
        yes_no(right.has_insert_access_to(&user, &event, calendar))
    )?;
    writeln!(out, "update:   {}", yes_no(write))?;
    writeln!(
        out,
        "delete:   {}",
        yes_no(right.has_delete_access(&user, Some(&event), Some(&event), calendar))
    )?;
    writeln!(
        out,
        "history:  {}",
        yes_no(right.has_history_access(&user, Some(&event), calendar))
    )?;
    writeln!(
        out,
        "minimal:  {}",
        yes_no(right.has_minimal_access(calendar, user.id))
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::show_access;
    use crate::commands::calendar::{add_calendar, grant, Grantee};
    use crate::commands::event::{add_event, NewEvent};
    use crate::commands::user::add_user;
    use crate::commands::Session;
    use teamcal_core::TeamCalRepository;

    fn field<'a>(text: &'a str, name: &str) -> &'a str {
        text.lines()
            .find_map(|line| line.strip_prefix(&format!("{name}:")))
            .map(str::trim)
            .unwrap_or_default()
    }

    #[test]
    fn access_row_reflects_level_and_demo_user() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::open(&dir.path().join("teamcal.db"), Some("demo".into())).unwrap();
        let mut sink = Vec::new();
        for name in ["anna", "ben", "demo"] {
            add_user(&session, name, None, &mut sink).unwrap();
        }
        add_calendar(&session, "anna", "Team", None, None, &mut sink).unwrap();
        grant(&session, "anna", 1, "readonly", Grantee::User("ben"), &mut sink).unwrap();
        add_event(
            &session,
            "anna",
            NewEvent {
                calendar_id: 1,
                subject: "Kickoff".to_string(),
                start_ms: 0,
                end_ms: Some(10),
                location: None,
                note: None,
                all_day: false,
            },
            &mut sink,
        )
        .unwrap();

        let mut out = Vec::new();
        show_access(&session, "ben", 1, &mut out).unwrap();
        let ben = String::from_utf8(out).unwrap();
        assert_eq!(field(&ben, "access"), "readonly");
        assert_eq!(field(&ben, "select"), "yes");
        assert_eq!(field(&ben, "update"), "no");
        assert_eq!(field(&ben, "history"), "yes");

        let mut out = Vec::new();
        show_access(&session, "demo", 1, &mut out).unwrap();
        let demo = String::from_utf8(out).unwrap();
        assert_eq!(field(&demo, "access"), "none");
        assert_eq!(field(&demo, "select"), "no");
        assert_eq!(field(&demo, "update"), "yes");
        assert_eq!(field(&demo, "minimal"), "no");
    }

    #[test]
    fn deleted_calendar_grants_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::open(&dir.path().join("teamcal.db"), None).unwrap();
        let mut sink = Vec::new();
        add_user(&session, "anna", None, &mut sink).unwrap();
        add_calendar(&session, "anna", "Team", None, None, &mut sink).unwrap();
        add_event(
            &session,
            "anna",
            NewEvent {
                calendar_id: 1,
                subject: "Kickoff".to_string(),
                start_ms: 0,
                end_ms: Some(10),
                location: None,
                note: None,
                all_day: false,
            },
            &mut sink,
        )
        .unwrap();
        session.calendars().unwrap().soft_delete_calendar(1).unwrap();

        let mut out = Vec::new();
        show_access(&session, "anna", 1, &mut out).unwrap();
        let anna = String::from_utf8(out).unwrap();
        assert_eq!(field(&anna, "access"), "none");
        assert_eq!(field(&anna, "select"), "no");
        assert_eq!(field(&anna, "update"), "no");
        assert_eq!(field(&anna, "delete"), "no");
        assert_eq!(field(&anna, "minimal"), "yes");
    }
}
