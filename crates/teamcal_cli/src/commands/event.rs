use super::Session;
use anyhow::{bail, Result};
use std::io::Write;
use teamcal_core::{CalEvent, CalEventId, CalEventListQuery, TeamCalId, UserRepository};

const DEFAULT_DURATION_MS: i64 = 60 * 60 * 1000;

/// Fields of `event add`; times are epoch milliseconds.
pub struct NewEvent {
    pub calendar_id: TeamCalId,
    pub subject: String,
    pub start_ms: i64,
    pub end_ms: Option<i64>,
    pub location: Option<String>,
    pub note: Option<String>,
    pub all_day: bool,
}

pub fn add_event(
    session: &Session,
    as_user: &str,
    new: NewEvent,
    out: &mut impl Write,
) -> Result<()> {
    let user = session.acting_user(as_user)?;
    let end_ms = match new.end_ms {
        Some(end_ms) => end_ms,
        None => match new.start_ms.checked_add(DEFAULT_DURATION_MS) {
            Some(end_ms) => end_ms,
            None => bail!(
                "start {} leaves no room for the default one-hour duration; pass --end",
                new.start_ms
            ),
        },
    };
    let mut event = CalEvent::new(new.calendar_id, new.subject, new.start_ms, end_ms);
    event.location = new.location;
    event.note = new.note;
    event.all_day = new.all_day;

    let id = session.event_service()?.create_event(&user, &event)?;
    writeln!(out, "created event {id} uid={}", event.uid)?;
    Ok(())
}

pub fn show_event(
    session: &Session,
    as_user: &str,
    id: CalEventId,
    out: &mut impl Write,
) -> Result<()> {
    let user = session.acting_user(as_user)?;
    let Some(event) = session.event_service()?.get_event(&user, id)? else {
        bail!("event {id} not found");
    };

    writeln!(out, "id:       {}", event.id)?;
    writeln!(out, "uid:      {}", event.uid)?;
    writeln!(out, "calendar: {}", event.calendar_id)?;
    writeln!(out, "subject:  {}", display_subject(&event))?;
    writeln!(out, "start:    {}", event.start_ms)?;
    writeln!(out, "end:      {}", event.end_ms)?;
    writeln!(out, "all day:  {}", super::yes_no(event.all_day))?;
    if let Some(location) = &event.location {
        writeln!(out, "location: {location}")?;
    }
    if let Some(note) = &event.note {
        writeln!(out, "note:     {note}")?;
    }
    Ok(())
}

pub fn list_events(
    session: &Session,
    as_user: &str,
    query: &CalEventListQuery,
    out: &mut impl Write,
) -> Result<()> {
    let user = session.acting_user(as_user)?;
    let events = session.event_service()?.list_events(&user, query)?;
    if events.is_empty() {
        writeln!(out, "no events")?;
        return Ok(());
    }
    for event in events {
        writeln!(
            out,
            "{}\t{}\t{}..{}\t{}",
            event.id,
            event.calendar_id,
            event.start_ms,
            event.end_ms,
            display_subject(&event)
        )?;
    }
    Ok(())
}

pub fn delete_event(
    session: &Session,
    as_user: &str,
    id: CalEventId,
    out: &mut impl Write,
) -> Result<()> {
    let user = session.acting_user(as_user)?;
    session.event_service()?.delete_event(&user, id)?;
    writeln!(out, "deleted event {id}")?;
    Ok(())
}

pub fn restore_event(
    session: &Session,
    as_user: &str,
    id: CalEventId,
    out: &mut impl Write,
) -> Result<()> {
    let user = session.acting_user(as_user)?;
    session.event_service()?.restore_event(&user, id)?;
    writeln!(out, "restored event {id}")?;
    Ok(())
}

pub fn history(
    session: &Session,
    as_user: &str,
    id: CalEventId,
    out: &mut impl Write,
) -> Result<()> {
    let user = session.acting_user(as_user)?;
    let entries = session.event_service()?.event_history(&user, id)?;
    let users = session.users()?;
    for entry in entries {
        let actor = users
            .get_user(entry.user_id)?
            .map_or_else(|| entry.user_id.to_string(), |user| user.username);
        let fields = if entry.changed_fields.is_empty() {
            String::new()
        } else {
            format!("\t{}", entry.changed_fields.join(","))
        };
        writeln!(
            out,
            "{}\t{}\t{actor}{fields}",
            entry.timestamp_ms,
            entry.operation.as_str()
        )?;
    }
    Ok(())
}

/// Minimal-access copies carry no subject.
fn display_subject(event: &CalEvent) -> &str {
    if event.subject.is_empty() {
        "(busy)"
    } else {
        &event.subject
    }
}

#[cfg(test)]
mod tests {
    use super::{add_event, delete_event, history, list_events, show_event, NewEvent};
    use crate::commands::calendar::{add_calendar, grant, Grantee};
    use crate::commands::user::add_user;
    use crate::commands::Session;
    use teamcal_core::CalEventListQuery;

    fn seeded(dir: &tempfile::TempDir) -> Session {
        let session = Session::open(&dir.path().join("teamcal.db"), None).unwrap();
        let mut sink = Vec::new();
        for name in ["anna", "ben"] {
            add_user(&session, name, None, &mut sink).unwrap();
        }
        add_calendar(&session, "anna", "Team", None, None, &mut sink).unwrap();
        grant(&session, "anna", 1, "minimal", Grantee::User("ben"), &mut sink).unwrap();
        add_event(
            &session,
            "anna",
            NewEvent {
                calendar_id: 1,
                subject: "Review".to_string(),
                start_ms: 1_000,
                end_ms: None,
                location: None,
                note: Some("agenda".to_string()),
                all_day: false,
            },
            &mut sink,
        )
        .unwrap();
        session
    }

    fn run<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> anyhow::Result<()>,
    {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn minimal_reader_sees_busy_slot() {
        let dir = tempfile::tempdir().unwrap();
        let session = seeded(&dir);
        let query = CalEventListQuery::default();

        let owner_view = run(|out| list_events(&session, "anna", &query, out));
        assert_eq!(owner_view, "1\t1\t1000..3601000\tReview\n");

        let guest_view = run(|out| list_events(&session, "ben", &query, out));
        assert_eq!(guest_view, "1\t1\t1000..3601000\t(busy)\n");

        let detail = run(|out| show_event(&session, "ben", 1, out));
        assert!(detail.contains("subject:  (busy)"));
        assert!(!detail.contains("agenda"));
    }

    #[test]
    fn history_lists_actor_and_operation() {
        let dir = tempfile::tempdir().unwrap();
        let session = seeded(&dir);

        run(|out| delete_event(&session, "anna", 1, out));
        let text = run(|out| history(&session, "anna", 1, out));
        let operations: Vec<&str> = text
            .lines()
            .map(|line| line.split('\t').nth(1).unwrap_or_default())
            .collect();
        assert_eq!(operations, vec!["insert", "delete"]);
        assert!(text.lines().all(|line| line.contains("\tanna")));

        assert!(history(&session, "ben", 1, &mut Vec::new()).is_err());
    }

    #[test]
    fn start_near_max_needs_explicit_end() {
        let dir = tempfile::tempdir().unwrap();
        let session = seeded(&dir);
        let late = |end_ms| NewEvent {
            calendar_id: 1,
            subject: "Late".to_string(),
            start_ms: i64::MAX - 10,
            end_ms,
            location: None,
            note: None,
            all_day: false,
        };

        let err = add_event(&session, "anna", late(None), &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("pass --end"));

        let created = run(|out| add_event(&session, "anna", late(Some(i64::MAX)), out));
        assert!(created.starts_with("created event 2 "));
    }
}
