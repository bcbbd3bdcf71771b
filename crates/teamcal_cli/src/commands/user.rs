use super::Session;
use anyhow::{anyhow, Result};
use std::io::Write;
use teamcal_core::{Group, User, UserRepository};

pub fn add_user(
    session: &Session,
    username: &str,
    display_name: Option<String>,
    out: &mut impl Write,
) -> Result<()> {
    let mut user = User::new(username);
    user.display_name = display_name;
    let id = session.users()?.create_user(&user)?;
    writeln!(out, "created user {id} `{username}`")?;
    Ok(())
}

pub fn add_group(session: &Session, name: &str, out: &mut impl Write) -> Result<()> {
    let id = session.users()?.create_group(&Group::new(name))?;
    writeln!(out, "created group {id} `{name}`")?;
    Ok(())
}

pub fn join_group(
    session: &Session,
    group: &str,
    username: &str,
    out: &mut impl Write,
) -> Result<()> {
    let users = session.users()?;
    let group = users
        .find_group_by_name(group)?
        .ok_or_else(|| anyhow!("unknown group `{group}`"))?;
    let user = session.acting_user(username)?;
    users.add_group_member(group.id, user.id)?;
    writeln!(out, "user `{}` joined group `{}`", user.username, group.name)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{add_group, add_user, join_group};
    use crate::commands::Session;
    use teamcal_core::AccessChecker;

    #[test]
    fn group_join_is_visible_to_checker() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::open(&dir.path().join("teamcal.db"), None).unwrap();
        let mut out = Vec::new();

        add_user(&session, "kai", Some("Kai".to_string()), &mut out).unwrap();
        add_group(&session, "ops", &mut out).unwrap();
        join_group(&session, "ops", "kai", &mut out).unwrap();

        let kai = session.acting_user("kai").unwrap();
        let checker = session.checker().unwrap();
        let groups = checker.groups_of(kai.id).cloned().unwrap_or_default();
        assert!(checker.is_member_of_any_group(kai.id, &groups));
        assert_eq!(groups.len(), 1);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("joined group `ops`"));
    }

    #[test]
    fn joining_unknown_group_fails() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::open(&dir.path().join("teamcal.db"), None).unwrap();
        let mut out = Vec::new();
        add_user(&session, "kai", None, &mut out).unwrap();

        let err = join_group(&session, "nope", "kai", &mut out).unwrap_err();
        assert_eq!(err.to_string(), "unknown group `nope`");
    }
}
