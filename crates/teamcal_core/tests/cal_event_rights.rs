use teamcal_core::{
    AccessLevel, CalEvent, CalEventRight, OperationType, TeamCal, User, UserGroupCache,
};

const OWNER: i64 = 1;
const FULL: i64 = 2;
const READONLY: i64 = 3;
const MINIMAL: i64 = 4;
const STRANGER: i64 = 5;
const FULL_GROUP_MEMBER: i64 = 6;
const MINIMAL_GROUP_MEMBER: i64 = 7;
const DEMO: i64 = 8;

const EDITORS: i64 = 70;
const GUESTS: i64 = 71;

fn user(id: i64) -> User {
    let mut user = User::new(if id == DEMO {
        "demo".to_string()
    } else {
        format!("user{id}")
    });
    user.id = id;
    user
}

fn team_calendar() -> TeamCal {
    let mut calendar = TeamCal::new(OWNER, "Team");
    calendar.id = 10;
    calendar.acl.grant_user(AccessLevel::Full, FULL);
    calendar.acl.grant_user(AccessLevel::Readonly, READONLY);
    calendar.acl.grant_user(AccessLevel::Minimal, MINIMAL);
    calendar.acl.grant_group(AccessLevel::Full, EDITORS);
    calendar.acl.grant_group(AccessLevel::Minimal, GUESTS);
    calendar
}

fn checker() -> UserGroupCache {
    let mut cache = UserGroupCache::new(Some("demo".to_string()));
    cache.add_membership(FULL_GROUP_MEMBER, EDITORS);
    cache.add_membership(MINIMAL_GROUP_MEMBER, GUESTS);
    cache
}

struct Expected {
    user_id: i64,
    select: bool,
    write: bool,
    history: bool,
    minimal: bool,
}

#[test]
fn team_calendar_policy_table() {
    let checker = checker();
    let right = CalEventRight::new(&checker);
    let calendar = team_calendar();
    let event = CalEvent::new(calendar.id, "Planning", 1_000, 2_000);

    let table = [
        Expected { user_id: OWNER, select: true, write: true, history: true, minimal: false },
        Expected { user_id: FULL, select: true, write: true, history: true, minimal: false },
        Expected { user_id: READONLY, select: true, write: false, history: true, minimal: false },
        Expected { user_id: MINIMAL, select: true, write: false, history: false, minimal: true },
        Expected { user_id: STRANGER, select: false, write: false, history: false, minimal: false },
        Expected {
            user_id: FULL_GROUP_MEMBER,
            select: true,
            write: true,
            history: true,
            minimal: false,
        },
        Expected {
            user_id: MINIMAL_GROUP_MEMBER,
            select: true,
            write: false,
            history: false,
            minimal: true,
        },
        Expected { user_id: DEMO, select: false, write: true, history: false, minimal: false },
    ];

    for row in table {
        let user = user(row.user_id);
        let cal = Some(&calendar);
        assert_eq!(
            right.has_select_access_to(&user, &event, cal),
            row.select,
            "select for user {}",
            row.user_id
        );
        assert_eq!(
            right.has_insert_access_to(&user, &event, cal),
            row.write,
            "insert for user {}",
            row.user_id
        );
        assert_eq!(
            right.has_update_access(&user, Some(&event), Some(&event), cal),
            row.write,
            "update for user {}",
            row.user_id
        );
        assert_eq!(
            right.has_delete_access(&user, Some(&event), Some(&event), cal),
            row.write,
            "delete for user {}",
            row.user_id
        );
        assert_eq!(
            right.has_history_access(&user, Some(&event), cal),
            row.history,
            "history for user {}",
            row.user_id
        );
        assert_eq!(
            right.has_minimal_access(cal, row.user_id),
            row.minimal,
            "minimal for user {}",
            row.user_id
        );
    }
}

#[test]
fn external_subscription_is_read_only_for_everybody() {
    let checker = checker();
    let right = CalEventRight::new(&checker);
    let mut feed = TeamCal::subscription(OWNER, "Holidays", "https://example.org/holidays.ics");
    feed.id = 20;
    feed.acl.grant_user(AccessLevel::Full, FULL);
    let event = CalEvent::new(feed.id, "New Year", 0, 86_400_000);

    for id in [OWNER, FULL, DEMO] {
        let user = user(id);
        assert!(!right.has_insert_access_to(&user, &event, Some(&feed)), "user {id}");
        assert!(
            !right.has_update_access(&user, Some(&event), None, Some(&feed)),
            "user {id}"
        );
        assert!(
            !right.has_delete_access(&user, Some(&event), None, Some(&feed)),
            "user {id}"
        );
    }
    assert!(right.has_select_access_to(&user(OWNER), &event, Some(&feed)));
    assert!(right.has_history_access(&user(OWNER), Some(&event), Some(&feed)));
    assert!(right.has_select_access_to(&user(FULL), &event, Some(&feed)));
}

#[test]
fn strongest_grant_wins_when_levels_overlap() {
    let checker = checker();
    let right = CalEventRight::new(&checker);
    let mut calendar = team_calendar();
    calendar.acl.grant_user(AccessLevel::Minimal, READONLY);
    calendar.acl.grant_user(AccessLevel::Minimal, FULL_GROUP_MEMBER);
    let event = CalEvent::new(calendar.id, "Planning", 0, 10);

    assert!(!right.has_minimal_access(Some(&calendar), READONLY));
    assert!(right.has_history_access(&user(READONLY), Some(&event), Some(&calendar)));
    assert!(!right.has_minimal_access(Some(&calendar), FULL_GROUP_MEMBER));
    assert!(right.has_update_access(
        &user(FULL_GROUP_MEMBER),
        Some(&event),
        None,
        Some(&calendar)
    ));
}

#[test]
fn general_rights_do_not_need_a_calendar() {
    let checker = checker();
    let right = CalEventRight::new(&checker);
    let stranger = user(STRANGER);

    assert!(right.has_select_access(&stranger));
    assert!(right.has_insert_access(&stranger));
    assert!(right.has_history_access(&stranger, None, None));
}

#[test]
fn check_maps_every_operation() {
    let checker = checker();
    let right = CalEventRight::new(&checker);
    let calendar = team_calendar();
    let event = CalEvent::new(calendar.id, "Planning", 0, 10);
    let minimal = user(MINIMAL);

    assert!(right
        .check(&minimal, OperationType::Select, &event, None, Some(&calendar))
        .is_ok());
    for operation in [
        OperationType::Insert,
        OperationType::Update,
        OperationType::Delete,
        OperationType::History,
    ] {
        let err = right
            .check(&minimal, operation, &event, None, Some(&calendar))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "user {MINIMAL} has no {} access to calendar {}",
                operation.as_str(),
                calendar.id
            )
        );
    }
}
