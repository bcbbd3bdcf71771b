//! Calendar event model and change history records.
//!
//! # Invariants
//! - `uid` is stable and never reused for another event.
//! - `end_ms` is never earlier than `start_ms`.
//! - `is_deleted` is the source of truth for tombstone state.

use super::calendar::TeamCalId;
use super::user::UserId;
use super::ModelValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CalEventId = i64;

/// One appointment inside a team calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalEvent {
    /// Storage id. `0` until the record has been persisted.
    pub id: CalEventId,
    /// iCalendar UID, kept stable across moves between calendars.
    pub uid: Uuid,
    pub calendar_id: TeamCalId,
    pub subject: String,
    pub location: Option<String>,
    pub note: Option<String>,
    /// Unix epoch milliseconds.
    pub start_ms: i64,
    /// Unix epoch milliseconds, `>= start_ms`.
    pub end_ms: i64,
    pub all_day: bool,
    pub is_deleted: bool,
}

impl CalEvent {
    /// Creates an unsaved event with a generated UID.
    pub fn new(
        calendar_id: TeamCalId,
        subject: impl Into<String>,
        start_ms: i64,
        end_ms: i64,
    ) -> Self {
        Self {
            id: 0,
            uid: Uuid::new_v4(),
            calendar_id,
            subject: subject.into(),
            location: None,
            note: None,
            start_ms,
            end_ms,
            all_day: false,
            is_deleted: false,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.subject.trim().is_empty() {
            return Err(ModelValidationError::EmptyEventSubject);
        }
        if self.end_ms < self.start_ms {
            return Err(ModelValidationError::InvalidEventRange {
                start_ms: self.start_ms,
                end_ms: self.end_ms,
            });
        }
        Ok(())
    }

    /// Copy handed to users with minimal access: the slot is visible,
    /// its content is not.
    pub fn minimal_copy(&self) -> Self {
        Self {
            id: self.id,
            uid: self.uid,
            calendar_id: self.calendar_id,
            subject: String::new(),
            location: None,
            note: None,
            start_ms: self.start_ms,
            end_ms: self.end_ms,
            all_day: self.all_day,
            is_deleted: self.is_deleted,
        }
    }

    /// Names of the fields that differ between `self` and `other`.
    pub fn changed_fields(&self, other: &CalEvent) -> Vec<String> {
        let mut fields = Vec::new();
        if self.calendar_id != other.calendar_id {
            fields.push("calendar_id");
        }
        if self.subject != other.subject {
            fields.push("subject");
        }
        if self.location != other.location {
            fields.push("location");
        }
        if self.note != other.note {
            fields.push("note");
        }
        if self.start_ms != other.start_ms {
            fields.push("start_ms");
        }
        if self.end_ms != other.end_ms {
            fields.push("end_ms");
        }
        if self.all_day != other.all_day {
            fields.push("all_day");
        }
        fields.into_iter().map(str::to_string).collect()
    }
}

/// Kind of write recorded in the event history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOperation {
    Insert,
    Update,
    Delete,
    Restore,
}

impl EventOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Restore => "restore",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "insert" => Some(Self::Insert),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            "restore" => Some(Self::Restore),
            _ => None,
        }
    }
}

/// One recorded write on an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHistoryEntry {
    pub id: i64,
    pub event_id: CalEventId,
    /// User that performed the write.
    pub user_id: UserId,
    pub operation: EventOperation,
    /// Field names touched by an update; empty for other operations.
    pub changed_fields: Vec<String>,
    /// Unix epoch milliseconds.
    pub timestamp_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::{CalEvent, EventOperation};
    use crate::model::ModelValidationError;

    #[test]
    fn rejects_inverted_range_and_blank_subject() {
        let event = CalEvent::new(1, "Standup", 200, 100);
        assert_eq!(
            event.validate(),
            Err(ModelValidationError::InvalidEventRange {
                start_ms: 200,
                end_ms: 100
            })
        );
        let blank = CalEvent::new(1, "  ", 100, 200);
        assert_eq!(blank.validate(), Err(ModelValidationError::EmptyEventSubject));
    }

    #[test]
    fn zero_length_event_is_valid() {
        assert!(CalEvent::new(1, "Reminder", 100, 100).validate().is_ok());
    }

    #[test]
    fn minimal_copy_hides_content_and_keeps_slot() {
        let mut event = CalEvent::new(4, "Salary talk", 1_000, 2_000);
        event.id = 9;
        event.location = Some("Room 3".to_string());
        event.note = Some("bring numbers".to_string());
        event.all_day = true;

        let copy = event.minimal_copy();
        assert_eq!(copy.id, 9);
        assert_eq!(copy.uid, event.uid);
        assert_eq!(copy.calendar_id, 4);
        assert_eq!((copy.start_ms, copy.end_ms), (1_000, 2_000));
        assert!(copy.all_day);
        assert!(copy.subject.is_empty());
        assert!(copy.location.is_none());
        assert!(copy.note.is_none());
    }

    #[test]
    fn changed_fields_lists_differences_in_stable_order() {
        let before = CalEvent::new(1, "Review", 100, 200);
        let mut after = before.clone();
        after.end_ms = 300;
        after.subject = "Design review".to_string();
        assert_eq!(after.changed_fields(&before), vec!["subject", "end_ms"]);
        assert!(before.changed_fields(&before).is_empty());
    }

    #[test]
    fn operation_strings_roundtrip() {
        for op in [
            EventOperation::Insert,
            EventOperation::Update,
            EventOperation::Delete,
            EventOperation::Restore,
        ] {
            assert_eq!(EventOperation::parse(op.as_str()), Some(op));
        }
    }
}
