use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user-submitted symptom.
///
/// Field aliases accept the capitalised spellings written by older builds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Symptom {
    /// Assigned by the store on creation, never changes afterwards
    #[serde(alias = "ID")]
    pub id: u64,

    #[serde(alias = "Title", default)]
    pub title: String,

    #[serde(alias = "Author", default)]
    pub author: String,

    #[serde(alias = "Description", default)]
    pub description: String,
}

/// Lifecycle transitions recorded in the audit log.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    #[serde(alias = "SYMPTOM_ADDED")]
    RecordAdded,
    #[serde(alias = "SYMPTOM_REMOVED")]
    RecordRemoved,
    RecordUpdated,
    /// Any kind this build does not know about
    #[serde(other)]
    Unknown,
}

impl EventKind {
    pub fn title(&self) -> &'static str {
        match self {
            EventKind::RecordAdded => "Symptom added",
            EventKind::RecordRemoved => "Symptom removed",
            EventKind::RecordUpdated => "Symptom updated",
            EventKind::Unknown => "Unknown",
        }
    }
}

/// The value half of an event entry. The timestamp lives in the key.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StoredEvent {
    #[serde(alias = "Type")]
    pub kind: EventKind,
    #[serde(alias = "SymptomID")]
    pub record_id: u64,
}

/// An audit entry as handed back to callers.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub time: DateTime<Utc>,
    pub kind: EventKind,
    pub record_id: u64,
}

impl Event {
    pub(crate) fn from_stored(time: DateTime<Utc>, stored: StoredEvent) -> Self {
        Self {
            time,
            kind: stored.kind,
            record_id: stored.record_id,
        }
    }

    pub fn title(&self) -> &'static str {
        self.kind.title()
    }

    /// Unix `date` style rendering, e.g. `Fri Mar  1 10:00:00 UTC 2024`.
    pub fn pretty_time(&self) -> String {
        self.time.format("%a %b %e %H:%M:%S %Z %Y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_symptom_json_field_names() {
        let s = Symptom {
            id: 3,
            title: "Headache".into(),
            author: "Alice".into(),
            description: "Throbbing pain".into(),
        };
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["title"], "Headache");
        assert_eq!(json["author"], "Alice");
        assert_eq!(json["description"], "Throbbing pain");
    }

    #[test]
    fn test_symptom_accepts_legacy_fields() {
        let raw = r#"{"ID":7,"Title":"Cough","Author":"Bob","Description":"Dry"}"#;
        let s: Symptom = serde_json::from_str(raw).unwrap();
        assert_eq!(s.id, 7);
        assert_eq!(s.title, "Cough");
        assert_eq!(s.description, "Dry");
    }

    #[test]
    fn test_symptom_requires_id() {
        assert!(serde_json::from_str::<Symptom>(r#"{"title":"x"}"#).is_err());
    }

    #[test]
    fn test_event_kind_wire_names() {
        assert_eq!(serde_json::to_string(&EventKind::RecordAdded).unwrap(), "\"RECORD_ADDED\"");
        assert_eq!(serde_json::to_string(&EventKind::RecordRemoved).unwrap(), "\"RECORD_REMOVED\"");
    }

    #[test]
    fn test_stored_event_legacy_and_unknown() {
        let legacy: StoredEvent =
            serde_json::from_str(r#"{"Time":"2019-03-01T10:00:00Z","Type":"SYMPTOM_REMOVED","SymptomID":4}"#).unwrap();
        assert_eq!(legacy.kind, EventKind::RecordRemoved);
        assert_eq!(legacy.record_id, 4);

        let future: StoredEvent = serde_json::from_str(r#"{"kind":"RECORD_ARCHIVED","record_id":1}"#).unwrap();
        assert_eq!(future.kind, EventKind::Unknown);
        assert_eq!(future.kind.title(), "Unknown");
    }

    #[test]
    fn test_pretty_time() {
        let e = Event {
            time: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            kind: EventKind::RecordAdded,
            record_id: 1,
        };
        assert_eq!(e.pretty_time(), "Fri Mar  1 10:00:00 UTC 2024");
        assert_eq!(e.title(), "Symptom added");
    }
}
