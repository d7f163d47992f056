//! Session identity and change events pushed over the event stream.

use crate::error::EventDecodeError;
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identity of one live streaming connection.
///
/// UUIDv7 text: unique without a wall-clock resolution assumption, and still
/// sortable by connect time in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Fully random id, for when a generated id collides with a live one.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(value: &str) -> Result<Self, EventDecodeError> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| EventDecodeError::InvalidSession(value.to_string()))
    }
}

impl FromStr for SessionId {
    type Err = EventDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of confirmed change carried by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Create,
    Update,
    Move,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Create => "create",
            ChangeKind::Update => "update",
            ChangeKind::Move => "move",
        }
    }

    /// Classify an applied update. A lane change is the only thing that makes
    /// an update a move.
    pub fn classify(before: &Record, after: &Record) -> Self {
        if before.lane != after.lane {
            ChangeKind::Move
        } else {
            ChangeKind::Update
        }
    }
}

impl FromStr for ChangeKind {
    type Err = EventDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(ChangeKind::Create),
            "update" => Ok(ChangeKind::Update),
            "move" => Ok(ChangeKind::Move),
            other => Err(EventDecodeError::UnknownEvent(other.to_string())),
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record as it was before and after one applied update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDelta {
    pub before: Record,
    pub after: Record,
}

impl RecordDelta {
    /// `Move` if the lane changed, `Update` otherwise.
    pub fn kind(&self) -> ChangeKind {
        ChangeKind::classify(&self.before, &self.after)
    }
}

/// A confirmed change, attributed to the session that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub record: Record,
    pub origin: Option<SessionId>,
}

/// A message on the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// First frame on every connection: the connection's own session id.
    Init { session_id: SessionId },
    Change(ChangeEvent),
}

impl StreamEvent {
    pub const INIT: &'static str = "init";

    pub fn event_name(&self) -> &'static str {
        match self {
            StreamEvent::Init { .. } => Self::INIT,
            StreamEvent::Change(change) => change.kind.as_str(),
        }
    }

    /// The frame id: the connection's own id for `init`, the origin for changes.
    pub fn event_id(&self) -> Option<String> {
        match self {
            StreamEvent::Init { session_id } => Some(session_id.to_string()),
            StreamEvent::Change(change) => change.origin.map(|id| id.to_string()),
        }
    }

    pub fn data(&self) -> Result<String, serde_json::Error> {
        match self {
            StreamEvent::Init { session_id } => Ok(session_id.to_string()),
            StreamEvent::Change(change) => serde_json::to_string(&change.record),
        }
    }

    /// Rebuild an event from a received frame.
    pub fn decode(name: &str, id: Option<&str>, data: &str) -> Result<Self, EventDecodeError> {
        if name == Self::INIT {
            return Ok(StreamEvent::Init {
                session_id: SessionId::parse(data)?,
            });
        }

        let kind: ChangeKind = name.parse()?;
        let record: Record = serde_json::from_str(data)?;
        let origin = id
            .filter(|s| !s.is_empty())
            .map(SessionId::parse)
            .transpose()?;

        Ok(StreamEvent::Change(ChangeEvent {
            kind,
            record,
            origin,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Lane, RecordId};
    use chrono::NaiveDate;

    fn record(lane: Lane) -> Record {
        Record {
            id: RecordId(5),
            category: Some("MATH".to_string()),
            title: None,
            notes: None,
            lane,
            scheduled_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_classify_by_lane_only() {
        let before = record(Lane::Todo);
        let mut after = record(Lane::Todo);
        after.title = Some("renamed".to_string());
        assert_eq!(ChangeKind::classify(&before, &after), ChangeKind::Update);

        after.lane = Lane::Done;
        assert_eq!(ChangeKind::classify(&before, &after), ChangeKind::Move);
    }

    #[test]
    fn test_session_ids_are_distinct() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert_eq!(SessionId::parse(&a.to_string()).unwrap(), a);
        assert!(SessionId::parse("not-a-session").is_err());
    }

    #[test]
    fn test_init_frame_fields() {
        let session_id = SessionId::generate();
        let event = StreamEvent::Init { session_id };
        assert_eq!(event.event_name(), "init");
        assert_eq!(event.event_id(), Some(session_id.to_string()));
        assert_eq!(event.data().unwrap(), session_id.to_string());
    }

    #[test]
    fn test_change_frame_decodes() {
        let origin = SessionId::generate();
        let event = StreamEvent::Change(ChangeEvent {
            kind: ChangeKind::Move,
            record: record(Lane::Done),
            origin: Some(origin),
        });

        let id = event.event_id();
        let decoded =
            StreamEvent::decode(event.event_name(), id.as_deref(), &event.data().unwrap()).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_decode_rejects_unknown_event() {
        let err = StreamEvent::decode("delete", None, "{}").unwrap_err();
        assert!(matches!(err, EventDecodeError::UnknownEvent(name) if name == "delete"));
    }
}
