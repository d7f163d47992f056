//! Record types, mutation payloads and list filters.
//!
//! Wire payloads (`CreateRecordRequest`, `UpdateRecordRequest`) are what clients
//! send; `NewRecord` and `RecordChanges` are their normalized forms. Conversion
//! between the two is where empty-string normalization and lane coercion happen,
//! so every store sees the same canonical values.

use crate::error::ValidationError;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Date format used on the wire and in the store.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// IDENTITY
// ============================================================================

/// Record identifier.
///
/// Store-assigned ids are positive. Negative ids never leave a client: they
/// mark provisional records that have not been confirmed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl RecordId {
    pub fn is_provisional(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0.to_string())
    }
}

// ============================================================================
// LANE
// ============================================================================

/// Workflow column a record occupies.
///
/// Serialized as its bare integer. Deserialization also accepts a numeric
/// string, since form-driven clients send `"1"` as often as `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "LaneRepr", into = "i64")]
pub enum Lane {
    Todo = 0,
    Doing = 1,
    Done = 2,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LaneRepr {
    Number(i64),
    Text(String),
}

impl Lane {
    /// All lanes in key order.
    pub const ALL: [Lane; 3] = [Lane::Todo, Lane::Doing, Lane::Done];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for Lane {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Lane::Todo),
            1 => Ok(Lane::Doing),
            2 => Ok(Lane::Done),
            other => Err(ValidationError::invalid(
                "lane",
                format!("expected 0, 1 or 2, got {}", other),
            )),
        }
    }
}

impl FromStr for Lane {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| ValidationError::invalid("lane", format!("not a number: {:?}", s)))?;
        Lane::try_from(value)
    }
}

impl TryFrom<LaneRepr> for Lane {
    type Error = ValidationError;

    fn try_from(repr: LaneRepr) -> Result<Self, Self::Error> {
        match repr {
            LaneRepr::Number(n) => Lane::try_from(n),
            LaneRepr::Text(s) => s.parse(),
        }
    }
}

impl From<Lane> for i64 {
    fn from(lane: Lane) -> Self {
        lane.as_i64()
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i64())
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// A task on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: RecordId,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub lane: Lane,
    pub scheduled_date: NaiveDate,
}

/// A normalized, validated record awaiting an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub category: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub lane: Lane,
    pub scheduled_date: NaiveDate,
}

impl NewRecord {
    pub fn into_record(self, id: RecordId) -> Record {
        Record {
            id,
            category: self.category,
            title: self.title,
            notes: self.notes,
            lane: self.lane,
            scheduled_date: self.scheduled_date,
        }
    }
}

/// A normalized partial update.
///
/// Outer `None` means "leave untouched". For the nullable text fields an inner
/// `None` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordChanges {
    pub category: Option<Option<String>>,
    pub title: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub lane: Option<Lane>,
    pub scheduled_date: Option<NaiveDate>,
}

impl RecordChanges {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.title.is_none()
            && self.notes.is_none()
            && self.lane.is_none()
            && self.scheduled_date.is_none()
    }

    /// Apply the present fields to `record`, leaving the rest untouched.
    pub fn apply_to(&self, record: &mut Record) {
        if let Some(category) = &self.category {
            record.category = category.clone();
        }
        if let Some(title) = &self.title {
            record.title = title.clone();
        }
        if let Some(notes) = &self.notes {
            record.notes = notes.clone();
        }
        if let Some(lane) = self.lane {
            record.lane = lane;
        }
        if let Some(date) = self.scheduled_date {
            record.scheduled_date = date;
        }
    }
}

// ============================================================================
// WIRE PAYLOADS
// ============================================================================

/// Body of a create request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub lane: Option<Lane>,
    #[serde(default)]
    pub scheduled_date: Option<String>,
}

impl From<&NewRecord> for CreateRecordRequest {
    fn from(record: &NewRecord) -> Self {
        Self {
            category: record.category.clone(),
            title: record.title.clone(),
            notes: record.notes.clone(),
            lane: Some(record.lane),
            scheduled_date: Some(record.scheduled_date.format(DATE_FORMAT).to_string()),
        }
    }
}

impl TryFrom<CreateRecordRequest> for NewRecord {
    type Error = ValidationError;

    fn try_from(req: CreateRecordRequest) -> Result<Self, Self::Error> {
        let lane = req.lane.ok_or_else(|| ValidationError::missing("lane"))?;
        let scheduled_date = normalize_text(req.scheduled_date)
            .ok_or_else(|| ValidationError::missing("scheduledDate"))?;

        Ok(NewRecord {
            category: normalize_text(req.category),
            title: normalize_text(req.title),
            notes: normalize_text(req.notes),
            lane,
            scheduled_date: parse_date(&scheduled_date)?,
        })
    }
}

/// Body of a partial update request.
///
/// Each field is tri-state: absent (untouched), `null` (cleared) or a value.
/// Fields not declared here are ignored on deserialization, so this struct is
/// also the allow-list of updatable columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecordRequest {
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub lane: Option<Option<Lane>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<Option<String>>,
}

impl UpdateRecordRequest {
    /// Full replacement of every editable field with `record`'s values.
    pub fn from_record(record: &Record) -> Self {
        Self {
            category: Some(record.category.clone()),
            title: Some(record.title.clone()),
            notes: Some(record.notes.clone()),
            lane: Some(Some(record.lane)),
            scheduled_date: Some(Some(record.scheduled_date.format(DATE_FORMAT).to_string())),
        }
    }

    /// A move carries nothing but the target lane.
    pub fn move_to(lane: Lane) -> Self {
        Self {
            lane: Some(Some(lane)),
            ..Self::default()
        }
    }
}

impl TryFrom<UpdateRecordRequest> for RecordChanges {
    type Error = ValidationError;

    fn try_from(req: UpdateRecordRequest) -> Result<Self, Self::Error> {
        let lane = match req.lane {
            None => None,
            Some(None) => return Err(ValidationError::invalid("lane", "cannot be cleared")),
            Some(Some(lane)) => Some(lane),
        };

        let scheduled_date = match req.scheduled_date {
            None => None,
            Some(value) => {
                let text = normalize_text(value)
                    .ok_or_else(|| ValidationError::invalid("scheduledDate", "cannot be cleared"))?;
                Some(parse_date(&text)?)
            }
        };

        Ok(RecordChanges {
            category: req.category.map(normalize_text),
            title: req.title.map(normalize_text),
            notes: req.notes.map(normalize_text),
            lane,
            scheduled_date,
        })
    }
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Collapse `""` and the literal `"null"` to `None`.
pub fn normalize_text(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty() && s != "null")
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| {
        ValidationError::invalid("scheduledDate", format!("{:?} is not a YYYY-MM-DD date: {}", value, e))
    })
}

// ============================================================================
// FILTER
// ============================================================================

/// Conjunctive list filter. Absent fields place no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub category: Option<String>,
    pub date_ceiling: Option<NaiveDate>,
}

impl ListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_date_ceiling(mut self, date: NaiveDate) -> Self {
        self.date_ceiling = Some(date);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.date_ceiling.is_none()
    }

    pub fn matches(&self, record: &Record) -> bool {
        if let Some(category) = &self.category {
            if record.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(ceiling) = self.date_ceiling {
            if record.scheduled_date > ceiling {
                return false;
            }
        }
        true
    }
}
