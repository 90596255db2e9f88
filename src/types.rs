//! Core types for the Task Manager API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a stored task.
///
/// Ids are UUID v7 values rendered in their hyphenated form. A `TaskId` can
/// only be obtained from the store or by parsing, so a malformed id never
/// reaches a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generate a fresh, time-ordered id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parse an id supplied by a caller. Only the canonical lowercase
    /// hyphenated form is accepted, so each task has exactly one id string.
    pub fn parse(raw: &str) -> Option<Self> {
        let id = Uuid::try_parse(raw).ok()?;
        (id.hyphenated().to_string() == raw).then_some(Self(id))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// A task as stored and as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: TaskId,
    pub title: String,
    /// SHA-256 of the title. Internal only.
    #[serde(skip)]
    pub title_hash: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }
}

/// A partial update. `None` leaves a field untouched.
///
/// `description` distinguishes "absent" (`None`) from "cleared"
/// (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
}

/// Deserialize a field that may be absent, `null`, or a value into
/// `Option<Option<T>>`. Use together with `#[serde(default)]`.
pub fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_parse_accepts_generated_ids() {
        let id = TaskId::generate();
        assert_eq!(TaskId::parse(&id.to_string()), Some(id));
    }

    #[test]
    fn test_task_id_parse_rejects_garbage() {
        assert!(TaskId::parse("").is_none());
        assert!(TaskId::parse("not-an-id").is_none());
        assert!(TaskId::parse("507f1f77bcf86cd799439011").is_none());
    }

    #[test]
    fn test_task_id_parse_rejects_alternate_spellings() {
        let id = TaskId::generate();
        let canonical = id.to_string();
        let simple = canonical.replace('-', "");

        for alias in [
            simple,
            format!("{{{}}}", canonical),
            format!("urn:uuid:{}", canonical),
            format!(" {} ", canonical),
            canonical.to_uppercase(),
        ] {
            assert!(TaskId::parse(&alias).is_none(), "accepted {}", alias);
        }
        assert_eq!(TaskId::parse(&canonical), Some(id));
    }

    #[test]
    fn test_task_serializes_without_hash() {
        let now = Utc::now();
        let task = Task {
            id: TaskId::generate(),
            title: "Buy groceries".to_string(),
            title_hash: "abc".to_string(),
            description: None,
            completed: false,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["_id"], task.id.to_string());
        assert_eq!(json["title"], "Buy groceries");
        assert!(json["description"].is_null());
        assert_eq!(json["completed"], false);
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
        assert!(json.get("titleHash").is_none());
        assert!(json.get("title_hash").is_none());
    }

    #[test]
    fn test_deserialize_present_distinguishes_null() {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(default, deserialize_with = "deserialize_present")]
            value: Option<Option<String>>,
        }

        let absent: Wrapper = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.value, None);

        let null: Wrapper = serde_json::from_str(r#"{"value": null}"#).unwrap();
        assert_eq!(null.value, Some(None));

        let set: Wrapper = serde_json::from_str(r#"{"value": "x"}"#).unwrap();
        assert_eq!(set.value, Some(Some("x".to_string())));
    }
}
