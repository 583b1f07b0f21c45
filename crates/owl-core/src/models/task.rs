use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::{CoreError, CoreErrorKind, TagId};

const CHECKLIST_HEADER: &str = "Subtasks:";

/// A task created in the local list. Text may arrive under `text` or under the
/// older `task_text` field; values that are not strings are ignored.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct LocalTask {
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub text: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub task_text: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_subtasks",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub subtasks: Vec<LocalSubtask>,
}

impl LocalTask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_subtasks(mut self, subtasks: impl IntoIterator<Item = LocalSubtask>) -> Self {
        self.subtasks = subtasks.into_iter().collect();
        self
    }

    pub fn resolved_text(&self) -> Option<String> {
        resolve_text(self.text.as_deref(), self.task_text.as_deref())
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct LocalSubtask {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_text: Option<String>,
}

impl LocalSubtask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            task_text: None,
        }
    }

    pub fn resolved_text(&self) -> Option<String> {
        resolve_text(self.text.as_deref(), self.task_text.as_deref())
    }
}

impl From<Value> for LocalSubtask {
    fn from(value: Value) -> Self {
        match value {
            // Bare strings are accepted as subtask text.
            Value::String(text) => Self {
                text: Some(text),
                task_text: None,
            },
            Value::Object(fields) => Self {
                text: fields.get("text").and_then(string_value),
                task_text: fields.get("task_text").and_then(string_value),
            },
            _ => Self::default(),
        }
    }
}

/// A task as returned by the Habitica task endpoints. Only the fields read or
/// written here are modelled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemoteTask {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<TagId>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

impl RemoteTask {
    pub fn has_tag(&self, tag: &TagId) -> bool {
        self.tags.contains(tag)
    }
}

/// Body of a todo creation request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct NewTodo {
    pub text: String,
    #[serde(rename = "type")]
    pub task_type: &'static str,
    pub tags: Vec<TagId>,
    pub notes: String,
}

impl NewTodo {
    pub fn new(text: impl Into<String>, tag: TagId, notes: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            task_type: "todo",
            tags: vec![tag],
            notes: notes.into(),
        }
    }
}

/// Returns the first candidate that is non-blank after trimming, trimmed.
pub fn resolve_text(primary: Option<&str>, alternate: Option<&str>) -> Option<String> {
    [primary, alternate]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .map(str::to_owned)
}

/// Renders subtasks as a markdown checklist for the task notes. Subtasks
/// without usable text are dropped; no usable subtasks yields empty notes.
pub fn checklist_notes(subtasks: &[LocalSubtask]) -> String {
    let lines: Vec<String> = subtasks
        .iter()
        .filter_map(LocalSubtask::resolved_text)
        .map(|text| format!("- [ ] {text}"))
        .collect();

    if lines.is_empty() {
        return String::new();
    }

    format!("{CHECKLIST_HEADER}\n{}", lines.join("\n"))
}

/// Parses the stored task list. The document must be a JSON array; entries
/// that are not task objects become empty tasks which the reconciler skips.
pub fn parse_local_tasks(raw: &str) -> Result<Vec<LocalTask>, CoreError> {
    let entries: Vec<Value> = serde_json::from_str(raw).map_err(|error| {
        CoreError::new(
            CoreErrorKind::ParseFailure,
            format!("stored task list is not a JSON array: {error}"),
        )
    })?;

    Ok(entries
        .into_iter()
        .map(|entry| serde_json::from_value(entry).unwrap_or_default())
        .collect())
}

fn string_value(value: &Value) -> Option<String> {
    value.as_str().map(str::to_owned)
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(string_value))
}

fn lenient_subtasks<'de, D>(deserializer: D) -> Result<Vec<LocalSubtask>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items.into_iter().map(LocalSubtask::from).collect(),
        _ => Vec::new(),
    })
}
