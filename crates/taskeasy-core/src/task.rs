use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::datetime::iso_instant_serde;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    /// Display rank; lower sorts first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "l" => Ok(Priority::Low),
            "medium" | "m" => Ok(Priority::Medium),
            "high" | "h" => Ok(Priority::High),
            other => Err(anyhow::anyhow!("invalid priority: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Status {
    #[default]
    #[serde(rename = "to-do")]
    ToDo,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "done")]
    Done,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::ToDo, Status::InProgress, Status::Done];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::ToDo => "to-do",
            Status::InProgress => "in-progress",
            Status::Done => "done",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Status::ToDo => "To Do",
            Status::InProgress => "In Progress",
            Status::Done => "Done",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "to-do" | "todo" => Ok(Status::ToDo),
            "in-progress" | "inprogress" | "doing" => Ok(Status::InProgress),
            "done" => Ok(Status::Done),
            other => Err(anyhow::anyhow!("invalid status: {other}")),
        }
    }
}

/// A category label. Whether it belongs to the configured vocabulary is
/// checked by [`crate::category::Categories`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything a task carries except its identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub priority: Priority,

    pub status: Status,

    pub category: Category,

    #[serde(default, with = "iso_instant_serde::option")]
    pub due_date: Option<DateTime<Utc>>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, category: Category) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            priority: Priority::default(),
            status: Status::default(),
            category,
            due_date: None,
        }
    }

    pub fn into_task(self, id: impl Into<String>) -> Task {
        Task {
            id: id.into(),
            title: self.title,
            description: self.description,
            priority: self.priority,
            status: self.status,
            category: self.category,
            due_date: self.due_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    pub priority: Priority,

    pub status: Status,

    pub category: Category,

    #[serde(default, with = "iso_instant_serde::option")]
    pub due_date: Option<DateTime<Utc>>,
}

impl Task {
    pub fn draft(&self) -> TaskDraft {
        TaskDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            priority: self.priority,
            status: self.status,
            category: self.category.clone(),
            due_date: self.due_date,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == Status::Done
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn serializes_with_stored_field_shapes() {
        let mut draft = TaskDraft::new("Test Task", Category::new("Work"));
        draft.priority = Priority::High;
        draft.due_date = Some(Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap());
        let task = draft.into_task("1");

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["id"], "1");
        assert_eq!(value["priority"], "high");
        assert_eq!(value["status"], "to-do");
        assert_eq!(value["category"], "Work");
        assert_eq!(value["dueDate"], "2023-12-31T00:00:00.000Z");
    }

    #[test]
    fn rejects_values_outside_the_enumerations() {
        let raw = r#"{"id":"1","title":"x","description":"","priority":"urgent","status":"to-do","category":"Work","dueDate":null}"#;
        assert!(serde_json::from_str::<Task>(raw).is_err());

        let raw = r#"{"id":"1","title":"x","description":"","priority":"low","status":"blocked","category":"Work","dueDate":null}"#;
        assert!(serde_json::from_str::<Task>(raw).is_err());
    }

    #[test]
    fn parses_labels_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("In-Progress".parse::<Status>().unwrap(), Status::InProgress);
        assert!("someday".parse::<Status>().is_err());
    }

    #[test]
    fn priority_rank_puts_high_first() {
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
    }
}
