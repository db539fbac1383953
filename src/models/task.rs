use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::project::ProjectBrief;
use crate::models::user::UserSummary;

/// Represents the priority of a task.
/// Corresponds to the `task_priority` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    /// Low priority.
    Low,
    /// Medium priority.
    Medium,
    /// High priority.
    High,
    /// Urgent priority.
    Urgent,
}

/// Represents the status of a task.
/// Corresponds to the `task_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Task is yet to be started.
    Todo,
    /// Task is currently being worked on.
    InProgress,
    /// Task is done and awaiting review.
    Review,
    /// Task is completed.
    Completed,
}

/// A task row as stored in the database.
#[derive(Debug, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub project_id: Uuid,
    pub assigned_to: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Builds a new task from its input, applying the `todo` / `medium`
    /// defaults when the caller omitted status or priority.
    pub fn new(input: TaskInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            status: input.status.unwrap_or(TaskStatus::Todo),
            priority: input.priority.unwrap_or(TaskPriority::Medium),
            project_id: input.project,
            assigned_to: input.assigned_to,
            due_date: input.due_date,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Payload for creating a task.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    /// The title of the task.
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// An optional description for the task.
    /// Maximum length of 1000 characters if provided.
    #[validate(length(max = 1000))]
    pub description: Option<String>,

    /// Defaults to `todo` when absent.
    pub status: Option<TaskStatus>,

    /// Defaults to `medium` when absent.
    pub priority: Option<TaskPriority>,

    /// Id of the parent project. Must reference an existing project.
    pub project: Uuid,

    /// User the task is delegated to.
    pub assigned_to: Option<i32>,

    /// Optional due date for the task.
    pub due_date: Option<DateTime<Utc>>,
}

/// Payload for `PUT /api/tasks/{id}`. Absent fields keep their value;
/// `assignedTo: null` explicitly clears the assignee.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    pub status: Option<TaskStatus>,

    pub priority: Option<TaskPriority>,

    /// Missing: keep the current assignee. `null`: unassign. A user id:
    /// reassign. The double `Option` distinguishes missing from null.
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<i32>>,

    pub due_date: Option<DateTime<Utc>>,
}

/// Keeps `null` distinguishable from an absent field: a present value
/// (including `null`) always lands in `Some`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Represents query parameters for filtering tasks when listing them.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    /// Filter tasks by parent project id.
    pub project: Option<Uuid>,
    /// Filter tasks by assignee's user id.
    pub assigned_to: Option<i32>,
}

/// A task joined with its parent project's name and its assignee, as
/// selected by the list/detail queries.
#[derive(Debug, FromRow)]
pub struct TaskWithRefs {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub project_id: Uuid,
    pub project_name: String,
    pub assignee_id: Option<i32>,
    pub assignee_name: Option<String>,
    pub assignee_email: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task as returned by the API, with the parent project and assignee
/// expanded to references.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub project: ProjectBrief,
    pub assigned_to: Option<UserSummary>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TaskWithRefs> for TaskResponse {
    fn from(row: TaskWithRefs) -> Self {
        let assigned_to = match (row.assignee_id, row.assignee_name, row.assignee_email) {
            (Some(id), Some(name), Some(email)) => Some(UserSummary { id, name, email }),
            _ => None,
        };

        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            status: row.status,
            priority: row.priority,
            project: ProjectBrief {
                id: row.project_id,
                name: row.project_name,
            },
            assigned_to,
            due_date: row.due_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_creation_defaults() {
        let input = TaskInput {
            title: "Write onboarding docs".to_string(),
            description: None,
            status: None,
            priority: None,
            project: Uuid::new_v4(),
            assigned_to: None,
            due_date: None,
        };

        let task = Task::new(input);
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert!(task.assigned_to.is_none());
    }

    #[test]
    fn test_task_input_validation() {
        let valid_input = TaskInput {
            title: "Valid Task".to_string(),
            description: Some("Valid Description".to_string()),
            status: Some(TaskStatus::Todo),
            priority: Some(TaskPriority::High),
            project: Uuid::new_v4(),
            assigned_to: None,
            due_date: Some(Utc::now()),
        };
        assert!(valid_input.validate().is_ok());

        let empty_title = TaskInput {
            title: "".to_string(),
            description: None,
            status: None,
            priority: None,
            project: Uuid::new_v4(),
            assigned_to: None,
            due_date: None,
        };
        assert!(empty_title.validate().is_err());

        let long_description = TaskInput {
            title: "ok".to_string(),
            description: Some("b".repeat(1001)),
            status: None,
            priority: None,
            project: Uuid::new_v4(),
            assigned_to: None,
            due_date: None,
        };
        assert!(long_description.validate().is_err());
    }

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let missing: TaskUpdate = serde_json::from_str(r#"{"title": "t"}"#).unwrap();
        assert_eq!(missing.assigned_to, None);

        let null: TaskUpdate = serde_json::from_str(r#"{"assignedTo": null}"#).unwrap();
        assert_eq!(null.assigned_to, Some(None));

        let set: TaskUpdate = serde_json::from_str(r#"{"assignedTo": 7}"#).unwrap();
        assert_eq!(set.assigned_to, Some(Some(7)));
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
        assert_eq!(
            serde_json::to_string(&TaskStatus::Completed).unwrap(),
            "\"completed\""
        );
        assert_eq!(
            serde_json::to_string(&TaskPriority::Urgent).unwrap(),
            "\"urgent\""
        );
    }
}
