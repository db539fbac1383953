use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::user::{CurrentUser, UserSummary};

/// Represents the lifecycle state of a project.
/// Corresponds to the `project_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    /// Not started yet.
    Planning,
    /// Actively being worked on.
    InProgress,
    /// Finished.
    Completed,
    /// Paused.
    OnHold,
}

/// A project row as stored in the database. Membership lives in the
/// `project_members` join table and is loaded separately.
#[derive(Debug, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub owner_id: i32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Builds a new project from its input and the creating user, applying
    /// the `planning` default when no status was given. The input's member
    /// list is not part of the row; callers persist it separately.
    pub fn new(input: ProjectInput, owner_id: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            status: input.status.unwrap_or(ProjectStatus::Planning),
            owner_id,
            start_date: input.start_date,
            end_date: input.end_date,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owner(&self, user_id: i32) -> bool {
        self.owner_id == user_id
    }

    /// Mutation gate: update, delete and membership changes are restricted
    /// to the owner and admins.
    pub fn can_modify(&self, user: &CurrentUser) -> bool {
        self.is_owner(user.id) || user.is_admin()
    }

    /// Visibility gate: owners, members and admins. Also the gate for
    /// creating tasks inside the project.
    pub fn can_view(&self, user: &CurrentUser, member_ids: &[i32]) -> bool {
        self.can_modify(user) || member_ids.contains(&user.id)
    }
}

/// Payload for creating a project. The owner is always the requester.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    /// Defaults to `planning` when absent.
    pub status: Option<ProjectStatus>,

    /// Initial member user ids; duplicates are collapsed.
    pub members: Option<Vec<i32>>,

    pub start_date: Option<DateTime<Utc>>,

    pub end_date: Option<DateTime<Utc>>,
}

/// Payload for `PUT /api/projects/{id}`. Absent fields keep their value.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    pub status: Option<ProjectStatus>,

    pub start_date: Option<DateTime<Utc>>,

    pub end_date: Option<DateTime<Utc>>,
}

/// Minimal project reference embedded in task responses.
#[derive(Debug, Serialize, Deserialize, Clone, FromRow)]
pub struct ProjectBrief {
    pub id: Uuid,
    pub name: String,
}

/// Payload for `POST /api/projects/{id}/members`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: i32,
}

/// A project joined with its owner's summary, as selected by the
/// list/detail queries.
#[derive(Debug, FromRow)]
pub struct ProjectWithOwner {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub owner_id: i32,
    pub owner_name: String,
    pub owner_email: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectWithOwner {
    pub fn into_response(self, members: Vec<UserSummary>) -> ProjectResponse {
        ProjectResponse {
            id: self.id,
            name: self.name,
            description: self.description,
            status: self.status,
            owner: UserSummary {
                id: self.owner_id,
                name: self.owner_name,
                email: self.owner_email,
            },
            members,
            start_date: self.start_date,
            end_date: self.end_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A project as returned by the API, with owner and members expanded to
/// user summaries.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub owner: UserSummary,
    pub members: Vec<UserSummary>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
