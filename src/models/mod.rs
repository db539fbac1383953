pub mod project;
pub mod task;
pub mod user;

pub use project::{
    AddMemberRequest, Project, ProjectBrief, ProjectInput, ProjectResponse, ProjectStatus,
    ProjectUpdate, ProjectWithOwner,
};
pub use task::{
    Task, TaskInput, TaskPriority, TaskQuery, TaskResponse, TaskStatus, TaskUpdate, TaskWithRefs,
};
pub use user::{CurrentUser, User, UserResponse, UserRole, UserSummary, UserUpdate};
