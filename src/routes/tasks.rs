use crate::{
    auth::AuthenticatedUserId,
    error::AppError,
    models::{CurrentUser, Task, TaskInput, TaskQuery, TaskResponse, TaskUpdate, TaskWithRefs},
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::routes::projects::{fetch_member_ids, fetch_project};

/// Base query joining each task with its parent project's name and its
/// assignee's summary.
const TASK_WITH_REFS_SQL: &str = "SELECT t.id, t.title, t.description, t.status, t.priority, \
     t.project_id, p.name AS project_name, \
     u.id AS assignee_id, u.name AS assignee_name, u.email AS assignee_email, \
     t.due_date, t.created_at, t.updated_at \
     FROM tasks t \
     JOIN projects p ON t.project_id = p.id \
     LEFT JOIN users u ON t.assigned_to = u.id";

/// Loads a bare task row, or 404.
async fn fetch_task(pool: &PgPool, task_id: Uuid) -> Result<Task, AppError> {
    let task = sqlx::query_as::<_, Task>(
        "SELECT id, title, description, status, priority, project_id, assigned_to, due_date, created_at, updated_at
         FROM tasks WHERE id = $1",
    )
    .bind(task_id)
    .fetch_optional(pool)
    .await?;

    task.ok_or_else(|| AppError::NotFound("Task not found".into()))
}

/// Builds the full API shape of one task: project and assignee expanded.
async fn task_response(pool: &PgPool, task_id: Uuid) -> Result<TaskResponse, AppError> {
    let sql = format!("{} WHERE t.id = $1", TASK_WITH_REFS_SQL);
    let row = sqlx::query_as::<_, TaskWithRefs>(&sql)
        .bind(task_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    Ok(TaskResponse::from(row))
}

/// Retrieves tasks, newest first.
///
/// ## Query Parameters:
/// - `project` (optional): Filters tasks by their parent project id.
/// - `assignedTo` (optional): Filters tasks by the id of the user they are assigned to.
///
/// ## Responses:
/// - `200 OK`: Returns a JSON array of task objects with project and assignee expanded.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `500 Internal Server Error`: For database errors or other unexpected issues.
#[get("")]
pub async fn get_tasks(
    pool: web::Data<PgPool>,
    query_params: web::Query<TaskQuery>,
) -> Result<impl Responder, AppError> {
    // Conditions for the project and assignee filters are dynamically appended.
    let mut sql = String::from(TASK_WITH_REFS_SQL);
    let mut conditions: Vec<String> = Vec::new();

    if query_params.project.is_some() {
        conditions.push(format!("t.project_id = ${}", conditions.len() + 1));
    }
    if query_params.assigned_to.is_some() {
        conditions.push(format!("t.assigned_to = ${}", conditions.len() + 1));
    }

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    sql.push_str(" ORDER BY t.created_at DESC");

    let mut query_builder = sqlx::query_as::<_, TaskWithRefs>(&sql);

    if let Some(project) = query_params.project {
        query_builder = query_builder.bind(project);
    }
    if let Some(assigned_to) = query_params.assigned_to {
        query_builder = query_builder.bind(assigned_to);
    }

    let rows = query_builder.fetch_all(&**pool).await?;
    let tasks: Vec<TaskResponse> = rows.into_iter().map(TaskResponse::from).collect();

    Ok(HttpResponse::Ok().json(tasks))
}

/// Retrieves a specific task by its ID.
///
/// ## Responses:
/// - `200 OK`: Returns the task as JSON.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `404 Not Found`: If the task with the given ID does not exist.
/// - `500 Internal Server Error`: For database errors or other unexpected issues.
#[get("/{id}")]
pub async fn get_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = task_response(&pool, task_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Creates a new task inside a project.
///
/// The referenced project must exist (404 otherwise) and the requester
/// must be its owner, one of its members, or an admin (403 otherwise).
/// Status defaults to `todo` and priority to `medium`.
///
/// ## Responses:
/// - `201 Created`: Returns the newly created task as JSON.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `403 Forbidden`: If the requester has no access to the project.
/// - `404 Not Found`: If the referenced project does not exist.
/// - `422 Unprocessable Entity`: If input validation fails (e.g., empty title).
/// - `500 Internal Server Error`: For database errors or other unexpected issues.
#[post("")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    task_data: web::Json<TaskInput>,
    auth: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    // Validate input
    task_data.validate()?;

    let input = task_data.into_inner();

    // Verify the project exists before anything else
    let project = fetch_project(&pool, input.project).await?;
    let member_ids = fetch_member_ids(&pool, project.id).await?;
    let user = CurrentUser::load(&**pool, auth.0).await?;

    if !project.can_view(&user, &member_ids) {
        return Err(AppError::Forbidden(
            "Not authorized to create tasks in this project".into(),
        ));
    }

    let task = Task::new(input);

    sqlx::query(
        "INSERT INTO tasks (id, title, description, status, priority, project_id, assigned_to, due_date)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(task.id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.status)
    .bind(task.priority)
    .bind(task.project_id)
    .bind(task.assigned_to)
    .bind(task.due_date)
    .execute(&**pool)
    .await?;

    Ok(HttpResponse::Created().json(task_response(&pool, task.id).await?))
}

/// Updates an existing task.
///
/// Permitted for the parent project's owner, a project member, the task's
/// assignee, or an admin. Absent fields keep their value; `assignedTo: null`
/// clears the assignee.
///
/// ## Responses:
/// - `200 OK`: Returns the updated task as JSON.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `403 Forbidden`: If the requester may not touch this task.
/// - `404 Not Found`: If the task with the given ID does not exist.
/// - `422 Unprocessable Entity`: If input validation fails.
/// - `500 Internal Server Error`: For database errors or other unexpected issues.
#[put("/{id}")]
pub async fn update_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
    task_data: web::Json<TaskUpdate>,
    auth: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let task_uuid = task_id.into_inner();
    let task = fetch_task(&pool, task_uuid).await?;
    let project = fetch_project(&pool, task.project_id).await?;
    let member_ids = fetch_member_ids(&pool, project.id).await?;
    let user = CurrentUser::load(&**pool, auth.0).await?;

    let is_assignee = task.assigned_to == Some(user.id);
    if !project.can_view(&user, &member_ids) && !is_assignee {
        return Err(AppError::Forbidden(
            "Not authorized to update this task".into(),
        ));
    }

    let update = task_data.into_inner();

    let title = update.title.unwrap_or(task.title);
    let description = update.description.or(task.description);
    let status = update.status.unwrap_or(task.status);
    let priority = update.priority.unwrap_or(task.priority);
    let assigned_to = match update.assigned_to {
        Some(value) => value,
        None => task.assigned_to,
    };
    let due_date = update.due_date.or(task.due_date);

    sqlx::query(
        "UPDATE tasks
         SET title = $1, description = $2, status = $3, priority = $4, assigned_to = $5, due_date = $6, updated_at = NOW()
         WHERE id = $7",
    )
    .bind(&title)
    .bind(&description)
    .bind(status)
    .bind(priority)
    .bind(assigned_to)
    .bind(due_date)
    .bind(task_uuid)
    .execute(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(task_response(&pool, task_uuid).await?))
}

/// Deletes a task by its ID.
///
/// Restricted to the parent project's owner and admins — members and the
/// assignee may update a task but not delete it.
///
/// ## Responses:
/// - `200 OK`: `{"message": "Task removed"}` on successful deletion.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `403 Forbidden`: If the requester is neither project owner nor admin.
/// - `404 Not Found`: If the task with the given ID does not exist.
/// - `500 Internal Server Error`: For database errors or other unexpected issues.
#[delete("/{id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
    auth: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let task_uuid = task_id.into_inner();
    let task = fetch_task(&pool, task_uuid).await?;
    let project = fetch_project(&pool, task.project_id).await?;
    let user = CurrentUser::load(&**pool, auth.0).await?;

    if !project.can_modify(&user) {
        return Err(AppError::Forbidden(
            "Not authorized to delete this task".into(),
        ));
    }

    sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(task_uuid)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Task removed" })))
}
