use crate::{
    auth::AuthenticatedUserId,
    error::AppError,
    models::{
        AddMemberRequest, CurrentUser, Project, ProjectInput, ProjectResponse, ProjectUpdate,
        ProjectWithOwner, UserSummary,
    },
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

/// Base query joining each project with its owner's summary.
const PROJECT_WITH_OWNER_SQL: &str = "SELECT p.id, p.name, p.description, p.status, p.owner_id, \
     u.name AS owner_name, u.email AS owner_email, \
     p.start_date, p.end_date, p.created_at, p.updated_at \
     FROM projects p JOIN users u ON p.owner_id = u.id";

/// One membership row joined with the member's summary, keyed by project
/// so a single query can serve a whole listing.
#[derive(Debug, FromRow)]
struct MemberRow {
    project_id: Uuid,
    id: i32,
    name: String,
    email: String,
}

/// Loads a bare project row, or 404.
pub(crate) async fn fetch_project(pool: &PgPool, project_id: Uuid) -> Result<Project, AppError> {
    let project = sqlx::query_as::<_, Project>(
        "SELECT id, name, description, status, owner_id, start_date, end_date, created_at, updated_at
         FROM projects WHERE id = $1",
    )
    .bind(project_id)
    .fetch_optional(pool)
    .await?;

    project.ok_or_else(|| AppError::NotFound("Project not found".into()))
}

/// Loads the member user ids of a project.
pub(crate) async fn fetch_member_ids(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<Vec<i32>, AppError> {
    let ids = sqlx::query_scalar::<_, i32>(
        "SELECT user_id FROM project_members WHERE project_id = $1",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Builds the full API shape of one project: owner and members expanded.
async fn project_response(pool: &PgPool, project_id: Uuid) -> Result<ProjectResponse, AppError> {
    let sql = format!("{} WHERE p.id = $1", PROJECT_WITH_OWNER_SQL);
    let row = sqlx::query_as::<_, ProjectWithOwner>(&sql)
        .bind(project_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?;

    let members = sqlx::query_as::<_, UserSummary>(
        "SELECT u.id, u.name, u.email
         FROM project_members pm JOIN users u ON pm.user_id = u.id
         WHERE pm.project_id = $1
         ORDER BY u.name",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(row.into_response(members))
}

/// Retrieves the projects visible to the requester.
///
/// Admins see every project; everyone else sees the projects they own or
/// are a member of. Owner and members are expanded to `{id, name, email}`
/// summaries, newest project first.
#[get("")]
pub async fn get_projects(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let user = CurrentUser::load(&**pool, auth.0).await?;

    let rows = if user.is_admin() {
        let sql = format!("{} ORDER BY p.created_at DESC", PROJECT_WITH_OWNER_SQL);
        sqlx::query_as::<_, ProjectWithOwner>(&sql)
            .fetch_all(&**pool)
            .await?
    } else {
        let sql = format!(
            "{} WHERE p.owner_id = $1 \
             OR p.id IN (SELECT project_id FROM project_members WHERE user_id = $1) \
             ORDER BY p.created_at DESC",
            PROJECT_WITH_OWNER_SQL
        );
        sqlx::query_as::<_, ProjectWithOwner>(&sql)
            .bind(user.id)
            .fetch_all(&**pool)
            .await?
    };

    // One membership query for the whole page instead of one per project.
    let project_ids: Vec<Uuid> = rows.iter().map(|p| p.id).collect();
    let member_rows = sqlx::query_as::<_, MemberRow>(
        "SELECT pm.project_id, u.id, u.name, u.email
         FROM project_members pm JOIN users u ON pm.user_id = u.id
         WHERE pm.project_id = ANY($1)
         ORDER BY u.name",
    )
    .bind(&project_ids)
    .fetch_all(&**pool)
    .await?;

    let mut members_by_project: std::collections::HashMap<Uuid, Vec<UserSummary>> =
        std::collections::HashMap::new();
    for row in member_rows {
        members_by_project
            .entry(row.project_id)
            .or_default()
            .push(UserSummary {
                id: row.id,
                name: row.name,
                email: row.email,
            });
    }

    let projects: Vec<ProjectResponse> = rows
        .into_iter()
        .map(|row| {
            let members = members_by_project.remove(&row.id).unwrap_or_default();
            row.into_response(members)
        })
        .collect();

    Ok(HttpResponse::Ok().json(projects))
}

/// Retrieves a single project.
///
/// Visible to its owner, its members and admins; everyone else gets 403.
#[get("/{id}")]
pub async fn get_project(
    pool: web::Data<PgPool>,
    project_id: web::Path<Uuid>,
    auth: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let project_uuid = project_id.into_inner();
    let project = fetch_project(&pool, project_uuid).await?;
    let member_ids = fetch_member_ids(&pool, project_uuid).await?;
    let user = CurrentUser::load(&**pool, auth.0).await?;

    if !project.can_view(&user, &member_ids) {
        return Err(AppError::Forbidden(
            "Not authorized to view this project".into(),
        ));
    }

    Ok(HttpResponse::Ok().json(project_response(&pool, project_uuid).await?))
}

/// Creates a new project owned by the requester.
///
/// An optional initial member list is accepted; duplicate ids collapse
/// into a single membership.
#[post("")]
pub async fn create_project(
    pool: web::Data<PgPool>,
    project_data: web::Json<ProjectInput>,
    auth: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    project_data.validate()?;

    let mut input = project_data.into_inner();
    let members = input.members.take().unwrap_or_default();
    let project = Project::new(input, auth.0);

    sqlx::query(
        "INSERT INTO projects (id, name, description, status, owner_id, start_date, end_date)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(project.id)
    .bind(&project.name)
    .bind(&project.description)
    .bind(project.status)
    .bind(project.owner_id)
    .bind(project.start_date)
    .bind(project.end_date)
    .execute(&**pool)
    .await?;

    if !members.is_empty() {
        sqlx::query(
            "INSERT INTO project_members (project_id, user_id)
             SELECT $1, ids.user_id FROM UNNEST($2::INT4[]) AS ids(user_id)
             ON CONFLICT DO NOTHING",
        )
        .bind(project.id)
        .bind(&members)
        .execute(&**pool)
        .await?;
    }

    Ok(HttpResponse::Created().json(project_response(&pool, project.id).await?))
}

/// Updates a project.
///
/// Only the owner or an admin may update; absent fields keep their value.
#[put("/{id}")]
pub async fn update_project(
    pool: web::Data<PgPool>,
    project_id: web::Path<Uuid>,
    update_data: web::Json<ProjectUpdate>,
    auth: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    update_data.validate()?;

    let project_uuid = project_id.into_inner();
    let project = fetch_project(&pool, project_uuid).await?;
    let user = CurrentUser::load(&**pool, auth.0).await?;

    // Check if user is owner or admin
    if !project.can_modify(&user) {
        return Err(AppError::Forbidden(
            "Not authorized to update this project".into(),
        ));
    }

    let update = update_data.into_inner();

    let name = update.name.unwrap_or(project.name);
    let description = update.description.or(project.description);
    let status = update.status.unwrap_or(project.status);
    let start_date = update.start_date.or(project.start_date);
    let end_date = update.end_date.or(project.end_date);

    sqlx::query(
        "UPDATE projects
         SET name = $1, description = $2, status = $3, start_date = $4, end_date = $5, updated_at = NOW()
         WHERE id = $6",
    )
    .bind(&name)
    .bind(&description)
    .bind(status)
    .bind(start_date)
    .bind(end_date)
    .bind(project_uuid)
    .execute(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(project_response(&pool, project_uuid).await?))
}

/// Deletes a project together with its memberships and tasks.
///
/// Only the owner or an admin may delete.
#[delete("/{id}")]
pub async fn delete_project(
    pool: web::Data<PgPool>,
    project_id: web::Path<Uuid>,
    auth: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let project_uuid = project_id.into_inner();
    let project = fetch_project(&pool, project_uuid).await?;
    let user = CurrentUser::load(&**pool, auth.0).await?;

    // Check if user is owner or admin
    if !project.can_modify(&user) {
        return Err(AppError::Forbidden(
            "Not authorized to delete this project".into(),
        ));
    }

    // Membership rows and tasks go with the project (ON DELETE CASCADE).
    sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(project_uuid)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Project removed" })))
}

/// Adds a member to a project.
///
/// Only the owner or an admin may add members. Adding a user twice is a
/// 400; adding an unknown user is a 404.
#[post("/{id}/members")]
pub async fn add_member(
    pool: web::Data<PgPool>,
    project_id: web::Path<Uuid>,
    member_data: web::Json<AddMemberRequest>,
    auth: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let project_uuid = project_id.into_inner();
    let project = fetch_project(&pool, project_uuid).await?;
    let user = CurrentUser::load(&**pool, auth.0).await?;

    if !project.can_modify(&user) {
        return Err(AppError::Forbidden("Not authorized to add members".into()));
    }

    let new_member_id = member_data.user_id;

    let member_exists = sqlx::query("SELECT id FROM users WHERE id = $1")
        .bind(new_member_id)
        .fetch_optional(&**pool)
        .await?;
    if member_exists.is_none() {
        return Err(AppError::NotFound("User not found".into()));
    }

    let already_member =
        sqlx::query("SELECT 1 FROM project_members WHERE project_id = $1 AND user_id = $2")
            .bind(project_uuid)
            .bind(new_member_id)
            .fetch_optional(&**pool)
            .await?;
    if already_member.is_some() {
        return Err(AppError::BadRequest("User is already a member".into()));
    }

    sqlx::query("INSERT INTO project_members (project_id, user_id) VALUES ($1, $2)")
        .bind(project_uuid)
        .bind(new_member_id)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(project_response(&pool, project_uuid).await?))
}

/// Removes a member from a project.
///
/// Only the owner or an admin may remove members. Removing a user who is
/// not a member is a no-op.
#[delete("/{id}/members/{user_id}")]
pub async fn remove_member(
    pool: web::Data<PgPool>,
    path: web::Path<(Uuid, i32)>,
    auth: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let (project_uuid, member_id) = path.into_inner();
    let project = fetch_project(&pool, project_uuid).await?;
    let user = CurrentUser::load(&**pool, auth.0).await?;

    if !project.can_modify(&user) {
        return Err(AppError::Forbidden(
            "Not authorized to remove members".into(),
        ));
    }

    sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
        .bind(project_uuid)
        .bind(member_id)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(project_response(&pool, project_uuid).await?))
}
