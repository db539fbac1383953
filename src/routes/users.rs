use crate::{
    auth::{hash_password, AuthenticatedUserId},
    error::AppError,
    models::{CurrentUser, User, UserResponse, UserUpdate},
};
use actix_web::{delete, get, put, web, HttpResponse, Responder};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

/// Lists all users.
///
/// Any authenticated user may call this; the client needs the directory
/// to pick project members and task assignees.
#[get("")]
pub async fn get_users(pool: web::Data<PgPool>) -> Result<impl Responder, AppError> {
    let users = sqlx::query_as::<_, UserResponse>(
        "SELECT id, name, email, role, created_at FROM users ORDER BY name",
    )
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(users))
}

/// Retrieves a single user by id.
#[get("/{id}")]
pub async fn get_user(
    pool: web::Data<PgPool>,
    user_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let user = sqlx::query_as::<_, UserResponse>(
        "SELECT id, name, email, role, created_at FROM users WHERE id = $1",
    )
    .bind(user_id.into_inner())
    .fetch_optional(&**pool)
    .await?;

    match user {
        Some(user) => Ok(HttpResponse::Ok().json(user)),
        None => Err(AppError::NotFound("User not found".into())),
    }
}

/// Updates a user's profile.
///
/// Users may edit themselves; admins may edit anyone. Changing the `role`
/// field is admin-only. Absent fields keep their current value.
#[put("/{id}")]
pub async fn update_user(
    pool: web::Data<PgPool>,
    user_id: web::Path<i32>,
    update_data: web::Json<UserUpdate>,
    auth: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    update_data.validate()?;

    let requester = CurrentUser::load(&**pool, auth.0).await?;
    let target_id = user_id.into_inner();

    if requester.id != target_id && !requester.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to update this user".into(),
        ));
    }

    let update = update_data.into_inner();

    if update.role.is_some() && !requester.is_admin() {
        return Err(AppError::Forbidden("Not authorized to change roles".into()));
    }

    let target = sqlx::query_as::<_, User>(
        "SELECT id, name, email, password_hash, role, created_at, updated_at
         FROM users WHERE id = $1",
    )
    .bind(target_id)
    .fetch_optional(&**pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if let Some(email) = &update.email {
        let taken = sqlx::query("SELECT id FROM users WHERE email = $1 AND id <> $2")
            .bind(email)
            .bind(target_id)
            .fetch_optional(&**pool)
            .await?;
        if taken.is_some() {
            return Err(AppError::BadRequest("Email already in use".into()));
        }
    }

    let name = update.name.unwrap_or(target.name);
    let email = update.email.unwrap_or(target.email);
    let password_hash = match update.password {
        Some(password) => hash_password(&password)?,
        None => target.password_hash,
    };
    let role = update.role.unwrap_or(target.role);

    let updated = sqlx::query_as::<_, UserResponse>(
        "UPDATE users
         SET name = $1, email = $2, password_hash = $3, role = $4, updated_at = NOW()
         WHERE id = $5
         RETURNING id, name, email, role, created_at",
    )
    .bind(&name)
    .bind(&email)
    .bind(&password_hash)
    .bind(role)
    .bind(target_id)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Deletes a user account. Admin only.
#[delete("/{id}")]
pub async fn delete_user(
    pool: web::Data<PgPool>,
    user_id: web::Path<i32>,
    auth: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let requester = CurrentUser::load(&**pool, auth.0).await?;

    if !requester.is_admin() {
        return Err(AppError::Forbidden("Not authorized to delete users".into()));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id.into_inner())
        .execute(&**pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".into()));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "User removed" })))
}
