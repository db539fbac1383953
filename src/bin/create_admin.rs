//! Administrator bootstrap.
//!
//! Idempotently creates the admin account (credentials from `ADMIN_NAME`,
//! `ADMIN_EMAIL` and `ADMIN_PASSWORD`, with defaults for local setups) and
//! prints a ready-to-use bearer token for it.

use sqlx::PgPool;
use std::env;

use projecthub::auth::{generate_token, hash_password};
use projecthub::config::Config;
use projecthub::models::UserResponse;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let pool = PgPool::connect(&config.database_url).await?;

    let name = env::var("ADMIN_NAME").unwrap_or_else(|_| "Super Admin".to_string());
    let email = env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@projecthub.local".to_string());
    let password = env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "ChangeMe123!".to_string());

    let existing = sqlx::query_as::<_, UserResponse>(
        "SELECT id, name, email, role, created_at FROM users WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(&pool)
    .await?;

    let user = match existing {
        Some(user) => {
            println!("Admin account already exists: {} <{}>", user.name, user.email);
            user
        }
        None => {
            let password_hash = hash_password(&password)?;
            let user = sqlx::query_as::<_, UserResponse>(
                "INSERT INTO users (name, email, password_hash, role)
                 VALUES ($1, $2, $3, 'admin')
                 RETURNING id, name, email, role, created_at",
            )
            .bind(&name)
            .bind(&email)
            .bind(&password_hash)
            .fetch_one(&pool)
            .await?;
            println!("Created admin account: {} <{}>", user.name, user.email);
            user
        }
    };

    let token = generate_token(user.id)?;
    println!();
    println!("Use this header to authenticate as the admin:");
    println!("Authorization: Bearer {}", token);

    Ok(())
}
