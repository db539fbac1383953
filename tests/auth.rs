use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{http::header, test, web, App};
use dotenv::dotenv;
use pretty_assertions::assert_eq;
use serde_json::json;
use sqlx::PgPool;

use projecthub::auth::{AuthMiddleware, AuthResponse};
use projecthub::models::{UserResponse, UserRole};
use projecthub::routes;

// Returns None (and the test skips) when no database is reachable.
async fn setup_pool() -> Option<PgPool> {
    dotenv().ok();
    if std::env::var("JWT_SECRET").is_err() {
        std::env::set_var("JWT_SECRET", "projecthub-test-secret");
    }
    let database_url = std::env::var("DATABASE_URL").ok()?;
    PgPool::connect(&database_url).await.ok()
}

async fn cleanup_user(pool: &PgPool, email: &str) {
    let _ = sqlx::query(
        "DELETE FROM projects WHERE owner_id IN (SELECT id FROM users WHERE email = $1)",
    )
    .bind(email)
    .execute(pool)
    .await;
    let _ = sqlx::query("DELETE FROM users WHERE email = $1")
        .bind(email)
        .execute(pool)
        .await;
}

#[actix_rt::test]
async fn test_register_and_login_flow() {
    let Some(pool) = setup_pool().await else {
        eprintln!("DATABASE_URL not available; skipping");
        return;
    };

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            ),
    )
    .await;

    let email = "integration_auth@example.com";
    cleanup_user(&pool, email).await;

    // Register
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "name": "Integration Tester",
            "email": email,
            "password": "password123"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);
    let registered: AuthResponse = test::read_body_json(resp).await;
    assert_eq!(registered.user.email, email);
    assert_eq!(registered.user.name, "Integration Tester");
    // Self-registration never yields elevated roles.
    assert_eq!(registered.user.role, UserRole::Member);

    // Registering the same email again is rejected
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "name": "Integration Tester",
            "email": email,
            "password": "password123"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);

    // Login
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({
            "email": email,
            "password": "password123"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    let logged_in: AuthResponse = test::read_body_json(resp).await;
    assert_eq!(logged_in.user.id, registered.user.id);

    // Wrong password
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({
            "email": email,
            "password": "not-the-password"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);

    // /me with the fresh token
    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .append_header((header::AUTHORIZATION, format!("Bearer {}", logged_in.token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    let me: UserResponse = test::read_body_json(resp).await;
    assert_eq!(me.id, registered.user.id);
    assert_eq!(me.email, email);

    // /me without a token
    let req = test::TestRequest::get().uri("/api/auth/me").to_request();
    let resp = test::try_call_service(&app, req).await;
    match resp {
        Ok(resp) => assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED),
        Err(err) => assert_eq!(
            err.error_response().status(),
            actix_web::http::StatusCode::UNAUTHORIZED
        ),
    }

    cleanup_user(&pool, email).await;
}

#[actix_rt::test]
async fn test_register_validation() {
    let Some(pool) = setup_pool().await else {
        eprintln!("DATABASE_URL not available; skipping");
        return;
    };

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .wrap(Logger::default())
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            ),
    )
    .await;

    // Invalid email
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "name": "Valid Name",
            "email": "invalid-email",
            "password": "password123"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_client_error());

    // Short password
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "name": "Valid Name",
            "email": "valid@example.com",
            "password": "short"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_client_error());

    // Name with markup
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "name": "<script>alert(1)</script>",
            "email": "valid@example.com",
            "password": "password123"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_client_error());
}
