use axum::Json;

use crate::api::models::users::CurrentUser;
use crate::errors::Result;

#[utoipa::path(
    get,
    path = "/me",
    tag = "users",
    summary = "Current user",
    description = "The user resolved from the identity header; created on first sight when auto-creation is enabled.",
    responses(
        (status = 200, description = "Current user", body = CurrentUser),
        (status = 401, description = "Missing identity header or unknown user")
    ),
    security(("X-Atelier-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_current_user(current_user: CurrentUser) -> Result<Json<CurrentUser>> {
    Ok(Json(current_user))
}

#[cfg(test)]
mod tests {
    use crate::api::models::users::CurrentUser;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_identity_header(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        app.get("/api/v1/me").await.assert_status(StatusCode::UNAUTHORIZED);

        let (name, value) = auth_header("new.tailor@example.com");
        let response = app.get("/api/v1/me").add_header(name, value).await;
        response.assert_status_ok();
        let user: CurrentUser = response.json();
        assert_eq!(user.email, "new.tailor@example.com");

        // Second request resolves to the same user
        let (name, value) = auth_header("new.tailor@example.com");
        let again: CurrentUser = app.get("/api/v1/me").add_header(name, value).await.json();
        assert_eq!(again.id, user.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unknown_user_rejected_without_auto_create(pool: PgPool) {
        let mut config = create_test_config();
        config.auth.auto_create_users = false;
        let app = create_test_app_with_config(pool.clone(), config).await;

        let (name, value) = auth_header("stranger@example.com");
        app.get("/api/v1/me").add_header(name, value).await.assert_status(StatusCode::UNAUTHORIZED);

        create_test_user(&pool, "known@example.com").await;
        let (name, value) = auth_header("known@example.com");
        app.get("/api/v1/me").add_header(name, value).await.assert_status_ok();
    }
}
