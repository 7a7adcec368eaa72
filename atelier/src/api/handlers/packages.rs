use axum::{
    Json,
    extract::{Path, State},
};

use crate::AppState;
use crate::api::models::packages::PackageResponse;
use crate::db::handlers::Packages;
use crate::errors::{Error, Result};
use crate::packages::Tier;

#[utoipa::path(
    get,
    path = "/packages",
    tag = "packages",
    summary = "List packages",
    description = "The subscription catalog with each tier's limit profile. No authentication required.",
    responses(
        (status = 200, description = "All packages", body = Vec<PackageResponse>),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_packages(State(state): State<AppState>) -> Result<Json<Vec<PackageResponse>>> {
    let mut conn = state.db.acquire().await?;
    let packages = Packages::new(&mut conn).list().await?;
    Ok(Json(packages.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/packages/{name}",
    tag = "packages",
    summary = "Get package",
    params(("name" = String, Path, description = "Tier name, e.g. BASIC")),
    responses(
        (status = 200, description = "Package", body = PackageResponse),
        (status = 404, description = "Unknown tier"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_package(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<PackageResponse>> {
    let tier: Tier = name.parse()?;
    let mut conn = state.db.acquire().await?;
    let package = Packages::new(&mut conn)
        .get(tier)
        .await?
        .ok_or_else(|| Error::not_found("Package", tier))?;
    Ok(Json(package.into()))
}

#[cfg(test)]
mod tests {
    use crate::api::models::packages::PackageResponse;
    use crate::packages::Tier;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_catalog_is_public(pool: PgPool) {
        let app = create_test_app(pool).await;

        let response = app.get("/api/v1/packages").await;
        response.assert_status_ok();
        let packages: Vec<PackageResponse> = response.json();
        assert_eq!(packages.len(), 4);

        let response = app.get("/api/v1/packages/basic").await;
        response.assert_status_ok();
        let basic: PackageResponse = response.json();
        assert_eq!(basic.name, Tier::Basic);
        assert_eq!(basic.limits.max_workers, 15);

        app.get("/api/v1/packages/GOLD").await.assert_status(StatusCode::NOT_FOUND);
    }
}
