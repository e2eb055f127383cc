use axum::{extract::Path, http::StatusCode, Extension, Json};
use hub_catalog_core::principal::Principal;
use hub_catalog_core::types::{Category, CategoryInput};
use hub_catalog_core::HubServices;

use crate::error::AppError;

pub async fn list_categories(
    Extension(services): Extension<HubServices>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(services.categories.get_categories().await?))
}

pub async fn get_category(
    Extension(services): Extension<HubServices>,
    Path(id): Path<i64>,
) -> Result<Json<Category>, AppError> {
    Ok(Json(services.categories.get_category(id).await?))
}

pub async fn create_category(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    principal.require_admin()?;
    let category = services.categories.create_category(&input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Path(id): Path<i64>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>, AppError> {
    principal.require_admin()?;
    Ok(Json(services.categories.update_category(id, &input).await?))
}

pub async fn delete_category(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<HubServices>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    principal.require_admin()?;
    services.categories.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
