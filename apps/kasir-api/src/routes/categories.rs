use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;

use kasir_core::{Category, CategoryWithCount, NewCategory};

use super::{created, ok, Envelope};
use crate::auth::AuthenticatedCashier;
use crate::error::ApiResult;
use crate::extract::ValidJson;
use crate::AppState;

/// GET /api/v1/categories - ordered by name, with product counts
pub async fn list(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Envelope<Vec<CategoryWithCount>>> {
    let categories = state.db.categories().list_with_counts().await?;
    Ok(ok(categories))
}

/// POST /api/v1/categories
pub async fn create(
    State(state): State<Arc<AppState>>,
    _cashier: AuthenticatedCashier,
    ValidJson(input): ValidJson<NewCategory>,
) -> ApiResult<(StatusCode, Envelope<Category>)> {
    input.validate()?;
    let category = state.db.categories().insert(&input).await?;
    Ok(created(category))
}
