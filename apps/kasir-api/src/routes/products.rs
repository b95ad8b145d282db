//! Catalog: products.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use kasir_core::validation::validate_search_query;
use kasir_core::{NewProduct, Product, ProductDetail, ProductUpdate};

use super::{created, ok, Envelope};
use crate::auth::AuthenticatedCashier;
use crate::error::{ApiError, ApiResult};
use crate::extract::ValidJson;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub message: &'static str,
}

/// GET /api/v1/products?q=
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Envelope<Vec<ProductDetail>>> {
    let products = state.db.products();

    let found = match query.q.as_deref() {
        Some(q) if !q.trim().is_empty() => {
            let q = validate_search_query(q)?;
            products.search(&q).await?
        }
        _ => products.list().await?,
    };

    Ok(ok(found))
}

/// POST /api/v1/products
pub async fn create(
    State(state): State<Arc<AppState>>,
    _cashier: AuthenticatedCashier,
    ValidJson(input): ValidJson<NewProduct>,
) -> ApiResult<(StatusCode, Envelope<Product>)> {
    input.validate()?;
    let product = state.db.products().insert(&input).await?;
    Ok(created(product))
}

/// GET /api/v1/products/{id}
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<ProductDetail>> {
    state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .map(ok)
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))
}

/// PATCH /api/v1/products/{id}
pub async fn update(
    State(state): State<Arc<AppState>>,
    _cashier: AuthenticatedCashier,
    Path(id): Path<String>,
    ValidJson(changes): ValidJson<ProductUpdate>,
) -> ApiResult<Envelope<Product>> {
    changes.validate()?;
    let products = state.db.products();

    if changes.is_empty() {
        let current = products
            .get_by_id(&id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;
        return Ok(ok(current.product));
    }

    let product = products.update(&id, &changes).await?;
    Ok(ok(product))
}

/// DELETE /api/v1/products/{id}
pub async fn delete(
    State(state): State<Arc<AppState>>,
    _cashier: AuthenticatedCashier,
    Path(id): Path<String>,
) -> ApiResult<Envelope<Deleted>> {
    state.db.products().delete(&id).await?;
    Ok(ok(Deleted {
        message: "Product deleted",
    }))
}
