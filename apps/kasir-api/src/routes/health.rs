use std::sync::Arc;

use axum::extract::State;
use serde::Serialize;

use super::{ok, Envelope};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub database: bool,
}

/// GET /api/v1/health
pub async fn check(State(state): State<Arc<AppState>>) -> Envelope<Health> {
    ok(Health {
        status: "ok",
        database: state.db.health_check().await,
    })
}
