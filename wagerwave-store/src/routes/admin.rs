//! Admin dashboard endpoints.
//!
//! Every route requires a signed-in session whose local role is admin.

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;

use wagerwave_common::{Session, Status, UserRecord};

use crate::error::{Error, Result};
use crate::ledger::LedgerError;
use crate::routes::session::{AmountRequest, BalanceResponse};
use crate::AppState;

/// Middleware that requires an admin session and hands it to the handler.
async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(session) = state.store.session() else {
        return Error::Unauthenticated.into_response();
    };
    if !session.is_admin() {
        tracing::warn!("Admin route refused for {}", session.user.username);
        return Error::from(LedgerError::NotAdmin).into_response();
    }

    request.extensions_mut().insert(session);
    next.run(request).await
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: Status,
}

/// GET /admin/users
async fn list_users(State(state): State<Arc<AppState>>) -> Json<Vec<UserRecord>> {
    Json(state.users_view.current())
}

/// POST /admin/users/:id/points
async fn grant_points(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Session>,
    Path(user_id): Path<String>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<BalanceResponse>> {
    let points = state.ledger.admin_grant(&caller, &user_id, request.amount)?;
    state.refresh_views();
    Ok(Json(BalanceResponse { user_id, points }))
}

/// POST /admin/users/:id/status
async fn set_status(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Session>,
    Path(user_id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<UserRecord>> {
    let user = state.ledger.set_status(&caller, &user_id, request.status)?;
    state.refresh_views();
    Ok(Json(user))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id/points", post(grant_points))
        .route("/users/:id/status", post(set_status))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .with_state(state)
}
