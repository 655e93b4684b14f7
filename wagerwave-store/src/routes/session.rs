//! Session and top-up endpoints for the user dashboard.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use wagerwave_common::Session;

use crate::error::{Error, Result};
use crate::ledger::LedgerError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub user_id: String,
    pub points: u64,
}

#[derive(Debug, Serialize)]
pub struct MenuResponse {
    pub amounts: Vec<u64>,
}

/// GET /session
async fn current_session(State(state): State<Arc<AppState>>) -> Result<Json<Session>> {
    state.session_view.current().map(Json).ok_or(Error::NoSession)
}

/// GET /points/top-up
async fn top_up_menu(State(state): State<Arc<AppState>>) -> Json<MenuResponse> {
    Json(MenuResponse {
        amounts: state.ledger.top_up_amounts().to_vec(),
    })
}

/// POST /points/top-up
async fn top_up(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<BalanceResponse>> {
    let session = state.store.session().ok_or(LedgerError::NoActiveSession)?;
    let points = state.ledger.top_up(session.user_id(), request.amount)?;
    state.refresh_views();
    Ok(Json(BalanceResponse {
        user_id: session.user.id,
        points,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/session", get(current_session))
        .route("/points/top-up", get(top_up_menu).post(top_up))
        .with_state(state)
}
