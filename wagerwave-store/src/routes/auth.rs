//! Sign-in, sign-up and link auto-fill.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use reqwest::Url;
use serde::Deserialize;

use wagerwave_common::{Session, UserRecord};

use crate::auth::RegistrationForm;
use crate::error::{Error, Result};
use crate::prefill::PrefillParams;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Either a full address (`url`) or the bare link parameters.
#[derive(Debug, Deserialize)]
pub struct PrefillQuery {
    pub url: Option<String>,
    #[serde(flatten)]
    pub params: PrefillParams,
}

/// POST /auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Session>> {
    let session = state.auth.login(&request.username, &request.password).await?;
    state.refresh_views();
    Ok(Json(session))
}

/// POST /auth/admin-login
async fn admin_login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Session>> {
    let session = state.auth.admin_login(&request.username, &request.password).await?;
    state.refresh_views();
    Ok(Json(session))
}

/// POST /auth/register
async fn register(
    State(state): State<Arc<AppState>>,
    Json(form): Json<RegistrationForm>,
) -> Result<(StatusCode, Json<UserRecord>)> {
    let user = state.auth.register(&form).await?;
    state.refresh_views();
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /auth/logout
async fn logout(State(state): State<Arc<AppState>>) -> Result<StatusCode> {
    state.auth.logout()?;
    state.refresh_views();
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/prefill - 204 when the link carries nothing to fill.
async fn prefill(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PrefillQuery>,
) -> Result<Response> {
    let outcome = match &query.url {
        Some(raw) => {
            let url = Url::parse(raw).map_err(|e| Error::InvalidRequest(format!("url: {}", e)))?;
            state.prefill.from_url(&url)
        }
        None => state.prefill.resolve(&query.params),
    };

    Ok(match outcome {
        Some(outcome) => Json(outcome).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/admin-login", post(admin_login))
        .route("/register", post(register))
        .route("/logout", post(logout))
        .route("/prefill", get(prefill))
        .with_state(state)
}
