use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use notesync_core::store::NoteStore;
use notesync_core::sync::SyncCoordinator;
use notesync_core::UserId;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{extract_bearer_token, JwtVerifier};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::rate_limit::{RateLimitMetricsSnapshot, SyncRateLimiter};

pub struct AppState<S> {
    coordinator: Arc<SyncCoordinator<S>>,
    jwt_verifier: JwtVerifier,
    rate_limiter: SyncRateLimiter,
    request_timeout: Duration,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            coordinator: Arc::clone(&self.coordinator),
            jwt_verifier: self.jwt_verifier.clone(),
            rate_limiter: self.rate_limiter.clone(),
            request_timeout: self.request_timeout,
        }
    }
}

impl<S: NoteStore> AppState<S> {
    pub fn from_config(config: &AppConfig, store: S) -> Self {
        Self::new(
            SyncCoordinator::new(store, config.sync_options()),
            JwtVerifier::from_config(config),
            SyncRateLimiter::from_config(config),
            config.request_timeout,
        )
    }

    pub fn new(
        coordinator: SyncCoordinator<S>,
        jwt_verifier: JwtVerifier,
        rate_limiter: SyncRateLimiter,
        request_timeout: Duration,
    ) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
            jwt_verifier,
            rate_limiter,
            request_timeout,
        }
    }
}

/// Identity resolved from the bearer token, if one was sent.
#[derive(Debug, Clone)]
struct Caller(Option<UserId>);

pub fn app_router<S: NoteStore + 'static>(state: AppState<S>) -> Router {
    let sync_routes = Router::new()
        .route("/sync", post(sync::<S>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            resolve_caller::<S>,
        ));

    Router::new()
        .route("/healthz", get(healthz::<S>))
        .nest("/v1", sync_routes)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    rate_limit: RateLimitMetricsSnapshot,
}

async fn healthz<S: NoteStore + 'static>(State(state): State<AppState<S>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        rate_limit: state.rate_limiter.metrics_snapshot(),
    })
}

async fn resolve_caller<S: NoteStore + 'static>(
    State(state): State<AppState<S>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let caller = match extract_bearer_token(request.headers())? {
        Some(token) => Some(state.jwt_verifier.verify_access_token(token)?),
        None => None,
    };
    request.extensions_mut().insert(Caller(caller));
    Ok(next.run(request).await)
}

async fn sync<S: NoteStore + 'static>(
    State(state): State<AppState<S>>,
    Extension(Caller(caller)): Extension<Caller>,
    body: Bytes,
) -> Result<Response, AppError> {
    if let Some(user) = &caller {
        state.rate_limiter.check(user).await?;
    }

    let response = state.coordinator.sync(caller.as_ref(), &body).await?;
    tracing::debug!(
        endpoint = "sync",
        user = caller.as_ref().map(UserId::fingerprint),
        request_bytes = body.len(),
        response_bytes = response.len(),
        "Served sync round"
    );
    Ok(([(header::CONTENT_TYPE, "application/json")], response).into_response())
}
