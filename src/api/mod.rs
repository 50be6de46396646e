use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

use crate::config::Config;
use crate::db::{CredentialStore, Store};
use crate::services::{AuthService, CredentialAuthService};

pub mod auth;
mod error;
pub mod guard;
mod observability;
mod types;
pub(crate) mod validation;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    pub auth_service: Arc<dyn AuthService>,

    pub session_store: SqliteStore,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Build state around any credential store. Tests hand in fakes here.
#[must_use]
pub fn create_app_state(
    config: Config,
    store: Arc<dyn CredentialStore>,
    session_store: SqliteStore,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    let auth_service: Arc<dyn AuthService> = Arc::new(CredentialAuthService::new(store));

    Arc::new(AppState {
        config: Arc::new(config),
        auth_service,
        session_store,
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let store = Store::connect(&config.database).await?;
    let session_store = store.session_store().await?;
    Ok(create_app_state(
        config,
        Arc::new(store),
        session_store,
        prometheus_handle,
    ))
}

pub fn router(state: Arc<AppState>) -> Router {
    let server = &state.config().server;

    let session_layer = SessionManagerLayer::new(state.session_store.clone())
        .with_secure(server.secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            server.session_idle_minutes,
        )));

    let api_router = Router::new()
        .merge(create_player_router())
        .merge(create_gm_router())
        .route("/user-login", post(auth::user_login))
        .route("/gm-login", post(auth::gm_login))
        .route("/logout", post(auth::logout))
        .route("/route-check", get(guard::route_check))
        .route("/metrics", get(observability::get_metrics))
        .layer(session_layer)
        .with_state(state.clone());

    let cors_origins = &server.cors_allowed_origins;
    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_credentials(true)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
        ]).allow_headers([axum::http::header::CONTENT_TYPE]))
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn create_player_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/session", get(guard::current_user))
        .route_layer(middleware::from_fn(guard::require_user))
}

fn create_gm_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/gm/session", get(guard::current_gm))
        .route_layer(middleware::from_fn(guard::require_gm))
}
