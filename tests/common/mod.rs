#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use novaterra::config::Config;
use novaterra::db::Store;
use novaterra::entities::{gm_accounts, users};
use sea_orm::{ActiveModelTrait, Set};
use std::sync::Arc;
use tower::ServiceExt;
use tower_sessions_sqlx_store::SqliteStore;

pub const PASSWORD: &str = "LeviathanValkyrae";

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.database.url = "sqlite::memory:".to_string();
    config.server.secure_cookies = false;
    config.observability.metrics_enabled = false;
    config
}

pub fn bcrypt_hash(password: &str) -> String {
    bcrypt::hash(password, 4).expect("bcrypt hash")
}

pub async fn seed_user(store: &Store, username: &str, password: &str) {
    users::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set(bcrypt_hash(password)),
        ..Default::default()
    }
    .insert(&store.conn)
    .await
    .expect("insert user");
}

pub struct GmSeed<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub gm_level: Option<i32>,
    pub permissions: Option<&'a str>,
    pub is_active: bool,
    pub last_login: Option<&'a str>,
}

pub async fn seed_gm(store: &Store, seed: GmSeed<'_>) {
    gm_accounts::ActiveModel {
        username: Set(seed.username.to_string()),
        password_hash: Set(bcrypt_hash(seed.password)),
        gm_level: Set(seed.gm_level),
        permissions: Set(seed.permissions.map(str::to_string)),
        is_active: Set(seed.is_active),
        last_login: Set(seed.last_login.map(str::to_string)),
        ..Default::default()
    }
    .insert(&store.conn)
    .await
    .expect("insert gm");
}

/// Router over a migrated in-memory database with the standard fixtures.
pub async fn spawn_app() -> (Router, Store) {
    let config = test_config();
    let store = Store::connect(&config.database)
        .await
        .expect("Failed to open store");

    seed_user(&store, "Plaguedoc", PASSWORD).await;
    seed_gm(
        &store,
        GmSeed {
            username: "admin_1",
            password: PASSWORD,
            gm_level: Some(5),
            permissions: Some(r#"{"bounties":"write"}"#),
            is_active: true,
            last_login: Some("2025-01-01T00:00:00+00:00"),
        },
    )
    .await;
    seed_gm(
        &store,
        GmSeed {
            username: "retired_gm",
            password: PASSWORD,
            gm_level: Some(2),
            permissions: None,
            is_active: false,
            last_login: None,
        },
    )
    .await;
    seed_gm(
        &store,
        GmSeed {
            username: "bare_gm",
            password: PASSWORD,
            gm_level: None,
            permissions: None,
            is_active: true,
            last_login: None,
        },
    )
    .await;

    let sessions = store.session_store().await.expect("Failed to open session store");
    let state = novaterra::api::create_app_state(config, Arc::new(store.clone()), sessions, None);
    (novaterra::api::router(state), store)
}

/// Session store over its own in-memory database, for routers built on fake
/// credential stores.
pub async fn session_store() -> SqliteStore {
    let store = Store::new("sqlite::memory:")
        .await
        .expect("Failed to open store");
    store
        .session_store()
        .await
        .expect("Failed to open session store")
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("response is JSON")
    }

    /// `name=value` pair of the session cookie, if one was set.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn post_raw(
    app: &Router,
    uri: &str,
    content_type: Option<&str>,
    body: &str,
) -> TestResponse {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    send(app, builder.body(Body::from(body.to_string())).unwrap()).await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> TestResponse {
    post_raw(app, uri, Some("application/json"), &body.to_string()).await
}

pub async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> TestResponse {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}
