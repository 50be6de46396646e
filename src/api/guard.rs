//! Route guards for the player and Game Master areas.
//!
//! Access is decided from the server-side session written by the login
//! handlers; nothing the browser stores on its own is trusted. The decision
//! functions are pure so the site front end and the API middleware agree on
//! the same rules.

use axum::{
    Extension, Json,
    extract::{Query, Request},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::observability::RequestSpan;
use super::{ApiError, ApiResponse, SessionGm, SessionUser, validation};

pub const SESSION_USER_KEY: &str = "user";
pub const SESSION_GM_KEY: &str = "gm";

const LOGIN_PAGE: &str = "/login";
const GM_LOGIN_PAGE: &str = "/gm-login";
const GM_DASHBOARD: &str = "/gm-dashboard";
const GM_PREFIX: &str = "/gm-";
const HOME: &str = "/";

/// What the current session is allowed to see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionFlags {
    pub logged_in: bool,
    pub is_gm: bool,
    pub gm_logged_in: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum RouteDecision {
    Allow,
    Redirect { location: &'static str },
}

impl RouteDecision {
    const fn redirect(location: &'static str) -> Self {
        Self::Redirect { location }
    }
}

/// Player-area guard, applied to every page of the site.
#[must_use]
pub fn user_area(path: &str, flags: SessionFlags) -> RouteDecision {
    if !flags.logged_in && path != LOGIN_PAGE {
        return RouteDecision::redirect(LOGIN_PAGE);
    }

    if flags.logged_in && path == LOGIN_PAGE {
        return RouteDecision::redirect(if flags.is_gm { GM_DASHBOARD } else { HOME });
    }

    if flags.logged_in && !flags.is_gm && path.starts_with(GM_PREFIX) {
        return RouteDecision::redirect(HOME);
    }

    RouteDecision::Allow
}

/// Game Master guard for the `/gm-*` pages.
#[must_use]
pub fn gm_area(path: &str, flags: SessionFlags) -> RouteDecision {
    if path == GM_LOGIN_PAGE {
        return if flags.gm_logged_in {
            RouteDecision::redirect(GM_DASHBOARD)
        } else {
            RouteDecision::Allow
        };
    }

    if path.starts_with(GM_PREFIX) && !flags.gm_logged_in {
        return RouteDecision::redirect(GM_LOGIN_PAGE);
    }

    RouteDecision::Allow
}

/// Combined decision for a navigation to `path`. Every page passes the
/// player guard first; `/gm-*` pages, `/gm-login` included, then pass the
/// GM guard.
#[must_use]
pub fn evaluate(path: &str, flags: SessionFlags) -> RouteDecision {
    match user_area(path, flags) {
        RouteDecision::Allow if path.starts_with(GM_PREFIX) => gm_area(path, flags),
        decision => decision,
    }
}

pub async fn session_user(session: &Session) -> Result<Option<SessionUser>, ApiError> {
    session
        .get::<SessionUser>(SESSION_USER_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))
}

pub async fn session_gm(session: &Session) -> Result<Option<SessionGm>, ApiError> {
    session
        .get::<SessionGm>(SESSION_GM_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))
}

pub async fn session_flags(session: &Session) -> Result<SessionFlags, ApiError> {
    let user = session_user(session).await?;
    let gm = session_gm(session).await?;

    Ok(SessionFlags {
        logged_in: user.is_some(),
        is_gm: user.is_some_and(|u| u.is_gm),
        gm_logged_in: gm.is_some(),
    })
}

// ============================================================================
// Middleware
// ============================================================================

/// Reject requests without a player (or GM) session.
pub async fn require_user(
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = session_user(&session)
        .await?
        .ok_or_else(ApiError::not_authenticated)?;

    record_user(&request, &user.username);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Reject requests without a Game Master session.
pub async fn require_gm(
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let gm = session_gm(&session)
        .await?
        .ok_or_else(ApiError::not_authenticated)?;

    record_user(&request, &gm.username);
    request.extensions_mut().insert(gm);
    Ok(next.run(request).await)
}

fn record_user(request: &Request, username: &str) {
    if let Some(span) = request.extensions().get::<RequestSpan>() {
        span.record_user(username);
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Deserialize)]
pub struct RouteQuery {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct RouteCheck {
    pub path: String,
    #[serde(flatten)]
    pub decision: RouteDecision,
}

/// GET /route-check?path=/x
pub async fn route_check(
    session: Session,
    Query(query): Query<RouteQuery>,
) -> Result<Json<ApiResponse<RouteCheck>>, ApiError> {
    validation::validate_route_path(&query.path)?;

    let flags = session_flags(&session).await?;
    let decision = evaluate(&query.path, flags);

    Ok(Json(ApiResponse::success(RouteCheck {
        path: query.path,
        decision,
    })))
}

/// GET /session
pub async fn current_user(Extension(user): Extension<SessionUser>) -> Json<ApiResponse<SessionUser>> {
    Json(ApiResponse::success(user))
}

/// GET /gm/session
pub async fn current_gm(Extension(gm): Extension<SessionGm>) -> Json<ApiResponse<SessionGm>> {
    Json(ApiResponse::success(gm))
}
