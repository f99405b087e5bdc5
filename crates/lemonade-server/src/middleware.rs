use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use lemonade_core::{AccountStore, Identity};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::{ApiError, AppState};

pub const GUEST_SESSION_HEADER: &str = "x-guest-session";
const MAX_GUEST_SESSION_LEN: usize = 128;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// The resolved caller, stored as a request extension by [`resolve_identity`].
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Process-wide fixed-window flood guard. Per-caller analysis quotas live in
/// the database; this only caps raw request volume.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(RateLimitWindow {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is inserted into request
/// extensions as [`RequestId`] and echoed on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default()
}

/// Resolve who is calling and attach it as [`Caller`].
///
/// A bearer token must match a live session; a token that does not is
/// rejected rather than downgraded to a guest. Without a token the
/// `x-guest-session` header identifies an anonymous browser session.
pub async fn resolve_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let req_id = request_id_of(&req);
    // Owned values only: the request itself must not be borrowed across the
    // session lookup.
    let token_hash = extract_bearer_token(req.headers().get(AUTHORIZATION))
        .map(lemonade_db::hash_token);
    let guest_session =
        extract_guest_session(req.headers().get(GUEST_SESSION_HEADER)).map(str::to_string);

    let identity = if let Some(token_hash) = token_hash {
        match state.store.user_for_session(&token_hash, Utc::now()).await {
            Ok(Some(user)) => Identity::User {
                id: user.id,
                plan: user.plan,
            },
            Ok(None) => {
                return ApiError::new(req_id, "unauthorized", "session is invalid or expired")
                    .into_response();
            }
            Err(e) => {
                tracing::error!(error = %e, "session lookup failed");
                return ApiError::new(req_id, "internal_error", "session lookup failed")
                    .into_response();
            }
        }
    } else if let Some(session_id) = guest_session {
        Identity::Guest { session_id }
    } else {
        return ApiError::new(
            req_id,
            "unauthorized",
            "sign in or provide an x-guest-session header",
        )
        .into_response();
    };

    req.extensions_mut().insert(Caller(identity));
    next.run(req).await
}

/// Middleware enforcing a fixed request-per-window limit.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let mut window = rate_limit.state.lock().await;
    let elapsed = window.started_at.elapsed();

    if elapsed >= rate_limit.window {
        window.started_at = Instant::now();
        window.count = 0;
    }

    if window.count >= rate_limit.max_requests {
        drop(window);
        return ApiError::new(request_id_of(&req), "rate_limited", "rate limit exceeded")
            .into_response();
    }

    window.count += 1;
    drop(window);

    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn extract_guest_session(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() <= MAX_GUEST_SESSION_LEN)
}
