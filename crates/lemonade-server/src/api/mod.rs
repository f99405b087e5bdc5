mod analyze;
mod insights;
mod reports;
mod tracked;
mod usage;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use lemonade_core::{Identity, Plan, QuotaLimits, Store, StoreError, StoreHealth};
use lemonade_signals::{SocialSentimentAnalyzer, SuggestionFinder};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{
    enforce_rate_limit, request_id, resolve_identity, RateLimitState, RequestId,
    GUEST_SESSION_HEADER,
};
use crate::pipeline::{AnalysisError, AnalysisService};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub analysis: Arc<AnalysisService>,
    pub social: Arc<SocialSentimentAnalyzer>,
    pub suggestions: Arc<SuggestionFinder>,
    pub limits: QuotaLimits,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(flatten)]
    pub quota: Option<QuotaDetails>,
}

/// Attached to `quota_exceeded` errors so clients can prompt for sign-up or
/// an upgrade.
#[derive(Debug, Serialize)]
pub struct QuotaDetails {
    pub limit: u32,
    pub used: u32,
    pub sign_up_required: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                quota: None,
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    fn with_quota(mut self, quota: QuotaDetails) -> Self {
        self.error.quota = Some(quota);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "validation_error" => StatusCode::BAD_REQUEST,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "sign_up_required" => StatusCode::FORBIDDEN,
            "not_found" => StatusCode::NOT_FOUND,
            "quota_exceeded" | "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "report_failed" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_store_error(request_id: String, error: &StoreError) -> ApiError {
    if matches!(error, StoreError::NotFound) {
        return ApiError::new(request_id, "not_found", "record not found");
    }
    tracing::error!(error = %error, "storage operation failed");
    ApiError::new(request_id, "internal_error", "storage operation failed")
}

pub(super) fn map_analysis_error(request_id: String, error: AnalysisError) -> ApiError {
    match error {
        AnalysisError::Input(e) => ApiError::new(request_id, "validation_error", e.to_string()),
        AnalysisError::NoSources => ApiError::new(
            request_id,
            "validation_error",
            "enable at least one signal source",
        ),
        AnalysisError::QuotaExceeded {
            used,
            limit,
            sign_up_required,
        } => {
            let message = if sign_up_required {
                "free analysis used; sign up to keep analysing competitors"
            } else {
                "daily analysis limit reached; upgrade or try again tomorrow"
            };
            ApiError::new(request_id, "quota_exceeded", message).with_quota(QuotaDetails {
                limit,
                used,
                sign_up_required,
            })
        }
        AnalysisError::Report(e) => {
            tracing::error!(error = %e, "report generation failed");
            ApiError::new(
                request_id,
                "report_failed",
                "the report could not be generated; no analysis was used",
            )
        }
        AnalysisError::Store(e) => map_store_error(request_id, &e),
    }
}

/// History, watch-list and suggestion endpoints are for signed-in users.
pub(super) fn require_user(request_id: &str, identity: &Identity) -> Result<(i64, Plan), ApiError> {
    match identity {
        Identity::User { id, plan } => Ok((*id, *plan)),
        Identity::Guest { .. } => Err(ApiError::new(
            request_id,
            "sign_up_required",
            "sign up to use this feature",
        )),
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
            HeaderName::from_static(GUEST_SESSION_HEADER),
        ])
}

fn protected_router(state: AppState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/analyze", post(analyze::run_analysis))
        .route("/api/v1/analyze/preview", post(analyze::run_preview))
        .route("/api/v1/usage", get(usage::get_usage))
        .route("/api/v1/reports", get(reports::list_reports))
        .route("/api/v1/reports/{id}", get(reports::get_report))
        .route(
            "/api/v1/tracked",
            get(tracked::list_tracked).post(tracked::add_tracked),
        )
        .route("/api/v1/tracked/{id}", delete(tracked::remove_tracked))
        .route("/api/v1/suggestions", get(insights::get_suggestions))
        .route("/api/v1/sentiment", get(insights::get_sentiment))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    state,
                    resolve_identity,
                )),
        )
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(state.clone(), rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
