use axum::{extract::State, Extension, Json};
use chrono::Utc;
use lemonade_core::{Identity, QuotaLedger, QuotaPolicy};
use serde::Serialize;

use crate::middleware::{Caller, RequestId};

use super::{map_store_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct UsageResponse {
    /// `free`, `pro`, or `guest`.
    pub plan: &'static str,
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    /// `daily` for plans, `never` for guest sessions.
    pub resets: &'static str,
}

pub(super) async fn get_usage(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(Caller(identity)): Extension<Caller>,
) -> Result<Json<ApiResponse<UsageResponse>>, ApiError> {
    let policy = QuotaPolicy::for_identity(&identity, &state.limits);
    let usage = state
        .store
        .usage(&identity, policy, Utc::now().date_naive())
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    let plan = match &identity {
        Identity::User { plan, .. } => plan.as_str(),
        Identity::Guest { .. } => "guest",
    };

    Ok(Json(ApiResponse {
        data: UsageResponse {
            plan,
            used: usage.used,
            limit: usage.limit,
            remaining: usage.remaining,
            resets: if usage.resets_daily { "daily" } else { "never" },
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
