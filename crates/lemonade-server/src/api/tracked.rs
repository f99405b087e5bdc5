use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use lemonade_core::{TrackResult, TrackedCompetitor, WatchList};
use serde::{Deserialize, Serialize};

use crate::middleware::{Caller, RequestId};

use super::{
    map_analysis_error, map_store_error, require_user, ApiError, ApiResponse, AppState,
    ResponseMeta,
};

const MAX_TRACK_BATCH: usize = 50;

#[derive(Debug, Serialize)]
pub(super) struct TrackedList {
    pub items: Vec<TrackedCompetitor>,
    pub active: usize,
    pub cap: u32,
}

#[derive(Debug, Deserialize)]
pub(super) struct TrackRequest {
    pub competitors: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct RemovedTracked {
    pub id: i64,
    pub removed: bool,
}

pub(super) async fn list_tracked(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(Caller(identity)): Extension<Caller>,
) -> Result<Json<ApiResponse<TrackedList>>, ApiError> {
    let (user_id, plan) = require_user(&req_id.0, &identity)?;
    let items = state
        .store
        .list_tracked(user_id)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: TrackedList {
            active: items.len(),
            cap: state.limits.tracked_cap(plan),
            items,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Track a batch of names. Each name gets its own outcome, so a batch that
/// runs into the plan cap still succeeds as a request.
pub(super) async fn add_tracked(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(Caller(identity)): Extension<Caller>,
    Json(body): Json<TrackRequest>,
) -> Result<Json<ApiResponse<Vec<TrackResult>>>, ApiError> {
    let (user_id, plan) = require_user(&req_id.0, &identity)?;

    let names: Vec<String> = body
        .competitors
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "at least one competitor name is required",
        ));
    }
    if names.len() > MAX_TRACK_BATCH {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("at most {MAX_TRACK_BATCH} competitors can be tracked per request"),
        ));
    }

    let data = state
        .analysis
        .track_competitors(user_id, plan, &names, None)
        .await
        .map_err(|e| map_analysis_error(req_id.0.clone(), e))?;

    tracing::info!(user_id, requested = names.len(), "tracked competitors updated");
    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn remove_tracked(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(Caller(identity)): Extension<Caller>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<RemovedTracked>>, ApiError> {
    let (user_id, _) = require_user(&req_id.0, &identity)?;
    let removed = state
        .store
        .deactivate_tracked(user_id, id)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;
    if !removed {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            "tracked competitor not found",
        ));
    }

    Ok(Json(ApiResponse {
        data: RemovedTracked { id, removed },
        meta: ResponseMeta::new(req_id.0),
    }))
}
