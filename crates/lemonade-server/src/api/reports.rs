use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use lemonade_core::{CompetitorReport, ReportListItem, ReportStore};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::{Caller, RequestId};

use super::{
    map_store_error, normalize_limit, require_user, ApiError, ApiResponse, AppState, ResponseMeta,
};

#[derive(Debug, Deserialize)]
pub(super) struct ReportsQuery {
    pub limit: Option<i64>,
}

pub(super) async fn list_reports(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(Caller(identity)): Extension<Caller>,
    Query(query): Query<ReportsQuery>,
) -> Result<Json<ApiResponse<Vec<ReportListItem>>>, ApiError> {
    let (user_id, _) = require_user(&req_id.0, &identity)?;
    let data = state
        .store
        .list_reports(user_id, normalize_limit(query.limit))
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// A report belonging to someone else is reported as missing.
pub(super) async fn get_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(Caller(identity)): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CompetitorReport>>, ApiError> {
    let (user_id, _) = require_user(&req_id.0, &identity)?;
    let report = state
        .store
        .get_report(id)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?
        .filter(|r| r.user_id == Some(user_id))
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "report not found"))?;

    Ok(Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    }))
}
