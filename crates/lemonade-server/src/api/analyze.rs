use axum::{extract::State, Extension, Json};
use chrono::Utc;
use lemonade_core::{parse_competitor_input, SourceToggles};
use serde::Deserialize;

use crate::middleware::{Caller, RequestId};
use crate::pipeline::{AnalysisError, AnalysisOutcome, AnalysisRequest, PreviewOutcome};

use super::{map_analysis_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// Inbound analysis body. Competitors may arrive as free text (newline or
/// comma separated), as a list, or both.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AnalyzeBody {
    #[serde(default)]
    pub competitors: Option<String>,
    #[serde(default)]
    pub competitor_list: Option<Vec<String>>,
    #[serde(default)]
    pub sources: SourceToggles,
    #[serde(default)]
    pub auto_track: bool,
    #[serde(default)]
    pub nocache: bool,
}

impl AnalyzeBody {
    fn competitor_names(&self, max: usize) -> Result<Vec<String>, AnalysisError> {
        Ok(parse_competitor_input(
            self.competitors.as_deref(),
            self.competitor_list.as_deref(),
            max,
        )?)
    }
}

pub(super) async fn run_analysis(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(Caller(identity)): Extension<Caller>,
    Json(body): Json<AnalyzeBody>,
) -> Result<Json<ApiResponse<AnalysisOutcome>>, ApiError> {
    let max = state.analysis.settings().max_competitors;
    let competitors = body
        .competitor_names(max)
        .map_err(|e| map_analysis_error(req_id.0.clone(), e))?;

    let request = AnalysisRequest {
        competitors,
        sources: body.sources,
        auto_track: body.auto_track,
        nocache: body.nocache,
    };
    let outcome = state
        .analysis
        .analyze(&identity, request, Utc::now())
        .await
        .map_err(|e| map_analysis_error(req_id.0.clone(), e))?;

    Ok(Json(ApiResponse {
        data: outcome,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn run_preview(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(Caller(identity)): Extension<Caller>,
    Json(body): Json<AnalyzeBody>,
) -> Result<Json<ApiResponse<PreviewOutcome>>, ApiError> {
    let max = state.analysis.settings().max_competitors;
    let competitors = body
        .competitor_names(max)
        .map_err(|e| map_analysis_error(req_id.0.clone(), e))?;

    let outcome = state
        .analysis
        .preview(&identity, competitors, body.sources, Utc::now())
        .await
        .map_err(|e| map_analysis_error(req_id.0.clone(), e))?;

    Ok(Json(ApiResponse {
        data: outcome,
        meta: ResponseMeta::new(req_id.0),
    }))
}
