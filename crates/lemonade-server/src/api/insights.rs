use axum::{
    extract::{Query, State},
    Extension, Json,
};
use lemonade_llm::Suggestion;
use lemonade_signals::SocialSentiment;
use serde::{Deserialize, Serialize};

use crate::middleware::{Caller, RequestId};

use super::{require_user, ApiError, ApiResponse, AppState, ResponseMeta};

const MAX_NAME_CHARS: usize = 100;

#[derive(Debug, Deserialize)]
pub(super) struct CompetitorQuery {
    pub competitor: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct SuggestionList {
    pub competitor: String,
    pub suggestions: Vec<Suggestion>,
}

fn competitor_param(request_id: &str, query: CompetitorQuery) -> Result<String, ApiError> {
    let name = query.competitor.unwrap_or_default().trim().to_string();
    if name.is_empty() {
        return Err(ApiError::new(
            request_id,
            "validation_error",
            "competitor is required",
        ));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(ApiError::new(
            request_id,
            "validation_error",
            format!("competitor must be at most {MAX_NAME_CHARS} characters"),
        ));
    }
    Ok(name)
}

/// Suggested competitors never fail: missing news or model output just
/// yields fewer suggestions.
pub(super) async fn get_suggestions(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(Caller(identity)): Extension<Caller>,
    Query(query): Query<CompetitorQuery>,
) -> Result<Json<ApiResponse<SuggestionList>>, ApiError> {
    require_user(&req_id.0, &identity)?;
    let competitor = competitor_param(&req_id.0, query)?;

    let suggestions = state.suggestions.suggest(&competitor).await;
    tracing::info!(competitor, count = suggestions.len(), "suggestions served");

    Ok(Json(ApiResponse {
        data: SuggestionList {
            competitor,
            suggestions,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_sentiment(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CompetitorQuery>,
) -> Result<Json<ApiResponse<SocialSentiment>>, ApiError> {
    let competitor = competitor_param(&req_id.0, query)?;
    let data = state.social.analyze(&competitor).await;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
