//! Analysis endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use persona_common::{Post, Profile, Trait, TraitScores};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::analyzer::AnalysisResult;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /analyze request body
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Profile URL or bare handle
    pub instagram_url: String,
    pub max_posts: Option<usize>,
}

/// POST /analyze response
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub username: String,
    pub personality_traits: TraitScores,
    /// Posts sampled from the profile
    pub posts_analyzed: usize,
    /// Posts that contributed to the scores
    pub posts_scored: usize,
    pub sample_data: Vec<Post>,
    /// Radar chart as a `data:` URI
    pub visualization: String,
    pub dominant_trait: Trait,
    pub confidence: f64,
    pub trait_descriptions: BTreeMap<&'static str, &'static str>,
    pub engagement_rate: f64,
    pub profile_info: Profile,
}

impl AnalyzeResponse {
    pub fn from_result(result: &AnalysisResult, sample_size: usize) -> Self {
        Self {
            username: result.username.clone(),
            personality_traits: result.scores,
            posts_analyzed: result.posts.len(),
            posts_scored: result.posts_scored,
            sample_data: result.posts.iter().take(sample_size).cloned().collect(),
            visualization: result.chart.to_data_uri(),
            dominant_trait: result.dominant_trait,
            confidence: result.confidence,
            trait_descriptions: result.trait_descriptions(),
            engagement_rate: result.engagement_rate,
            profile_info: result.profile.clone(),
        }
    }
}

/// Service banner
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
    pub status: String,
}

/// GET /
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Instagram Personality Analyzer API".to_string(),
        status: "running".to_string(),
    })
}

/// POST /analyze
///
/// Analyzes a public profile and returns trait scores, a radar chart and a
/// sample of the posts used.
pub async fn analyze_profile(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    info!(input = %request.instagram_url, max_posts = ?request.max_posts, "Analyze request");

    match state.analyzer.analyze(&request.instagram_url, request.max_posts).await {
        Ok(result) => Ok(Json(AnalyzeResponse::from_result(
            &result,
            state.analyzer.sample_size(),
        ))),
        Err(e) => {
            let (status, _) = e.status_and_code();
            if status.is_server_error() {
                warn!(error = %e, "Analysis failed");
                *state.last_error.write().await = Some(e.to_string());
            }
            Err(e.into())
        }
    }
}

/// Build analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/analyze", post(analyze_profile))
}
