use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::middleware::request_id::RequestId;
use crate::models::{ContentId, UserId};
use crate::services::Recommendation;

use super::AppState;

// Request/Response types

fn default_policy() -> String {
    "thompson".to_string()
}

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub user_id: UserId,
    pub genre: String,
    #[serde(default = "default_policy", alias = "agent_type")]
    pub policy: String,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub content_id: ContentId,
    pub title: String,
    pub url: String,
    pub policy: String,
    pub score: f64,
}

impl From<Recommendation> for RecommendResponse {
    fn from(recommendation: Recommendation) -> Self {
        Self {
            content_id: recommendation.content.id,
            title: recommendation.content.title,
            url: recommendation.content.url,
            policy: recommendation.policy.name().to_string(),
            score: recommendation.score,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub user_id: UserId,
    pub content_id: ContentId,
    pub reward: i64,
    pub genre: String,
    #[serde(alias = "agent_type")]
    pub policy: String,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub status: &'static str,
    pub event_id: i64,
    pub recorded_at: DateTime<Utc>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Pick a video for a user within a genre
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RecommendRequest>,
) -> AppResult<Json<RecommendResponse>> {
    tracing::info!(
        request_id = %request_id,
        user_id = request.user_id,
        genre = %request.genre,
        policy = %request.policy,
        "Processing recommendation request"
    );

    let recommendation = state
        .engine
        .recommend(request.user_id, &request.genre, &request.policy)
        .await?;

    Ok(Json(RecommendResponse::from(recommendation)))
}

/// Record explicit feedback for a recommended video
pub async fn feedback(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<FeedbackRequest>,
) -> AppResult<(StatusCode, Json<FeedbackResponse>)> {
    tracing::info!(
        request_id = %request_id,
        user_id = request.user_id,
        content_id = request.content_id,
        reward = request.reward,
        "Processing feedback"
    );

    let ack = state
        .feedback
        .record_feedback(
            request.user_id,
            request.content_id,
            &request.genre,
            &request.policy,
            request.reward,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(FeedbackResponse {
            status: "recorded",
            event_id: ack.event_id,
            recorded_at: ack.recorded_at,
        }),
    ))
}
