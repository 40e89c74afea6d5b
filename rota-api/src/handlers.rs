//! Route handlers
//!
//! Each handler draws its random source from entropy; the engine sees only
//! the `Rng` it is handed.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rota_db::{NewPullRequest, PullRequest, PullRequestShort, ReviewerStats, Team, User};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ApiErr;
use crate::AppState;

type ApiResult<T> = Result<T, ApiErr>;

// ── Request and response bodies ──────────────────────────────────────────────

#[derive(Deserialize)]
pub struct TeamQuery {
    team_name: String,
}

#[derive(Deserialize)]
pub struct UserQuery {
    user_id: String,
}

#[derive(Deserialize)]
pub struct SetActiveBody {
    user_id: String,
    is_active: bool,
}

#[derive(Deserialize)]
pub struct CreatePrBody {
    pull_request_id: String,
    pull_request_name: String,
    author_id: String,
}

#[derive(Deserialize)]
pub struct MergeBody {
    pull_request_id: String,
}

#[derive(Deserialize)]
pub struct ReassignBody {
    pull_request_id: String,
    old_user_id: String,
}

#[derive(Deserialize)]
pub struct DeactivateBody {
    team_name: String,
    #[serde(default)]
    user_ids: Vec<String>,
}

#[derive(Serialize)]
pub struct TeamResponse {
    team: Team,
}

#[derive(Serialize)]
pub struct UserResponse {
    user: User,
}

#[derive(Serialize)]
pub struct PrResponse {
    pr: PullRequest,
}

#[derive(Serialize)]
pub struct ReassignResponse {
    pr: PullRequest,
    replaced_by: String,
}

#[derive(Serialize)]
pub struct ReviewsResponse {
    user_id: String,
    pull_requests: Vec<PullRequestShort>,
}

fn require(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiErr::invalid(format!("{} required", field)));
    }
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// POST /team/add
pub async fn add_team(
    State(state): State<AppState>,
    payload: Result<Json<Team>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TeamResponse>)> {
    let Json(team) = payload?;
    let team = state.roster.upsert_team(&team).await?;
    Ok((StatusCode::CREATED, Json(TeamResponse { team })))
}

/// GET /team/get?team_name=
pub async fn get_team(
    State(state): State<AppState>,
    query: Result<Query<TeamQuery>, QueryRejection>,
) -> ApiResult<Json<Team>> {
    let Query(query) = query?;
    require("team_name", &query.team_name)?;
    Ok(Json(state.roster.get_team(&query.team_name).await?))
}

/// POST /users/setIsActive
pub async fn set_is_active(
    State(state): State<AppState>,
    payload: Result<Json<SetActiveBody>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    let Json(body) = payload?;
    require("user_id", &body.user_id)?;
    let user = state
        .roster
        .set_user_active(&body.user_id, body.is_active)
        .await?;
    Ok(Json(UserResponse { user }))
}

/// GET /users/getReview?user_id=
pub async fn get_review(
    State(state): State<AppState>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult<Json<ReviewsResponse>> {
    let Query(query) = query?;
    require("user_id", &query.user_id)?;
    let pull_requests = state.engine.reviews_for(&query.user_id).await?;
    Ok(Json(ReviewsResponse {
        user_id: query.user_id,
        pull_requests,
    }))
}

/// POST /pullRequest/create
pub async fn create_pull_request(
    State(state): State<AppState>,
    payload: Result<Json<CreatePrBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PrResponse>)> {
    let Json(body) = payload?;
    require("pull_request_id", &body.pull_request_id)?;
    require("author_id", &body.author_id)?;

    let new = NewPullRequest::new(body.pull_request_id, body.pull_request_name, body.author_id);
    let mut rng = StdRng::from_entropy();
    let pr = state.engine.create_pull_request(new, &mut rng).await?;
    Ok((StatusCode::CREATED, Json(PrResponse { pr })))
}

/// POST /pullRequest/merge
pub async fn merge_pull_request(
    State(state): State<AppState>,
    payload: Result<Json<MergeBody>, JsonRejection>,
) -> ApiResult<Json<PrResponse>> {
    let Json(body) = payload?;
    require("pull_request_id", &body.pull_request_id)?;
    let pr = state.engine.merge_pull_request(&body.pull_request_id).await?;
    Ok(Json(PrResponse { pr }))
}

/// POST /pullRequest/reassign
pub async fn reassign_reviewer(
    State(state): State<AppState>,
    payload: Result<Json<ReassignBody>, JsonRejection>,
) -> ApiResult<Json<ReassignResponse>> {
    let Json(body) = payload?;
    require("pull_request_id", &body.pull_request_id)?;
    require("old_user_id", &body.old_user_id)?;

    let mut rng = StdRng::from_entropy();
    let outcome = state
        .engine
        .reassign_reviewer(&body.pull_request_id, &body.old_user_id, &mut rng)
        .await?;
    Ok(Json(ReassignResponse {
        pr: outcome.pull_request,
        replaced_by: outcome.replaced_by,
    }))
}

/// POST /team/deactivateUsers
pub async fn deactivate_users(
    State(state): State<AppState>,
    payload: Result<Json<DeactivateBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;
    if body.team_name.trim().is_empty() || body.user_ids.is_empty() {
        return Err(ApiErr::invalid("team_name and user_ids required"));
    }

    let mut rng = StdRng::from_entropy();
    state
        .engine
        .deactivate_team_members(&body.team_name, &body.user_ids, &mut rng)
        .await?;
    Ok(Json(json!({ "status": "ok" })))
}

/// GET /stats
pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<ReviewerStats>> {
    Ok(Json(state.engine.stats().await?))
}
