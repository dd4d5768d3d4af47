//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs include parameters and basic result info.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::response::IntoResponse;
use axum::Json;
use tracing::{info, instrument};

use crate::error::EngineError;
use crate::logic;
use crate::protocol::{HealthOut, LeaderboardQuery, LimitQuery, SubmitIn};
use crate::state::AppState;

/// Authenticated identity attached by the auth layer in front of the engine.
///
/// Session mechanics live outside this service; requests arrive with an
/// `x-user-id` header (required) and an `x-user-name` header (optional, a
/// placeholder name is synthesized when absent).
pub struct Identity {
  pub user_id: i64,
  pub username: String,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Identity
where
  S: Send + Sync,
{
  type Rejection = EngineError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    let user_id = parts
      .headers
      .get("x-user-id")
      .and_then(|v| v.to_str().ok())
      .and_then(|s| s.parse::<i64>().ok())
      .ok_or_else(|| {
        EngineError::Unauthenticated("missing or malformed x-user-id header".into())
      })?;
    let username = parts
      .headers
      .get("x-user-name")
      .and_then(|v| v.to_str().ok())
      .map(str::to_string)
      .filter(|s| !s.is_empty())
      .unwrap_or_else(|| format!("user{user_id}"));
    Ok(Identity { user_id, username })
  }
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
  Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(state, identity), fields(user_id = identity.user_id))]
pub async fn http_get_challenge_meta(
  State(state): State<Arc<AppState>>,
  identity: Identity,
  Path(exercise): Path<i64>,
) -> Result<impl IntoResponse, EngineError> {
  let meta = logic::challenge_meta(&state, identity.user_id, &identity.username, exercise).await?;
  info!(target: "challenge", user_id = identity.user_id, exercise, challenge_id = meta.id, "HTTP challenge meta served");
  Ok(Json(meta))
}

#[instrument(level = "info", skip(state, identity), fields(user_id = identity.user_id))]
pub async fn http_get_challenge_page(
  State(state): State<Arc<AppState>>,
  identity: Identity,
  Path((exercise, page)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, EngineError> {
  let out =
    logic::challenge_page(&state, identity.user_id, &identity.username, exercise, page).await?;
  info!(target: "challenge", user_id = identity.user_id, exercise, page, "HTTP dataset page served");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, identity), fields(user_id = identity.user_id))]
pub async fn http_get_public_params(
  State(state): State<Arc<AppState>>,
  identity: Identity,
  Path(exercise): Path<i64>,
) -> Result<impl IntoResponse, EngineError> {
  let params = logic::public_params(&state, identity.user_id, exercise).await?;
  info!(target: "challenge", user_id = identity.user_id, exercise, "HTTP public params served");
  Ok(Json(params))
}

#[instrument(level = "info", skip(state, identity, body), fields(user_id = identity.user_id, exercise = body.exercise_id))]
pub async fn http_post_submit(
  State(state): State<Arc<AppState>>,
  identity: Identity,
  Json(body): Json<SubmitIn>,
) -> Result<impl IntoResponse, EngineError> {
  let out = logic::submit_answer(&state, identity.user_id, &identity.username, &body).await?;
  info!(
    target: "challenge",
    user_id = identity.user_id,
    exercise = body.exercise_id,
    is_correct = out.is_correct,
    "HTTP submission evaluated"
  );
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, identity), fields(user_id = identity.user_id))]
pub async fn http_get_progress(
  State(state): State<Arc<AppState>>,
  identity: Identity,
) -> Result<impl IntoResponse, EngineError> {
  let out = logic::user_progress(&state, identity.user_id).await?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_leaderboard(
  State(state): State<Arc<AppState>>,
  Query(q): Query<LeaderboardQuery>,
) -> Result<impl IntoResponse, EngineError> {
  let rows = logic::global_leaderboard(&state, q.sort_by.as_deref(), q.limit).await?;
  info!(target: "challenge", entries = rows.len(), sort_by = q.sort_by.as_deref().unwrap_or("score"), "HTTP leaderboard served");
  Ok(Json(rows))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_exercise_leaderboard(
  State(state): State<Arc<AppState>>,
  Path(exercise): Path<i64>,
  Query(q): Query<LimitQuery>,
) -> Result<impl IntoResponse, EngineError> {
  let rows = logic::exercise_leaderboard(&state, exercise, q.limit).await?;
  info!(target: "challenge", exercise, entries = rows.len(), "HTTP exercise leaderboard served");
  Ok(Json(rows))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_recent_completions(
  State(state): State<Arc<AppState>>,
  Query(q): Query<LimitQuery>,
) -> Result<impl IntoResponse, EngineError> {
  let rows = logic::recent_completions(&state, q.limit).await?;
  Ok(Json(rows))
}
