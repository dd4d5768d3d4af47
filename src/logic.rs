//! Core challenge operations shared by the HTTP handlers.
//!
//! This includes:
//!   - Challenge meta and page reads (lazy creation + freshness check)
//!   - Public validator params
//!   - Answer submission (validator pipeline, scoring, completion)
//!   - Progress and leaderboard reads

use tracing::{info, instrument};

use crate::error::EngineError;
use crate::leaderboard::LeaderboardSort;
use crate::protocol::{
  completion_to_out, exercise_standing_to_out, global_to_out, meta_to_out, page_to_out,
  progress_to_out, ChallengeMetaOut, ChallengePageOut, ExerciseStandingOut, GlobalStandingOut,
  ProgressOut, RecentCompletionOut, SubmitIn, SubmitOut,
};
use crate::state::AppState;
use crate::store::now_ts;
use crate::validators::SubmissionCheck;

const DEFAULT_BOARD_LIMIT: usize = 50;
const DEFAULT_RECENT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 500;

fn clamp_limit(requested: Option<usize>, default: usize) -> usize {
  requested.unwrap_or(default).clamp(1, MAX_LIMIT)
}

/// Challenge progress for the pair, creating the challenge on first read.
#[instrument(level = "info", skip(state, username))]
pub async fn challenge_meta(
  state: &AppState,
  user_id: i64,
  username: &str,
  exercise_ref: i64,
) -> Result<ChallengeMetaOut, EngineError> {
  let exercise = state.catalog.resolve(exercise_ref)?;
  let mut store = state.store.lock().await;
  let challenge = store.get_or_create(user_id, username, exercise.id)?;
  Ok(meta_to_out(&challenge))
}

/// One page of the generated dataset, 1-based.
#[instrument(level = "info", skip(state, username))]
pub async fn challenge_page(
  state: &AppState,
  user_id: i64,
  username: &str,
  exercise_ref: i64,
  page: i64,
) -> Result<ChallengePageOut, EngineError> {
  let exercise = state.catalog.resolve(exercise_ref)?;
  let mut store = state.store.lock().await;
  let challenge = store.get_or_create(user_id, username, exercise.id)?;
  let numbers = challenge.page(page)?;
  Ok(page_to_out(page, numbers))
}

/// Validator public params for the exercise; `{}` when none is registered.
#[instrument(level = "info", skip(state))]
pub async fn public_params(
  state: &AppState,
  user_id: i64,
  exercise_ref: i64,
) -> Result<serde_json::Value, EngineError> {
  let exercise = state.catalog.resolve(exercise_ref)?;
  match state.validators.get(exercise.id) {
    Some(validator) => Ok(validator.public_params(user_id, exercise.id, now_ts())),
    None => Ok(serde_json::json!({})),
  }
}

/// Evaluate a submission and record the attempt.
///
/// Exercises with a registered validator let the validator decide correctness;
/// any failed check rejects the submission after the attempt is logged. Plain
/// exercises compare the answer against the dataset sum and report a wrong
/// answer in-band, echoing the expected total.
#[instrument(level = "info", skip(state, username, req), fields(exercise_ref = req.exercise_id))]
pub async fn submit_answer(
  state: &AppState,
  user_id: i64,
  username: &str,
  req: &SubmitIn,
) -> Result<SubmitOut, EngineError> {
  let exercise = state.catalog.resolve(req.exercise_id)?;
  if req.time_spent < 0 {
    return Err(EngineError::InvalidRange(format!(
      "time_spent must be non-negative, got {}",
      req.time_spent
    )));
  }

  let mut store = state.store.lock().await;
  let challenge = store.get_or_create(user_id, username, exercise.id)?;
  let verdict = state.validators.get(exercise.id).map(|validator| {
    let check = SubmissionCheck {
      answer: req.answer,
      time_spent: req.time_spent,
      payload: &req.payload,
      target_value: challenge.target_value,
      now: now_ts(),
    };
    validator.validate(&check)
  });
  let (correct, rejection) = match verdict {
    Some(Ok(())) => (true, None),
    Some(Err(reason)) => (false, Some(reason)),
    None => (req.answer == challenge.target_value, None),
  };
  let outcome = store.record_attempt(challenge.id, req.answer, req.time_spent, correct)?;
  drop(store);

  if let Some(reason) = rejection {
    info!(
      target: "challenge",
      user_id,
      exercise_id = exercise.id,
      attempts = outcome.attempts,
      %reason,
      "submission rejected by validator"
    );
    return Err(EngineError::ValidationRejected(reason));
  }

  let message = if !correct {
    "Wrong answer. Keep exploring the dataset.".to_string()
  } else if let Some(awarded) = outcome.awarded {
    format!("Correct! You earned {awarded} points.")
  } else {
    "Correct. This challenge was already completed; score unchanged.".to_string()
  };
  info!(
    target: "challenge",
    user_id,
    exercise_id = exercise.id,
    correct,
    attempts = outcome.attempts,
    awarded = ?outcome.awarded,
    "submission recorded"
  );
  Ok(SubmitOut {
    accepted: true,
    is_correct: correct,
    message,
    correct_answer: (!correct).then_some(challenge.target_value),
    score: if correct { outcome.score } else { None },
    completed_at: outcome.completed_at,
  })
}

#[instrument(level = "info", skip(state))]
pub async fn user_progress(state: &AppState, user_id: i64) -> Result<ProgressOut, EngineError> {
  let store = state.store.lock().await;
  let summary = store.progress(user_id)?;
  Ok(progress_to_out(&summary))
}

#[instrument(level = "info", skip(state))]
pub async fn global_leaderboard(
  state: &AppState,
  sort_by: Option<&str>,
  limit: Option<usize>,
) -> Result<Vec<GlobalStandingOut>, EngineError> {
  let sort = LeaderboardSort::parse(sort_by.unwrap_or("score"));
  let limit = clamp_limit(limit, DEFAULT_BOARD_LIMIT);
  let store = state.store.lock().await;
  let rows = store.global_standings(sort, limit)?;
  Ok(rows.iter().map(global_to_out).collect())
}

#[instrument(level = "info", skip(state))]
pub async fn exercise_leaderboard(
  state: &AppState,
  exercise_ref: i64,
  limit: Option<usize>,
) -> Result<Vec<ExerciseStandingOut>, EngineError> {
  let exercise = state.catalog.resolve(exercise_ref)?;
  let limit = clamp_limit(limit, DEFAULT_BOARD_LIMIT);
  let store = state.store.lock().await;
  let rows = store.exercise_standings(exercise.id, limit)?;
  Ok(rows.iter().map(exercise_standing_to_out).collect())
}

#[instrument(level = "info", skip(state))]
pub async fn recent_completions(
  state: &AppState,
  limit: Option<usize>,
) -> Result<Vec<RecentCompletionOut>, EngineError> {
  let limit = clamp_limit(limit, DEFAULT_RECENT_LIMIT);
  let store = state.store.lock().await;
  let rows = store.recent_completions(limit)?;
  Ok(
    rows
      .iter()
      .map(|row| {
        let title = state
          .catalog
          .by_id(row.exercise_id)
          .map(|e| e.title.clone())
          .unwrap_or_else(|| format!("exercise {}", row.exercise_id));
        completion_to_out(row, title)
      })
      .collect(),
  )
}
