//! SQLite-backed persistence for challenges and submissions.
//!
//! One connection per store; the app state serializes access behind a lock.
//! Every mutating operation runs in a single transaction, and first access to
//! a (user, exercise) pair relies on the UNIQUE constraint plus insert-or-fetch
//! so concurrent requests can never produce two rows or two divergent datasets.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::domain::{Challenge, PAGE_SIZE, TOTAL_PAGES};
use crate::error::EngineError;
use crate::generator;
use crate::scoring;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
  id INTEGER PRIMARY KEY,
  username TEXT NOT NULL,
  updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS challenges (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  user_id INTEGER NOT NULL,
  exercise_id INTEGER NOT NULL,
  dataset TEXT NOT NULL,
  target_value INTEGER NOT NULL,
  completed INTEGER NOT NULL DEFAULT 0,
  completed_at INTEGER,
  attempts INTEGER NOT NULL DEFAULT 0,
  best_time INTEGER,
  score INTEGER,
  created_at INTEGER NOT NULL,
  updated_at INTEGER NOT NULL,
  UNIQUE(user_id, exercise_id)
);
CREATE INDEX IF NOT EXISTS idx_challenges_user ON challenges(user_id);
CREATE INDEX IF NOT EXISTS idx_challenges_exercise ON challenges(exercise_id, completed);
CREATE INDEX IF NOT EXISTS idx_challenges_completed_at ON challenges(completed_at);

CREATE TABLE IF NOT EXISTS submissions (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  challenge_id INTEGER NOT NULL REFERENCES challenges(id),
  user_id INTEGER NOT NULL,
  exercise_id INTEGER NOT NULL,
  answer INTEGER NOT NULL,
  time_spent INTEGER NOT NULL,
  is_correct INTEGER NOT NULL,
  score INTEGER,
  submitted_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_submissions_user ON submissions(user_id);
CREATE INDEX IF NOT EXISTS idx_submissions_challenge ON submissions(challenge_id);
"#;

pub struct ChallengeStore {
  pub(crate) conn: Connection,
}

/// Result of recording one attempt. `awarded` is set only on the submission
/// that transitions the challenge to completed.
#[derive(Clone, Debug)]
pub struct AttemptOutcome {
  pub attempts: i64,
  pub completed: bool,
  pub completed_at: Option<DateTime<Utc>>,
  pub best_time: Option<i64>,
  pub score: Option<i64>,
  pub awarded: Option<i64>,
}

/// Per-user aggregate over their challenges.
#[derive(Clone, Debug)]
pub struct ProgressSummary {
  pub completed_exercises: Vec<i64>,
  pub total_score: i64,
  pub total_attempts: i64,
  pub average_time: Option<i64>,
}

impl ChallengeStore {
  pub fn open(path: &Path) -> Result<Self, EngineError> {
    if let Some(dir) = path.parent() {
      if !dir.as_os_str().is_empty() {
        std::fs::create_dir_all(dir)?;
      }
    }
    let conn = Connection::open(path)?;
    conn.execute_batch(
      "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
    )?;
    let store = ChallengeStore { conn };
    store.migrate()?;
    Ok(store)
  }

  fn migrate(&self) -> Result<(), EngineError> {
    self.conn.execute_batch(SCHEMA)?;
    Ok(())
  }

  /// Existing challenge for the pair, freshness-checked, or a newly generated
  /// one. The user row is upserted on the way so rankings can show a name.
  pub fn get_or_create(
    &mut self,
    user_id: i64,
    username: &str,
    exercise_id: i64,
  ) -> Result<Challenge, EngineError> {
    let tx = self.conn.transaction()?;
    upsert_user_tx(&tx, user_id, username)?;
    let raw = match select_pair_tx(&tx, user_id, exercise_id)? {
      Some(raw) => raw,
      None => {
        insert_challenge_tx(&tx, user_id, exercise_id)?;
        select_pair_tx(&tx, user_id, exercise_id)?
          .ok_or_else(|| EngineError::Internal("challenge row missing after insert".into()))?
      }
    };
    let challenge = ensure_fresh_tx(&tx, raw)?;
    tx.commit()?;
    Ok(challenge)
  }

  /// Logs the submission and applies the completion transition at most once.
  pub fn record_attempt(
    &mut self,
    challenge_id: i64,
    answer: i64,
    time_spent: i64,
    correct: bool,
  ) -> Result<AttemptOutcome, EngineError> {
    let tx = self.conn.transaction()?;
    let raw = select_by_id_tx(&tx, challenge_id)?
      .ok_or_else(|| EngineError::NotFound(format!("challenge {challenge_id}")))?;
    let now = now_ts();
    let attempts = raw.attempts + 1;
    let completing = correct && !raw.completed;
    let awarded = completing.then(|| scoring::completion_score(time_spent));
    if let Some(score) = awarded {
      tx.execute(
        "UPDATE challenges SET attempts = ?1, completed = 1, completed_at = ?2, \
         best_time = ?3, score = ?4, updated_at = ?2 WHERE id = ?5",
        params![attempts, now, time_spent, score, challenge_id],
      )?;
    } else {
      tx.execute(
        "UPDATE challenges SET attempts = ?1, updated_at = ?2 WHERE id = ?3",
        params![attempts, now, challenge_id],
      )?;
    }
    tx.execute(
      "INSERT INTO submissions (challenge_id, user_id, exercise_id, answer, time_spent, \
       is_correct, score, submitted_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
      params![
        challenge_id,
        raw.user_id,
        raw.exercise_id,
        answer,
        time_spent,
        correct as i64,
        awarded,
        now
      ],
    )?;
    tx.commit()?;
    Ok(AttemptOutcome {
      attempts,
      completed: raw.completed || completing,
      completed_at: if completing { Some(from_ts(now)) } else { raw.completed_at.map(from_ts) },
      best_time: if completing { Some(time_spent) } else { raw.best_time },
      score: awarded.or(raw.score),
      awarded,
    })
  }

  pub fn progress(&self, user_id: i64) -> Result<ProgressSummary, EngineError> {
    let mut stmt = self.conn.prepare(
      "SELECT exercise_id FROM challenges WHERE user_id = ?1 AND completed = 1 ORDER BY exercise_id",
    )?;
    let completed_exercises = stmt
      .query_map(params![user_id], |r| r.get(0))?
      .collect::<Result<Vec<i64>, _>>()?;
    let (total_score, average_time): (i64, Option<f64>) = self.conn.query_row(
      "SELECT COALESCE(SUM(score), 0), AVG(best_time) FROM challenges \
       WHERE user_id = ?1 AND completed = 1",
      params![user_id],
      |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    let total_attempts: i64 = self.conn.query_row(
      "SELECT COALESCE(SUM(attempts), 0) FROM challenges WHERE user_id = ?1",
      params![user_id],
      |r| r.get(0),
    )?;
    Ok(ProgressSummary {
      completed_exercises,
      total_score,
      total_attempts,
      average_time: average_time.map(|t| t.round() as i64),
    })
  }
}

struct RawChallenge {
  id: i64,
  user_id: i64,
  exercise_id: i64,
  dataset_json: String,
  target_value: i64,
  completed: bool,
  completed_at: Option<i64>,
  attempts: i64,
  best_time: Option<i64>,
  score: Option<i64>,
}

fn map_raw(r: &rusqlite::Row<'_>) -> rusqlite::Result<RawChallenge> {
  Ok(RawChallenge {
    id: r.get(0)?,
    user_id: r.get(1)?,
    exercise_id: r.get(2)?,
    dataset_json: r.get(3)?,
    target_value: r.get(4)?,
    completed: r.get::<_, i64>(5)? != 0,
    completed_at: r.get(6)?,
    attempts: r.get(7)?,
    best_time: r.get(8)?,
    score: r.get(9)?,
  })
}

fn select_pair_tx(
  tx: &Transaction<'_>,
  user_id: i64,
  exercise_id: i64,
) -> Result<Option<RawChallenge>, EngineError> {
  tx.query_row(
    "SELECT id, user_id, exercise_id, dataset, target_value, completed, completed_at, \
     attempts, best_time, score FROM challenges WHERE user_id = ?1 AND exercise_id = ?2",
    params![user_id, exercise_id],
    map_raw,
  )
  .optional()
  .map_err(Into::into)
}

fn select_by_id_tx(tx: &Transaction<'_>, id: i64) -> Result<Option<RawChallenge>, EngineError> {
  tx.query_row(
    "SELECT id, user_id, exercise_id, dataset, target_value, completed, completed_at, \
     attempts, best_time, score FROM challenges WHERE id = ?1",
    params![id],
    map_raw,
  )
  .optional()
  .map_err(Into::into)
}

fn upsert_user_tx(tx: &Transaction<'_>, user_id: i64, username: &str) -> Result<(), EngineError> {
  tx.execute(
    "INSERT INTO users (id, username, updated_at) VALUES (?1, ?2, ?3) \
     ON CONFLICT(id) DO UPDATE SET username = excluded.username, updated_at = excluded.updated_at",
    params![user_id, username, now_ts()],
  )?;
  Ok(())
}

fn insert_challenge_tx(
  tx: &Transaction<'_>,
  user_id: i64,
  exercise_id: i64,
) -> Result<(), EngineError> {
  let (dataset, target_value) = generator::generate(user_id, exercise_id);
  let dataset_json = serde_json::to_string(&dataset)?;
  let now = now_ts();
  // OR IGNORE: another connection may have won the insert; the caller re-reads.
  tx.execute(
    "INSERT OR IGNORE INTO challenges (user_id, exercise_id, dataset, target_value, \
     created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
    params![user_id, exercise_id, dataset_json, target_value, now],
  )?;
  tracing::info!(target: "challenge", user_id, exercise_id, "created challenge dataset");
  Ok(())
}

/// Page-0 canary: a stored dataset produced by the current generation rule
/// reproduces exactly. Malformed or stale data is regenerated in full, keeping
/// attempts/completion/score untouched.
fn ensure_fresh_tx(tx: &Transaction<'_>, raw: RawChallenge) -> Result<Challenge, EngineError> {
  let parsed: Option<Vec<Vec<i64>>> = serde_json::from_str(&raw.dataset_json).ok();
  if let Some(dataset) = parsed.filter(|d| dataset_is_current(&raw, d)) {
    let target_value = raw.target_value;
    return Ok(challenge_from(raw, dataset, target_value));
  }
  let (dataset, target_value) = generator::generate(raw.user_id, raw.exercise_id);
  tx.execute(
    "UPDATE challenges SET dataset = ?1, target_value = ?2, updated_at = ?3 WHERE id = ?4",
    params![serde_json::to_string(&dataset)?, target_value, now_ts(), raw.id],
  )?;
  tracing::info!(
    target: "challenge",
    user_id = raw.user_id,
    exercise_id = raw.exercise_id,
    "stored dataset failed the canary check; regenerated"
  );
  Ok(challenge_from(raw, dataset, target_value))
}

fn dataset_is_current(raw: &RawChallenge, dataset: &[Vec<i64>]) -> bool {
  dataset.len() == TOTAL_PAGES
    && dataset.iter().all(|p| p.len() == PAGE_SIZE)
    && dataset[0] == generator::generate_page(raw.user_id, raw.exercise_id, 0)
}

fn challenge_from(raw: RawChallenge, dataset: Vec<Vec<i64>>, target_value: i64) -> Challenge {
  Challenge {
    id: raw.id,
    user_id: raw.user_id,
    exercise_id: raw.exercise_id,
    dataset,
    target_value,
    completed: raw.completed,
    completed_at: raw.completed_at.map(from_ts),
    attempts: raw.attempts,
    best_time: raw.best_time,
    score: raw.score,
  }
}

pub(crate) fn now_ts() -> i64 {
  Utc::now().timestamp()
}

pub(crate) fn from_ts(secs: i64) -> DateTime<Utc> {
  DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
