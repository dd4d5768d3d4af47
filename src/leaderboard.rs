//! Read-only ranking views over completed challenges.
//!
//! These queries never take the write path; they tolerate reading a snapshot
//! that is a few submissions behind concurrent completions.

use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::domain;
use crate::error::EngineError;
use crate::store::{from_ts, ChallengeStore};

/// Sort order for the global leaderboard. Unknown query values fall back to
/// score ordering, matching the lenient client contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeaderboardSort {
  Score,
  Solved,
}

impl LeaderboardSort {
  pub fn parse(s: &str) -> Self {
    match s {
      "solved" => LeaderboardSort::Solved,
      _ => LeaderboardSort::Score,
    }
  }
}

#[derive(Clone, Debug)]
pub struct GlobalStanding {
  pub rank: usize,
  pub user_id: i64,
  pub username: String,
  pub total_score: i64,
  pub solved_count: i64,
  pub honor_title: &'static str,
  pub last_submission_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug)]
pub struct ExerciseStanding {
  pub rank: usize,
  pub user_id: i64,
  pub username: String,
  pub score: i64,
  pub best_time: i64,
  pub completed_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct CompletionEntry {
  pub user_id: i64,
  pub username: String,
  pub exercise_id: i64,
  pub score: i64,
  pub completed_at: DateTime<Utc>,
}

impl ChallengeStore {
  /// Per-user aggregation across all completed challenges. Users whose
  /// aggregate sits at or below the noise threshold for the chosen sort are
  /// left out of the board entirely.
  pub fn global_standings(
    &self,
    sort: LeaderboardSort,
    limit: usize,
  ) -> Result<Vec<GlobalStanding>, EngineError> {
    let sql = match sort {
      LeaderboardSort::Score => {
        "SELECT c.user_id, u.username, SUM(c.score) AS total_score, COUNT(*) AS solved, \
         MAX(c.completed_at) AS last_at \
         FROM challenges c JOIN users u ON u.id = c.user_id \
         WHERE c.completed = 1 \
         GROUP BY c.user_id, u.username \
         HAVING SUM(c.score) > 1 \
         ORDER BY total_score DESC, solved DESC, last_at ASC \
         LIMIT ?1"
      }
      LeaderboardSort::Solved => {
        "SELECT c.user_id, u.username, SUM(c.score) AS total_score, COUNT(*) AS solved, \
         MAX(c.completed_at) AS last_at \
         FROM challenges c JOIN users u ON u.id = c.user_id \
         WHERE c.completed = 1 \
         GROUP BY c.user_id, u.username \
         HAVING COUNT(*) > 1 \
         ORDER BY solved DESC, total_score DESC, last_at ASC \
         LIMIT ?1"
      }
    };
    let mut stmt = self.conn.prepare(sql)?;
    let rows = stmt.query_map(params![limit as i64], |r| {
      Ok((
        r.get::<_, i64>(0)?,
        r.get::<_, String>(1)?,
        r.get::<_, i64>(2)?,
        r.get::<_, i64>(3)?,
        r.get::<_, Option<i64>>(4)?,
      ))
    })?;
    let mut out = Vec::new();
    for (idx, row) in rows.enumerate() {
      let (user_id, username, total_score, solved_count, last_at) = row?;
      out.push(GlobalStanding {
        rank: idx + 1,
        user_id,
        username,
        total_score,
        solved_count,
        honor_title: domain::honor_title(solved_count),
        last_submission_at: last_at.map(from_ts),
      });
    }
    Ok(out)
  }

  /// Completions for one exercise, best score first, faster time breaking ties.
  pub fn exercise_standings(
    &self,
    exercise_id: i64,
    limit: usize,
  ) -> Result<Vec<ExerciseStanding>, EngineError> {
    let mut stmt = self.conn.prepare(
      "SELECT c.user_id, u.username, c.score, c.best_time, c.completed_at \
       FROM challenges c JOIN users u ON u.id = c.user_id \
       WHERE c.exercise_id = ?1 AND c.completed = 1 \
       ORDER BY c.score DESC, c.best_time ASC, c.completed_at ASC \
       LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![exercise_id, limit as i64], |r| {
      Ok((
        r.get::<_, i64>(0)?,
        r.get::<_, String>(1)?,
        r.get::<_, i64>(2)?,
        r.get::<_, i64>(3)?,
        r.get::<_, i64>(4)?,
      ))
    })?;
    let mut out = Vec::new();
    for (idx, row) in rows.enumerate() {
      let (user_id, username, score, best_time, completed_at) = row?;
      out.push(ExerciseStanding {
        rank: idx + 1,
        user_id,
        username,
        score,
        best_time,
        completed_at: from_ts(completed_at),
      });
    }
    Ok(out)
  }

  /// Most recent completions across all exercises, newest first.
  pub fn recent_completions(&self, limit: usize) -> Result<Vec<CompletionEntry>, EngineError> {
    let mut stmt = self.conn.prepare(
      "SELECT c.user_id, u.username, c.exercise_id, c.score, c.completed_at \
       FROM challenges c JOIN users u ON u.id = c.user_id \
       WHERE c.completed = 1 \
       ORDER BY c.completed_at DESC, c.id DESC \
       LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit as i64], |r| {
      Ok(CompletionEntry {
        user_id: r.get(0)?,
        username: r.get(1)?,
        exercise_id: r.get(2)?,
        score: r.get(3)?,
        completed_at: from_ts(r.get(4)?),
      })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sort_parse_is_lenient() {
    assert_eq!(LeaderboardSort::parse("solved"), LeaderboardSort::Solved);
    assert_eq!(LeaderboardSort::parse("score"), LeaderboardSort::Score);
    assert_eq!(LeaderboardSort::parse("anything"), LeaderboardSort::Score);
  }
}
