//! Domain models used by the backend: exercises, challenges, submissions, and honor tiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Pages in every generated dataset.
pub const TOTAL_PAGES: usize = 100;
/// Numbers on each page, all distinct within the page.
pub const PAGE_SIZE: usize = 10;
/// Inclusive value range for generated numbers.
pub const VALUE_MIN: i64 = 1;
pub const VALUE_MAX: i64 = 200;

/// One entry of the exercise catalog (static configuration, not persisted).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Exercise {
  pub id: i64,
  pub title: String,
  pub difficulty: String,   // free-form (e.g., "beginner", "intermediate")
  pub points: i64,
  pub sort_order: i64,      // position in the training track, also accepted as a lookup key
  /// Tag of the registered validator, if this exercise uses one instead of
  /// the baseline sum check.
  #[serde(default)] pub validator: Option<String>,
}

/// Per-(user, exercise) challenge state persisted in SQLite.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Challenge {
  pub id: i64,
  pub user_id: i64,
  pub exercise_id: i64,
  pub dataset: Vec<Vec<i64>>,
  pub target_value: i64,
  pub completed: bool,
  pub completed_at: Option<DateTime<Utc>>,
  pub attempts: i64,
  pub best_time: Option<i64>,   // seconds, first correct submission only
  pub score: Option<i64>,
}

impl Challenge {
  /// One page of the dataset, 1-based. `page` outside 1..=TOTAL_PAGES is a
  /// client error, never a panic.
  pub fn page(&self, page: i64) -> Result<&[i64], EngineError> {
    if page < 1 || page > TOTAL_PAGES as i64 {
      return Err(EngineError::InvalidRange(format!(
        "page must be between 1 and {TOTAL_PAGES}, got {page}"
      )));
    }
    let idx = (page - 1) as usize;
    self
      .dataset
      .get(idx)
      .map(|p| p.as_slice())
      .ok_or_else(|| EngineError::Internal(format!("dataset has no page {page}")))
  }
}

/// Honor titles by tier; tier = solved_count / 3, capped at the last entry.
const HONOR_TITLES: [&str; 7] = [
  "novice",
  "apprentice",
  "journeyman",
  "adept",
  "expert",
  "grandmaster",
  "legendary master",
];

pub fn honor_title(solved_count: i64) -> &'static str {
  let tier = (solved_count.max(0) / 3).min(HONOR_TITLES.len() as i64 - 1);
  HONOR_TITLES[tier as usize]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn honor_titles_step_every_three_solved() {
    assert_eq!(honor_title(0), "novice");
    assert_eq!(honor_title(2), "novice");
    assert_eq!(honor_title(3), "apprentice");
    assert_eq!(honor_title(8), "journeyman");
    assert_eq!(honor_title(17), "grandmaster");
    assert_eq!(honor_title(18), "legendary master");
    assert_eq!(honor_title(90), "legendary master");
  }

  #[test]
  fn page_lookup_is_one_based_and_bounded() {
    let ch = Challenge {
      id: 1,
      user_id: 7,
      exercise_id: 1,
      dataset: vec![vec![1, 2, 3]; TOTAL_PAGES],
      target_value: 0,
      completed: false,
      completed_at: None,
      attempts: 0,
      best_time: None,
      score: None,
    };
    assert_eq!(ch.page(1).unwrap(), &[1, 2, 3]);
    assert_eq!(ch.page(TOTAL_PAGES as i64).unwrap(), &[1, 2, 3]);
    assert!(ch.page(0).is_err());
    assert!(ch.page(TOTAL_PAGES as i64 + 1).is_err());
    assert!(ch.page(-4).is_err());
  }
}
