//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and clients independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Challenge, PAGE_SIZE, TOTAL_PAGES};
use crate::leaderboard::{CompletionEntry, ExerciseStanding, GlobalStanding};
use crate::store::ProgressSummary;

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

/// Challenge progress for one (user, exercise) pair. Never carries the
/// dataset or the target value; numbers are served one page at a time.
#[derive(Debug, Serialize)]
pub struct ChallengeMetaOut {
    pub id: i64,
    pub exercise_id: i64,
    pub total_pages: usize,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub attempts: i64,
    pub best_time: Option<i64>,
    pub score: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ChallengePageOut {
    pub page: i64,
    pub numbers: Vec<i64>,
    pub start_index: i64,
    pub end_index: i64,
}

#[derive(Debug, Deserialize)]
pub struct SubmitIn {
    pub exercise_id: i64,
    pub answer: i64,
    #[serde(default)]
    pub time_spent: i64,
    /// Validator proof parameters; `Null` when the client sent none.
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct SubmitOut {
    pub accepted: bool,
    pub is_correct: bool,
    pub message: String,
    pub correct_answer: Option<i64>,
    pub score: Option<i64>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ProgressOut {
    pub completed_challenges: Vec<i64>,
    pub total_score: i64,
    pub total_attempts: i64,
    pub average_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub sort_by: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct GlobalStandingOut {
    pub rank: usize,
    pub user_id: i64,
    pub username: String,
    pub total_score: i64,
    pub solved_count: i64,
    pub honor_title: String,
    pub last_submission_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ExerciseStandingOut {
    pub rank: usize,
    pub user_id: i64,
    pub username: String,
    pub score: i64,
    pub best_time: i64,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct RecentCompletionOut {
    pub user_id: i64,
    pub username: String,
    pub exercise_id: i64,
    pub exercise_title: String,
    pub score: i64,
    pub completed_at: DateTime<Utc>,
}

//
// Converters from internal models to the public DTOs.
//

pub fn meta_to_out(c: &Challenge) -> ChallengeMetaOut {
    ChallengeMetaOut {
        id: c.id,
        exercise_id: c.exercise_id,
        total_pages: TOTAL_PAGES,
        completed: c.completed,
        completed_at: c.completed_at,
        attempts: c.attempts,
        best_time: c.best_time,
        score: c.score,
    }
}

pub fn page_to_out(page: i64, numbers: &[i64]) -> ChallengePageOut {
    let page_size = PAGE_SIZE as i64;
    ChallengePageOut {
        page,
        numbers: numbers.to_vec(),
        start_index: (page - 1) * page_size + 1,
        end_index: page * page_size,
    }
}

pub fn progress_to_out(p: &ProgressSummary) -> ProgressOut {
    ProgressOut {
        completed_challenges: p.completed_exercises.clone(),
        total_score: p.total_score,
        total_attempts: p.total_attempts,
        average_time: p.average_time,
    }
}

pub fn global_to_out(row: &GlobalStanding) -> GlobalStandingOut {
    GlobalStandingOut {
        rank: row.rank,
        user_id: row.user_id,
        username: row.username.clone(),
        total_score: row.total_score,
        solved_count: row.solved_count,
        honor_title: row.honor_title.to_string(),
        last_submission_at: row.last_submission_at,
    }
}

pub fn exercise_standing_to_out(row: &ExerciseStanding) -> ExerciseStandingOut {
    ExerciseStandingOut {
        rank: row.rank,
        user_id: row.user_id,
        username: row.username.clone(),
        score: row.score,
        best_time: row.best_time,
        completed_at: row.completed_at,
    }
}

pub fn completion_to_out(row: &CompletionEntry, exercise_title: String) -> RecentCompletionOut {
    RecentCompletionOut {
        user_id: row.user_id,
        username: row.username.clone(),
        exercise_id: row.exercise_id,
        exercise_title,
        score: row.score,
        completed_at: row.completed_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_indices_cover_one_to_one_thousand() {
        let first = page_to_out(1, &[1; PAGE_SIZE]);
        assert_eq!((first.start_index, first.end_index), (1, 10));
        let last = page_to_out(TOTAL_PAGES as i64, &[1; PAGE_SIZE]);
        assert_eq!((last.start_index, last.end_index), (991, 1000));
    }

    #[test]
    fn submit_in_defaults_payload_to_null() {
        let body: SubmitIn =
            serde_json::from_str(r#"{"exercise_id": 1, "answer": 42, "time_spent": 10}"#).unwrap();
        assert!(body.payload.is_null());
        assert_eq!(body.answer, 42);
    }
}
