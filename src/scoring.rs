//! Scoring for completed challenges.

/// Base award for solving an exercise, before the speed bonus.
pub const BASE_SCORE: i64 = 100;
/// Seconds after which the speed bonus drops to zero.
pub const BONUS_WINDOW_SECS: i64 = 300;

/// Score for a completing submission: `BASE_SCORE` plus one bonus point per
/// ten seconds under the bonus window. Slower runs floor at the base score.
pub fn completion_score(time_spent: i64) -> i64 {
  let bonus = (BONUS_WINDOW_SECS - time_spent).max(0) / 10;
  BASE_SCORE + bonus
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn instant_solve_earns_the_full_bonus() {
    assert_eq!(completion_score(0), 130);
  }

  #[test]
  fn bonus_decays_by_tens_of_seconds() {
    assert_eq!(completion_score(10), 129);
    assert_eq!(completion_score(150), 115);
    assert_eq!(completion_score(290), 101);
    assert_eq!(completion_score(295), 100);
  }

  #[test]
  fn slow_solves_floor_at_base_score() {
    assert_eq!(completion_score(300), 100);
    assert_eq!(completion_score(301), 100);
    assert_eq!(completion_score(86_400), 100);
  }
}
