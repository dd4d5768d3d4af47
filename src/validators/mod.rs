//! Pluggable per-exercise answer validation.
//!
//! Exercises with a registered validator replace the baseline sum check with
//! an anti-automation proof: the client fetches public params, performs the
//! exercise-specific work, and submits a payload carrying a timestamp and a
//! signature. The registry is built once at startup from the catalog and is
//! read-only afterwards; validators hold no mutable state and do no I/O.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::domain::Exercise;

pub mod cipher_font;
pub mod dynamic_font;
pub mod paged_token;

/// Accepted timestamp buckets: the current minute and the four before it.
/// This is the 300-second tolerance window checked bucket-wise, so a payload
/// built late in a minute is not penalized for the seconds already elapsed.
pub const WINDOW_MINUTES: i64 = 5;

/// Everything a validator may inspect about one submission.
pub struct SubmissionCheck<'a> {
  pub answer: i64,
  pub time_spent: i64,
  /// Proof parameters sent by the client; `Null` when the field was absent.
  pub payload: &'a Value,
  pub target_value: i64,
  /// Server clock, unix seconds.
  pub now: i64,
}

/// Capability implemented by every exercise validator.
///
/// `validate` never fails the request as a server fault: any problem with the
/// proof, including a missing or malformed payload, comes back as `Err` with
/// the reason shown to the client.
pub trait Validator: Send + Sync {
  /// Non-secret, time-varying parameters handed to the client before solving.
  fn public_params(&self, user_id: i64, exercise_id: i64, now: i64) -> Value;
  fn validate(&self, check: &SubmissionCheck<'_>) -> Result<(), String>;
}

/// Static exercise-id to validator mapping, built once before serving traffic.
pub struct ValidatorRegistry {
  by_exercise: HashMap<i64, Arc<dyn Validator>>,
}

impl ValidatorRegistry {
  pub fn from_catalog(exercises: &[Exercise]) -> Self {
    let mut by_exercise: HashMap<i64, Arc<dyn Validator>> = HashMap::new();
    for ex in exercises {
      let Some(tag) = ex.validator.as_deref() else { continue };
      match validator_for_tag(tag) {
        Some(v) => {
          by_exercise.insert(ex.id, v);
        }
        None => {
          tracing::error!(
            target: "challenge",
            exercise_id = ex.id,
            tag,
            "unknown validator tag; exercise falls back to the baseline check"
          );
        }
      }
    }
    ValidatorRegistry { by_exercise }
  }

  pub fn get(&self, exercise_id: i64) -> Option<&Arc<dyn Validator>> {
    self.by_exercise.get(&exercise_id)
  }

  pub fn len(&self) -> usize {
    self.by_exercise.len()
  }

  pub fn is_empty(&self) -> bool {
    self.by_exercise.is_empty()
  }
}

pub fn validator_for_tag(tag: &str) -> Option<Arc<dyn Validator>> {
  match tag {
    paged_token::TAG => Some(Arc::new(paged_token::PagedTokenValidator)),
    dynamic_font::TAG => Some(Arc::new(dynamic_font::DynamicFontValidator)),
    cipher_font::TAG => Some(Arc::new(cipher_font::CipherFontValidator)),
    _ => None,
  }
}

// -------- Shared helpers for the concrete validators --------

pub(crate) fn sha256_hex(input: &str) -> String {
  let digest = Sha256::digest(input.as_bytes());
  let mut out = String::with_capacity(digest.len() * 2);
  for b in digest {
    let _ = write!(&mut out, "{b:02x}");
  }
  out
}

/// Minute-bucket window check: accepts the current minute and the preceding
/// `WINDOW_MINUTES - 1`; anything older or in a future minute is rejected.
pub(crate) fn timestamp_in_window(submitted: i64, now: i64) -> bool {
  let current = now.div_euclid(60);
  let minute = submitted.div_euclid(60);
  minute <= current && current - minute < WINDOW_MINUTES
}

pub(crate) fn payload_i64(payload: &Value, key: &str) -> Option<i64> {
  payload.get(key).and_then(Value::as_i64)
}

pub(crate) fn payload_str<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
  payload.get(key).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sha256_hex_matches_known_vector() {
    assert_eq!(
      sha256_hex("abc"),
      "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
  }

  #[test]
  fn window_accepts_current_and_four_preceding_minutes() {
    let now = 1_700_000_040; // 40 seconds into some minute
    assert!(timestamp_in_window(now, now));
    assert!(timestamp_in_window(now - 40, now)); // start of the current minute
    assert!(timestamp_in_window(now - 4 * 60, now));
    assert!(!timestamp_in_window(now - 5 * 60, now));
    assert!(!timestamp_in_window(now - 3600, now));
  }

  #[test]
  fn window_rejects_future_minutes() {
    let now = 1_700_000_040;
    assert!(timestamp_in_window(now + 10, now)); // same bucket
    assert!(!timestamp_in_window(now + 60, now));
  }

  #[test]
  fn registry_maps_tags_and_skips_unknown_ones() {
    let exercises = vec![
      Exercise {
        id: 1,
        title: "a".into(),
        difficulty: "beginner".into(),
        points: 10,
        sort_order: 1,
        validator: Some(paged_token::TAG.into()),
      },
      Exercise {
        id: 2,
        title: "b".into(),
        difficulty: "beginner".into(),
        points: 10,
        sort_order: 2,
        validator: Some("no_such_validator".into()),
      },
      Exercise {
        id: 3,
        title: "c".into(),
        difficulty: "beginner".into(),
        points: 10,
        sort_order: 3,
        validator: None,
      },
    ];
    let registry = ValidatorRegistry::from_catalog(&exercises);
    assert_eq!(registry.len(), 1);
    assert!(registry.get(1).is_some());
    assert!(registry.get(2).is_none());
    assert!(registry.get(3).is_none());
  }
}
