//! Paged-token exercise: every page turn is signed with a salted digest of the
//! current timestamp, and the final answer is the dataset sum itself.

use serde_json::{json, Value};

use super::{payload_i64, payload_str, sha256_hex, timestamp_in_window, SubmissionCheck, Validator};

pub const TAG: &str = "paged_token";

const SALT: &str = "spider";

pub struct PagedTokenValidator;

impl Validator for PagedTokenValidator {
  fn public_params(&self, _user_id: i64, exercise_id: i64, now: i64) -> Value {
    json!({
      "version": "1.0.0",
      "exercise_id": exercise_id,
      "timestamp": now,
      "algorithm": "sha256",
      "hint": "carry digest = sha256(timestamp + salt) with every page request and the final submission",
    })
  }

  fn validate(&self, check: &SubmissionCheck<'_>) -> Result<(), String> {
    let timestamp =
      payload_i64(check.payload, "timestamp").ok_or("payload is missing timestamp")?;
    let digest = payload_str(check.payload, "digest").ok_or("payload is missing digest")?;
    if !timestamp_in_window(timestamp, check.now) {
      return Err("timestamp outside the accepted window".into());
    }
    let expected = sha256_hex(&format!("{timestamp}{SALT}"));
    if digest != expected {
      return Err("page token digest mismatch".into());
    }
    if check.answer != check.target_value {
      return Err("answer does not match the expected total".into());
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn valid_payload(now: i64) -> Value {
    json!({
      "timestamp": now,
      "digest": sha256_hex(&format!("{now}{SALT}")),
    })
  }

  #[test]
  fn accepts_a_well_formed_proof() {
    let now = 1_700_000_000;
    let payload = valid_payload(now);
    let check = SubmissionCheck {
      answer: 98_765,
      time_spent: 120,
      payload: &payload,
      target_value: 98_765,
      now,
    };
    assert!(PagedTokenValidator.validate(&check).is_ok());
  }

  #[test]
  fn rejects_a_stale_timestamp() {
    let now = 1_700_000_000;
    let stale = now - 301;
    let payload = valid_payload(stale);
    let check = SubmissionCheck {
      answer: 98_765,
      time_spent: 120,
      payload: &payload,
      target_value: 98_765,
      now: stale + 301,
    };
    let err = PagedTokenValidator.validate(&check).unwrap_err();
    assert!(err.contains("window"), "unexpected reason: {err}");
  }

  #[test]
  fn rejects_a_tampered_digest() {
    let now = 1_700_000_000;
    let payload = json!({ "timestamp": now, "digest": "0000" });
    let check = SubmissionCheck {
      answer: 98_765,
      time_spent: 120,
      payload: &payload,
      target_value: 98_765,
      now,
    };
    assert!(PagedTokenValidator.validate(&check).is_err());
  }

  #[test]
  fn rejects_a_wrong_answer_even_with_a_valid_proof() {
    let now = 1_700_000_000;
    let payload = valid_payload(now);
    let check = SubmissionCheck {
      answer: 1,
      time_spent: 120,
      payload: &payload,
      target_value: 98_765,
      now,
    };
    let err = PagedTokenValidator.validate(&check).unwrap_err();
    assert!(err.contains("answer"), "unexpected reason: {err}");
  }

  #[test]
  fn rejects_an_absent_payload() {
    let payload = Value::Null;
    let check = SubmissionCheck {
      answer: 1,
      time_spent: 0,
      payload: &payload,
      target_value: 1,
      now: 1_700_000_000,
    };
    assert!(PagedTokenValidator.validate(&check).is_err());
  }
}
