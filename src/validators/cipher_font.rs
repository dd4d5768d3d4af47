//! Cipher-font exercise: page text is served through a Caesar-rotated glyph
//! table, and the answer is the digit sum of the decrypted strings. The rows
//! here mirror the fixture strings embedded in the exercise assets.

use serde_json::{json, Value};

use super::{payload_i64, payload_str, sha256_hex, timestamp_in_window, SubmissionCheck, Validator};

pub const TAG: &str = "cipher_font";

const SHIFT: i64 = 13;

const CIPHER_TABLE: [&str; 5] = [
  "a1b2c3d4e5",
  "f6g7h8i9j0",
  "k1l2m3n4o5",
  "p6q7r8s9t0",
  "u1v2w3x4y5",
];

/// Digit sum over the decrypted fixture rows.
pub(crate) fn expected_answer() -> i64 {
  CIPHER_TABLE
    .iter()
    .flat_map(|row| row.chars())
    .filter_map(|c| c.to_digit(10))
    .map(i64::from)
    .sum()
}

pub(crate) fn sign_for(answer: i64, time_spent: i64, timestamp: i64) -> String {
  sha256_hex(&format!("{answer}:{time_spent}:{timestamp}:{SHIFT}:encrypted_font"))
}

pub struct CipherFontValidator;

impl Validator for CipherFontValidator {
  fn public_params(&self, _user_id: i64, exercise_id: i64, now: i64) -> Value {
    json!({
      "version": "3.0.0",
      "exercise_id": exercise_id,
      "timestamp": now,
      "algorithm": "caesar",
      "shift": SHIFT,
      "cipherKey": "ROT13",
      "hint": "decrypt with Caesar shift 13, sum every digit, and sign answer:timeSpent:timestamp:shift",
    })
  }

  fn validate(&self, check: &SubmissionCheck<'_>) -> Result<(), String> {
    let timestamp =
      payload_i64(check.payload, "timestamp").ok_or("payload is missing timestamp")?;
    let sign = payload_str(check.payload, "sign").ok_or("payload is missing sign")?;
    if !timestamp_in_window(timestamp, check.now) {
      return Err("timestamp outside the accepted window".into());
    }
    if sign != sign_for(check.answer, check.time_spent, timestamp) {
      return Err("signature mismatch".into());
    }
    if check.answer != expected_answer() {
      return Err("answer does not match the decrypted digit sum".into());
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn fixture_digit_sum_is_stable() {
    assert_eq!(expected_answer(), 105);
  }

  #[test]
  fn accepts_a_signed_submission() {
    let now = 1_700_000_000;
    let answer = expected_answer();
    let payload = json!({
      "timestamp": now,
      "sign": sign_for(answer, 45, now),
    });
    let check = SubmissionCheck {
      answer,
      time_spent: 45,
      payload: &payload,
      target_value: 0,
      now,
    };
    assert!(CipherFontValidator.validate(&check).is_ok());
  }

  #[test]
  fn rejects_missing_proof_fields() {
    let payload = json!({ "timestamp": 1_700_000_000 });
    let check = SubmissionCheck {
      answer: expected_answer(),
      time_spent: 45,
      payload: &payload,
      target_value: 0,
      now: 1_700_000_000,
    };
    let err = CipherFontValidator.validate(&check).unwrap_err();
    assert!(err.contains("sign"), "unexpected reason: {err}");
  }

  #[test]
  fn rejects_a_replayed_signature() {
    let then = 1_700_000_000;
    let answer = expected_answer();
    let payload = json!({
      "timestamp": then,
      "sign": sign_for(answer, 45, then),
    });
    let check = SubmissionCheck {
      answer,
      time_spent: 45,
      payload: &payload,
      target_value: 0,
      now: then + 20 * 60,
    };
    let err = CipherFontValidator.validate(&check).unwrap_err();
    assert!(err.contains("window"), "unexpected reason: {err}");
  }

  #[test]
  fn rejects_a_wrong_digit_sum() {
    let now = 1_700_000_000;
    let answer = expected_answer() + 7;
    let payload = json!({
      "timestamp": now,
      "sign": sign_for(answer, 45, now),
    });
    let check = SubmissionCheck {
      answer,
      time_spent: 45,
      payload: &payload,
      target_value: 0,
      now,
    };
    let err = CipherFontValidator.validate(&check).unwrap_err();
    assert!(err.contains("digit sum"), "unexpected reason: {err}");
  }
}
