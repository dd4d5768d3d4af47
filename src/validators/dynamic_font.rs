//! Dynamic-font exercise: glyph tables re-encode on every fetch, so the client
//! must sign its submission with the served encoding key and derive the answer
//! from the submitted timestamp rather than from the stored dataset.

use serde_json::{json, Value};

use super::{payload_i64, payload_str, sha256_hex, timestamp_in_window, SubmissionCheck, Validator};

pub const TAG: &str = "dynamic_font";

pub struct DynamicFontValidator;

/// Timestamp-seeded digit sum over a 10x10 grid of `(timestamp + offset) % 100`.
pub(crate) fn expected_answer(timestamp: i64) -> i64 {
  let mut total = 0i64;
  for page in 0..10i64 {
    for pos in 0..10i64 {
      total += (timestamp + page * 10 + pos).rem_euclid(100);
    }
  }
  total
}

pub(crate) fn sign_for(answer: i64, time_spent: i64, timestamp: i64, encoding_key: &str) -> String {
  sha256_hex(&format!("{answer}:{time_spent}:{timestamp}:{encoding_key}:{TAG}"))
}

impl Validator for DynamicFontValidator {
  fn public_params(&self, _user_id: i64, exercise_id: i64, now: i64) -> Value {
    json!({
      "version": "2.1.3",
      "exercise_id": exercise_id,
      "timestamp": now,
      "encodingKey": format!("dynamic_{now}"),
      "algorithm": "dynamic_font_encoding",
      "hint": "the font re-encodes continuously; sign answer:timeSpent:timestamp:encodingKey with the served key",
    })
  }

  fn validate(&self, check: &SubmissionCheck<'_>) -> Result<(), String> {
    let timestamp =
      payload_i64(check.payload, "timestamp").ok_or("payload is missing timestamp")?;
    let sign = payload_str(check.payload, "sign").ok_or("payload is missing sign")?;
    let encoding_key = payload_str(check.payload, "encodingKey").unwrap_or("");
    if !timestamp_in_window(timestamp, check.now) {
      return Err("timestamp outside the accepted window".into());
    }
    if sign != sign_for(check.answer, check.time_spent, timestamp, encoding_key) {
      return Err("signature mismatch".into());
    }
    if check.answer != expected_answer(timestamp) {
      return Err("answer does not match the dynamic encoding".into());
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn valid_check(now: i64) -> (Value, i64) {
    let answer = expected_answer(now);
    let payload = json!({
      "timestamp": now,
      "encodingKey": format!("dynamic_{now}"),
      "sign": sign_for(answer, 90, now, &format!("dynamic_{now}")),
    });
    (payload, answer)
  }

  #[test]
  fn the_offset_grid_covers_every_residue_once() {
    // (timestamp + k) % 100 for k in 0..100 walks all residues, so the sum is
    // constant; the proof binds the timestamp, not the value.
    assert_eq!(expected_answer(1_700_000_000), 4950);
    assert_eq!(expected_answer(1_700_000_037), 4950);
  }

  #[test]
  fn accepts_a_signed_submission() {
    let now = 1_700_000_000;
    let (payload, answer) = valid_check(now);
    let check = SubmissionCheck {
      answer,
      time_spent: 90,
      payload: &payload,
      target_value: 0,
      now,
    };
    assert!(DynamicFontValidator.validate(&check).is_ok());
  }

  #[test]
  fn rejects_when_the_sign_does_not_cover_the_submitted_answer() {
    let now = 1_700_000_000;
    let (payload, answer) = valid_check(now);
    let check = SubmissionCheck {
      answer: answer + 1,
      time_spent: 90,
      payload: &payload,
      target_value: 0,
      now,
    };
    let err = DynamicFontValidator.validate(&check).unwrap_err();
    assert!(err.contains("signature"), "unexpected reason: {err}");
  }

  #[test]
  fn rejects_a_stale_timestamp() {
    let stale = 1_700_000_000;
    let (payload, answer) = valid_check(stale);
    let check = SubmissionCheck {
      answer,
      time_spent: 90,
      payload: &payload,
      target_value: 0,
      now: stale + 301,
    };
    let err = DynamicFontValidator.validate(&check).unwrap_err();
    assert!(err.contains("window"), "unexpected reason: {err}");
  }

  #[test]
  fn rejects_a_foreign_encoding_key() {
    let now = 1_700_000_000;
    let answer = expected_answer(now);
    let payload = json!({
      "timestamp": now,
      "encodingKey": "dynamic_borrowed",
      "sign": sign_for(answer, 90, now, &format!("dynamic_{now}")),
    });
    let check = SubmissionCheck {
      answer,
      time_spent: 90,
      payload: &payload,
      target_value: 0,
      now,
    };
    assert!(DynamicFontValidator.validate(&check).is_err());
  }
}
