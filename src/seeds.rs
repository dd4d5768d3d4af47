//! Built-in exercise catalog used when no TOML config provides one.

use crate::domain::Exercise;

fn exercise(
  id: i64,
  title: &str,
  difficulty: &str,
  points: i64,
  sort_order: i64,
  validator: Option<&str>,
) -> Exercise {
  Exercise {
    id,
    title: title.into(),
    difficulty: difficulty.into(),
    points,
    sort_order,
    validator: validator.map(Into::into),
  }
}

/// Default training track. The first three exercises carry anti-automation
/// validators; the rest use the baseline dataset-sum check.
pub fn seed_exercises() -> Vec<Exercise> {
  vec![
    exercise(1, "Font Camouflage Basics", "beginner", 10, 1, Some("paged_token")),
    exercise(2, "Shifting Glyph Tables", "beginner", 15, 2, Some("dynamic_font")),
    exercise(3, "Encrypted Font Maze", "intermediate", 25, 3, Some("cipher_font")),
    exercise(4, "Mixed Typeface Tangle", "intermediate", 30, 4, None),
    exercise(5, "Warped Glyph Recognition", "intermediate", 35, 5, None),
    exercise(6, "Cookie Signing Basics", "beginner", 12, 6, None),
    exercise(7, "Timestamped Cookie Gate", "beginner", 15, 7, None),
    exercise(8, "Standard AES Payloads", "beginner", 15, 8, None),
    exercise(9, "RSA Handshake Teardown", "beginner", 18, 9, None),
    exercise(10, "Webpack Bundle Spelunking", "beginner", 15, 10, None),
  ]
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use super::*;

  #[test]
  fn seed_ids_and_sort_orders_are_unique() {
    let exercises = seed_exercises();
    let ids: HashSet<i64> = exercises.iter().map(|e| e.id).collect();
    let orders: HashSet<i64> = exercises.iter().map(|e| e.sort_order).collect();
    assert_eq!(ids.len(), exercises.len());
    assert_eq!(orders.len(), exercises.len());
  }

  #[test]
  fn seed_validator_tags_all_resolve() {
    for ex in seed_exercises() {
      if let Some(tag) = &ex.validator {
        assert!(
          crate::validators::validator_for_tag(tag).is_some(),
          "seed exercise {} names unknown validator {tag}",
          ex.id
        );
      }
    }
  }
}
