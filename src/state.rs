//! Application state: the exercise catalog, the validator registry, and the
//! SQLite store.
//!
//! The catalog and registry are built once at startup and never mutated; the
//! store sits behind an async lock because its connection is used from every
//! request handler.

use std::collections::HashMap;
use std::path::Path;

use tokio::sync::Mutex;
use tracing::{error, info, instrument};

use crate::config::load_engine_config_from_env;
use crate::domain::Exercise;
use crate::error::EngineError;
use crate::seeds::seed_exercises;
use crate::store::ChallengeStore;
use crate::validators::ValidatorRegistry;

const DB_FILE: &str = "crawlgym.db";

/// Immutable exercise catalog with id and display-order lookup.
pub struct ExerciseCatalog {
    items: Vec<Exercise>,
    by_id: HashMap<i64, usize>,
    by_sort: HashMap<i64, usize>,
}

impl ExerciseCatalog {
    pub fn new(items: Vec<Exercise>) -> Self {
        let mut kept: Vec<Exercise> = Vec::with_capacity(items.len());
        let mut by_id = HashMap::new();
        let mut by_sort = HashMap::new();
        for ex in items {
            if by_id.contains_key(&ex.id) {
                error!(target: "challenge", exercise_id = ex.id, title = %ex.title, "Skipping catalog entry: duplicate id");
                continue;
            }
            let idx = kept.len();
            by_id.insert(ex.id, idx);
            if let Some(prev) = by_sort.insert(ex.sort_order, idx) {
                by_sort.insert(ex.sort_order, prev);
                error!(target: "challenge", exercise_id = ex.id, sort_order = ex.sort_order, "Duplicate sort_order; keeping the earlier entry for lookup");
            }
            kept.push(ex);
        }
        Self { items: kept, by_id, by_sort }
    }

    /// Resolve a client-supplied exercise reference: primary id first, then
    /// display-order number. Unresolvable references are an explicit NotFound,
    /// never passed through to downstream lookups.
    pub fn resolve(&self, reference: i64) -> Result<&Exercise, EngineError> {
        if let Some(&idx) = self.by_id.get(&reference) {
            return Ok(&self.items[idx]);
        }
        if let Some(&idx) = self.by_sort.get(&reference) {
            return Ok(&self.items[idx]);
        }
        Err(EngineError::NotFound(format!("exercise {reference}")))
    }

    pub fn by_id(&self, id: i64) -> Option<&Exercise> {
        self.by_id.get(&id).map(|&idx| &self.items[idx])
    }

    pub fn items(&self) -> &[Exercise] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub struct AppState {
    pub store: Mutex<ChallengeStore>,
    pub catalog: ExerciseCatalog,
    pub validators: ValidatorRegistry,
}

impl AppState {
    /// Build state from env: load config, assemble the catalog, build the
    /// validator registry, open the store.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Result<Self, EngineError> {
        let cfg = load_engine_config_from_env();

        let exercises: Vec<Exercise> = match &cfg {
            Some(c) if !c.exercises.is_empty() => c
                .exercises
                .iter()
                .enumerate()
                .map(|(idx, e)| Exercise {
                    id: e.id,
                    title: e.title.clone(),
                    difficulty: e.difficulty.clone(),
                    points: e.points.unwrap_or(10),
                    sort_order: e.sort_order.unwrap_or(idx as i64 + 1),
                    validator: e.validator.clone(),
                })
                .collect(),
            _ => seed_exercises(),
        };

        let data_dir = cfg
            .as_ref()
            .and_then(|c| c.data_dir.clone())
            .unwrap_or_else(|| "./data".to_string());
        let db_path = Path::new(&data_dir).join(DB_FILE);
        let store = ChallengeStore::open(&db_path)?;
        info!(target: "crawlgym_backend", path = %db_path.display(), "SQLite store ready");

        Ok(Self::with_catalog(store, exercises))
    }

    /// Assemble state around an already-open store; keeps the registry and the
    /// catalog built from the same exercise list.
    pub fn with_catalog(store: ChallengeStore, exercises: Vec<Exercise>) -> Self {
        let catalog = ExerciseCatalog::new(exercises);
        let validators = ValidatorRegistry::from_catalog(catalog.items());

        // Inventory summary by difficulty.
        let mut by_diff: HashMap<String, (usize, i64)> = HashMap::new();
        for ex in catalog.items() {
            let entry = by_diff.entry(ex.difficulty.clone()).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += ex.points;
        }
        for (diff, (count, points)) in by_diff {
            info!(target: "challenge", %diff, count, points, "Startup exercise inventory");
        }
        info!(target: "challenge", exercises = catalog.len(), validators = validators.len(), "Validator registry ready");

        Self { store: Mutex::new(store), catalog, validators }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ex(id: i64, sort_order: i64) -> Exercise {
        Exercise {
            id,
            title: format!("exercise {id}"),
            difficulty: "beginner".into(),
            points: 10,
            sort_order,
            validator: None,
        }
    }

    #[test]
    fn resolve_prefers_primary_id_over_display_order() {
        // id 5 and sort_order 5 belong to different entries; id wins.
        let catalog = ExerciseCatalog::new(vec![ex(5, 1), ex(20, 5)]);
        assert_eq!(catalog.resolve(5).unwrap().id, 5);
        assert_eq!(catalog.resolve(1).unwrap().id, 5);
        assert_eq!(catalog.resolve(20).unwrap().id, 20);
        assert!(catalog.resolve(99).is_err());
    }

    #[test]
    fn duplicate_ids_are_skipped() {
        let catalog = ExerciseCatalog::new(vec![ex(1, 1), ex(1, 2), ex(2, 3)]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.resolve(1).unwrap().sort_order, 1);
    }

    #[test]
    fn duplicate_sort_orders_keep_the_earlier_entry() {
        let catalog = ExerciseCatalog::new(vec![ex(1, 7), ex(2, 7)]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.resolve(7).unwrap().id, 1);
    }
}
