//! In-memory annotation store
//!
//! Holds the editable per-image annotation lists for one folder while a
//! calibration session is active. The durable copy lives in the
//! database; nothing here persists until the session is explicitly
//! saved.
//!
//! Two tolerances are deliberate: seeding is at-most-once per image, so
//! a re-seed can never duplicate or clobber user edits; and edits or
//! deletes against an id that is no longer present are silent no-ops,
//! because a stale UI firing at a deleted region is expected traffic,
//! not a fault.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use super::types::{Annotation, AnnotationSet, AnnotationStats};
use crate::geometry::Rect;
use crate::ocr::OcrRegion;

/// Per-folder annotation state
#[derive(Debug, Default)]
pub struct AnnotationStore {
    sets: HashMap<String, AnnotationSet>,
    /// Images whose list came from a seed or a saved record. A list
    /// that only ever held manual additions is not in here, and is
    /// removed outright once emptied.
    committed: HashSet<String>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from previously saved sets
    pub fn from_sets(sets: Vec<AnnotationSet>) -> Self {
        let committed = sets.iter().map(|s| s.image_name.clone()).collect();
        Self {
            sets: sets
                .into_iter()
                .map(|s| (s.image_name.clone(), s))
                .collect(),
            committed,
        }
    }

    /// Whether an image already has an annotation list (even an empty one)
    pub fn is_seeded(&self, image_name: &str) -> bool {
        self.sets.contains_key(image_name)
    }

    /// Seed an image's list from normalized OCR output.
    ///
    /// At most once per image: when a list already exists this is a
    /// no-op regardless of the input, and returns false.
    pub fn seed(&mut self, image_name: &str, regions: &[OcrRegion]) -> bool {
        if self.sets.contains_key(image_name) {
            return false;
        }

        let set = AnnotationSet {
            image_name: image_name.to_string(),
            text_regions: regions.iter().map(Annotation::from_ocr).collect(),
        };
        self.sets.insert(image_name.to_string(), set);
        self.committed.insert(image_name.to_string());
        true
    }

    /// Append a manual annotation; returns its id
    pub fn add(&mut self, image_name: &str, region: Rect, text: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let annotation = Annotation {
            id: id.clone(),
            text: text.to_string(),
            region,
            is_manual: true,
            confidence: None,
        };

        self.sets
            .entry(image_name.to_string())
            .or_insert_with(|| AnnotationSet::new(image_name))
            .text_regions
            .push(annotation);

        id
    }

    /// Replace the text of an annotation; no-op when the id is gone
    pub fn edit(&mut self, image_name: &str, id: &str, new_text: &str) {
        if let Some(set) = self.sets.get_mut(image_name) {
            if let Some(annotation) = set.text_regions.iter_mut().find(|a| a.id == id) {
                annotation.text = new_text.to_string();
            }
        }
    }

    /// Remove an annotation; no-op when the id is gone
    pub fn delete(&mut self, image_name: &str, id: &str) {
        if let Some(set) = self.sets.get_mut(image_name) {
            set.text_regions.retain(|a| a.id != id);
        }
        self.prune(image_name);
    }

    /// Empty an image's list. A seeded or previously saved list stays
    /// (so the image remains seeded); a list that only ever held manual
    /// additions is removed outright.
    pub fn clear(&mut self, image_name: &str) {
        if let Some(set) = self.sets.get_mut(image_name) {
            set.text_regions.clear();
        }
        self.prune(image_name);
    }

    /// Drop an emptied list that never came from a seed or a saved
    /// record; keeping it would persist a phantom record and block a
    /// future seed
    fn prune(&mut self, image_name: &str) {
        if self.committed.contains(image_name) {
            return;
        }
        if self.sets.get(image_name).is_some_and(|s| s.text_regions.is_empty()) {
            self.sets.remove(image_name);
        }
    }

    /// Current statistics, recomputed from the list on every call
    pub fn stats(&self, image_name: &str) -> AnnotationStats {
        let set = self.sets.get(image_name);
        let regions = set.map(|s| s.text_regions.as_slice()).unwrap_or(&[]);

        AnnotationStats {
            count: regions.len(),
            total_chars: regions.iter().map(|a| a.text.chars().count()).sum(),
        }
    }

    pub fn get(&self, image_name: &str) -> Option<&AnnotationSet> {
        self.sets.get(image_name)
    }

    /// Snapshot of all sets, for persisting. Seeded or previously
    /// saved lists are included even when empty, so a clear-all
    /// outlives the session.
    pub fn snapshot(&self) -> Vec<AnnotationSet> {
        let mut sets: Vec<AnnotationSet> = self.sets.values().cloned().collect();
        sets.sort_by(|a, b| a.image_name.cmp(&b.image_name));
        sets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::normalize_items;
    use serde_json::json;

    fn sample_regions() -> Vec<OcrRegion> {
        normalize_items(&[
            json!({
                "text": "你好",
                "text_region": [[10, 10], [50, 10], [50, 30], [10, 30]],
                "confidence": 0.9
            }),
            json!({
                "text": "world",
                "text_region": [[10, 40], [80, 40], [80, 60], [10, 60]],
                "confidence": 0.8
            }),
        ])
    }

    #[test]
    fn test_seed_converts_regions() {
        let mut store = AnnotationStore::new();
        assert!(store.seed("a.jpg", &sample_regions()));

        let set = store.get("a.jpg").unwrap();
        assert_eq!(set.text_regions.len(), 2);

        let first = &set.text_regions[0];
        assert_eq!(first.text, "你好");
        assert_eq!(first.region, Rect::new(10, 10, 40, 20));
        assert!(!first.is_manual);
        assert_eq!(first.confidence, Some(0.9));
    }

    #[test]
    fn test_seed_is_idempotent() {
        let mut store = AnnotationStore::new();
        store.seed("a.jpg", &sample_regions());
        store.edit("a.jpg", &store.get("a.jpg").unwrap().text_regions[0].id.clone(), "edited");

        // Second seed with different input must not touch the list
        let other = normalize_items(&[json!({ "text": "intruder" })]);
        assert!(!store.seed("a.jpg", &other));

        let set = store.get("a.jpg").unwrap();
        assert_eq!(set.text_regions.len(), 2);
        assert_eq!(set.text_regions[0].text, "edited");
    }

    #[test]
    fn test_cleared_image_stays_seeded() {
        let mut store = AnnotationStore::new();
        store.seed("a.jpg", &sample_regions());
        store.clear("a.jpg");

        assert!(store.is_seeded("a.jpg"));
        assert!(!store.seed("a.jpg", &sample_regions()));
        assert_eq!(store.stats("a.jpg").count, 0);
    }

    #[test]
    fn test_add_is_manual_with_fresh_id() {
        let mut store = AnnotationStore::new();
        store.seed("a.jpg", &sample_regions());

        let id = store.add("a.jpg", Rect::new(5, 5, 20, 10), "note");
        let set = store.get("a.jpg").unwrap();
        let added = set.text_regions.iter().find(|a| a.id == id).unwrap();

        assert!(added.is_manual);
        assert_eq!(added.confidence, None);
        assert_eq!(set.text_regions.len(), 3);
        // Insertion order preserved
        assert_eq!(set.text_regions[2].id, id);
    }

    #[test]
    fn test_edit_and_delete_missing_id_are_noops() {
        let mut store = AnnotationStore::new();
        store.seed("a.jpg", &sample_regions());
        let before = store.get("a.jpg").unwrap().clone();

        store.edit("a.jpg", "no-such-id", "x");
        store.delete("a.jpg", "no-such-id");
        store.edit("other.jpg", "no-such-id", "x");
        store.delete("other.jpg", "no-such-id");

        let after = store.get("a.jpg").unwrap();
        assert_eq!(after.text_regions.len(), before.text_regions.len());
        assert_eq!(after.text_regions[0].text, before.text_regions[0].text);
    }

    #[test]
    fn test_double_delete_tolerated() {
        let mut store = AnnotationStore::new();
        store.seed("a.jpg", &sample_regions());
        let id = store.get("a.jpg").unwrap().text_regions[0].id.clone();

        store.delete("a.jpg", &id);
        store.delete("a.jpg", &id);

        assert_eq!(store.stats("a.jpg").count, 1);
    }

    #[test]
    fn test_stats_track_every_mutation() {
        let mut store = AnnotationStore::new();
        store.seed("a.jpg", &sample_regions());
        // "你好" (2) + "world" (5)
        assert_eq!(store.stats("a.jpg"), AnnotationStats { count: 2, total_chars: 7 });

        let first_id = store.get("a.jpg").unwrap().text_regions[0].id.clone();
        store.edit("a.jpg", &first_id, "你好吗");
        assert_eq!(store.stats("a.jpg"), AnnotationStats { count: 2, total_chars: 8 });

        let id = store.add("a.jpg", Rect::new(0, 0, 10, 10), "ab");
        assert_eq!(store.stats("a.jpg"), AnnotationStats { count: 3, total_chars: 10 });

        store.delete("a.jpg", &id);
        store.delete("a.jpg", &first_id);
        assert_eq!(store.stats("a.jpg"), AnnotationStats { count: 1, total_chars: 5 });
    }

    #[test]
    fn test_stats_for_unknown_image() {
        let store = AnnotationStore::new();
        assert_eq!(store.stats("missing.jpg"), AnnotationStats { count: 0, total_chars: 0 });
    }

    #[test]
    fn test_emptied_manual_only_set_is_dropped() {
        let mut store = AnnotationStore::new();
        let id = store.add("a.jpg", Rect::new(0, 0, 10, 10), "transient");
        store.delete("a.jpg", &id);

        // The list only ever held a manual add; once emptied it must
        // not persist, and the image can still be seeded later
        assert!(store.snapshot().is_empty());
        assert!(!store.is_seeded("a.jpg"));
        assert!(store.seed("a.jpg", &sample_regions()));

        // A seeded list emptied by clear still persists
        store.seed("b.jpg", &sample_regions());
        store.clear("b.jpg");
        let snapshot = store.snapshot();
        assert!(snapshot.iter().any(|s| s.image_name == "b.jpg"));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut store = AnnotationStore::new();
        store.seed("b.jpg", &sample_regions());
        store.add("a.jpg", Rect::new(0, 0, 10, 10), "manual");

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        // Sorted by image name for deterministic persistence
        assert_eq!(snapshot[0].image_name, "a.jpg");

        let restored = AnnotationStore::from_sets(snapshot);
        assert_eq!(restored.stats("b.jpg").count, 2);
        assert!(restored.is_seeded("a.jpg"));
    }
}
