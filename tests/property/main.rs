// tests/property/main.rs

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use proptest::prelude::*;
use testwatch::engine::dedup_targets;
use testwatch::types::{ChangeKind, FileChangeEvent};
use testwatch::watch::PendingEvents;

fn kind_strategy() -> impl Strategy<Value = ChangeKind> {
    prop_oneof![
        Just(ChangeKind::Created),
        Just(ChangeKind::Modified),
        Just(ChangeKind::Deleted),
        Just(ChangeKind::Renamed),
    ]
}

proptest! {
    #[test]
    fn pending_table_keeps_last_event_per_path(
        events in proptest::collection::vec((0..6usize, kind_strategy()), 0..40)
    ) {
        let mut pending = PendingEvents::new();
        let mut expected: HashMap<PathBuf, ChangeKind> = HashMap::new();

        for (idx, kind) in &events {
            let path = PathBuf::from(format!("pkg/f{idx}.go"));
            pending.upsert(FileChangeEvent::new(path.clone(), *kind).unwrap());
            expected.insert(path, *kind);
        }

        prop_assert_eq!(pending.len(), expected.len());
        let batch = pending.drain();
        prop_assert!(pending.is_empty());
        prop_assert_eq!(batch.len(), expected.len());
        for ev in &batch {
            prop_assert_eq!(Some(&ev.kind()), expected.get(ev.path()));
        }
    }

    #[test]
    fn dedup_keeps_first_occurrence_order(
        picks in proptest::collection::vec(0..8usize, 0..30)
    ) {
        let input: Vec<PathBuf> = picks.iter().map(|i| PathBuf::from(format!("pkg{i}"))).collect();
        let out = dedup_targets(input.clone());

        let unique: HashSet<_> = out.iter().collect();
        prop_assert_eq!(unique.len(), out.len());

        let mut first_seen = Vec::new();
        for p in &input {
            if !first_seen.contains(p) {
                first_seen.push(p.clone());
            }
        }
        prop_assert_eq!(out, first_seen);
    }
}
