//! Property tests for identifiers, ordering and id allocation.

use std::collections::HashSet;

use bindery::extract::sort_by_display_seq;
use bindery::model::Ident;
use bindery::single::{IdRegistry, generated_id, local_id};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_ident_hash_round_trips(
        id in "[a-z0-9-]{1,36}",
        version in proptest::option::of("[0-9]{1,3}(\\.[0-9]{1,3})?"),
    ) {
        let value = match &version {
            Some(v) => format!("{id}@{v}"),
            None => id.clone(),
        };
        let ident = Ident::parse(&value).unwrap();
        prop_assert_eq!(ident.id(), id);
        prop_assert_eq!(ident.version(), version.as_deref());
        prop_assert_eq!(ident.ident_hash(), value);
    }

    #[test]
    fn prop_display_seq_sorts_refined_first_and_is_stable(
        seqs in prop::collection::vec(proptest::option::of(0i64..5), 0..20),
    ) {
        let mut entries: Vec<(Option<i64>, usize)> =
            seqs.iter().copied().enumerate().map(|(i, s)| (s, i)).collect();
        sort_by_display_seq(&mut entries);

        let first_none = entries.iter().position(|(s, _)| s.is_none()).unwrap_or(entries.len());
        prop_assert!(entries[first_none..].iter().all(|(s, _)| s.is_none()));
        for pair in entries.windows(2) {
            let ((a, i), (b, j)) = (pair[0], pair[1]);
            match (a, b) {
                (Some(a), Some(b)) => prop_assert!(a < b || (a == b && i < j)),
                (None, None) => prop_assert!(i < j),
                _ => {}
            }
        }
    }

    #[test]
    fn prop_reserved_ids_are_unique(
        candidates in prop::collection::vec("[ab](_[12])?", 1..40),
    ) {
        let mut registry = IdRegistry::new();
        let mut seen = HashSet::new();
        for candidate in &candidates {
            let id = registry.reserve(candidate);
            prop_assert!(id.starts_with(candidate.as_str()));
            prop_assert!(seen.insert(id));
        }
        prop_assert_eq!(registry.len(), candidates.len());
    }

    #[test]
    fn prop_local_part_recovered(
        page in "[a-f0-9_]{1,12}",
        local in "[A-Za-z][A-Za-z0-9_-]{0,12}",
    ) {
        let generated = generated_id(&page, &local);
        prop_assert_eq!(local_id(&generated), Some(local.as_str()));
    }
}

#[test]
fn test_display_seq_example() {
    let mut entries = vec![(Some(3), 0), (None, 1), (Some(1), 2)];
    sort_by_display_seq(&mut entries);
    let seqs: Vec<Option<i64>> = entries.iter().map(|(s, _)| *s).collect();
    let indices: Vec<usize> = entries.iter().map(|(_, i)| *i).collect();
    assert_eq!(seqs, vec![Some(1), Some(3), None]);
    assert_eq!(indices, vec![2, 0, 1]);
}
