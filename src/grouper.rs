//! Remark Grouper (spec.md §4.2).
//!
//! A stable run-length split on a key: equal keys stay in the same group,
//! the boundary falls at the first index where the key changes. Order
//! within each group is preserved. Total and infallible.
//!
//! The original's `_classify_batch_all` is recursive (it slices the
//! remaining list and recurses on the tail). `itertools::Itertools::group_by`
//! is exactly this operation — a lazy run-length split, not a hash-based
//! grouping — so it replaces the recursion without changing the semantics,
//! and gives the teacher's `itertools` dependency (already in Cargo.toml)
//! an actual caller.

use itertools::Itertools;

pub fn group_by_key<T, K, F>(items: Vec<T>, key_fn: F) -> Vec<Vec<T>>
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    items
        .into_iter()
        .group_by(key_fn)
        .into_iter()
        .map(|(_, group)| group.collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_key_change() {
        let items = vec![(0, 'a'), (0, 'b'), (1, 'c'), (1, 'd'), (1, 'e'), (2, 'f')];
        let groups = group_by_key(items, |(k, _)| *k);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0], vec![(0, 'a'), (0, 'b')]);
        assert_eq!(groups[1], vec![(1, 'c'), (1, 'd'), (1, 'e')]);
        assert_eq!(groups[2], vec![(2, 'f')]);
    }

    #[test]
    fn repeated_key_after_gap_forms_new_group() {
        let items = vec![0, 0, 1, 0];
        let groups = group_by_key(items, |k| *k);
        assert_eq!(groups, vec![vec![0, 0], vec![1], vec![0]]);
    }

    #[test]
    fn empty_input_yields_no_groups() {
        let groups = group_by_key(Vec::<u32>::new(), |k| *k);
        assert!(groups.is_empty());
    }
}
