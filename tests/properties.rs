//! Property tests (spec.md §8) against the grouper and tick normalization,
//! using `quickcheck` per the teacher's dev-dependency set.

use dot20_indexer::grouper::group_by_key;
use dot20_indexer::remark::normalize_tick;
use quickcheck_macros::quickcheck;

/// P6: normalization is idempotent.
#[quickcheck]
fn tick_normalization_is_idempotent(tick: String) -> bool {
    let once = normalize_tick(&tick);
    let twice = normalize_tick(&once);
    once == twice
}

/// Grouping never drops or reorders elements: flattening the groups back
/// out reproduces the input exactly. This is the totality half of the
/// Grouper's contract (spec.md §4.2) that P5 (determinism) depends on.
#[quickcheck]
fn grouping_preserves_order_and_elements(keys: Vec<u8>) -> bool {
    let input = keys.clone();
    let groups = group_by_key(input, |k| *k);
    let flattened: Vec<u8> = groups.into_iter().flatten().collect();
    flattened == keys
}

/// Every group returned by the grouper is non-empty and shares one key.
#[quickcheck]
fn groups_are_key_uniform_and_nonempty(keys: Vec<u8>) -> bool {
    let groups = group_by_key(keys, |k| *k);
    groups
        .iter()
        .all(|g| !g.is_empty() && g.iter().all(|k| k == &g[0]))
}

/// P7: fair-mode credit math. floor(total/n) per mint, remainder burned.
#[quickcheck]
fn fair_share_math(total_amt: u32, mint_count: u8) -> bool {
    let mint_count = (mint_count as u64 % 20) + 1; // keep n in [1, 20]
    let total_amt = total_amt as u64;
    let av_amt = total_amt / mint_count;
    let distributed = av_amt * mint_count;
    distributed <= total_amt && total_amt - distributed < mint_count
}
