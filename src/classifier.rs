//! Classifier (spec.md §4.4): partitions valid batches into per-tick fair/
//! normal mints, deploys, and everything else, enforcing the per-block
//! `(tick, origin)` mint-uniqueness invariant (P4).

use std::collections::{HashMap, HashSet};

use crate::filter::TicksModeCache;
use crate::remark::{Address, Memo, Mode, Remark};

pub struct Classification {
    pub mints_by_tick: HashMap<String, Vec<Remark>>,
    pub deploy_list: Vec<Remark>,
    pub other_batches: Vec<Vec<Remark>>,
}

pub fn classify(batches: Vec<Vec<Remark>>, ticks_mode: &TicksModeCache) -> Classification {
    let mut mints_by_tick: HashMap<String, Vec<Remark>> = HashMap::new();
    let mut deploy_list: Vec<Remark> = Vec::new();
    let mut other_batches: Vec<Vec<Remark>> = Vec::new();
    let mut seen_submitters: HashMap<String, HashSet<Address>> = HashMap::new();

    for mut batch in batches {
        if batch.len() == 1 {
            let remark = batch.pop().expect("len checked above");
            match &remark.memo {
                Memo::Mint { tick, .. } if ticks_mode.get(tick) != Some(Mode::Owner) => {
                    let submitters = seen_submitters.entry(tick.clone()).or_default();
                    if submitters.insert(remark.origin.clone()) {
                        mints_by_tick.entry(tick.clone()).or_default().push(remark);
                    } else {
                        log::warn!(
                            "block {}: {} already submitted a mint for {} in this block, dropping",
                            remark.block_num,
                            remark.origin,
                            tick
                        );
                    }
                }
                Memo::Deploy { .. } => deploy_list.push(remark),
                _ => other_batches.push(vec![remark]),
            }
        } else {
            other_batches.push(batch);
        }
    }

    Classification {
        mints_by_tick,
        deploy_list,
        other_batches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remark::Mode;

    fn mint(tick: &str, origin: &str, block: u64) -> Remark {
        Remark {
            block_num: block,
            extrinsic_index: 0,
            batchall_index: 0,
            remark_index: 0,
            origin: origin.to_string(),
            user: origin.to_string(),
            memo: Memo::Mint {
                tick: tick.to_string(),
                to: Some(origin.to_string()),
                lim: Some(1),
            },
            memo_remark: None,
        }
    }

    #[test]
    fn drops_duplicate_mint_from_same_submitter() {
        let mut ticks_mode = TicksModeCache::new();
        ticks_mode.insert("bar".to_string(), Mode::Fair);
        let batches = vec![
            vec![mint("bar", "alice", 10)],
            vec![mint("bar", "alice", 10)],
            vec![mint("bar", "bob", 10)],
        ];
        let c = classify(batches, &ticks_mode);
        assert_eq!(c.mints_by_tick.get("bar").map(|v| v.len()), Some(2));
    }
}
