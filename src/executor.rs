//! Executor (spec.md §4.5): the transactional discipline that turns a
//! classification into committed (or rolled back) store mutations.
//!
//! Deploys run first, each in its own outer transaction (DDL can't share a
//! transaction with row mutations). Then one outer transaction holds the
//! mint phase and the other-ops phase, each per-group wrapped in a
//! savepoint, followed by the indexer-progress upsert and commit.

use std::collections::HashMap;

use crate::classifier::Classification;
use crate::error::{IndexerError, OpError, Result};
use crate::ops;
use crate::remark::{Memo, Mode, Remark};
use crate::store::{IndexerStatus, LedgerStore, LedgerTx};

pub fn execute_block(
    store: &mut dyn LedgerStore,
    classification: Classification,
    block_num: u64,
) -> Result<()> {
    run_deploy_phase(store, classification.deploy_list)?;
    run_mint_and_other_phase(
        store,
        classification.mints_by_tick,
        classification.other_batches,
        block_num,
    )
}

fn run_deploy_phase(store: &mut dyn LedgerStore, deploys: Vec<Remark>) -> Result<()> {
    for remark in deploys {
        let tx = store.begin()?;
        match run_scoped(tx, |tx| ops::deploy(tx, &remark)) {
            Ok(()) => log::debug!("deploy {:?} committed", remark.memo),
            Err(OpError::Protocol(e)) => log::warn!("deploy {:?} failed: {}", remark.memo, e),
            Err(OpError::Storage(e)) => return Err(IndexerError::Storage(e)),
        }
    }
    Ok(())
}

fn run_mint_and_other_phase(
    store: &mut dyn LedgerStore,
    mints_by_tick: HashMap<String, Vec<Remark>>,
    other_batches: Vec<Vec<Remark>>,
    block_num: u64,
) -> Result<()> {
    let mut outer = store.begin()?;

    for (tick, remarks) in mints_by_tick {
        let deploy_info = match outer.get_deploy_info(&tick)? {
            Some(info) => info,
            None => {
                log::warn!("{} not deployed yet, dropping {} mint(s)", tick, remarks.len());
                continue;
            }
        };

        // Fair mode: the Executor computes the actual per-remark share,
        // floor(total_amt / accepted_mint_count), remainder burned for the
        // block (spec.md §4.5, P7). The filter's `lim = 1` was only a
        // hand-off placeholder.
        let av_amt = if deploy_info.mode == Mode::Fair {
            deploy_info.total_supply / remarks.len() as u64
        } else {
            0
        };

        for mut remark in remarks {
            if deploy_info.mode == Mode::Fair {
                if let Memo::Mint { lim, .. } = &mut remark.memo {
                    *lim = Some(av_amt);
                }
            }
            let sp = outer.savepoint()?;
            match run_scoped(sp, |tx| ops::mint(tx, &remark)) {
                Ok(()) => log::debug!("mint {:?} committed", remark.memo),
                Err(OpError::Protocol(e)) => log::warn!("mint {:?} failed: {}", remark.memo, e),
                Err(OpError::Storage(e)) => return Err(IndexerError::Storage(e)),
            }
        }
    }

    for batch in other_batches {
        let sp = outer.savepoint()?;
        match run_scoped(sp, |tx| {
            for remark in &batch {
                ops::apply_other(tx, remark)?;
            }
            Ok(())
        }) {
            Ok(()) => log::debug!("batch of {} op(s) committed", batch.len()),
            Err(OpError::Protocol(e)) => log::warn!("batch failed: {}", e),
            Err(OpError::Storage(e)) => return Err(IndexerError::Storage(e)),
        }
    }

    outer.upsert_indexer_status(&IndexerStatus {
        protocol: "dot-20".to_string(),
        indexer_height: block_num,
        crawler_height: block_num,
    })?;
    outer.commit()?;
    Ok(())
}

/// Run `f` against a transactional scope, committing on success and letting
/// the scope's `Drop` roll it back on any error (protocol or storage).
fn run_scoped<F>(mut tx: Box<dyn LedgerTx + '_>, f: F) -> Result<(), OpError>
where
    F: FnOnce(&mut dyn LedgerTx) -> Result<(), OpError>,
{
    f(tx.as_mut())?;
    tx.commit()?;
    Ok(())
}
