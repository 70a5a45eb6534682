//! Block Driver (spec.md §4.1): the only component with suspension points.
//! Drives the engine one block at a time, advancing `start_block` only on
//! success, reconnecting on transport failure without advancing.

use std::time::Duration;

use crate::chain::ChainClient;
use crate::classifier;
use crate::error::{IndexerError, Result};
use crate::executor;
use crate::filter::{self, TicksModeCache};
use crate::grouper::group_by_key;
use crate::remark::RawRemark;
use crate::store::LedgerStore;

pub struct BlockDriver {
    pub start_block: u64,
    pub delay: u64,
    pub poll_interval: Duration,
}

impl BlockDriver {
    pub fn new(start_block: u64, delay: u64) -> Self {
        Self {
            start_block,
            delay,
            poll_interval: Duration::from_secs(3),
        }
    }

    /// Runs forever. Returns only on a fatal (non-transport) error.
    pub fn run(
        &mut self,
        chain: &mut dyn ChainClient,
        store: &mut dyn LedgerStore,
        ticks_mode: &mut TicksModeCache,
    ) -> Result<()> {
        loop {
            match self.step(chain, store, ticks_mode) {
                Ok(true) => {}
                Ok(false) => std::thread::sleep(self.poll_interval),
                Err(IndexerError::Transport(e)) => {
                    log::warn!("disconnected, reconnecting: {}", e);
                    if let Err(e) = chain.reconnect() {
                        log::warn!("reconnect failed: {}", e);
                    }
                    std::thread::sleep(self.poll_interval);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Runs one iteration. `Ok(true)` means a block was processed and
    /// `start_block` advanced; `Ok(false)` means we're not yet past the
    /// finality delay.
    fn step(
        &mut self,
        chain: &mut dyn ChainClient,
        store: &mut dyn LedgerStore,
        ticks_mode: &mut TicksModeCache,
    ) -> Result<bool> {
        let head_hash = chain.finalized_head()?;
        let head_height = chain.block_number(&head_hash)?;
        if head_height < self.start_block + self.delay {
            return Ok(false);
        }

        let remarks = chain.fetch_remarks(self.start_block)?;
        process_block(store, ticks_mode, remarks, self.start_block)?;
        self.start_block += 1;
        Ok(true)
    }
}

/// Runs the full pipeline (Grouper → Base Filter → Classifier → Executor)
/// for one block's remarks. Exposed standalone so tests can drive it
/// without a `ChainClient`.
pub fn process_block(
    store: &mut dyn LedgerStore,
    ticks_mode: &mut TicksModeCache,
    remarks: Vec<RawRemark>,
    block_num: u64,
) -> Result<()> {
    let extrinsics = group_by_key(remarks, |r| r.extrinsic_index);

    let mut valid_batches = Vec::new();
    for extrinsic in extrinsics {
        let batches = filter::filter_extrinsic(extrinsic, ticks_mode, store)?;
        valid_batches.extend(batches);
    }

    let classification = classifier::classify(valid_batches, ticks_mode);
    executor::execute_block(store, classification, block_num)
}
