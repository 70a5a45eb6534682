//! Base Filter (spec.md §4.3): per-batch validity rules R1–R8, applied to
//! one extrinsic's remarks at a time.

use std::collections::HashMap;

use crate::error::Result;
use crate::grouper::group_by_key;
use crate::remark::{normalize_tick, Memo, Mode, RawRemark, Remark};
use crate::store::LedgerStore;

/// Process-local cache of `tick -> mode`, populated lazily from the store
/// (Design Notes, spec.md §9: "should be an explicit component... not
/// process-global state"). Seeded with `{"dota": fair}` per spec.md §3.
pub struct TicksModeCache {
    cache: HashMap<String, Mode>,
}

impl TicksModeCache {
    pub fn new() -> Self {
        let mut cache = HashMap::new();
        cache.insert("dota".to_string(), Mode::Fair);
        Self { cache }
    }

    pub fn get(&self, tick: &str) -> Option<Mode> {
        self.cache.get(tick).copied()
    }

    pub fn insert(&mut self, tick: String, mode: Mode) {
        self.cache.insert(tick, mode);
    }
}

impl Default for TicksModeCache {
    fn default() -> Self {
        Self::new()
    }
}

enum BatchOutcome {
    Valid(Vec<Remark>),
    Discarded,
    AbortExtrinsic,
}

/// Apply R1–R8 to one extrinsic's remarks. Returns the surviving valid
/// batches, or an empty vec if R6 discarded the whole extrinsic.
pub fn filter_extrinsic(
    extrinsic: Vec<RawRemark>,
    ticks_mode: &mut TicksModeCache,
    store: &mut dyn LedgerStore,
) -> Result<Vec<Vec<Remark>>> {
    let extrinsic_len = extrinsic.len();
    let batches = group_by_key(extrinsic, |r| r.batchall_index);

    let mut out = Vec::new();
    for batch in batches {
        match process_batch(batch, extrinsic_len, ticks_mode, store)? {
            BatchOutcome::Valid(remarks) => out.push(remarks),
            BatchOutcome::Discarded => {}
            BatchOutcome::AbortExtrinsic => return Ok(Vec::new()),
        }
    }
    Ok(out)
}

fn process_batch(
    batch: Vec<RawRemark>,
    extrinsic_len: usize,
    ticks_mode: &mut TicksModeCache,
    store: &mut dyn LedgerStore,
) -> Result<BatchOutcome> {
    let batch_len = batch.len();
    // R6's second clause inspects a sibling remark's raw `op` tag even when
    // that sibling never gets far enough to be parsed into a `Memo` itself
    // (the original peeks the second remark's untrusted `op` string directly,
    // not a validated struct), so this is captured before the loop below can
    // bail out early on that sibling's own parse failure.
    let second_op: Option<String> = batch
        .get(1)
        .and_then(|r| r.memo.get("op"))
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let mut parsed: Vec<Remark> = Vec::with_capacity(batch_len);

    for (idx, raw) in batch.into_iter().enumerate() {
        let mut memo_json = raw.memo;
        if let Some(serde_json::Value::String(tick)) = memo_json.get("tick").cloned() {
            memo_json["tick"] = serde_json::Value::String(normalize_tick(&tick));
        }

        // R1, R2: unknown op or missing required field.
        let mut memo: Memo = match serde_json::from_value(memo_json) {
            Ok(m) => m,
            Err(e) => {
                log::warn!(
                    "block {} ext {} batch {}: invalid op or malformed memo json, discarding batch: {}",
                    raw.block_num,
                    raw.extrinsic_index,
                    raw.batchall_index,
                    e
                );
                return Ok(BatchOutcome::Discarded);
            }
        };

        // R3: resolve (and cache) the ticker's mode; an undeployed tick kills
        // the batch unless this remark is itself the deploy or a bare memo.
        if let Some(tick) = memo.tick() {
            if ticks_mode.get(tick).is_none() {
                match store.get_deploy_info(tick)? {
                    Some(info) => ticks_mode.insert(tick.to_string(), info.mode),
                    None => {
                        if !matches!(memo, Memo::Deploy { .. } | Memo::Memo { .. }) {
                            log::warn!(
                                "block {} ext {} batch {}: tick {} has not been deployed, discarding batch",
                                raw.block_num,
                                raw.extrinsic_index,
                                raw.batchall_index,
                                tick
                            );
                            return Ok(BatchOutcome::Discarded);
                        }
                    }
                }
            }
        }

        // R6: exclusive ops (deploy, and mint outside owner mode) must stand
        // alone in a <=2-remark extrinsic, paired at most with a trailing
        // memo. Checked as soon as the exclusive remark itself is parsed, so
        // a later sibling's own parse failure can never preempt this abort.
        let is_exclusive = matches!(&memo, Memo::Deploy { .. })
            || matches!(&memo, Memo::Mint { tick, .. } if ticks_mode.get(tick) != Some(Mode::Owner));
        if is_exclusive {
            if extrinsic_len > 2 {
                log::warn!(
                    "block {} ext {}: invalid mint or deploy, abandoning entire extrinsic",
                    raw.block_num,
                    raw.extrinsic_index
                );
                return Ok(BatchOutcome::AbortExtrinsic);
            }
            if batch_len == 2 && second_op.as_deref() != Some("memo") {
                log::warn!(
                    "block {} ext {}: invalid ordinary mint or deploy, abandoning entire extrinsic",
                    raw.block_num,
                    raw.extrinsic_index
                );
                return Ok(BatchOutcome::AbortExtrinsic);
            }
        }

        // R7: placeholder lim for fair-mode mints; the Executor recomputes
        // the real per-remark share once it knows how many mints landed.
        if let Memo::Mint { tick, lim, .. } = &mut memo {
            if ticks_mode.get(tick) == Some(Mode::Fair) {
                *lim = Some(1);
            }
        }
        // R8: default mint recipient to the effective caller.
        if let Memo::Mint { to, .. } = &mut memo {
            if to.is_none() {
                *to = Some(raw.user.clone());
            }
        }

        // R4: a `memo` terminator may appear only as the batch's last remark,
        // and only in a batch of >=2.
        if matches!(memo, Memo::Memo { .. }) {
            if batch_len == 1 {
                log::warn!(
                    "block {} ext {} batch {}: only a memo field, discarding batch",
                    raw.block_num,
                    raw.extrinsic_index,
                    raw.batchall_index
                );
                return Ok(BatchOutcome::Discarded);
            }
            if idx != batch_len - 1 {
                log::warn!(
                    "block {} ext {} batch {}: memo is not in the last position, discarding batch",
                    raw.block_num,
                    raw.extrinsic_index,
                    raw.batchall_index
                );
                return Ok(BatchOutcome::Discarded);
            }
        }

        // R5: a terminating `memo` doesn't become its own remark; its text
        // fans out onto every remark already accepted in this batch.
        if let Memo::Memo { text } = &memo {
            for r in parsed.iter_mut() {
                r.memo_remark = Some(text.clone());
            }
            continue;
        }

        parsed.push(Remark {
            block_num: raw.block_num,
            extrinsic_index: raw.extrinsic_index,
            batchall_index: raw.batchall_index,
            remark_index: raw.remark_index,
            origin: raw.origin,
            user: raw.user,
            memo,
            memo_remark: None,
        });
    }

    Ok(BatchOutcome::Valid(parsed))
}
