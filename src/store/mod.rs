//! Ledger Store interface (spec.md §6): transactional sessions with
//! savepoints, ticker metadata, per-ticker balances and approvals.
//!
//! The store session / savepoint pattern maps onto scoped transactional
//! handles with guaranteed rollback on drop (Design Notes, spec.md §9):
//! `LedgerTx::commit` is the only way out of a scope that doesn't roll
//! back, and a handle can't outlive the scope it was opened in because
//! `begin`/`savepoint` tie their return value's lifetime to `&mut self`.

pub mod mem;
pub mod pg;

use crate::error::StoreResult;
use crate::remark::{Address, Mode};

/// Persisted ticker metadata (spec.md §3's Ticker Registry).
///
/// `lim` is the deploy-time per-mint amount (spec.md §3's `deploy { ...,
/// lim? }`): for normal mode it's the fixed credit a mint receives when its
/// own remark doesn't specify one; for owner mode it's an advisory hint only
/// (spec.md §9). Fair mode ignores it — the Executor computes the real
/// per-remark share from `total_supply` and the accepted mint count.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployInfo {
    pub tick: String,
    pub mode: Mode,
    pub total_supply: u64,
    pub remaining: u64,
    pub deployer: Address,
    pub lim: Option<u64>,
}

/// Persisted indexer progress row (spec.md §3, §6).
#[derive(Debug, Clone, PartialEq)]
pub struct IndexerStatus {
    pub protocol: String,
    pub indexer_height: u64,
    pub crawler_height: u64,
}

/// Top-level store handle: read-only lookups plus the entry point into a
/// transactional scope.
pub trait LedgerStore {
    fn get_deploy_info(&mut self, tick: &str) -> StoreResult<Option<DeployInfo>>;
    fn get_indexer_status(&mut self, protocol: &str) -> StoreResult<Option<IndexerStatus>>;
    fn begin(&mut self) -> StoreResult<Box<dyn LedgerTx + '_>>;
}

/// A transactional scope: either an outer transaction (from `LedgerStore::begin`)
/// or a nested savepoint (from `LedgerTx::savepoint`). Mutations are visible
/// to the scope they were made in and to any savepoint opened from it;
/// dropping a scope without calling `commit` rolls it back.
pub trait LedgerTx {
    fn savepoint(&mut self) -> StoreResult<Box<dyn LedgerTx + '_>>;
    fn commit(self: Box<Self>) -> StoreResult<()>;

    fn create_tables_for_new_tick(&mut self, tick: &str) -> StoreResult<()>;
    fn insert_ticker(&mut self, info: &DeployInfo) -> StoreResult<()>;
    fn get_deploy_info(&mut self, tick: &str) -> StoreResult<Option<DeployInfo>>;
    fn set_remaining(&mut self, tick: &str, remaining: u64) -> StoreResult<()>;

    fn get_balance(&mut self, tick: &str, user: &str) -> StoreResult<u64>;
    fn set_balance(&mut self, tick: &str, user: &str, amount: u64) -> StoreResult<()>;

    fn get_approval(&mut self, tick: &str, owner: &str, spender: &str) -> StoreResult<u64>;
    fn set_approval(
        &mut self,
        tick: &str,
        owner: &str,
        spender: &str,
        amount: u64,
    ) -> StoreResult<()>;

    fn upsert_indexer_status(&mut self, status: &IndexerStatus) -> StoreResult<()>;
}
