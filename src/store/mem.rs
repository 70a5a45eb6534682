//! In-memory `LedgerStore`, used by tests and the in-process engine
//! benchmarks. Mirrors the shape of the teacher's `db/mem.rs`: a small
//! struct holding the whole ledger in a couple of maps, no I/O.

use std::collections::HashMap;

use super::{DeployInfo, IndexerStatus, LedgerStore, LedgerTx};
use crate::error::StoreResult;
use crate::remark::{Address, Mode};

#[derive(Clone)]
struct TickState {
    mode: Mode,
    total_supply: u64,
    remaining: u64,
    deployer: Address,
    lim: Option<u64>,
    balances: HashMap<Address, u64>,
    approvals: HashMap<(Address, Address), u64>,
}

#[derive(Clone, Default)]
struct Ledger {
    tickers: HashMap<String, TickState>,
    indexer_status: HashMap<String, IndexerStatus>,
}

#[derive(Default)]
pub struct MemStore {
    ledger: Ledger,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: current balance for `(tick, user)`, 0 if either is absent.
    pub fn balance_of(&self, tick: &str, user: &str) -> u64 {
        self.ledger
            .tickers
            .get(tick)
            .and_then(|t| t.balances.get(user))
            .copied()
            .unwrap_or(0)
    }

    /// Test helper: remaining supply for a deployed tick.
    pub fn remaining(&self, tick: &str) -> Option<u64> {
        self.ledger.tickers.get(tick).map(|t| t.remaining)
    }

    /// Test helper: total supply for a deployed tick.
    pub fn total_supply(&self, tick: &str) -> Option<u64> {
        self.ledger.tickers.get(tick).map(|t| t.total_supply)
    }

    /// Test helper: approval amount for `(tick, owner, spender)`.
    pub fn approval_of(&self, tick: &str, owner: &str, spender: &str) -> u64 {
        self.ledger
            .tickers
            .get(tick)
            .and_then(|t| t.approvals.get(&(owner.to_string(), spender.to_string())))
            .copied()
            .unwrap_or(0)
    }
}

impl LedgerStore for MemStore {
    fn get_deploy_info(&mut self, tick: &str) -> StoreResult<Option<DeployInfo>> {
        Ok(self.ledger.tickers.get(tick).map(|t| DeployInfo {
            tick: tick.to_string(),
            mode: t.mode,
            total_supply: t.total_supply,
            remaining: t.remaining,
            deployer: t.deployer.clone(),
            lim: t.lim,
        }))
    }

    fn get_indexer_status(&mut self, protocol: &str) -> StoreResult<Option<IndexerStatus>> {
        Ok(self.ledger.indexer_status.get(protocol).cloned())
    }

    fn begin(&mut self) -> StoreResult<Box<dyn LedgerTx + '_>> {
        Ok(Box::new(MemTx::new(&mut self.ledger)))
    }
}

/// A transactional scope over the in-memory ledger. Takes a clone of the
/// ledger as a backup when opened; on drop without `commit`, the backup is
/// restored. Nested savepoints reborrow the same underlying `Ledger`, so
/// writes in an inner scope are immediately visible to the outer one, and
/// rolling back the inner scope only restores to the inner backup.
struct MemTx<'a> {
    ledger: &'a mut Ledger,
    backup: Ledger,
    committed: bool,
}

impl<'a> MemTx<'a> {
    fn new(ledger: &'a mut Ledger) -> Self {
        let backup = ledger.clone();
        Self {
            ledger,
            backup,
            committed: false,
        }
    }

    fn tick_mut(&mut self, tick: &str) -> StoreResult<&mut TickState> {
        self.ledger
            .tickers
            .get_mut(tick)
            .ok_or_else(|| crate::error::StorageError::Other(format!("no such tick {}", tick)))
    }
}

impl<'a> Drop for MemTx<'a> {
    fn drop(&mut self) {
        if !self.committed {
            *self.ledger = self.backup.clone();
        }
    }
}

impl<'a> LedgerTx for MemTx<'a> {
    fn savepoint(&mut self) -> StoreResult<Box<dyn LedgerTx + '_>> {
        Ok(Box::new(MemTx::new(&mut *self.ledger)))
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut this = *self;
        this.committed = true;
        Ok(())
    }

    fn create_tables_for_new_tick(&mut self, _tick: &str) -> StoreResult<()> {
        // In-memory store has no schema to create; the tick's `TickState`
        // entry itself plays that role, created by `insert_ticker`.
        Ok(())
    }

    fn insert_ticker(&mut self, info: &DeployInfo) -> StoreResult<()> {
        self.ledger.tickers.insert(
            info.tick.clone(),
            TickState {
                mode: info.mode,
                total_supply: info.total_supply,
                remaining: info.remaining,
                deployer: info.deployer.clone(),
                lim: info.lim,
                balances: HashMap::new(),
                approvals: HashMap::new(),
            },
        );
        Ok(())
    }

    fn get_deploy_info(&mut self, tick: &str) -> StoreResult<Option<DeployInfo>> {
        Ok(self.ledger.tickers.get(tick).map(|t| DeployInfo {
            tick: tick.to_string(),
            mode: t.mode,
            total_supply: t.total_supply,
            remaining: t.remaining,
            deployer: t.deployer.clone(),
            lim: t.lim,
        }))
    }

    fn set_remaining(&mut self, tick: &str, remaining: u64) -> StoreResult<()> {
        self.tick_mut(tick)?.remaining = remaining;
        Ok(())
    }

    fn get_balance(&mut self, tick: &str, user: &str) -> StoreResult<u64> {
        Ok(self
            .ledger
            .tickers
            .get(tick)
            .and_then(|t| t.balances.get(user))
            .copied()
            .unwrap_or(0))
    }

    fn set_balance(&mut self, tick: &str, user: &str, amount: u64) -> StoreResult<()> {
        self.tick_mut(tick)?
            .balances
            .insert(user.to_string(), amount);
        Ok(())
    }

    fn get_approval(&mut self, tick: &str, owner: &str, spender: &str) -> StoreResult<u64> {
        Ok(self
            .ledger
            .tickers
            .get(tick)
            .and_then(|t| t.approvals.get(&(owner.to_string(), spender.to_string())))
            .copied()
            .unwrap_or(0))
    }

    fn set_approval(
        &mut self,
        tick: &str,
        owner: &str,
        spender: &str,
        amount: u64,
    ) -> StoreResult<()> {
        self.tick_mut(tick)?
            .approvals
            .insert((owner.to_string(), spender.to_string()), amount);
        Ok(())
    }

    fn upsert_indexer_status(&mut self, status: &IndexerStatus) -> StoreResult<()> {
        self.ledger
            .indexer_status
            .insert(status.protocol.clone(), status.clone());
        Ok(())
    }
}
