//! Operation Semantics (spec.md §4.6): the per-op mutations against the
//! Ledger Store. Each op reads and writes through the active transactional
//! handle; none of them open or commit a transaction of their own.

use crate::error::{OpError, ProtocolError};
use crate::remark::{Memo, Mode, Remark};
use crate::store::{DeployInfo, LedgerTx};

pub fn deploy(tx: &mut dyn LedgerTx, remark: &Remark) -> Result<(), OpError> {
    let (tick, mode, amt, lim) = match &remark.memo {
        Memo::Deploy { tick, mode, amt, lim } => (tick, *mode, *amt, *lim),
        _ => return Err(ProtocolError::UnexpectedOp("deploy").into()),
    };

    if tx.get_deploy_info(tick)?.is_some() {
        return Err(ProtocolError::TickAlreadyDeployed(tick.clone()).into());
    }

    let info = DeployInfo {
        tick: tick.clone(),
        mode,
        total_supply: amt,
        remaining: amt,
        deployer: remark.user.clone(),
        lim,
    };
    tx.insert_ticker(&info)?;
    tx.create_tables_for_new_tick(tick)?;
    Ok(())
}

/// `mint(tick, to, lim)` (spec.md §4.6). `lim` must already be resolved by
/// the time this runs for fair mode: the filter sets a `1` placeholder and
/// the Executor overwrites it with the real per-remark share before calling
/// in. Normal mode falls back to the deploy's own `lim` when the mint
/// remark omits one (spec.md §8 scenario 1: `mint{tick:"foo"}` with no
/// `lim` credits the ticker's deploy-time amount); owner mode does the same
/// as an advisory default, but an explicit `lim` on the remark always wins.
pub fn mint(tx: &mut dyn LedgerTx, remark: &Remark) -> Result<(), OpError> {
    let (tick, to, lim) = match &remark.memo {
        Memo::Mint { tick, to, lim } => (tick, to, *lim),
        _ => return Err(ProtocolError::UnexpectedOp("mint").into()),
    };
    let to = to.clone().unwrap_or_else(|| remark.user.clone());

    let info = tx
        .get_deploy_info(tick)?
        .ok_or_else(|| ProtocolError::TickNotDeployed(tick.clone()))?;

    let lim = lim.or(info.lim).ok_or(ProtocolError::MintQuotaExceeded)?;

    if info.mode == Mode::Owner {
        if remark.user != info.deployer {
            return Err(ProtocolError::NotOwner.into());
        }
        // Owner-mode supply cap is advisory only (spec.md §9 Open Questions):
        // no `remaining` check here, but the ledger is still debited so the
        // figure stays informative.
        let new_remaining = info.remaining.saturating_sub(lim);
        tx.set_remaining(tick, new_remaining)?;
    } else {
        if info.remaining < lim {
            return Err(ProtocolError::InsufficientSupply.into());
        }
        tx.set_remaining(tick, info.remaining - lim)?;
    }

    let balance = tx.get_balance(tick, &to)?;
    tx.set_balance(tick, &to, balance + lim)?;
    Ok(())
}

pub fn transfer(tx: &mut dyn LedgerTx, remark: &Remark) -> Result<(), OpError> {
    let (tick, to, amt) = match &remark.memo {
        Memo::Transfer { tick, to, amt } => (tick, to, *amt),
        _ => return Err(ProtocolError::UnexpectedOp("transfer").into()),
    };
    let from = &remark.user;

    let from_balance = tx.get_balance(tick, from)?;
    if from_balance < amt {
        return Err(ProtocolError::InsufficientBalance.into());
    }
    tx.set_balance(tick, from, from_balance - amt)?;
    let to_balance = tx.get_balance(tick, to)?;
    tx.set_balance(tick, to, to_balance + amt)?;
    Ok(())
}

/// `approve(tick, owner=user, spender, amt)`: overwrite, not additive.
pub fn approve(tx: &mut dyn LedgerTx, remark: &Remark) -> Result<(), OpError> {
    let (tick, spender, amt) = match &remark.memo {
        Memo::Approve { tick, spender, amt } => (tick, spender, *amt),
        _ => return Err(ProtocolError::UnexpectedOp("approve").into()),
    };
    tx.set_approval(tick, &remark.user, spender, amt)?;
    Ok(())
}

pub fn transfer_from(tx: &mut dyn LedgerTx, remark: &Remark) -> Result<(), OpError> {
    let (tick, from, to, amt) = match &remark.memo {
        Memo::TransferFrom { tick, from, to, amt } => (tick, from, to, *amt),
        _ => return Err(ProtocolError::UnexpectedOp("transferFrom").into()),
    };
    let spender = &remark.user;

    let approved = tx.get_approval(tick, from, spender)?;
    if approved < amt {
        return Err(ProtocolError::InsufficientApproval.into());
    }
    let from_balance = tx.get_balance(tick, from)?;
    if from_balance < amt {
        return Err(ProtocolError::InsufficientBalance.into());
    }

    tx.set_approval(tick, from, spender, approved - amt)?;
    tx.set_balance(tick, from, from_balance - amt)?;
    let to_balance = tx.get_balance(tick, to)?;
    tx.set_balance(tick, to, to_balance + amt)?;
    Ok(())
}

/// Dispatch for the "other ops" phase: owner-mode mint, transfer, approve,
/// transferFrom. Deploy and fair/normal mint never reach here — the
/// Classifier routes them to their own phases — but this still rejects them
/// defensively, mirroring the original's "enters a code block that does not
/// belong to itself" guard.
pub fn apply_other(tx: &mut dyn LedgerTx, remark: &Remark) -> Result<(), OpError> {
    match &remark.memo {
        Memo::Mint { tick, .. } => {
            let info = tx
                .get_deploy_info(tick)?
                .ok_or_else(|| ProtocolError::TickNotDeployed(tick.clone()))?;
            if info.mode != Mode::Owner {
                return Err(ProtocolError::UnexpectedOp("mint").into());
            }
            mint(tx, remark)
        }
        Memo::Transfer { .. } => transfer(tx, remark),
        Memo::Approve { .. } => approve(tx, remark),
        Memo::TransferFrom { .. } => transfer_from(tx, remark),
        Memo::Deploy { .. } => Err(ProtocolError::UnexpectedOp("deploy").into()),
        Memo::Memo { .. } => Err(ProtocolError::UnexpectedOp("memo").into()),
    }
}
