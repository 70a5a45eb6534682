//! Postgres-backed `LedgerStore`.
//!
//! Keeps the teacher's `db/pg.rs` idiom: a synchronous `postgres::Connection`,
//! hand-built SQL via `format!`, `log` macros around every round trip. What
//! changes is the schema this drives — ticker metadata, per-tick balance and
//! approval tables, an indexer-status row — instead of blocks/txs/outputs.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use dotenv::dotenv;
use log::{debug, info};
use postgres::transaction::Transaction;
use postgres::{Connection, TlsMode};

use super::{DeployInfo, IndexerStatus, LedgerStore, LedgerTx};
use crate::error::StoreResult;
use crate::remark::Mode;

static NEXT_SAVEPOINT_ID: AtomicU64 = AtomicU64::new(0);

pub fn establish_connection(database_url: &str) -> StoreResult<Connection> {
    Connection::connect(database_url, TlsMode::None)
        .map_err(|e| crate::error::StorageError::Other(e.to_string()))
}

/// Map a tick into a SQL-identifier-safe suffix: non `[a-z0-9_]` bytes are
/// escaped as `_XX` (hex). Ticks are already lowercase-ASCII-normalized by
/// the time they reach the store (spec.md §3), so this mostly passes
/// through unchanged; it exists so a pathological tick can't be used to
/// inject SQL via a table name.
fn sanitize_tick_identifier(tick: &str) -> String {
    let mut out = String::with_capacity(tick.len());
    for b in tick.bytes() {
        if b.is_ascii_alphanumeric() || b == b'_' {
            out.push(b as char);
        } else {
            write!(out, "_{:02x}", b).unwrap();
        }
    }
    out
}

pub struct PgStore {
    conn: Connection,
}

impl PgStore {
    pub fn connect(database_url: &str) -> StoreResult<Self> {
        dotenv().ok();
        let conn = establish_connection(database_url)?;
        info!("creating dot-20 base schema");
        conn.batch_execute(include_str!("pg_init_base.sql"))
            .map_err(crate::error::StorageError::from)?;
        Ok(Self { conn })
    }

    /// Drops every dot-20 table, including the per-tick balance/approval
    /// tables created by past deploys, then recreates the base schema.
    /// Mirrors the teacher's `DataStore::wipe_to_height` escape hatch for
    /// resetting a dev database; unlike that method this wipes unconditionally
    /// rather than to a height, since dot-20 state has no block-range undo.
    pub fn wipe(&mut self) -> StoreResult<()> {
        let txn = self
            .conn
            .transaction()
            .map_err(crate::error::StorageError::from)?;
        let tick_tables: Vec<String> = txn
            .query(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = 'public' \
                   AND (table_name LIKE 'dot20_balances_%' OR table_name LIKE 'dot20_approvals_%')",
                &[],
            )
            .map_err(crate::error::StorageError::from)?
            .iter()
            .map(|row| row.get(0))
            .collect();

        let mut drop_sql = String::new();
        for table in &tick_tables {
            write!(drop_sql, "DROP TABLE IF EXISTS {} CASCADE;", table).unwrap();
        }
        drop_sql.push_str("DROP TABLE IF EXISTS dot20_tickers CASCADE;");
        drop_sql.push_str("DROP TABLE IF EXISTS dot20_indexer_status CASCADE;");
        txn.batch_execute(&drop_sql)
            .map_err(crate::error::StorageError::from)?;
        txn.commit().map_err(crate::error::StorageError::from)?;

        info!("wiped {} dot-20 tick table(s), recreating base schema", tick_tables.len());
        self.conn
            .batch_execute(include_str!("pg_init_base.sql"))
            .map_err(crate::error::StorageError::from)
    }
}

impl LedgerStore for PgStore {
    fn get_deploy_info(&mut self, tick: &str) -> StoreResult<Option<DeployInfo>> {
        query_deploy_info(&self.conn, tick)
    }

    fn get_indexer_status(&mut self, protocol: &str) -> StoreResult<Option<IndexerStatus>> {
        query_indexer_status(&self.conn, protocol)
    }

    fn begin(&mut self) -> StoreResult<Box<dyn LedgerTx + '_>> {
        let txn = self
            .conn
            .transaction()
            .map_err(crate::error::StorageError::from)?;
        Ok(Box::new(PgTx { txn }))
    }
}

fn query_deploy_info(
    conn: &impl postgres::GenericConnection,
    tick: &str,
) -> StoreResult<Option<DeployInfo>> {
    let rows = conn
        .query(
            "SELECT tick, mode, total_supply, remaining, deployer, lim FROM dot20_tickers WHERE tick = $1",
            &[&tick],
        )
        .map_err(crate::error::StorageError::from)?;
    Ok(rows.iter().next().map(|row| DeployInfo {
        tick: row.get(0),
        mode: match row.get::<_, String>(1).as_str() {
            "fair" => Mode::Fair,
            "owner" => Mode::Owner,
            _ => Mode::Normal,
        },
        total_supply: row.get::<_, i64>(2) as u64,
        remaining: row.get::<_, i64>(3) as u64,
        deployer: row.get(4),
        lim: row.get::<_, Option<i64>>(5).map(|v| v as u64),
    }))
}

fn query_indexer_status(
    conn: &impl postgres::GenericConnection,
    protocol: &str,
) -> StoreResult<Option<IndexerStatus>> {
    let rows = conn
        .query(
            "SELECT protocol, indexer_height, crawler_height FROM dot20_indexer_status WHERE protocol = $1",
            &[&protocol],
        )
        .map_err(crate::error::StorageError::from)?;
    Ok(rows.iter().next().map(|row| IndexerStatus {
        protocol: row.get(0),
        indexer_height: row.get::<_, i64>(1) as u64,
        crawler_height: row.get::<_, i64>(2) as u64,
    }))
}

fn mode_str(mode: Mode) -> &'static str {
    match mode {
        Mode::Fair => "fair",
        Mode::Normal => "normal",
        Mode::Owner => "owner",
    }
}

/// A nested scope around a `postgres::Transaction`. Relies on the crate's
/// own rollback-on-drop: an uncommitted `Transaction` rolls back when
/// dropped, so this wrapper needs no bookkeeping of its own beyond holding
/// the handle.
struct PgTx<'a> {
    txn: Transaction<'a>,
}

impl<'a> LedgerTx for PgTx<'a> {
    fn savepoint(&mut self) -> StoreResult<Box<dyn LedgerTx + '_>> {
        let name = format!("sp_{}", NEXT_SAVEPOINT_ID.fetch_add(1, Ordering::Relaxed));
        debug!("opening savepoint {}", name);
        let sp = self
            .txn
            .savepoint(&name)
            .map_err(crate::error::StorageError::from)?;
        Ok(Box::new(PgTx { txn: sp }))
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        let this = *self;
        this.txn.commit().map_err(crate::error::StorageError::from)
    }

    fn create_tables_for_new_tick(&mut self, tick: &str) -> StoreResult<()> {
        let id = sanitize_tick_identifier(tick);
        self.txn
            .batch_execute(&format!(
                "CREATE TABLE IF NOT EXISTS dot20_balances_{id} (\
                     addr TEXT PRIMARY KEY, amount NUMERIC(39, 0) NOT NULL DEFAULT 0); \
                 CREATE TABLE IF NOT EXISTS dot20_approvals_{id} (\
                     owner TEXT NOT NULL, spender TEXT NOT NULL, amount NUMERIC(39, 0) NOT NULL DEFAULT 0, \
                     PRIMARY KEY (owner, spender));",
                id = id
            ))
            .map_err(crate::error::StorageError::from)
    }

    fn insert_ticker(&mut self, info: &DeployInfo) -> StoreResult<()> {
        self.txn
            .execute(
                "INSERT INTO dot20_tickers (tick, mode, total_supply, remaining, deployer, lim) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
                &[
                    &info.tick,
                    &mode_str(info.mode),
                    &(info.total_supply as i64),
                    &(info.remaining as i64),
                    &info.deployer,
                    &info.lim.map(|v| v as i64),
                ],
            )
            .map_err(crate::error::StorageError::from)?;
        Ok(())
    }

    fn get_deploy_info(&mut self, tick: &str) -> StoreResult<Option<DeployInfo>> {
        query_deploy_info(&self.txn, tick)
    }

    fn set_remaining(&mut self, tick: &str, remaining: u64) -> StoreResult<()> {
        self.txn
            .execute(
                "UPDATE dot20_tickers SET remaining = $1 WHERE tick = $2",
                &[&(remaining as i64), &tick],
            )
            .map_err(crate::error::StorageError::from)?;
        Ok(())
    }

    fn get_balance(&mut self, tick: &str, user: &str) -> StoreResult<u64> {
        let id = sanitize_tick_identifier(tick);
        let rows = self
            .txn
            .query(
                &format!("SELECT amount FROM dot20_balances_{} WHERE addr = $1", id),
                &[&user],
            )
            .map_err(crate::error::StorageError::from)?;
        Ok(rows
            .iter()
            .next()
            .map(|row| row.get::<_, i64>(0) as u64)
            .unwrap_or(0))
    }

    fn set_balance(&mut self, tick: &str, user: &str, amount: u64) -> StoreResult<()> {
        let id = sanitize_tick_identifier(tick);
        self.txn
            .execute(
                &format!(
                    "INSERT INTO dot20_balances_{id} (addr, amount) VALUES ($1, $2) \
                     ON CONFLICT (addr) DO UPDATE SET amount = EXCLUDED.amount",
                    id = id
                ),
                &[&user, &(amount as i64)],
            )
            .map_err(crate::error::StorageError::from)?;
        Ok(())
    }

    fn get_approval(&mut self, tick: &str, owner: &str, spender: &str) -> StoreResult<u64> {
        let id = sanitize_tick_identifier(tick);
        let rows = self
            .txn
            .query(
                &format!(
                    "SELECT amount FROM dot20_approvals_{} WHERE owner = $1 AND spender = $2",
                    id
                ),
                &[&owner, &spender],
            )
            .map_err(crate::error::StorageError::from)?;
        Ok(rows
            .iter()
            .next()
            .map(|row| row.get::<_, i64>(0) as u64)
            .unwrap_or(0))
    }

    fn set_approval(
        &mut self,
        tick: &str,
        owner: &str,
        spender: &str,
        amount: u64,
    ) -> StoreResult<()> {
        let id = sanitize_tick_identifier(tick);
        self.txn
            .execute(
                &format!(
                    "INSERT INTO dot20_approvals_{id} (owner, spender, amount) VALUES ($1, $2, $3) \
                     ON CONFLICT (owner, spender) DO UPDATE SET amount = EXCLUDED.amount",
                    id = id
                ),
                &[&owner, &spender, &(amount as i64)],
            )
            .map_err(crate::error::StorageError::from)?;
        Ok(())
    }

    fn upsert_indexer_status(&mut self, status: &IndexerStatus) -> StoreResult<()> {
        self.txn
            .execute(
                "INSERT INTO dot20_indexer_status (protocol, indexer_height, crawler_height) \
                 VALUES ($1, $2, $3) \
                 ON CONFLICT (protocol) DO UPDATE SET \
                     indexer_height = EXCLUDED.indexer_height, \
                     crawler_height = EXCLUDED.crawler_height",
                &[
                    &status.protocol,
                    &(status.indexer_height as i64),
                    &(status.crawler_height as i64),
                ],
            )
            .map_err(crate::error::StorageError::from)?;
        Ok(())
    }
}
