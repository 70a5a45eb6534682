use thiserror::Error;

/// Top-level result type returned across the engine/driver boundary.
pub type Result<T> = std::result::Result<T, IndexerError>;

/// Result type for the ledger store's own (storage-layer) operations.
pub type StoreResult<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("transport error: {0}")]
    Transport(#[from] ChainError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("configuration error: {0}")]
    Config(String),
}

/// Transport-layer failures, caught and retried by the Block Driver (spec §7.1).
/// Never fatal on their own; they trigger a reconnect, not a propagated error
/// past the driver.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("request timed out")]
    Timeout,
    #[error("rpc error: {0}")]
    Rpc(String),
}

/// Storage-layer failures (spec §7.3): constraint violations the validator
/// could not have caught, connection loss mid-transaction. Always fatal —
/// they abort the enclosing transaction/savepoint and propagate.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("postgres error: {0}")]
    Postgres(#[from] postgres::Error),
    #[error("{0}")]
    Other(String),
}

/// Protocol-validity failures (spec §7.2): bad JSON, undeployed tick, rule
/// violation, insufficient balance, duplicate mint. Logged at warn level and
/// swallowed by the caller; never propagated as an error past the op.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("tick {0} already deployed")]
    TickAlreadyDeployed(String),
    #[error("tick {0} not deployed")]
    TickNotDeployed(String),
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("insufficient remaining supply")]
    InsufficientSupply,
    #[error("mint lim missing or quota exceeded")]
    MintQuotaExceeded,
    #[error("insufficient approval")]
    InsufficientApproval,
    #[error("caller is not the deployer of this ticker")]
    NotOwner,
    #[error("op {0} not valid in this context")]
    UnexpectedOp(&'static str),
}

/// Error type for a single operation (`ops.rs`): either a protocol-level
/// failure (caller rolls back one savepoint and continues) or a
/// storage-level one (caller aborts the whole enclosing transaction).
#[derive(Debug, Error)]
pub enum OpError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
