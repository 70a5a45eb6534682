//! `dot20-indexer` — an indexer for a dot-20-style inscription protocol
//! layered over a Substrate-style chain. The crate root wires together the
//! Block Driver, the Base Filter/Classifier/Executor pipeline, and the
//! `ChainClient`/`LedgerStore` collaborator traits.
//!
//! The core (grouper, filter, classifier, executor, ops) is a pure function
//! of `(remarks, store)`: it takes no lock, opens no socket, and makes no
//! scheduling decisions of its own. Everything with a suspension point
//! lives in the Block Driver.

pub mod chain;
pub mod classifier;
pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod filter;
pub mod grouper;
pub mod ops;
pub mod remark;
pub mod store;

pub use error::{IndexerError, Result};
