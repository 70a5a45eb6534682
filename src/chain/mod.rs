//! Chain Client interface (spec.md §6) — an external collaborator. The
//! engine only depends on this trait; how remarks actually get off the
//! wire (websocket reconnection, RPC decoding) lives outside the core.

pub mod substrate;

use crate::error::Result;
use crate::remark::RawRemark;

pub type BlockHash = String;

pub trait ChainClient {
    fn finalized_head(&mut self) -> Result<BlockHash>;
    fn block_number(&mut self, hash: &BlockHash) -> Result<u64>;
    /// Decoded, filtered to protocol `p = "dot-20"`, annotated with
    /// positional indices, sorted by `(extrinsic_index, batchall_index,
    /// remark_index)` (spec.md §3).
    fn fetch_remarks(&mut self, block_num: u64) -> Result<Vec<RawRemark>>;
    /// Re-establish a dropped connection after a transport error.
    fn reconnect(&mut self) -> Result<()>;
}
