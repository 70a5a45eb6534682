//! Remark and Memo data model (spec.md §3).

use serde::{Deserialize, Serialize};

pub type Address = String;

/// Ticker governance mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Fair,
    Normal,
    Owner,
}

/// A single dot-20 remark, already decoded and structurally valid (it has
/// passed serde deserialization into one of the known ops). `memo_remark` is
/// populated by R5 from a trailing `memo` terminator in the same batch.
#[derive(Debug, Clone)]
pub struct Remark {
    pub block_num: u64,
    pub extrinsic_index: u32,
    pub batchall_index: u32,
    pub remark_index: u32,
    pub origin: Address,
    pub user: Address,
    pub memo: Memo,
    pub memo_remark: Option<String>,
}

/// A remark as handed over by the Chain Client: positional metadata plus an
/// un-trusted JSON memo payload. Everything about the memo's shape (is `op`
/// known, are its required fields present) is validated by the Base Filter.
#[derive(Debug, Clone)]
pub struct RawRemark {
    pub block_num: u64,
    pub extrinsic_index: u32,
    pub batchall_index: u32,
    pub remark_index: u32,
    pub origin: Address,
    pub user: Address,
    pub memo: serde_json::Value,
}

/// Tagged memo payload, one arm per supported op (spec.md §3).
///
/// Using a `serde`-tagged enum makes "unknown op" a deserialization error
/// (R1) and "missing required field for this op" a deserialization error
/// (R2) for free, rather than a chain of `.get("field")` string comparisons.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Memo {
    Deploy {
        tick: String,
        mode: Mode,
        amt: u64,
        /// Default per-mint amount: normal mode credits this when a mint
        /// remark omits its own `lim` (spec.md §8 scenario 1); owner mode
        /// treats it the same way but only as an advisory default, never
        /// enforced (spec.md §9 Open Questions); fair mode ignores it.
        #[serde(default)]
        lim: Option<u64>,
    },
    Mint {
        tick: String,
        #[serde(default)]
        to: Option<Address>,
        #[serde(default)]
        lim: Option<u64>,
    },
    Transfer {
        tick: String,
        to: Address,
        amt: u64,
    },
    TransferFrom {
        tick: String,
        from: Address,
        to: Address,
        amt: u64,
    },
    Approve {
        tick: String,
        spender: Address,
        amt: u64,
    },
    Memo {
        text: String,
    },
}

impl Memo {
    pub fn tick(&self) -> Option<&str> {
        match self {
            Memo::Deploy { tick, .. }
            | Memo::Mint { tick, .. }
            | Memo::Transfer { tick, .. }
            | Memo::TransferFrom { tick, .. }
            | Memo::Approve { tick, .. } => Some(tick.as_str()),
            Memo::Memo { .. } => None,
        }
    }

    pub fn op_name(&self) -> &'static str {
        match self {
            Memo::Deploy { .. } => "deploy",
            Memo::Mint { .. } => "mint",
            Memo::Transfer { .. } => "transfer",
            Memo::TransferFrom { .. } => "transferFrom",
            Memo::Approve { .. } => "approve",
            Memo::Memo { .. } => "memo",
        }
    }
}

/// Normalize a tick to its lowercased ASCII representation, non-ASCII
/// characters rendered as `\xNN`/`\uNNNN` escapes (spec.md §3, resolved
/// against `original_source/indexer.py`'s `ascii(tick).lower().strip("'")`).
///
/// Deliberately does *not* quote the output or escape `'`/`\`: the source's
/// `ascii()`-then-`lower()` round-trip is not idempotent on its own escape
/// output (a `\` surviving a second pass gets re-escaped). Escaping only
/// non-ASCII bytes keeps a second application a no-op, satisfying P6.
pub fn normalize_tick(tick: &str) -> String {
    let mut out = String::with_capacity(tick.len());
    for c in tick.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let cp = c as u32;
            if cp <= 0xFF {
                out.push_str(&format!("\\x{:02x}", cp));
            } else {
                out.push_str(&format!("\\u{:04x}", cp));
            }
        }
    }
    out.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_ascii_lowercases() {
        assert_eq!(normalize_tick("DoTa"), "dota");
    }

    #[test]
    fn normalize_escapes_non_ascii() {
        assert_eq!(normalize_tick("dotᴬ"), normalize_tick("dotᴬ").to_lowercase());
        assert!(normalize_tick("café").contains("\\x"));
        assert!(normalize_tick("dot\u{1F600}").contains("\\u"));
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_tick("Café\u{1F600}");
        let twice = normalize_tick(&once);
        assert_eq!(once, twice);
    }
}
