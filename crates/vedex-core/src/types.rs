use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::constants::WEEK;

/// Token amount in base units. u128 covers 10^9 tokens at 18 decimals with
/// plenty of headroom for the products taken in pool math.
pub type Balance = u128;

/// Unix timestamp (seconds, UTC).
pub type Timestamp = i64;

/// Execution-sequence counter supplied by the host (block height, batch
/// number). Two calls sharing a step are treated as the same time-step.
pub type Step = u64;

// ── Epochs ───────────────────────────────────────────────────────────────────

/// Start of the weekly epoch containing `ts`.
pub fn epoch_start(ts: Timestamp) -> Timestamp {
    ts.div_euclid(WEEK) * WEEK
}

/// Start of the epoch following the one containing `ts`.
pub fn epoch_next(ts: Timestamp) -> Timestamp {
    epoch_start(ts) + WEEK
}

// ── AccountId ────────────────────────────────────────────────────────────────

/// 32-byte account identifier. External actors are derived from a name or
/// key; protocol components (pools, gauges, the minter…) from a domain tag.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The unspendable sink. Minimum liquidity and burned claims land here.
    pub fn null() -> Self {
        Self([0u8; 32])
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// BLAKE3(name). Used for human-named actors in genesis files and tests.
    pub fn from_name(name: &str) -> Self {
        Self(*blake3::hash(name.as_bytes()).as_bytes())
    }

    /// Account owned by a protocol component, e.g. `derived("pool", 3)`.
    pub fn derived(domain: &str, index: u64) -> Self {
        let mut h = blake3::Hasher::new();
        h.update(b"vedex/");
        h.update(domain.as_bytes());
        h.update(&index.to_le_bytes());
        Self(*h.finalize().as_bytes())
    }

    /// Base-58 encoded string representation.
    pub fn to_b58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_b58(s: &str) -> Result<Self, bs58::decode::Error> {
        let bytes = bs58::decode(s).into_vec()?;
        if bytes.len() != 32 {
            return Err(bs58::decode::Error::BufferTooSmall);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_b58())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.to_b58();
        write!(f, "AccountId({})", &s[..s.len().min(8)])
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_b58())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_b58(&s).map_err(serde::de::Error::custom)
    }
}

// ── TokenId ──────────────────────────────────────────────────────────────────

/// Fungible token identifier (its ticker). Liquidity claims use the
/// pool-derived symbol returned by [`TokenId::liquidity`].
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(pub String);

impl TokenId {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Symbol of the liquidity claim minted by `pool`.
    pub fn liquidity(pool: PoolId, stable: bool) -> Self {
        let prefix = if stable { "sAMM" } else { "vAMM" };
        Self(format!("{prefix}-{}", pool.0))
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({})", self.0)
    }
}

// ── Sequential ids ───────────────────────────────────────────────────────────

macro_rules! sequential_id {
    ($name:ident, $tag:literal) => {
        #[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Debug)]
        pub struct $name(pub u64);

        impl $name {
            pub fn next(self) -> Self {
                Self(self.0 + 1)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, ":{}"), self.0)
            }
        }
    };
}

sequential_id!(PoolId, "pool");
sequential_id!(LockId, "lock");
sequential_id!(GaugeId, "gauge");

impl PoolId {
    pub fn account(&self) -> AccountId {
        AccountId::derived("pool", self.0)
    }
}

impl GaugeId {
    pub fn account(&self) -> AccountId {
        AccountId::derived("gauge", self.0)
    }

    /// Every gauge has exactly one bribe escrow sharing its index.
    pub fn bribe_account(&self) -> AccountId {
        AccountId::derived("bribe", self.0)
    }
}

/// Fixed accounts held by the singleton components.
pub mod accounts {
    use super::AccountId;

    pub fn escrow() -> AccountId {
        AccountId::derived("escrow", 0)
    }

    pub fn voter() -> AccountId {
        AccountId::derived("voter", 0)
    }

    pub fn minter() -> AccountId {
        AccountId::derived("minter", 0)
    }

    pub fn rebase_distributor() -> AccountId {
        AccountId::derived("rebase", 0)
    }
}
