use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use vedex_core::action::Call;
use vedex_core::error::VedexError;
use vedex_core::types::{GaugeId, LockId, PoolId};

use crate::bribe::Bribe;
use crate::escrow::Lock;
use crate::gauge::Gauge;
use crate::ledger::Ledger;
use crate::pool::Pool;

const LEDGER_KEY: &str = "ledger";

/// Persistent state database backed by sled.
///
/// Named trees:
/// - `pools`:  PoolId (u64 BE)  → bincode(Pool)
/// - `locks`:  LockId (u64 BE)  → bincode(Lock)
/// - `gauges`: GaugeId (u64 BE) → bincode(Gauge)
/// - `bribes`: GaugeId (u64 BE) → bincode(Bribe)
/// - `calls`:  sequence (u64 BE) → bincode(Call), the applied-call journal
/// - `meta`:   string key → raw bytes; `ledger` holds every scalar component
pub struct StateDb {
    _db: sled::Db,
    pools: sled::Tree,
    locks: sled::Tree,
    gauges: sled::Tree,
    bribes: sled::Tree,
    calls: sled::Tree,
    meta: sled::Tree,
}

fn storage(e: sled::Error) -> VedexError {
    VedexError::Storage(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, VedexError> {
    bincode::serialize(value).map_err(|e| VedexError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, VedexError> {
    bincode::deserialize(bytes).map_err(|e| VedexError::Serialization(e.to_string()))
}

impl StateDb {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VedexError> {
        let db = sled::open(path).map_err(storage)?;
        let pools = db.open_tree("pools").map_err(storage)?;
        let locks = db.open_tree("locks").map_err(storage)?;
        let gauges = db.open_tree("gauges").map_err(storage)?;
        let bribes = db.open_tree("bribes").map_err(storage)?;
        let calls = db.open_tree("calls").map_err(storage)?;
        let meta = db.open_tree("meta").map_err(storage)?;
        Ok(Self { _db: db, pools, locks, gauges, bribes, calls, meta })
    }

    fn put<T: Serialize>(tree: &sled::Tree, key: u64, value: &T) -> Result<(), VedexError> {
        tree.insert(key.to_be_bytes(), encode(value)?).map_err(storage)?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(tree: &sled::Tree, key: u64) -> Result<Option<T>, VedexError> {
        match tree.get(key.to_be_bytes()).map_err(storage)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(tree: &sled::Tree) -> Result<Vec<T>, VedexError> {
        let mut out = Vec::new();
        for item in tree.iter() {
            let (_, bytes) = item.map_err(storage)?;
            out.push(decode(&bytes)?);
        }
        Ok(out)
    }

    // ── Records ──────────────────────────────────────────────────────────────

    pub fn get_pool(&self, id: PoolId) -> Result<Option<Pool>, VedexError> {
        Self::get(&self.pools, id.0)
    }

    pub fn put_pool(&self, pool: &Pool) -> Result<(), VedexError> {
        Self::put(&self.pools, pool.id.0, pool)
    }

    pub fn get_lock(&self, id: LockId) -> Result<Option<Lock>, VedexError> {
        Self::get(&self.locks, id.0)
    }

    pub fn put_lock(&self, lock: &Lock) -> Result<(), VedexError> {
        Self::put(&self.locks, lock.id.0, lock)
    }

    pub fn get_gauge(&self, id: GaugeId) -> Result<Option<Gauge>, VedexError> {
        Self::get(&self.gauges, id.0)
    }

    pub fn put_gauge(&self, gauge: &Gauge) -> Result<(), VedexError> {
        Self::put(&self.gauges, gauge.id.0, gauge)
    }

    pub fn get_bribe(&self, id: GaugeId) -> Result<Option<Bribe>, VedexError> {
        Self::get(&self.bribes, id.0)
    }

    pub fn put_bribe(&self, bribe: &Bribe) -> Result<(), VedexError> {
        Self::put(&self.bribes, bribe.gauge.0, bribe)
    }

    // ── Call journal ─────────────────────────────────────────────────────────

    pub fn append_call(&self, seq: u64, call: &Call) -> Result<(), VedexError> {
        Self::put(&self.calls, seq, call)
    }

    pub fn calls(&self) -> Result<Vec<Call>, VedexError> {
        Self::scan(&self.calls)
    }

    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    // ── Metadata ─────────────────────────────────────────────────────────────

    pub fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), VedexError> {
        self.meta.insert(key.as_bytes(), value).map_err(storage)?;
        Ok(())
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, VedexError> {
        self.meta
            .get(key.as_bytes())
            .map(|opt| opt.map(|v| v.to_vec()))
            .map_err(storage)
    }

    // ── Whole ledger ─────────────────────────────────────────────────────────

    /// Write every record plus the scalar blob.
    pub fn save_ledger(&self, ledger: &Ledger) -> Result<(), VedexError> {
        for pool in ledger.pools.iter() {
            self.put_pool(pool)?;
        }
        for lock in ledger.escrow.iter() {
            self.put_lock(lock)?;
        }
        for gauge in ledger.gauges.values() {
            self.put_gauge(gauge)?;
        }
        for bribe in ledger.bribes.values() {
            self.put_bribe(bribe)?;
        }
        self.put_meta(LEDGER_KEY, &encode(ledger)?)
    }

    /// `None` on a fresh database.
    pub fn load_ledger(&self) -> Result<Option<Ledger>, VedexError> {
        let Some(bytes) = self.get_meta(LEDGER_KEY)? else {
            return Ok(None);
        };
        let mut ledger: Ledger = decode(&bytes)?;
        for pool in Self::scan::<Pool>(&self.pools)? {
            ledger.pools.restore(pool);
        }
        for lock in Self::scan::<Lock>(&self.locks)? {
            ledger.escrow.restore(lock);
        }
        for gauge in Self::scan::<Gauge>(&self.gauges)? {
            ledger.gauges.insert(gauge.id, gauge);
        }
        for bribe in Self::scan::<Bribe>(&self.bribes)? {
            ledger.bribes.insert(bribe.gauge, bribe);
        }
        Ok(Some(ledger))
    }

    pub fn flush(&self) -> Result<(), VedexError> {
        self._db.flush().map_err(storage)?;
        Ok(())
    }
}
