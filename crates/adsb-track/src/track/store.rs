//! Aircraft store: a hash-bucket table keyed by 24-bit address, sharded so
//! that decoder threads and maintenance workers can each own a disjoint
//! range of buckets without contending on a single lock (spec.md §3.1, §5).

use super::aircraft::Aircraft;
use adsb_core::decode::ICAO;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Number of hash buckets the store is partitioned into. Maintenance and
/// trace-writer worker pools each claim `AIRCRAFT_BUCKETS / n` of these.
pub const AIRCRAFT_BUCKETS: usize = 256;

fn bucket_of(address: ICAO) -> usize {
    (address.0 as usize) % AIRCRAFT_BUCKETS
}

/// One shard of the table. Structural changes (insert/remove) require the
/// shard's write lock; per-aircraft field mutation only needs the aircraft
/// to already be reachable (callers still take the write lock today since
/// `Aircraft` lives directly in the map — see spec.md §9 on arena indices
/// as a future refinement).
#[derive(Default)]
struct Shard {
    aircraft: HashMap<u32, Aircraft>,
}

pub struct Store {
    shards: Vec<RwLock<Shard>>,
}

impl Default for Store {
    fn default() -> Self {
        let mut shards = Vec::with_capacity(AIRCRAFT_BUCKETS);
        shards.resize_with(AIRCRAFT_BUCKETS, || RwLock::new(Shard::default()));
        Store { shards }
    }
}

pub struct ShardReadGuard<'a> {
    guard: RwLockReadGuard<'a, Shard>,
    address: u32,
}

impl<'a> ShardReadGuard<'a> {
    pub fn get(&self) -> Option<&Aircraft> {
        self.guard.aircraft.get(&self.address)
    }
}

pub struct ShardWriteGuard<'a> {
    guard: RwLockWriteGuard<'a, Shard>,
    address: u32,
}

impl<'a> ShardWriteGuard<'a> {
    pub fn get_mut(&mut self) -> &mut Aircraft {
        self.guard
            .aircraft
            .entry(self.address)
            .or_insert_with(|| Aircraft::new(ICAO(self.address)))
    }

    pub fn existing_mut(&mut self) -> Option<&mut Aircraft> {
        self.guard.aircraft.get_mut(&self.address)
    }
}

impl Store {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn read(&self, address: ICAO) -> ShardReadGuard<'_> {
        let shard = &self.shards[bucket_of(address)];
        ShardReadGuard {
            guard: shard.read().await,
            address: address.0,
        }
    }

    /// Take the write lock for the shard owning `address`, creating the
    /// aircraft entry on first touch. This is the "first reliable-address
    /// message" creation point described in spec.md §3.6.
    pub async fn write(&self, address: ICAO) -> ShardWriteGuard<'_> {
        let shard = &self.shards[bucket_of(address)];
        ShardWriteGuard {
            guard: shard.write().await,
            address: address.0,
        }
    }

    /// Called only by the maintenance loop, which owns the table-structure
    /// lock ordering described in spec.md §5: evict every aircraft in the
    /// given bucket range for which `keep` returns false.
    pub async fn retain_bucket_range(
        &self,
        range: std::ops::Range<usize>,
        keep: impl Fn(&Aircraft) -> bool,
    ) -> Vec<ICAO> {
        let mut removed = Vec::new();
        for idx in range {
            let mut shard = self.shards[idx].write().await;
            let doomed: Vec<u32> = shard
                .aircraft
                .iter()
                .filter(|(_, a)| !keep(a))
                .map(|(addr, _)| *addr)
                .collect();
            for addr in doomed {
                shard.aircraft.remove(&addr);
                removed.push(ICAO(addr));
            }
        }
        removed
    }

    pub async fn for_each_in_range(
        &self,
        range: std::ops::Range<usize>,
        mut f: impl FnMut(&Aircraft),
    ) {
        for idx in range {
            let shard = self.shards[idx].read().await;
            for aircraft in shard.aircraft.values() {
                f(aircraft);
            }
        }
    }

    pub async fn len(&self) -> usize {
        let mut total = 0;
        for shard in &self.shards {
            total += shard.read().await.aircraft.len();
        }
        total
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_read_back() {
        let store = Store::new();
        {
            let mut w = store.write(ICAO(0xabcdef)).await;
            w.get_mut().lat = 12.0;
        }
        let r = store.read(ICAO(0xabcdef)).await;
        assert_eq!(r.get().unwrap().lat, 12.0);
    }

    #[tokio::test]
    async fn stale_removal_drops_entries() {
        let store = Store::new();
        {
            let mut w = store.write(ICAO(1)).await;
            w.get_mut();
        }
        let removed = store
            .retain_bucket_range(0..AIRCRAFT_BUCKETS, |_| false)
            .await;
        assert_eq!(removed.len(), 1);
        assert!(store.is_empty().await);
    }
}
