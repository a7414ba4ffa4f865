//! Concurrent cache table with generation-checked commits.
//!
//! Each tracked key carries a generation. A reader takes a [`Ticket`]
//! before it fetches; an invalidation moves the key to a fresh generation
//! and evicts the entry. A fetched value is committed only if the key's
//! generation still matches the ticket, so a fetch that overlapped a write
//! or delete can never repopulate the cache with what it read.
//!
//! Generations are drawn from one table-wide clock, so they never repeat
//! for a key even after its row is dropped. A row lives only while the key
//! has a cached entry or a fetch in flight; tickets release their row when
//! dropped, including when the fetch errors or the future is abandoned.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use keyloom_core::BackendId;
use tracing::trace;

use crate::entry::{CacheEntry, CacheKey};

#[derive(Debug)]
struct Slot {
    generation: u64,
    in_flight: u32,
    entry: Option<CacheEntry>,
}

impl Slot {
    fn is_idle(&self) -> bool {
        self.in_flight == 0 && self.entry.is_none()
    }
}

/// Generation snapshot taken before a fetch.
///
/// Consumed by [`commit`](Self::commit). Dropping it uncommitted releases
/// the key's row.
#[must_use = "a ticket is needed to commit the fetched value"]
pub struct Ticket<'a> {
    table: &'a CacheTable,
    key: CacheKey,
    generation: u64,
    settled: bool,
}

impl Ticket<'_> {
    /// The key this ticket was taken for.
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// The generation observed when the ticket was taken.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Store a fetched value if no invalidation happened since the ticket
    /// was taken.
    ///
    /// Returns `false` when the value is stale and was discarded.
    pub fn commit(mut self, value: Option<String>) -> bool {
        self.settled = true;
        self.table.fill(&self.key, self.generation, value)
    }
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.table.release(&self.key);
        }
    }
}

impl fmt::Debug for Ticket<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticket")
            .field("key", &self.key)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// The cache entry table.
#[derive(Debug, Default)]
pub struct CacheTable {
    slots: DashMap<CacheKey, Slot>,
    clock: AtomicU64,
}

impl CacheTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached entry for `key`, if any.
    #[must_use]
    pub fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.slots.get(key).and_then(|slot| slot.entry.clone())
    }

    /// Current generation of `key`, or `None` if the key is not tracked.
    #[must_use]
    pub fn generation(&self, key: &CacheKey) -> Option<u64> {
        self.slots.get(key).map(|slot| slot.generation)
    }

    /// Snapshot the key's generation before fetching it.
    ///
    /// The key stays tracked until the ticket is committed or dropped, so a
    /// backend-wide invalidation also catches fetches for keys with no
    /// entry yet.
    pub fn ticket(&self, key: CacheKey) -> Ticket<'_> {
        let mut slot = self.slots.entry(key.clone()).or_insert_with(|| Slot {
            generation: self.clock.load(Ordering::SeqCst),
            in_flight: 0,
            entry: None,
        });
        slot.in_flight = slot.in_flight.saturating_add(1);
        let generation = slot.generation;
        drop(slot);
        Ticket {
            table: self,
            key,
            generation,
            settled: false,
        }
    }

    fn fill(&self, key: &CacheKey, generation: u64, value: Option<String>) -> bool {
        let Entry::Occupied(mut occupied) = self.slots.entry(key.clone()) else {
            return false;
        };
        let slot = occupied.get_mut();
        slot.in_flight = slot.in_flight.saturating_sub(1);
        if slot.generation != generation {
            trace!(%key, ticket = generation, current = slot.generation, "discarding stale fetch");
            if slot.is_idle() {
                occupied.remove();
            }
            return false;
        }
        slot.entry = Some(CacheEntry {
            value,
            version: generation,
            fetched_at: Utc::now(),
        });
        true
    }

    fn release(&self, key: &CacheKey) {
        if let Entry::Occupied(mut occupied) = self.slots.entry(key.clone()) {
            let slot = occupied.get_mut();
            slot.in_flight = slot.in_flight.saturating_sub(1);
            if slot.is_idle() {
                occupied.remove();
            }
        }
    }

    fn advance(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst).wrapping_add(1)
    }

    /// Evict `key` and move it to a fresh generation. Returns that
    /// generation.
    ///
    /// Keys with neither an entry nor a fetch in flight are not recorded.
    pub fn invalidate(&self, key: &CacheKey) -> u64 {
        match self.slots.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let generation = self.advance();
                let slot = occupied.get_mut();
                slot.generation = generation;
                let evicted = slot.entry.take().is_some();
                let in_flight = slot.in_flight;
                if in_flight == 0 {
                    occupied.remove();
                }
                trace!(%key, version = generation, evicted, in_flight, "invalidated");
                generation
            },
            Entry::Vacant(_) => self.advance(),
        }
    }

    /// Invalidate every tracked key of `backend`.
    ///
    /// Returns how many keys were invalidated.
    pub fn invalidate_backend(&self, backend: BackendId) -> usize {
        let keys: Vec<CacheKey> = self
            .slots
            .iter()
            .filter(|slot| slot.key().backend == backend)
            .map(|slot| slot.key().clone())
            .collect();
        for key in &keys {
            self.invalidate(key);
        }
        keys.len()
    }

    /// All entries, sorted by backend then key.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(CacheKey, CacheEntry)> {
        let mut all: Vec<_> = self
            .slots
            .iter()
            .filter_map(|slot| slot.entry.clone().map(|entry| (slot.key().clone(), entry)))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.entry.is_some()).count()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.slots.iter().any(|slot| slot.entry.is_some())
    }

    /// Number of keys tracked: cached entries plus keys with a fetch in
    /// flight.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.slots.len()
    }
}
