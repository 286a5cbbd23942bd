//! Result cache with single-flight computation
//!
//! Each key owns a `tokio::sync::OnceCell`. Concurrent callers for the same
//! key wait on the one computation in flight instead of starting their own.
//! Failed or cancelled computations leave the cell empty and their slot is
//! dropped, so nothing but successes is ever cached.
//!
//! Entries expire after the TTL. Inserting a new key first sweeps expired and
//! abandoned slots, then evicts the oldest stored value while the cache is
//! full. Slots with a computation in flight are never evicted, so the cache
//! can briefly hold more than `max_entries` slots.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

struct Cached<V> {
    value: Arc<V>,
    stored_at: Instant,
}

struct Slot<V> {
    cell: Arc<OnceCell<Cached<V>>>,
}

enum SlotState {
    Fresh,
    Expired,
    /// Empty, and some caller still holds the cell
    InFlight,
    /// Empty, and nobody holds the cell any more
    Abandoned,
}

impl<V> Slot<V> {
    fn state(&self, now: Instant, ttl: Duration) -> SlotState {
        match self.cell.get() {
            Some(cached) if now.duration_since(cached.stored_at) < ttl => SlotState::Fresh,
            Some(_) => SlotState::Expired,
            // The map holds one reference; every caller working on or waiting
            // for the cell holds another
            None if Arc::strong_count(&self.cell) > 1 => SlotState::InFlight,
            None => SlotState::Abandoned,
        }
    }

    fn stored_at(&self) -> Option<Instant> {
        self.cell.get().map(|c| c.stored_at)
    }
}

/// Bounded TTL cache keyed by `K`
pub struct TtlCache<K, V> {
    slots: Mutex<HashMap<K, Slot<V>>>,
    ttl: Duration,
    max_entries: usize,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Return the cached value for `key`, or run `compute` once and cache its success
    pub async fn get_or_try_compute<F, Fut, E>(&self, key: K, compute: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let cell = self.cell_for(key.clone()).await;

        let outcome = cell
            .get_or_try_init(|| async move {
                let value = compute().await?;
                Ok::<_, E>(Cached {
                    value: Arc::new(value),
                    stored_at: Instant::now(),
                })
            })
            .await
            .map(|cached| Arc::clone(&cached.value));

        if outcome.is_err() {
            self.release_failed(&key, cell).await;
        }
        outcome
    }

    /// Cell for `key`: the live one if present, otherwise a fresh slot
    async fn cell_for(&self, key: K) -> Arc<OnceCell<Cached<V>>> {
        let mut slots = self.slots.lock().await;
        let now = Instant::now();

        if let Some(slot) = slots.get(&key) {
            match slot.state(now, self.ttl) {
                SlotState::Fresh => {
                    debug!("Cache hit");
                    return Arc::clone(&slot.cell);
                }
                SlotState::InFlight => {
                    debug!("Joining computation in flight");
                    return Arc::clone(&slot.cell);
                }
                SlotState::Expired => debug!("Cache entry expired"),
                SlotState::Abandoned => {}
            }
        }
        slots.remove(&key);

        self.make_room(&mut slots, now);

        let cell = Arc::new(OnceCell::new());
        slots.insert(
            key,
            Slot {
                cell: Arc::clone(&cell),
            },
        );
        cell
    }

    /// Drop the slot of a failed computation unless it was replaced or is still shared
    async fn release_failed(&self, key: &K, cell: Arc<OnceCell<Cached<V>>>) {
        let mut slots = self.slots.lock().await;
        let ours = slots
            .get(key)
            .map(|slot| Arc::ptr_eq(&slot.cell, &cell))
            .unwrap_or(false);
        drop(cell);

        if ours {
            if let Some(SlotState::Abandoned) = slots.get(key).map(|s| s.state(Instant::now(), self.ttl)) {
                slots.remove(key);
            }
        }
    }

    fn make_room(&self, slots: &mut HashMap<K, Slot<V>>, now: Instant) {
        let ttl = self.ttl;
        slots.retain(|_, slot| matches!(slot.state(now, ttl), SlotState::Fresh | SlotState::InFlight));

        while slots.len() >= self.max_entries {
            let oldest = slots
                .iter()
                .filter_map(|(k, slot)| slot.stored_at().map(|at| (k, at)))
                .min_by_key(|(_, at)| *at)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(key) => {
                    debug!("Evicting oldest cache entry");
                    slots.remove(&key);
                }
                // Everything left is in flight
                None => break,
            }
        }
    }

    /// Number of slots, including computations in flight
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.lock().await.is_empty()
    }
}
