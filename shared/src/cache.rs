use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, TimeDelta, Utc};
use log::debug;

use crate::clock::Clock;

#[derive(Clone, Debug)]
pub struct CacheEntry<V> {
    pub data: V,
    pub timestamp: DateTime<Utc>,
}

/// Keyed store for the last successful result of a fetch.
///
/// Entries are only written on success and are overwritten on every later success
/// (last write wins). Staleness is decided by the caller at read time through a
/// freshness window; the cache itself only drops entries when it has to make room
/// (least recently used first) or when they outlive the retention period.
pub struct ResultCache<V> {
    clock: Arc<dyn Clock>,
    capacity: usize,
    retention: TimeDelta,
    state: Mutex<CacheState<V>>,
}

struct CacheState<V> {
    entries: HashMap<String, Slot<V>>,
    tick: u64,
}

struct Slot<V> {
    entry: CacheEntry<V>,
    last_used: u64,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(clock: Arc<dyn Clock>, capacity: usize, retention: TimeDelta) -> Self {
        Self {
            clock,
            capacity: capacity.max(1),
            retention,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                tick: 0,
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry<V>> {
        let mut state = self.lock();
        let tick = state.next_tick();

        state.entries.get_mut(key).map(|slot| {
            slot.last_used = tick;
            slot.entry.clone()
        })
    }

    pub fn set(&self, key: impl Into<String>, data: V) {
        let key = key.into();
        let mut state = self.lock();
        // the last write to commit carries the newest timestamp
        let now = self.clock.now();

        if let Some(cutoff) = now.checked_sub_signed(self.retention) {
            state.sweep_older_than(cutoff);
        }

        if !state.entries.contains_key(&key) {
            while state.entries.len() >= self.capacity {
                if !state.evict_least_recently_used() {
                    break;
                }
            }
        }

        let tick = state.next_tick();
        state.entries.insert(
            key,
            Slot {
                entry: CacheEntry {
                    data,
                    timestamp: now,
                },
                last_used: tick,
            },
        );
    }

    pub fn is_fresh(&self, entry: &CacheEntry<V>, window: TimeDelta) -> bool {
        self.clock.now() - entry.timestamp < window
    }

    pub fn get_fresh(&self, key: &str, window: TimeDelta) -> Option<V> {
        self.get(key)
            .filter(|entry| self.is_fresh(entry, window))
            .map(|entry| entry.data)
    }

    /// Like [`ResultCache::get_fresh`], but a stale entry is removed on the spot.
    pub fn take_fresh(&self, key: &str, window: TimeDelta) -> Option<V> {
        let mut state = self.lock();
        let now = self.clock.now();
        let tick = state.next_tick();

        match state.entries.get_mut(key) {
            Some(slot) if now - slot.entry.timestamp < window => {
                slot.last_used = tick;
                Some(slot.entry.data.clone())
            }
            Some(_) => {
                debug!("take_fresh: expiring `{key}`");
                state.entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn remove(&self, key: &str) -> Option<CacheEntry<V>> {
        self.lock().entries.remove(key).map(|slot| slot.entry)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V> CacheState<V> {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn sweep_older_than(&mut self, cutoff: DateTime<Utc>) {
        let before = self.entries.len();
        self.entries.retain(|_, slot| slot.entry.timestamp >= cutoff);

        let swept = before - self.entries.len();
        if swept > 0 {
            debug!("sweep_older_than: dropped {swept} entries written before {cutoff}");
        }
    }

    fn evict_least_recently_used(&mut self) -> bool {
        let Some(key) = self
            .entries
            .iter()
            .min_by_key(|(_, slot)| slot.last_used)
            .map(|(key, _)| key.clone())
        else {
            return false;
        };

        debug!("evict_least_recently_used: evicting `{key}`");
        self.entries.remove(&key);

        true
    }
}
