//! Containment-aware search cache with request coalescing.
//!
//! A [`RegionCache`] holds the results of recent searches for one grouping
//! key, each tagged with the region it covered. A tile is answered from the
//! cache when some live entry's region contains the whole tile.
//!
//! # Coalescing
//!
//! ```text
//! tile A ──claim──► Owner ──search(region R)──► complete ──put(R)──┐
//! tile B ──claim──► Coalesced (B ⊂ R) ─── waits on Watcher ◄───────┤
//! tile C ──watch──► Watcher (C ⊂ R)   ─── waits on Watcher ◄───────┘
//! ```
//!
//! The first request for a region becomes the owner of a search over a
//! padded region. Requests whose tile falls inside a region already being
//! searched register a [`Watcher`] instead of searching again. `put`
//! delivers to every watcher it satisfies after the cache lock is released,
//! so a woken watcher always finds the entry in the cache.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::coord::Bound;
use crate::search::FeatureList;

struct CacheEntry {
    bound: Bound,
    features: FeatureList,
    inserted: Instant,
}

struct PendingWatcher {
    bound: Bound,
    sender: oneshot::Sender<FeatureList>,
    /// In-flight search this watcher coalesced onto
    depends_on: Option<u64>,
}

#[derive(Default)]
struct Inner {
    /// Oldest first
    entries: VecDeque<CacheEntry>,
    watchers: HashMap<u64, PendingWatcher>,
    in_flight: HashMap<u64, Bound>,
    next_id: u64,
}

impl Inner {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Drops expired entries from the oldest end.
    fn prune(&mut self, now: Instant, ttl: Duration) -> usize {
        let mut pruned = 0;
        while let Some(front) = self.entries.front() {
            if now.saturating_duration_since(front.inserted) < ttl {
                break;
            }
            self.entries.pop_front();
            pruned += 1;
        }
        pruned
    }

    fn lookup(&self, bound: &Bound) -> Option<FeatureList> {
        self.entries
            .iter()
            .find(|entry| entry.bound.contains(bound))
            .map(|entry| Arc::clone(&entry.features))
    }

    /// Removes and returns the watchers `bound` satisfies.
    fn take_satisfied(&mut self, bound: &Bound) -> Vec<oneshot::Sender<FeatureList>> {
        let ids: Vec<u64> = self
            .watchers
            .iter()
            .filter(|(_, w)| bound.contains(&w.bound))
            .map(|(id, _)| *id)
            .collect();
        ids.into_iter()
            .filter_map(|id| self.watchers.remove(&id))
            .map(|w| w.sender)
            .collect()
    }

    fn take_dependents(&mut self, search_id: u64) -> Vec<oneshot::Sender<FeatureList>> {
        let ids: Vec<u64> = self
            .watchers
            .iter()
            .filter(|(_, w)| w.depends_on == Some(search_id))
            .map(|(id, _)| *id)
            .collect();
        ids.into_iter()
            .filter_map(|id| self.watchers.remove(&id))
            .map(|w| w.sender)
            .collect()
    }
}

/// Counters for monitoring cache effectiveness.
#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    puts: AtomicU64,
    expired: AtomicU64,
    searches: AtomicU64,
    coalesced: AtomicU64,
}

/// Snapshot of cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub puts: u64,
    /// Entries removed after their TTL passed
    pub expired: u64,
    /// Claims that became search owners
    pub searches: u64,
    /// Claims that waited on an existing search
    pub coalesced: u64,
}

impl CacheStats {
    /// Returns the hit ratio (0.0 to 1.0)
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Per-group cache of search results keyed by region containment.
pub struct RegionCache {
    inner: Mutex<Inner>,
    ttl: Duration,
    counters: Counters,
}

/// Outcome of [`RegionCache::claim`].
pub enum Claim {
    /// A search covering the tile is already running, or its result is
    /// already cached. Wait on the watcher; `None` means that search failed.
    Coalesced(Watcher),
    /// The caller must run the search and publish it through `search`.
    Owner {
        watcher: Watcher,
        search: InFlightSearch,
    },
}

impl RegionCache {
    /// Creates an empty cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            ttl,
            counters: Counters::default(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the features of the oldest live entry containing `bound`.
    ///
    /// Expired entries at the old end are pruned first. A miss is not an
    /// error.
    pub fn get(&self, bound: &Bound) -> Option<FeatureList> {
        let found = {
            let mut inner = self.inner.lock();
            self.prune(&mut inner);
            inner.lookup(bound)
        };

        match &found {
            Some(_) => self.counters.hits.fetch_add(1, Ordering::Relaxed),
            None => self.counters.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Stores the result of a search over `bound` and wakes every watcher it
    /// satisfies.
    pub fn put(&self, bound: Bound, features: FeatureList) {
        let satisfied = {
            let mut inner = self.inner.lock();
            self.insert(&mut inner, bound, &features)
        };
        Self::deliver(satisfied, &features);
    }

    /// Registers interest in an exact tile bound.
    ///
    /// If a live entry already contains the bound the watcher resolves
    /// immediately.
    pub fn watch(self: &Arc<Self>, bound: Bound) -> Watcher {
        let mut inner = self.inner.lock();
        self.prune(&mut inner);
        self.watch_locked(&mut inner, bound, None)
    }

    /// Coalescing entry point for a cache miss on `tile_bound`.
    ///
    /// If an in-flight search region already contains `tile_bound` the
    /// caller is coalesced onto it. Otherwise `search_bound` is registered as
    /// in flight and the caller becomes its owner.
    pub fn claim(self: &Arc<Self>, tile_bound: Bound, search_bound: Bound) -> Claim {
        let mut inner = self.inner.lock();
        self.prune(&mut inner);

        if inner.lookup(&tile_bound).is_some() {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Claim::Coalesced(self.watch_locked(&mut inner, tile_bound, None));
        }

        let running = inner
            .in_flight
            .iter()
            .find(|(_, region)| region.contains(&tile_bound))
            .map(|(id, _)| *id);

        if let Some(search_id) = running {
            self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
            trace!(search_id, "Coalescing onto in-flight search");
            return Claim::Coalesced(self.watch_locked(&mut inner, tile_bound, Some(search_id)));
        }

        let search_id = inner.next_id();
        inner.in_flight.insert(search_id, search_bound);
        self.counters.searches.fetch_add(1, Ordering::Relaxed);
        debug!(
            search_id,
            in_flight = inner.in_flight.len(),
            "New region search"
        );

        Claim::Owner {
            watcher: self.watch_locked(&mut inner, tile_bound, None),
            search: InFlightSearch {
                id: search_id,
                bound: search_bound,
                cache: Arc::clone(self),
                finished: false,
            },
        }
    }

    /// Number of live entries (expired ones not yet pruned included).
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending_watchers(&self) -> usize {
        self.inner.lock().watchers.len()
    }

    pub fn in_flight_searches(&self) -> usize {
        self.inner.lock().in_flight.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            puts: self.counters.puts.load(Ordering::Relaxed),
            expired: self.counters.expired.load(Ordering::Relaxed),
            searches: self.counters.searches.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
        }
    }

    fn prune(&self, inner: &mut Inner) {
        let pruned = inner.prune(Instant::now(), self.ttl);
        if pruned > 0 {
            self.counters
                .expired
                .fetch_add(pruned as u64, Ordering::Relaxed);
            trace!(pruned, "Pruned expired region entries");
        }
    }

    fn insert(
        &self,
        inner: &mut Inner,
        bound: Bound,
        features: &FeatureList,
    ) -> Vec<oneshot::Sender<FeatureList>> {
        inner.entries.push_back(CacheEntry {
            bound,
            features: Arc::clone(features),
            inserted: Instant::now(),
        });
        self.counters.puts.fetch_add(1, Ordering::Relaxed);
        let satisfied = inner.take_satisfied(&bound);
        debug!(
            features = features.len(),
            entries = inner.entries.len(),
            woken = satisfied.len(),
            "Cached region search"
        );
        satisfied
    }

    fn watch_locked(
        self: &Arc<Self>,
        inner: &mut Inner,
        bound: Bound,
        depends_on: Option<u64>,
    ) -> Watcher {
        let id = inner.next_id();
        let (sender, receiver) = oneshot::channel();

        match inner.lookup(&bound) {
            Some(features) => {
                let _ = sender.send(features);
            }
            None => {
                inner.watchers.insert(
                    id,
                    PendingWatcher {
                        bound,
                        sender,
                        depends_on,
                    },
                );
            }
        }

        Watcher {
            id,
            receiver: Some(receiver),
            cache: Arc::downgrade(self),
        }
    }

    fn deregister(&self, watcher_id: u64) {
        self.inner.lock().watchers.remove(&watcher_id);
    }

    /// Ends an in-flight search, publishing its result when there is one.
    ///
    /// Watchers that coalesced onto the search and were not satisfied by it
    /// are closed so they can retry.
    fn finish(&self, search_id: u64, result: Option<(Bound, FeatureList)>) {
        let (satisfied, closed) = {
            let mut inner = self.inner.lock();
            inner.in_flight.remove(&search_id);
            let satisfied = match &result {
                Some((bound, features)) => self.insert(&mut inner, *bound, features),
                None => Vec::new(),
            };
            (satisfied, inner.take_dependents(search_id))
        };

        if let Some((_, features)) = &result {
            Self::deliver(satisfied, features);
        }
        if !closed.is_empty() {
            debug!(
                search_id,
                closed = closed.len(),
                "Closing watchers of unfinished search"
            );
        }
        drop(closed);
    }

    fn deliver(senders: Vec<oneshot::Sender<FeatureList>>, features: &FeatureList) {
        for sender in senders {
            // Receiver may have given up already
            let _ = sender.send(Arc::clone(features));
        }
    }
}

/// One-shot delivery of the features covering a tile bound.
///
/// Dropping the watcher deregisters it from its cache.
pub struct Watcher {
    id: u64,
    receiver: Option<oneshot::Receiver<FeatureList>>,
    cache: Weak<RegionCache>,
}

impl Watcher {
    /// Waits for delivery.
    ///
    /// Returns `None` if the watcher was closed without delivery, or if it
    /// already returned a result. Cancel safe.
    pub async fn recv(&mut self) -> Option<FeatureList> {
        let receiver = self.receiver.as_mut()?;
        let delivered = receiver.await.ok();
        self.receiver = None;
        delivered
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        if let Some(cache) = self.cache.upgrade() {
            cache.deregister(self.id);
        }
    }
}

/// Ownership of an in-flight region search.
///
/// Publish the result with [`complete`](Self::complete). Dropping the handle
/// without completing withdraws the region and closes the watchers that
/// coalesced onto it.
pub struct InFlightSearch {
    id: u64,
    bound: Bound,
    cache: Arc<RegionCache>,
    finished: bool,
}

impl InFlightSearch {
    /// Region this search must cover.
    pub fn bound(&self) -> Bound {
        self.bound
    }

    /// Stores the result and wakes every watcher it satisfies.
    pub fn complete(mut self, features: FeatureList) {
        self.finished = true;
        self.cache.finish(self.id, Some((self.bound, features)));
    }
}

impl Drop for InFlightSearch {
    fn drop(&mut self) {
        if !self.finished {
            self.cache.finish(self.id, None);
        }
    }
}
