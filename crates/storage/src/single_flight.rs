//! Per-key coalescing of concurrent computations.
//!
//! The first caller for a key becomes the leader and runs the computation;
//! callers arriving while it runs subscribe to its result instead of
//! starting their own. Results are not retained once delivered.

use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tile_common::{TileError, TileResult};
use tokio::sync::broadcast;
use tracing::debug;

type Sender<V> = broadcast::Sender<TileResult<V>>;

pub struct SingleFlight<K, V> {
    in_flight: DashMap<K, Sender<V>>,
    coalesced: AtomicU64,
}

enum Role<V> {
    Leader(Sender<V>),
    Follower(broadcast::Receiver<TileResult<V>>),
}

/// Releases the leader's slot even if the leader future is dropped midway.
struct FlightGuard<'a, K: Eq + Hash, V> {
    in_flight: &'a DashMap<K, Sender<V>>,
    key: Option<K>,
    tx: Sender<V>,
}

impl<'a, K: Eq + Hash, V> FlightGuard<'a, K, V> {
    fn release(&mut self) {
        if let Some(key) = self.key.take() {
            let tx = &self.tx;
            self.in_flight
                .remove_if(&key, |_, current| current.same_channel(tx));
        }
    }

    fn complete(mut self, result: TileResult<V>) {
        self.release();
        // No subscribers is fine
        let _ = self.tx.send(result);
    }
}

impl<'a, K: Eq + Hash, V> Drop for FlightGuard<'a, K, V> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            in_flight: DashMap::new(),
            coalesced: AtomicU64::new(0),
        }
    }

    /// Run `work` for `key`, or wait for the run already in progress.
    ///
    /// Every caller that overlaps one run observes that run's result. If the
    /// leader is cancelled, waiters receive an error rather than hanging.
    pub async fn run<F, Fut>(&self, key: K, work: F) -> TileResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = TileResult<V>>,
    {
        let role = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => Role::Follower(entry.get().subscribe()),
            Entry::Vacant(entry) => {
                let (tx, _) = broadcast::channel(1);
                entry.insert(tx.clone());
                Role::Leader(tx)
            }
        };

        match role {
            Role::Follower(mut rx) => {
                self.coalesced.fetch_add(1, Ordering::Relaxed);
                debug!(?key, "Joining in-flight computation");
                rx.recv().await.map_err(|_| {
                    TileError::Internal(format!("in-flight computation for {:?} was abandoned", key))
                })?
            }
            Role::Leader(tx) => {
                let guard = FlightGuard {
                    in_flight: &self.in_flight,
                    key: Some(key),
                    tx,
                };
                let result = work().await;
                guard.complete(result.clone());
                result
            }
        }
    }

    /// Number of callers that joined another caller's computation.
    pub fn coalesced(&self) -> u64 {
        self.coalesced.load(Ordering::Relaxed)
    }

    /// Number of keys currently being computed.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
