//! Request-scoped batching and caching of keyed loads
//!
//! Callers register interest in a key and await a future. A batch is flushed
//! when it reaches `max_batch` keys or when `delay` elapses after its first
//! key, whichever comes first. Each batch runs exactly one batch call, and a
//! key already being loaded by a dispatched batch waits for that batch.

use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

/// Failure of one key of a batch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct LoadError(pub String);

impl LoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Loads many keys in one call
///
/// The returned vector must have one entry per key, in key order.
#[async_trait]
pub trait BatchLoad<K, V>: Send + Sync + 'static {
    async fn load(&self, keys: &[K]) -> Vec<Result<V, LoadError>>;
}

#[derive(Debug, Clone, Copy)]
pub struct DataLoaderConfig {
    pub max_batch: usize,
    pub delay: Duration,
}

impl Default for DataLoaderConfig {
    fn default() -> Self {
        Self {
            max_batch: 100,
            delay: Duration::from_millis(1),
        }
    }
}

type Waiter<V> = oneshot::Sender<Result<V, LoadError>>;

struct Batch<K, V> {
    id: u64,
    keys: Vec<K>,
    waiters: HashMap<K, Vec<Waiter<V>>>,
}

struct State<K, V> {
    cache: HashMap<K, V>,
    pending: Option<Batch<K, V>>,
    /// Keys of dispatched batches, with the waiters that arrived after dispatch
    in_flight: HashMap<K, Vec<Waiter<V>>>,
}

impl<K: Eq + Hash + Clone, V> State<K, V> {
    /// Take the pending batch for dispatch, marking its keys in flight
    fn take_pending(&mut self) -> Option<Batch<K, V>> {
        let batch = self.pending.take()?;
        for key in &batch.keys {
            self.in_flight.entry(key.clone()).or_default();
        }
        Some(batch)
    }
}

/// Releases the in-flight keys of a batch that never settled
///
/// Dropping the late waiters wakes them with an error instead of leaving them
/// parked forever.
struct InFlight<'a, K: Eq + Hash, V> {
    state: &'a Mutex<State<K, V>>,
    keys: &'a [K],
    settled: bool,
}

impl<K: Eq + Hash, V> Drop for InFlight<'_, K, V> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for key in self.keys {
            state.in_flight.remove(key);
        }
    }
}

struct Inner<K, V> {
    batch_fn: Arc<dyn BatchLoad<K, V>>,
    config: DataLoaderConfig,
    next_batch: AtomicU64,
    state: Mutex<State<K, V>>,
}

/// Batching, deduplicating, caching loader
pub struct DataLoader<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for DataLoader<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V> DataLoader<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(batch_fn: Arc<dyn BatchLoad<K, V>>, config: DataLoaderConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                batch_fn,
                config: DataLoaderConfig {
                    max_batch: config.max_batch.max(1),
                    delay: config.delay,
                },
                next_batch: AtomicU64::new(0),
                state: Mutex::new(State {
                    cache: HashMap::new(),
                    pending: None,
                    in_flight: HashMap::new(),
                }),
            }),
        }
    }

    /// Load one key, joining the pending batch
    pub async fn load(&self, key: K) -> Result<V, LoadError> {
        let (tx, rx) = oneshot::channel();
        let mut start_timer = None;
        let mut flush_now = None;

        {
            let mut state = self.inner.lock();
            if let Some(value) = state.cache.get(&key) {
                return Ok(value.clone());
            }
            if let Some(waiters) = state.in_flight.get_mut(&key) {
                waiters.push(tx);
            } else {
                if state.pending.is_none() {
                    let id = self.inner.next_batch.fetch_add(1, Ordering::Relaxed);
                    state.pending = Some(Batch {
                        id,
                        keys: Vec::new(),
                        waiters: HashMap::new(),
                    });
                    start_timer = Some(id);
                }

                if let Some(batch) = state.pending.as_mut() {
                    match batch.waiters.get_mut(&key) {
                        Some(waiters) => waiters.push(tx),
                        None => {
                            batch.keys.push(key.clone());
                            batch.waiters.insert(key, vec![tx]);
                        }
                    }
                    if batch.keys.len() >= self.inner.config.max_batch {
                        flush_now = state.take_pending();
                        start_timer = None;
                    }
                }
            }
        }

        if let Some(id) = start_timer {
            let inner = self.inner.clone();
            tokio::spawn(async move {
                tokio::time::sleep(inner.config.delay).await;
                let batch = {
                    let mut state = inner.lock();
                    let due = state.pending.as_ref().is_some_and(|batch| batch.id == id);
                    if due { state.take_pending() } else { None }
                };
                if let Some(batch) = batch {
                    inner.dispatch(batch).await;
                }
            });
        }
        if let Some(batch) = flush_now {
            // Spawned so a cancelled caller cannot strand the other waiters.
            let inner = self.inner.clone();
            tokio::spawn(async move { inner.dispatch(batch).await });
        }

        rx.await
            .unwrap_or_else(|_| Err(LoadError::new("data loader batch was dropped")))
    }

    /// Load several keys; results follow key order
    pub async fn load_many(&self, keys: Vec<K>) -> Vec<Result<V, LoadError>> {
        futures::future::join_all(keys.into_iter().map(|key| self.load(key))).await
    }

    /// Seed the cache without a batch call
    pub fn prime(&self, key: K, value: V) {
        self.inner.lock().cache.entry(key).or_insert(value);
    }

    pub fn clear(&self, key: &K) {
        self.inner.lock().cache.remove(key);
    }

    pub fn clear_all(&self) {
        self.inner.lock().cache.clear();
    }
}

impl<K, V> Inner<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn lock(&self) -> std::sync::MutexGuard<'_, State<K, V>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn dispatch(&self, mut batch: Batch<K, V>) {
        tracing::trace!(batch = batch.id, keys = batch.keys.len(), "dispatching data loader batch");
        let mut in_flight = InFlight {
            state: &self.state,
            keys: &batch.keys,
            settled: false,
        };

        let results = self.batch_fn.load(&batch.keys).await;
        let results = if results.len() == batch.keys.len() {
            results
        } else {
            let message = format!(
                "batch function returned {} results for {} keys",
                results.len(),
                batch.keys.len()
            );
            batch.keys.iter().map(|_| Err(LoadError::new(message.clone()))).collect()
        };

        let mut late = HashMap::new();
        {
            let mut state = self.lock();
            for (key, result) in batch.keys.iter().zip(&results) {
                if let Ok(value) = result {
                    state.cache.insert(key.clone(), value.clone());
                }
                if let Some(waiters) = state.in_flight.remove(key) {
                    late.insert(key.clone(), waiters);
                }
            }
            in_flight.settled = true;
        }

        for (key, result) in batch.keys.iter().zip(results) {
            let early = batch.waiters.remove(key).unwrap_or_default();
            for waiter in early.into_iter().chain(late.remove(key).unwrap_or_default()) {
                let _ = waiter.send(result.clone());
            }
        }
    }
}

type LoaderFactory = Arc<dyn Fn() -> Arc<dyn Any + Send + Sync> + Send + Sync>;

/// Loader factories registered before serving, shared by all requests
#[derive(Clone, Default)]
pub struct DataLoaderFactories {
    factories: HashMap<String, LoaderFactory>,
}

impl DataLoaderFactories {
    /// Register a loader that every request instantiates on first use
    pub fn register<K, V>(&mut self, name: &str, batch_fn: Arc<dyn BatchLoad<K, V>>, config: DataLoaderConfig)
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let factory: LoaderFactory = Arc::new(move || {
            Arc::new(DataLoader::new(batch_fn.clone(), config)) as Arc<dyn Any + Send + Sync>
        });
        self.factories.insert(name.to_string(), factory);
    }
}

/// Loaders of one request
pub struct DataLoaderRegistry {
    factories: Arc<DataLoaderFactories>,
    instances: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl DataLoaderRegistry {
    pub fn new(factories: Arc<DataLoaderFactories>) -> Self {
        Self {
            factories,
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// The request's loader called `name`, if one with these key/value types exists
    pub fn get<K, V>(&self, name: &str) -> Option<DataLoader<K, V>>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let mut instances = self.instances.lock().unwrap_or_else(|e| e.into_inner());
        let instance = match instances.get(name) {
            Some(instance) => instance.clone(),
            None => {
                let factory = self.factories.factories.get(name)?;
                let instance = factory();
                instances.insert(name.to_string(), instance.clone());
                instance
            }
        };
        instance
            .downcast::<DataLoader<K, V>>()
            .ok()
            .map(|loader| (*loader).clone())
    }
}
