//! Per-request state handed explicitly down the executor's call chain

use crate::graphql::dataloader::{DataLoader, DataLoaderFactories, DataLoaderRegistry};
use crate::graphql::response::CancelSignal;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

/// Data of one request, visible to resolvers and middleware
pub struct RequestContext {
    pub request_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub started: Instant,
    /// `extensions` of the incoming request
    pub extensions: Map<String, Value>,
    deadline: Option<Instant>,
    cancel: Option<CancelSignal>,
    values: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
    loaders: DataLoaderRegistry,
}

impl RequestContext {
    pub fn new(extensions: Map<String, Value>) -> Self {
        Self::with_loaders(extensions, Arc::new(DataLoaderFactories::default()))
    }

    pub(crate) fn with_loaders(extensions: Map<String, Value>, factories: Arc<DataLoaderFactories>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            started_at: Utc::now(),
            started: Instant::now(),
            extensions,
            deadline: None,
            cancel: None,
            values: RwLock::new(HashMap::new()),
            loaders: DataLoaderRegistry::new(factories),
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_cancel(mut self, cancel: Option<CancelSignal>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Deadline to propagate into store calls
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel_signal(&self) -> Option<CancelSignal> {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelSignal::is_cancelled)
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Store a typed value for the rest of the request
    pub fn insert<T: Any + Send + Sync>(&self, value: T) {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(TypeId::of::<T>(), Arc::new(value));
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|v| v.downcast::<T>().ok())
    }

    /// The request's data loader called `name`
    pub fn loader<K, V>(&self, name: &str) -> Option<DataLoader<K, V>>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        self.loaders.get(name)
    }
}
