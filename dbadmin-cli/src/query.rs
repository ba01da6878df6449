//! Keyed, de-duplicated fetch cache shared by a panel's list fetchers.
//!
//! A [`QueryKey`] is a pure function of the resource and the active filter
//! values. While a request for a key is in flight, later callers for the same
//! key await that request instead of issuing another. Invalidation marks a
//! resource's entries stale and bumps their generation, so a response from a
//! request started before the invalidation is never cached as fresh.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use dbadmin_common::ApiError;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::{segment, unwrap_envelope, Transport};

/// Default revalidation window
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(30);

/// Fetches restarted because an invalidation landed mid-flight
const MAX_REVALIDATIONS: usize = 3;

/// Readable resources exposed by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    Backups,
    Migrations,
    Tenants,
    AuditLogs,
    AuditStats,
    DatabaseTables,
    TableData,
    SystemStats,
}

impl Resource {
    pub fn name(&self) -> &'static str {
        match self {
            Resource::Backups => "backups",
            Resource::Migrations => "migrations",
            Resource::Tenants => "tenants",
            Resource::AuditLogs => "audit-logs",
            Resource::AuditStats => "audit-stats",
            Resource::DatabaseTables => "db-tables",
            Resource::TableData => "db-table-data",
            Resource::SystemStats => "dbadmin-stats",
        }
    }

    fn path(&self) -> &'static str {
        match self {
            Resource::Backups => "/backups",
            Resource::Migrations => "/migrations/status",
            Resource::Tenants => "/tenants",
            Resource::AuditLogs => "/audit-logs",
            Resource::AuditStats => "/audit-logs/stats",
            Resource::DatabaseTables | Resource::TableData => "/database/tables",
            Resource::SystemStats => "/stats",
        }
    }
}

/// Cache key: resource, optional path segment and non-empty filter values
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    resource: Resource,
    segment: Option<String>,
    params: BTreeMap<&'static str, String>,
}

impl QueryKey {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            segment: None,
            params: BTreeMap::new(),
        }
    }

    /// Key for one item below the resource, e.g. a table by name
    pub fn item(resource: Resource, id: &str) -> Self {
        Self {
            segment: Some(id.to_string()),
            ..Self::new(resource)
        }
    }

    /// Add a filter value; blank values are not part of the key
    pub fn param(mut self, name: &'static str, value: impl AsRef<str>) -> Self {
        let value = value.as_ref().trim();
        if !value.is_empty() {
            self.params.insert(name, value.to_string());
        }
        self
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    /// Request path, relative to the API base path
    pub fn path(&self) -> String {
        let mut path = self.resource.path().to_string();
        if let Some(id) = &self.segment {
            path.push('/');
            path.push_str(&segment(id));
        }

        if !self.params.is_empty() {
            let query: Vec<String> = self
                .params
                .iter()
                .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                .collect();
            path.push('?');
            path.push_str(&query.join("&"));
        }

        path
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}", self.resource.name())?;
        if let Some(id) = &self.segment {
            write!(f, ", {}", id)?;
        }
        for (k, v) in &self.params {
            write!(f, ", {}={}", k, v)?;
        }
        write!(f, "]")
    }
}

type SharedFetch = Shared<BoxFuture<'static, Result<Value, ApiError>>>;

#[derive(Default)]
struct Entry {
    value: Option<Value>,
    fetched_at: Option<Instant>,
    stale: bool,
    generation: u64,
    in_flight: Option<InFlight>,
}

struct InFlight {
    request_id: u64,
    generation: u64,
    fetch: SharedFetch,
}

impl Entry {
    fn fresh_value(&self, stale_time: Duration) -> Option<&Value> {
        match (&self.value, self.fetched_at) {
            (Some(value), Some(at)) if !self.stale && at.elapsed() < stale_time => Some(value),
            _ => None,
        }
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<QueryKey, Entry>,
    next_request: u64,
}

pub struct QueryCache {
    transport: Arc<dyn Transport>,
    stale_time: Duration,
    inner: Mutex<Inner>,
}

impl QueryCache {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_stale_time(transport, DEFAULT_STALE_TIME)
    }

    pub fn with_stale_time(transport: Arc<dyn Transport>, stale_time: Duration) -> Self {
        Self {
            transport,
            stale_time,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch and decode the `data` payload for `key`
    pub async fn fetch<T: DeserializeOwned>(&self, key: &QueryKey) -> Result<T, ApiError> {
        let value = self.fetch_value(key).await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Fetch the raw `data` payload for `key`, honouring freshness and
    /// joining any request already in flight for the same key.
    pub async fn fetch_value(&self, key: &QueryKey) -> Result<Value, ApiError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let (fetch, request_id, generation) = match self.lookup(key) {
                Lookup::Fresh(value) => {
                    debug!(key = %key, "query cache hit");
                    return Ok(value);
                }
                Lookup::Await {
                    fetch,
                    request_id,
                    generation,
                } => (fetch, request_id, generation),
            };

            let result = fetch.await;

            let superseded = {
                let mut inner = self.lock();
                match inner.entries.get_mut(key) {
                    Some(entry) => {
                        if entry
                            .in_flight
                            .as_ref()
                            .is_some_and(|f| f.request_id == request_id)
                        {
                            entry.in_flight = None;
                        }
                        if entry.generation == generation {
                            if let Ok(value) = &result {
                                entry.value = Some(value.clone());
                                entry.fetched_at = Some(Instant::now());
                                entry.stale = false;
                            }
                            false
                        } else {
                            true
                        }
                    }
                    None => false,
                }
            };

            if let Err(e) = &result {
                warn!(key = %key, error = %e, "query failed");
            }

            if superseded && attempts < MAX_REVALIDATIONS {
                debug!(key = %key, "response superseded by invalidation, refetching");
                continue;
            }

            return result;
        }
    }

    fn lookup(&self, key: &QueryKey) -> Lookup {
        let mut inner = self.lock();
        let request_id = inner.next_request;
        let entry = inner.entries.entry(key.clone()).or_default();

        if let Some(value) = entry.fresh_value(self.stale_time) {
            return Lookup::Fresh(value.clone());
        }

        if let Some(in_flight) = &entry.in_flight {
            if in_flight.generation == entry.generation {
                debug!(key = %key, "joining in-flight query");
                return Lookup::Await {
                    fetch: in_flight.fetch.clone(),
                    request_id: in_flight.request_id,
                    generation: in_flight.generation,
                };
            }
        }

        debug!(key = %key, "query cache miss");
        let transport = Arc::clone(&self.transport);
        let path = key.path();
        let fetch = async move { transport.get_json(&path).await.and_then(unwrap_envelope) }
            .boxed()
            .shared();

        let generation = entry.generation;
        entry.in_flight = Some(InFlight {
            request_id,
            generation,
            fetch: fetch.clone(),
        });
        inner.next_request += 1;

        Lookup::Await {
            fetch,
            request_id,
            generation,
        }
    }

    /// Last successful payload for `key`, even if stale
    pub fn peek(&self, key: &QueryKey) -> Option<Value> {
        self.lock()
            .entries
            .get(key)
            .and_then(|entry| entry.value.clone())
    }

    pub fn peek_as<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        self.peek(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        self.lock()
            .entries
            .get(key)
            .is_some_and(|entry| entry.fresh_value(self.stale_time).is_some())
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.lock()
            .entries
            .get(key)
            .is_some_and(|entry| entry.in_flight.is_some())
    }

    /// Mark every key of `resource` stale. Returns the number of keys touched.
    pub fn invalidate(&self, resource: Resource) -> usize {
        let mut inner = self.lock();
        let mut touched = 0;
        for (key, entry) in inner.entries.iter_mut() {
            if key.resource == resource {
                entry.stale = true;
                entry.generation += 1;
                entry.in_flight = None;
                touched += 1;
            }
        }
        debug!(resource = resource.name(), touched, "invalidated queries");
        touched
    }
}

enum Lookup {
    Fresh(Value),
    Await {
        fetch: SharedFetch,
        request_id: u64,
        generation: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use serde_json::json;

    #[test]
    fn test_key_is_pure_function_of_filters() {
        let a = QueryKey::new(Resource::AuditLogs)
            .param("search", "alice")
            .param("status", "failure")
            .param("action", "");
        let b = QueryKey::new(Resource::AuditLogs)
            .param("status", "failure")
            .param("search", " alice ");

        assert_eq!(a, b);
        assert_eq!(a.path(), b.path());
        assert_eq!(a.path(), "/audit-logs?search=alice&status=failure");
    }

    #[test]
    fn test_item_key_encodes_segment() {
        let key = QueryKey::item(Resource::TableData, "public.user accounts");
        assert_eq!(key.path(), "/database/tables/public.user%20accounts");
        assert_eq!(key.to_string(), "[db-table-data, public.user accounts]");
    }

    #[tokio::test]
    async fn test_identical_keys_share_one_request() {
        let backend = FakeBackend::new();
        backend.hold_requests();
        let cache = QueryCache::new(backend.transport());
        let key = QueryKey::new(Resource::Tenants);

        let first = cache.fetch_value(&key);
        let second = cache.fetch_value(&key);
        let release = async {
            tokio::task::yield_now().await;
            backend.release_requests();
        };

        let (a, b, _) = tokio::join!(first, second, release);
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(backend.request_count("/tenants"), 1);
    }

    #[tokio::test]
    async fn test_fresh_value_served_without_request() {
        let backend = FakeBackend::new();
        let cache = QueryCache::new(backend.transport());
        let key = QueryKey::new(Resource::Backups);

        cache.fetch_value(&key).await.unwrap();
        cache.fetch_value(&key).await.unwrap();

        assert_eq!(backend.request_count("/backups"), 1);
        assert!(cache.is_fresh(&key));
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch_but_keeps_stale_value() {
        let backend = FakeBackend::new();
        let cache = QueryCache::new(backend.transport());
        let key = QueryKey::new(Resource::Backups);

        cache.fetch_value(&key).await.unwrap();
        assert_eq!(cache.invalidate(Resource::Backups), 1);
        assert!(!cache.is_fresh(&key));
        assert!(cache.peek(&key).is_some());

        cache.fetch_value(&key).await.unwrap();
        assert_eq!(backend.request_count("/backups"), 2);
    }

    #[tokio::test]
    async fn test_invalidation_is_scoped_to_resource() {
        let backend = FakeBackend::new();
        let cache = QueryCache::new(backend.transport());
        let backups = QueryKey::new(Resource::Backups);
        let tenants = QueryKey::new(Resource::Tenants);

        cache.fetch_value(&backups).await.unwrap();
        cache.fetch_value(&tenants).await.unwrap();
        cache.invalidate(Resource::Backups);

        assert!(!cache.is_fresh(&backups));
        assert!(cache.is_fresh(&tenants));
    }

    #[tokio::test]
    async fn test_response_started_before_invalidation_is_not_cached() {
        let backend = FakeBackend::new();
        backend.hold_requests();
        let cache = QueryCache::new(backend.transport());
        let key = QueryKey::new(Resource::Backups);

        let fetch = cache.fetch_value(&key);
        let interfere = async {
            tokio::task::yield_now().await;
            backend.remove_backup("42");
            cache.invalidate(Resource::Backups);
            backend.release_requests();
        };

        let (result, _) = tokio::join!(fetch, interfere);
        let rows = result.unwrap();
        assert!(rows
            .as_array()
            .unwrap()
            .iter()
            .all(|row| row["id"] != json!("42")));
        assert_eq!(backend.request_count("/backups"), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_value() {
        let backend = FakeBackend::new();
        let cache = QueryCache::new(backend.transport());
        let key = QueryKey::new(Resource::Tenants);

        cache.fetch_value(&key).await.unwrap();
        cache.invalidate(Resource::Tenants);
        backend.fail_next(503);

        let err = cache.fetch_value(&key).await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert!(cache.peek(&key).is_some());
    }

    #[tokio::test]
    async fn test_zero_stale_time_always_revalidates() {
        let backend = FakeBackend::new();
        let cache = QueryCache::with_stale_time(backend.transport(), Duration::ZERO);
        let key = QueryKey::new(Resource::SystemStats);

        cache.fetch_value(&key).await.unwrap();
        cache.fetch_value(&key).await.unwrap();
        assert_eq!(backend.request_count("/stats"), 2);
    }
}
