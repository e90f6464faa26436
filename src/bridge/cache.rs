//! Namespaced call cache
//!
//! Maps `(namespace, input expression)` to the output expression produced by
//! the first successful call. Pages re-run their scripts every frame, so
//! without this table every frame would re-issue the same requests.
//!
//! Each key owns a slot guarded by its own mutex. The miss path holds that
//! mutex across the outbound call, so concurrent evaluations of the same key
//! wait for the in-flight call instead of issuing a duplicate.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::{BridgeError, BridgeResult};
use crate::interpreter::Expression;

/// How long cached outputs stay valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CachePolicy {
    /// Entries never expire.
    #[default]
    Forever,
    /// Entries older than the duration are treated as misses.
    Ttl(Duration),
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that found no fresh entry.
    pub misses: u64,
}

#[derive(Debug)]
struct Entry {
    value: Expression,
    stored_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Slot {
    entry: Mutex<Option<Entry>>,
}

#[derive(Debug, Default)]
struct Table {
    slots: RwLock<HashMap<Expression, Arc<Slot>>>,
}

impl Table {
    fn existing_slot(&self, key: &Expression) -> Option<Arc<Slot>> {
        self.slots.read().get(key).cloned()
    }

    fn slot(&self, key: &Expression) -> Arc<Slot> {
        if let Some(slot) = self.existing_slot(key) {
            return slot;
        }
        self.slots.write().entry(key.clone()).or_default().clone()
    }

    /// Remove the slot for `key` if it is empty and nobody else holds it.
    fn prune(&self, key: &Expression) {
        let mut slots = self.slots.write();
        let vacant = slots
            .get(key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1 && slot.entry.lock().is_none());
        if vacant {
            slots.remove(key);
        }
    }

    /// Drop every empty slot that no caller currently holds.
    fn sweep(&self) {
        self.slots
            .write()
            .retain(|_, slot| Arc::strong_count(slot) > 1 || slot.entry.lock().is_some());
    }
}

/// Process-wide table of memoized service calls.
#[derive(Debug)]
pub struct CallCache {
    tables: HashMap<String, Table>,
    policy: CachePolicy,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CallCache {
    /// Create a cache with a fixed set of namespaces.
    pub fn new<I, S>(namespaces: I, policy: CachePolicy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tables = namespaces
            .into_iter()
            .map(|ns| (ns.into(), Table::default()))
            .collect();
        Self {
            tables,
            policy,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Expiry policy in effect.
    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Declared namespaces, sorted.
    pub fn namespaces(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Look up a cached output.
    pub fn get(&self, namespace: &str, key: &Expression) -> BridgeResult<Option<Expression>> {
        let table = self.table(namespace)?;
        let found = table.existing_slot(key).and_then(|slot| {
            let entry = slot.entry.lock();
            self.fresh_value(entry.as_ref())
        });
        self.record(found.is_some());
        Ok(found)
    }

    /// Insert or overwrite the output for `key`.
    pub fn put(&self, namespace: &str, key: Expression, value: Expression) -> BridgeResult<()> {
        let slot = self.table(namespace)?.slot(&key);
        *slot.entry.lock() = Some(Entry {
            value,
            stored_at: Utc::now(),
        });
        Ok(())
    }

    /// Return the cached output for `key`, or run `produce` and cache its
    /// success. Concurrent callers for the same key run `produce` at most once;
    /// `produce` must not re-enter the cache for the same key.
    pub fn get_or_try_insert_with<F>(
        &self,
        namespace: &str,
        key: &Expression,
        produce: F,
    ) -> BridgeResult<Expression>
    where
        F: FnOnce() -> BridgeResult<Expression>,
    {
        let table = self.table(namespace)?;
        let slot = table.slot(key);
        let mut entry = slot.entry.lock();
        if let Some(value) = self.fresh_value(entry.as_ref()) {
            self.record(true);
            tracing::debug!(namespace, key = %key, "call cache hit");
            return Ok(value);
        }
        self.record(false);

        match produce() {
            Ok(value) => {
                *entry = Some(Entry {
                    value: value.clone(),
                    stored_at: Utc::now(),
                });
                Ok(value)
            }
            Err(err) => {
                // Nothing is cached on failure; the next call retries.
                *entry = None;
                drop(entry);
                drop(slot);
                table.prune(key);
                Err(err)
            }
        }
    }

    /// Drop the entry for `key`. Returns whether a fresh entry was removed.
    pub fn invalidate(&self, namespace: &str, key: &Expression) -> BridgeResult<bool> {
        let table = self.table(namespace)?;
        let slot = table.existing_slot(key);
        let taken = slot.as_ref().and_then(|slot| slot.entry.lock().take());
        drop(slot);
        table.prune(key);
        Ok(taken.is_some_and(|entry| self.is_fresh(&entry)))
    }

    /// Drop every entry in a namespace.
    ///
    /// Entries are reset in place, so a call already in flight finishes before
    /// its slot is emptied and later callers for that key still wait on it.
    pub fn clear(&self, namespace: &str) -> BridgeResult<()> {
        let table = self.table(namespace)?;
        for slot in table.slots.read().values() {
            *slot.entry.lock() = None;
        }
        table.sweep();
        Ok(())
    }

    /// Number of fresh entries in a namespace.
    pub fn len(&self, namespace: &str) -> BridgeResult<usize> {
        let table = self.table(namespace)?;
        let slots = table.slots.read();
        Ok(slots
            .values()
            .filter(|slot| self.fresh_value(slot.entry.lock().as_ref()).is_some())
            .count())
    }

    /// Hit/miss counters since construction.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn table(&self, namespace: &str) -> BridgeResult<&Table> {
        self.tables
            .get(namespace)
            .ok_or_else(|| BridgeError::UndeclaredNamespace(namespace.to_string()))
    }

    fn fresh_value(&self, entry: Option<&Entry>) -> Option<Expression> {
        entry
            .filter(|entry| self.is_fresh(entry))
            .map(|entry| entry.value.clone())
    }

    fn is_fresh(&self, entry: &Entry) -> bool {
        match self.policy {
            CachePolicy::Forever => true,
            // A stored_at in the future (clock skew) counts as fresh.
            CachePolicy::Ttl(ttl) => (Utc::now() - entry.stored_at)
                .to_std()
                .map(|age| age < ttl)
                .unwrap_or(true),
        }
    }

    fn record(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceError;
    use std::sync::atomic::AtomicUsize;

    const NS: &str = "dt:identity";

    fn cache() -> CallCache {
        CallCache::new([NS], CachePolicy::Forever)
    }

    #[test]
    fn put_then_get_uses_structural_equality() {
        let cache = cache();
        cache
            .put(NS, Expression::string("abc123"), Expression::string("R"))
            .expect("put");
        let found = cache.get(NS, &Expression::string("abc123")).expect("get");
        assert_eq!(found, Some(Expression::string("R")));
        assert_eq!(cache.get(NS, &Expression::string("other")).expect("get"), None);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn put_overwrites() {
        let cache = cache();
        let key = Expression::string("k");
        cache.put(NS, key.clone(), Expression::string("a")).expect("put");
        cache.put(NS, key.clone(), Expression::string("b")).expect("put");
        assert_eq!(cache.get(NS, &key).expect("get"), Some(Expression::string("b")));
        assert_eq!(cache.len(NS).expect("len"), 1);
    }

    #[test]
    fn undeclared_namespace_is_an_error() {
        let cache = cache();
        let key = Expression::string("k");
        assert!(matches!(
            cache.get("ps:results", &key),
            Err(BridgeError::UndeclaredNamespace(ns)) if ns == "ps:results"
        ));
        assert!(cache.put("nope", key.clone(), key.clone()).is_err());
        assert!(cache.get_or_try_insert_with("nope", &key, || Ok(key.clone())).is_err());
    }

    #[test]
    fn producer_runs_once_and_failures_are_not_cached() {
        let cache = cache();
        let key = Expression::string("k");
        let calls = AtomicUsize::new(0);

        let failed = cache.get_or_try_insert_with(NS, &key, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::Unavailable("down".into()).into())
        });
        assert!(matches!(failed, Err(BridgeError::Service(_))));
        assert_eq!(cache.len(NS).expect("len"), 0);

        for _ in 0..3 {
            let value = cache
                .get_or_try_insert_with(NS, &key, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Expression::string("v"))
                })
                .expect("value");
            assert_eq!(value, Expression::string("v"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_misses_share_one_call() {
        let cache = Arc::new(cache());
        let calls = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                std::thread::spawn(move || {
                    cache
                        .get_or_try_insert_with(NS, &Expression::string("shared"), || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(20));
                            Ok(Expression::string("v"))
                        })
                        .expect("value")
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().expect("join"), Expression::string("v"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_waits_for_in_flight_call() {
        let cache = Arc::new(cache());
        let running = Arc::new(AtomicUsize::new(0));
        let max_running = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));

        let request = |cache: Arc<CallCache>,
                       running: Arc<AtomicUsize>,
                       max_running: Arc<AtomicUsize>,
                       calls: Arc<AtomicUsize>| {
            std::thread::spawn(move || {
                cache
                    .get_or_try_insert_with(NS, &Expression::string("k"), || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        max_running.fetch_max(now, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(200));
                        running.fetch_sub(1, Ordering::SeqCst);
                        Ok(Expression::string("v"))
                    })
                    .expect("value")
            })
        };

        let first = request(cache.clone(), running.clone(), max_running.clone(), calls.clone());
        std::thread::sleep(Duration::from_millis(50));
        cache.clear(NS).expect("clear");
        let second = request(cache.clone(), running.clone(), max_running.clone(), calls.clone());

        assert_eq!(first.join().expect("join"), Expression::string("v"));
        assert_eq!(second.join().expect("join"), Expression::string("v"));
        assert_eq!(max_running.load(Ordering::SeqCst), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(NS).expect("len"), 1);
    }

    #[test]
    fn failed_and_invalidated_keys_leave_no_slots() {
        let cache = cache();
        let slot_count = |cache: &CallCache| cache.tables[NS].slots.read().len();

        for n in 0..5 {
            let key = Expression::Atom(crate::interpreter::Primitive::Integer(n));
            let result = cache.get_or_try_insert_with(NS, &key, || {
                Err(BridgeError::TypeMismatch {
                    expected: "string",
                    found: "integer",
                })
            });
            assert!(result.is_err());
        }
        assert_eq!(slot_count(&cache), 0);

        let key = Expression::string("k");
        cache.put(NS, key.clone(), Expression::string("v")).expect("put");
        assert_eq!(slot_count(&cache), 1);
        assert!(cache.invalidate(NS, &key).expect("invalidate"));
        assert_eq!(slot_count(&cache), 0);

        cache.put(NS, key.clone(), Expression::string("v")).expect("put");
        cache.clear(NS).expect("clear");
        assert_eq!(slot_count(&cache), 0);
    }

    #[test]
    fn ttl_serves_hits_inside_window_and_refetches_after() {
        let cache = CallCache::new([NS], CachePolicy::Ttl(Duration::from_millis(300)));
        let key = Expression::string("abc123");
        let calls = AtomicUsize::new(0);
        let fetch = || {
            cache.get_or_try_insert_with(NS, &key, || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Expression::string("R"))
            })
        };

        assert_eq!(fetch().expect("first"), Expression::string("R"));
        assert_eq!(fetch().expect("inside window"), Expression::string("R"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(NS).expect("len"), 1);

        std::thread::sleep(Duration::from_millis(400));
        assert_eq!(cache.len(NS).expect("len"), 0);
        assert_eq!(fetch().expect("after window"), Expression::string("R"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 2 });
    }

    #[test]
    fn zero_ttl_always_misses() {
        let cache = CallCache::new([NS], CachePolicy::Ttl(Duration::ZERO));
        let key = Expression::string("k");
        cache.put(NS, key.clone(), Expression::string("v")).expect("put");
        assert_eq!(cache.get(NS, &key).expect("get"), None);
        assert_eq!(cache.len(NS).expect("len"), 0);
    }

    #[test]
    fn invalidate_and_clear_force_new_calls() {
        let cache = CallCache::new([NS, "ps:results"], CachePolicy::Forever);
        let key = Expression::string("k");
        cache.put(NS, key.clone(), Expression::string("v")).expect("put");
        assert!(cache.invalidate(NS, &key).expect("invalidate"));
        assert!(!cache.invalidate(NS, &key).expect("invalidate"));

        cache.put(NS, key.clone(), Expression::string("v")).expect("put");
        cache.clear(NS).expect("clear");
        assert_eq!(cache.get(NS, &key).expect("get"), None);
        assert_eq!(cache.namespaces(), vec![NS, "ps:results"]);
    }
}
