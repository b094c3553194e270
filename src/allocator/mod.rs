//! Instance id allocation
//!
//! Each replica of a service claims the smallest free integer slot under a
//! shared registration path. Listing and picking a candidate is not atomic;
//! only the final create-if-absent is, so a replica that loses the race for
//! a candidate re-reads the directory and tries again within a bounded budget.
//!
//! - `config` - Retry budget, deadlines and backoff policy
//! - `backoff` - Jittered delay between attempts

mod backoff;
mod config;

use std::thread;

use tracing::{error, info, instrument, warn};

pub use config::{AllocatorConfig, AllocatorConfigBuilder, AllocatorConfigError};

use crate::error::AllocError;
use crate::identity::{slot_key, IdentityKey};
use crate::store::{CoordinationStore, Node, RequestOptions, StoreError};

use backoff::jittered_delay;

/// Allocates small integer ids to replicas sharing a registration path
#[derive(Debug)]
pub struct InstanceIdAllocator<S> {
    store: S,
    config: AllocatorConfig,
}

impl<S: CoordinationStore> InstanceIdAllocator<S> {
    /// Create with default configuration
    pub fn new(store: S) -> Self {
        Self::with_config(store, AllocatorConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(store: S, config: AllocatorConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Claim an instance id for `identity` under `path`.
    ///
    /// Returns the id already held by `identity` if one exists, otherwise the
    /// smallest id not present under `path`. Lost races and transient store
    /// failures are retried up to the configured budget; a missing or
    /// non-directory path fails immediately.
    #[instrument(level = "debug", skip(self, identity), fields(identity = %identity))]
    pub fn allocate(&self, path: &str, identity: &IdentityKey) -> Result<u32, AllocError> {
        let attempts = self.config.max_retries();
        let mut attempt = 0;

        loop {
            match self.try_allocate(path, identity) {
                Ok(id) => return Ok(id),
                Err(err) if !err.is_retryable() => {
                    error!(path, error = %err, "instance id allocation aborted");
                    return Err(err);
                }
                Err(err) => {
                    attempt += 1;
                    warn!(path, attempt, attempts, error = %err, "instance id attempt failed");
                    if attempt >= attempts {
                        error!(path, attempts, "instance id retry budget exhausted");
                        return Err(AllocError::RetryBudgetExhausted {
                            path: path.to_string(),
                            attempts,
                            last: Box::new(err),
                        });
                    }
                    if let Some(base) = self.config.retry_backoff() {
                        thread::sleep(jittered_delay(base, attempt - 1));
                    }
                }
            }
        }
    }

    /// One scan-and-create pass
    fn try_allocate(&self, path: &str, identity: &IdentityKey) -> Result<u32, AllocError> {
        let opts = RequestOptions {
            timeout: self.config.request_timeout(),
        };
        let dir = self.list(path, &opts)?;

        let mut ids = Vec::with_capacity(dir.nodes.len());
        for child in &dir.nodes {
            let Some(id) = dir.child_suffix(child).and_then(|s| s.parse::<u32>().ok()) else {
                error!(path, key = %child.key, "malformed instance id slot");
                continue;
            };
            if !child.dir && child.value == identity.as_str() {
                info!(path, id, "reusing instance id");
                return Ok(id);
            }
            ids.push(id);
        }

        let candidate = smallest_free_id(&mut ids);
        let key = slot_key(&dir.key, candidate);
        match self.store.create(&key, identity.as_str(), &opts) {
            Ok(_) => {
                info!(path, id = candidate, key = %key, "claimed instance id");
                Ok(candidate)
            }
            Err(StoreError::AlreadyExists { .. }) => Err(AllocError::RaceLost {
                path: path.to_string(),
                id: candidate,
            }),
            Err(err) => Err(classify(path, err)),
        }
    }

    /// Fetch the registration directory, checking its shape
    fn list(&self, path: &str, opts: &RequestOptions) -> Result<Node, AllocError> {
        if path.trim_matches('/').is_empty() {
            return Err(AllocError::NodeShape {
                path: path.to_string(),
                reason: "registration path is empty".to_string(),
            });
        }

        let node = match self.store.get(path, opts) {
            Err(StoreError::NotFound { .. }) if self.config.create_missing_path() => {
                info!(path, "creating registration directory");
                self.store
                    .create_dir(path, opts)
                    .map_err(|err| classify(path, err))?
            }
            result => result.map_err(|err| classify(path, err))?,
        };

        if !node.dir {
            return Err(AllocError::NodeShape {
                path: path.to_string(),
                reason: format!("{} is a leaf", node.key),
            });
        }
        Ok(node)
    }
}

/// Retryable store failures become `CoordinationUnavailable`; the rest mean
/// the registration path has the wrong shape
fn classify(path: &str, err: StoreError) -> AllocError {
    if err.is_retryable() {
        return AllocError::CoordinationUnavailable {
            path: path.to_string(),
            source: err,
        };
    }
    let reason = match err {
        StoreError::NotFound { key } => format!("{key} does not exist"),
        StoreError::NotADirectory { key } => format!("{key} is not a directory"),
        other => other.to_string(),
    };
    AllocError::NodeShape {
        path: path.to_string(),
        reason,
    }
}

/// Smallest non-negative integer absent from `ids`. Sorts `ids` in place.
pub fn smallest_free_id(ids: &mut [u32]) -> u32 {
    ids.sort_unstable();
    let mut free = 0;
    for &id in ids.iter() {
        if id == free {
            free += 1;
        } else if id > free {
            break;
        }
    }
    free
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::tests::test_utils::CountingStore;

    const OPTS: RequestOptions = RequestOptions { timeout: None };

    fn key(s: &str) -> IdentityKey {
        IdentityKey::new(s).unwrap()
    }

    fn registered(path: &str) -> MemoryStore {
        let store = MemoryStore::new();
        store.create_dir(path, &OPTS).unwrap();
        store
    }

    #[test]
    fn test_smallest_free_id() {
        assert_eq!(smallest_free_id(&mut []), 0);
        assert_eq!(smallest_free_id(&mut [0, 1, 2]), 3);
        assert_eq!(smallest_free_id(&mut [2, 0, 3]), 1);
        assert_eq!(smallest_free_id(&mut [1, 2]), 0);
        assert_eq!(smallest_free_id(&mut [0, 0, 1, 1, 3]), 2);
    }

    #[test]
    fn test_first_allocation_is_zero() {
        let allocator = InstanceIdAllocator::new(registered("/svc/account"));
        assert_eq!(allocator.allocate("/svc/account", &key("h1:80")).unwrap(), 0);
        assert_eq!(
            allocator.store().value("/svc/account/0").as_deref(),
            Some("h1:80")
        );
    }

    #[test]
    fn test_reuse_does_not_write() {
        let allocator = InstanceIdAllocator::new(registered("/svc"));
        allocator.allocate("/svc", &key("a")).unwrap();
        let id = allocator.allocate("/svc", &key("b")).unwrap();
        let creates = allocator.store().create_count();

        for _ in 0..3 {
            assert_eq!(allocator.allocate("/svc", &key("b")).unwrap(), id);
        }
        assert_eq!(allocator.store().create_count(), creates);
    }

    #[test]
    fn test_malformed_slots_are_skipped() {
        let store = registered("/svc");
        store.create("/svc/abc", "x", &OPTS).unwrap();
        store.create("/svc/-1", "y", &OPTS).unwrap();
        store.create("/svc/0", "z", &OPTS).unwrap();
        let allocator = InstanceIdAllocator::new(store);

        assert_eq!(allocator.allocate("/svc", &key("new")).unwrap(), 1);
    }

    #[test]
    fn test_malformed_slot_never_matches_identity() {
        let store = registered("/svc");
        store.create("/svc/abc", "me", &OPTS).unwrap();
        let allocator = InstanceIdAllocator::new(store);

        assert_eq!(allocator.allocate("/svc", &key("me")).unwrap(), 0);
    }

    #[test]
    fn test_nested_directory_occupies_slot() {
        let store = registered("/svc");
        store.create_dir("/svc/0", &OPTS).unwrap();
        let allocator = InstanceIdAllocator::new(store);

        assert_eq!(allocator.allocate("/svc", &key("a")).unwrap(), 1);
    }

    #[test]
    fn test_leaf_path_fails_without_retry() {
        let store = MemoryStore::new();
        store.create("/svc", "leaf", &OPTS).unwrap();
        let allocator = InstanceIdAllocator::new(CountingStore::new(store));

        let err = allocator.allocate("/svc", &key("a")).unwrap_err();
        assert!(matches!(err, AllocError::NodeShape { .. }), "{err:?}");
        assert_eq!(allocator.store().gets(), 1);
        assert_eq!(allocator.store().creates(), 0);
    }

    #[test]
    fn test_missing_path_reads_once() {
        let allocator = InstanceIdAllocator::new(CountingStore::new(MemoryStore::new()));
        assert!(matches!(
            allocator.allocate("/svc", &key("a")),
            Err(AllocError::NodeShape { .. })
        ));
        assert_eq!(allocator.store().gets(), 1);
    }

    #[test]
    fn test_timeout_rereads_directory() {
        let store = registered("/svc");
        store.inject_failures(1, StoreError::Timeout { key: "/svc".into() });
        let allocator = InstanceIdAllocator::new(CountingStore::new(store));

        assert_eq!(allocator.allocate("/svc", &key("a")).unwrap(), 0);
        assert_eq!(allocator.store().gets(), 2);
        assert_eq!(allocator.store().creates(), 1);
    }

    #[test]
    fn test_classify_follows_store_retryability() {
        let retryable = StoreError::Unavailable { reason: "down".into() };
        assert!(classify("/svc", retryable).is_retryable());

        let missing = StoreError::NotFound { key: "/svc".into() };
        assert_eq!(
            classify("/svc", missing),
            AllocError::NodeShape {
                path: "/svc".into(),
                reason: "/svc does not exist".into()
            }
        );
        assert!(!classify("/svc", StoreError::NotADirectory { key: "/svc".into() }).is_retryable());
    }

    #[test]
    fn test_missing_path_fails_fast() {
        let allocator = InstanceIdAllocator::new(MemoryStore::new());
        let err = allocator.allocate("/svc", &key("a")).unwrap_err();
        assert!(matches!(err, AllocError::NodeShape { .. }), "{err:?}");
    }

    #[test]
    fn test_missing_path_created_when_configured() {
        let config = AllocatorConfig::builder().create_missing_path(true).build();
        let allocator = InstanceIdAllocator::with_config(MemoryStore::new(), config);

        assert_eq!(allocator.allocate("/svc/new", &key("a")).unwrap(), 0);
        assert_eq!(allocator.allocate("/svc/new", &key("b")).unwrap(), 1);
    }

    #[test]
    fn test_empty_path_rejected() {
        let allocator = InstanceIdAllocator::new(MemoryStore::new());
        assert!(matches!(
            allocator.allocate("/", &key("a")),
            Err(AllocError::NodeShape { .. })
        ));
    }

    #[test]
    fn test_transient_failures_are_retried() {
        let store = registered("/svc");
        store.inject_failures(
            2,
            StoreError::Unavailable {
                reason: "leader election".into(),
            },
        );
        let allocator = InstanceIdAllocator::new(store);

        assert_eq!(allocator.allocate("/svc", &key("a")).unwrap(), 0);
    }

    #[test]
    fn test_persistent_failures_exhaust_budget() {
        let store = registered("/svc");
        store.inject_failures(3, StoreError::Timeout { key: "/svc".into() });
        let allocator = InstanceIdAllocator::new(store);

        let err = allocator.allocate("/svc", &key("a")).unwrap_err();
        match err {
            AllocError::RetryBudgetExhausted {
                path,
                attempts,
                last,
            } => {
                assert_eq!(path, "/svc");
                assert_eq!(attempts, 3);
                assert!(matches!(*last, AllocError::CoordinationUnavailable { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(allocator.store().create_count(), 0);
    }

    #[test]
    fn test_timeouts_from_deadline_are_retryable() {
        let store = MemoryStore::with_latency(std::time::Duration::from_millis(50));
        store.create_dir("/svc", &OPTS).unwrap();
        let config = AllocatorConfig::builder()
            .request_timeout(Some(std::time::Duration::from_millis(10)))
            .build();
        let allocator = InstanceIdAllocator::with_config(store, config);

        let err = allocator.allocate("/svc", &key("a")).unwrap_err();
        assert!(matches!(err, AllocError::RetryBudgetExhausted { .. }));
    }
}
