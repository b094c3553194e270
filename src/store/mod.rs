//! Coordination store contract
//!
//! The allocator only needs two things from the store: a recursive read of a
//! directory and an atomic create-if-absent. Any hierarchical key/value system
//! offering linearizable creates (etcd, ZooKeeper, Consul KV) can back it.
//!
//! - `memory` - In-process store with etcd-like key semantics

mod memory;

use std::time::Duration;

use thiserror::Error;

pub use memory::MemoryStore;

/// A node returned by the store
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Node {
    /// Full slash-delimited key
    pub key: String,
    /// Whether this node is a directory
    pub dir: bool,
    /// Stored value, empty for directories
    pub value: String,
    /// Immediate children, populated for directories
    pub nodes: Vec<Node>,
}

impl Node {
    /// Key of `child` relative to this node, `None` if `child` does not live
    /// directly under it
    pub fn child_suffix<'a>(&self, child: &'a Node) -> Option<&'a str> {
        let rest = child.key.strip_prefix(self.key.as_str())?;
        let suffix = if self.key.ends_with('/') {
            rest
        } else {
            rest.strip_prefix('/')?
        };
        (!suffix.is_empty() && !suffix.contains('/')).then_some(suffix)
    }
}

/// Per-request options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestOptions {
    /// Deadline for a single round-trip; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Errors reported by a coordination store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Key not found: {key}")]
    NotFound { key: String },
    #[error("Key already exists: {key}")]
    AlreadyExists { key: String },
    #[error("Not a directory: {key}")]
    NotADirectory { key: String },
    #[error("Request timed out: {key}")]
    Timeout { key: String },
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StoreError {
    /// Transient failures that may succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::AlreadyExists { .. }
                | StoreError::Timeout { .. }
                | StoreError::Unavailable { .. }
        )
    }
}

/// Hierarchical key/value store with atomic create-if-absent
pub trait CoordinationStore: Send + Sync {
    /// Fetch the node at `key` together with its whole subtree
    fn get(&self, key: &str, opts: &RequestOptions) -> Result<Node, StoreError>;

    /// Create a leaf at `key`, failing with `AlreadyExists` if occupied.
    /// Concurrent creates on the same key must have exactly one winner.
    fn create(&self, key: &str, value: &str, opts: &RequestOptions) -> Result<Node, StoreError>;

    /// Create an empty directory at `key`
    fn create_dir(&self, key: &str, opts: &RequestOptions) -> Result<Node, StoreError>;
}

impl<S: CoordinationStore + ?Sized> CoordinationStore for std::sync::Arc<S> {
    fn get(&self, key: &str, opts: &RequestOptions) -> Result<Node, StoreError> {
        (**self).get(key, opts)
    }

    fn create(&self, key: &str, value: &str, opts: &RequestOptions) -> Result<Node, StoreError> {
        (**self).create(key, value, opts)
    }

    fn create_dir(&self, key: &str, opts: &RequestOptions) -> Result<Node, StoreError> {
        (**self).create_dir(key, opts)
    }
}
