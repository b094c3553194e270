//! # servid
//!
//! Instance ids for service replicas, and Snowflake ids seeded by them.
//!
//! A replica starting up claims a small integer id under its service's
//! registration path in a coordination store:
//! - 🔁 Re-registering with the same identity key returns the same id
//! - 🔢 New identities get the smallest id not currently in use
//! - 🏁 Concurrent registrations race on an atomic create-if-absent and retry
//!
//! That id then seeds a [`SnowflakeGenerator`] which needs no further store
//! traffic:
//! - 📈 Time-sorted 64-bit ids
//! - 🔒 Lock-free and thread-safe
//! - ⏱️ Generation time recoverable from any id
//!
//! ```no_run
//! use servid::{CoordinationStore, IdentityKey, InstanceIdAllocator, MemoryStore, SnowflakeGenerator};
//!
//! let allocator = InstanceIdAllocator::new(MemoryStore::new());
//! # allocator.store().create_dir("/roc/servid/account", &Default::default()).unwrap();
//! let me = IdentityKey::from_addr("10.0.0.7", 9000).unwrap();
//! let instance_id = allocator.allocate("/roc/servid/account", &me).unwrap();
//!
//! let ids = SnowflakeGenerator::new(i64::from(instance_id)).unwrap();
//! let id = ids.next_id().unwrap();
//! let _when = ids.timestamp_of(id);
//! ```

#![forbid(unsafe_code)]

mod allocator;
mod config;
mod error;
mod extractor;
mod generator;
pub mod identity;
pub mod store;

#[cfg(test)]
pub mod tests;

pub use allocator::{
    smallest_free_id, AllocatorConfig, AllocatorConfigBuilder, AllocatorConfigError,
    InstanceIdAllocator,
};
pub use config::{
    SnowflakeConfig, SnowflakeConfigBuilder, SnowflakeConfigError, DEFAULT_EPOCH, DEFAULT_EPOCH_MS,
};
pub use error::{AllocError, SnowflakeError};
pub use extractor::SnowflakeExtractor;
pub use generator::SnowflakeGenerator;
pub use identity::{replica_name, slot_key, IdentityKey};
pub use store::{CoordinationStore, MemoryStore, Node, RequestOptions, StoreError};
