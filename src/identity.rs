//! Replica identity helpers

use std::fmt;

use thiserror::Error;

/// Rejected identity key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Identity key must not be blank")]
pub struct BlankIdentityKey;

/// Opaque string identifying one live replica, typically `host:port`.
///
/// Two replicas configured with the same key share a slot, so keys must be
/// unique per live replica.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn new(key: impl Into<String>) -> Result<Self, BlankIdentityKey> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(BlankIdentityKey);
        }
        Ok(Self(key))
    }

    /// `host:port` identity for a replica listening on that address
    pub fn from_addr(host: &str, port: u16) -> Result<Self, BlankIdentityKey> {
        if host.trim().is_empty() {
            return Err(BlankIdentityKey);
        }
        Ok(Self(format!("{host}:{port}")))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for IdentityKey {
    type Error = BlankIdentityKey;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Store key of the slot holding `id` under `path`
pub fn slot_key(path: &str, id: u32) -> String {
    format!("{}/{id}", path.trim_end_matches('/'))
}

/// Replica name: service name followed by its instance id
pub fn replica_name(service: &str, instance_id: u32) -> String {
    format!("{service}{instance_id}")
}
