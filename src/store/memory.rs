//! In-process coordination store
//!
//! Mirrors the etcd v2 key space: keys are slash-delimited, creating a leaf
//! implicitly creates its parent directories, and every mutation happens
//! under one lock so create-if-absent is linearizable.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;

use super::{CoordinationStore, Node, RequestOptions, StoreError};

#[derive(Debug, Clone)]
struct Entry {
    dir: bool,
    value: String,
}

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, Entry>,
    failures: VecDeque<StoreError>,
    creates: usize,
}

/// Thread-safe in-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated round-trip time; requests whose timeout is shorter fail
    /// with `StoreError::Timeout` without touching the key space
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            inner: Mutex::default(),
            latency: Some(latency),
        }
    }

    /// Fail the next `count` requests with `err`
    pub fn inject_failures(&self, count: usize, err: StoreError) {
        let mut inner = self.inner.lock();
        inner.failures.extend(std::iter::repeat_n(err, count));
    }

    /// Delete `key` and everything beneath it, as a lease expiry would
    pub fn remove(&self, key: &str) -> bool {
        let key = normalize(key);
        let prefix = format!("{key}/");
        let mut inner = self.inner.lock();
        let removed = inner.entries.remove(&key).is_some();
        inner.entries.retain(|k, _| !k.starts_with(&prefix));
        removed
    }

    /// Number of successful leaf creations so far
    pub fn create_count(&self) -> usize {
        self.inner.lock().creates
    }

    /// Value stored at a leaf, if any
    pub fn value(&self, key: &str) -> Option<String> {
        let inner = self.inner.lock();
        inner
            .entries
            .get(&normalize(key))
            .filter(|e| !e.dir)
            .map(|e| e.value.clone())
    }

    fn begin(&self, inner: &mut Inner, key: &str, opts: &RequestOptions) -> Result<(), StoreError> {
        if let Some(err) = inner.failures.pop_front() {
            return Err(err);
        }
        match (self.latency, opts.timeout) {
            (Some(latency), Some(timeout)) if latency > timeout => Err(StoreError::Timeout {
                key: key.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn insert(inner: &mut Inner, key: String, entry: Entry) -> Result<Node, StoreError> {
        if key == "/" || inner.entries.contains_key(&key) {
            return Err(StoreError::AlreadyExists { key });
        }

        let parents: Vec<String> = ancestors(&key).collect();
        for parent in &parents {
            if let Some(existing) = inner.entries.get(parent) {
                if !existing.dir {
                    return Err(StoreError::NotADirectory {
                        key: parent.clone(),
                    });
                }
            }
        }
        for parent in parents {
            inner.entries.entry(parent).or_insert(Entry {
                dir: true,
                value: String::new(),
            });
        }

        let node = Node {
            key: key.clone(),
            dir: entry.dir,
            value: entry.value.clone(),
            nodes: Vec::new(),
        };
        inner.entries.insert(key, entry);
        Ok(node)
    }

    fn build(entries: &BTreeMap<String, Entry>, key: &str, entry: &Entry) -> Node {
        let mut node = Node {
            key: key.to_string(),
            dir: entry.dir,
            value: entry.value.clone(),
            nodes: Vec::new(),
        };
        if entry.dir {
            let prefix = if key == "/" {
                "/".to_string()
            } else {
                format!("{key}/")
            };
            node.nodes = entries
                .range(prefix.clone()..)
                .take_while(|(k, _)| k.starts_with(&prefix))
                .filter(|(k, _)| !k[prefix.len()..].contains('/'))
                .map(|(k, e)| Self::build(entries, k, e))
                .collect();
        }
        node
    }
}

impl CoordinationStore for MemoryStore {
    fn get(&self, key: &str, opts: &RequestOptions) -> Result<Node, StoreError> {
        let key = normalize(key);
        let mut inner = self.inner.lock();
        self.begin(&mut inner, &key, opts)?;

        if key == "/" {
            let root = Entry {
                dir: true,
                value: String::new(),
            };
            return Ok(Self::build(&inner.entries, &key, &root));
        }
        match inner.entries.get(&key) {
            Some(entry) => Ok(Self::build(&inner.entries, &key, entry)),
            None => Err(StoreError::NotFound { key }),
        }
    }

    fn create(&self, key: &str, value: &str, opts: &RequestOptions) -> Result<Node, StoreError> {
        let key = normalize(key);
        let mut inner = self.inner.lock();
        self.begin(&mut inner, &key, opts)?;

        let entry = Entry {
            dir: false,
            value: value.to_string(),
        };
        let node = Self::insert(&mut inner, key, entry)?;
        inner.creates += 1;
        Ok(node)
    }

    fn create_dir(&self, key: &str, opts: &RequestOptions) -> Result<Node, StoreError> {
        let key = normalize(key);
        let mut inner = self.inner.lock();
        self.begin(&mut inner, &key, opts)?;

        let entry = Entry {
            dir: true,
            value: String::new(),
        };
        Self::insert(&mut inner, key, entry)
    }
}

/// Leading slash, no trailing or doubled slashes
fn normalize(key: &str) -> String {
    let parts: Vec<&str> = key.split('/').filter(|p| !p.is_empty()).collect();
    format!("/{}", parts.join("/"))
}

/// Proper ancestors of a normalized key, excluding the root
fn ancestors(key: &str) -> impl Iterator<Item = String> + '_ {
    key.match_indices('/')
        .skip(1)
        .map(move |(i, _)| key[..i].to_string())
}
