//! Inode numbers for etcd keys.
//!
//! A key's inode is the CRC-64 (ECMA-182 polynomial, reflected, as used by
//! XZ) of its bytes, so every mount exposes the same numbers for the same
//! keys. The kernel still addresses the mount root as [`ROOT_INODE`], and
//! [`KeyTable`] maps the ids it holds back to keys.

use dashmap::DashMap;
use tracing::warn;

pub type InodeId = u64;
pub const ROOT_INODE: InodeId = 1;

pub fn identity(key: &str) -> InodeId {
    let mut digest = crc64fast::Digest::new();
    digest.write(key.as_bytes());
    digest.sum64()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    pub key: String,
    pub lookup_count: u64,
}

/// Kernel-visible inode ids mapped to the keys they stand for.
///
/// Holds keys only; node contents are always read from the store.
#[derive(Debug)]
pub struct KeyTable {
    root_key: String,
    entries: DashMap<InodeId, KeyEntry>,
}

impl KeyTable {
    pub fn new(root_key: &str) -> Self {
        KeyTable {
            root_key: root_key.to_string(),
            entries: DashMap::new(),
        }
    }

    pub fn root_key(&self) -> &str {
        &self.root_key
    }

    pub fn key(&self, ino: InodeId) -> Option<String> {
        if ino == ROOT_INODE {
            return Some(self.root_key.clone());
        }
        self.entries.get(&ino).map(|e| e.key.clone())
    }

    /// Record a kernel lookup of `key` and return its inode.
    pub fn remember(&self, key: &str) -> InodeId {
        let ino = identity(key);
        let mut entry = self.entries.entry(ino).or_insert_with(|| KeyEntry {
            key: key.to_string(),
            lookup_count: 0,
        });
        if entry.key != key {
            warn!("inode {} collision: {} replaces {}", ino, key, entry.key);
            entry.key = key.to_string();
            entry.lookup_count = 0;
        }
        entry.lookup_count += 1;
        ino
    }

    pub fn lookup_count(&self, ino: InodeId) -> u64 {
        self.entries.get(&ino).map(|e| e.lookup_count).unwrap_or(0)
    }

    pub fn forget(&self, ino: InodeId, n: u64) {
        if ino == ROOT_INODE {
            return;
        }
        let should_remove = match self.entries.get_mut(&ino) {
            Some(mut entry) => {
                entry.lookup_count = entry.lookup_count.saturating_sub(n);
                entry.lookup_count == 0
            }
            None => false,
        };
        if should_remove {
            self.entries.remove_if(&ino, |_, e| e.lookup_count == 0);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
