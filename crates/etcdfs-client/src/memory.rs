//! In-memory etcd v2 key tree.
//!
//! Reproduces the read semantics of the keys API closely enough for the
//! filesystem layer to be exercised without a cluster: missing keys answer
//! with code 100, walking through a leaf answers with code 104, and
//! directory children come back sorted. Faults can be injected per key.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::client::KeysApi;
use crate::error::{ErrorCode, Result, StoreError};
use crate::node::{GetOptions, Node, Response};

#[derive(Debug, Clone)]
enum Entry {
    Dir { index: u64 },
    Leaf { value: String, index: u64 },
}

#[derive(Debug, Clone)]
enum Fault {
    Code(ErrorCode),
    Transport,
}

#[derive(Debug, Default)]
struct Tree {
    entries: BTreeMap<String, Entry>,
    index: u64,
}

/// Thread-safe in-memory key tree implementing [`KeysApi`].
#[derive(Debug, Default)]
pub struct MemoryKeys {
    tree: RwLock<Tree>,
    faults: RwLock<HashMap<String, Fault>>,
}

fn normalize(key: &str) -> String {
    let parts: Vec<&str> = key.split('/').filter(|p| !p.is_empty()).collect();
    format!("/{}", parts.join("/"))
}

fn ancestors(key: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let parts: Vec<&str> = key.split('/').filter(|p| !p.is_empty()).collect();
    if let Some((_, dirs)) = parts.split_last() {
        for part in dirs {
            current.push('/');
            current.push_str(part);
            out.push(current.clone());
        }
    }
    out
}

fn api_error(code: ErrorCode, message: &str, cause: &str, index: u64) -> StoreError {
    StoreError::Api {
        code,
        message: message.to_string(),
        cause: cause.to_string(),
        index,
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Status {
        endpoint: "memory://".to_string(),
        status: 500,
    }
}

impl Tree {
    fn child_prefix(key: &str) -> String {
        if key == "/" {
            String::from("/")
        } else {
            format!("{}/", key)
        }
    }

    fn is_dir(&self, key: &str) -> bool {
        key == "/" || matches!(self.entries.get(key), Some(Entry::Dir { .. }))
    }

    fn node(&self, key: &str, recursive: bool, depth: usize) -> Node {
        match self.entries.get(key) {
            Some(Entry::Leaf { value, index }) => {
                let mut node = Node::leaf(key, value.clone());
                node.created_index = *index;
                node.modified_index = *index;
                node
            }
            _ => {
                let mut node = Node::directory(key, Vec::new());
                if let Some(Entry::Dir { index }) = self.entries.get(key) {
                    node.created_index = *index;
                    node.modified_index = *index;
                }
                if depth == 0 || recursive {
                    node.nodes = self
                        .children(key)
                        .into_iter()
                        .map(|child| self.node(&child, recursive, depth + 1))
                        .collect();
                }
                node
            }
        }
    }

    fn children(&self, key: &str) -> Vec<String> {
        let prefix = Self::child_prefix(key);
        self.entries
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .filter(|(k, _)| !k[prefix.len()..].contains('/'))
            .map(|(k, _)| k.clone())
            .collect()
    }

    fn ensure_parents(&mut self, key: &str) -> Result<()> {
        for dir in ancestors(key) {
            match self.entries.get(&dir) {
                Some(Entry::Dir { .. }) => {}
                Some(Entry::Leaf { .. }) => {
                    return Err(api_error(ErrorCode::NotDir, "Not a directory", &dir, self.index))
                }
                None => {
                    self.index += 1;
                    self.entries.insert(dir, Entry::Dir { index: self.index });
                }
            }
        }
        Ok(())
    }
}

impl MemoryKeys {
    /// Create an empty tree holding only the root directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a leaf value, creating missing parent directories.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let key = normalize(key);
        let mut tree = self.tree.write().map_err(poisoned)?;
        if tree.is_dir(&key) {
            return Err(api_error(ErrorCode::NotFile, "Not a file", &key, tree.index));
        }
        tree.ensure_parents(&key)?;
        tree.index += 1;
        let index = tree.index;
        tree.entries.insert(
            key,
            Entry::Leaf {
                value: value.to_string(),
                index,
            },
        );
        Ok(())
    }

    /// Create a directory, creating missing parents.
    pub fn mkdir(&self, key: &str) -> Result<()> {
        let key = normalize(key);
        let mut tree = self.tree.write().map_err(poisoned)?;
        if key == "/" || tree.is_dir(&key) {
            return Ok(());
        }
        if tree.entries.contains_key(&key) {
            return Err(api_error(ErrorCode::NodeExist, "Key already exists", &key, tree.index));
        }
        tree.ensure_parents(&key)?;
        tree.index += 1;
        let index = tree.index;
        tree.entries.insert(key, Entry::Dir { index });
        Ok(())
    }

    /// Remove a key and everything below it.
    pub fn remove(&self, key: &str) -> Result<()> {
        let key = normalize(key);
        let mut tree = self.tree.write().map_err(poisoned)?;
        if key == "/" {
            tree.entries.clear();
        } else {
            let prefix = Tree::child_prefix(&key);
            tree.entries
                .retain(|k, _| k != &key && !k.starts_with(&prefix));
        }
        tree.index += 1;
        Ok(())
    }

    /// Make every get of `key` fail with an etcd error `code`.
    pub fn inject(&self, key: &str, code: ErrorCode) -> Result<()> {
        let mut faults = self.faults.write().map_err(poisoned)?;
        faults.insert(normalize(key), Fault::Code(code));
        Ok(())
    }

    /// Make every get of `key` fail as if the cluster were unreachable.
    pub fn inject_transport_failure(&self, key: &str) -> Result<()> {
        let mut faults = self.faults.write().map_err(poisoned)?;
        faults.insert(normalize(key), Fault::Transport);
        Ok(())
    }

    /// Drop any fault injected for `key`.
    pub fn clear_fault(&self, key: &str) -> Result<()> {
        let mut faults = self.faults.write().map_err(poisoned)?;
        faults.remove(&normalize(key));
        Ok(())
    }
}

#[async_trait]
impl KeysApi for MemoryKeys {
    async fn get(&self, key: &str, opts: &GetOptions) -> Result<Response> {
        let key = normalize(key);

        let fault = self.faults.read().map_err(poisoned)?.get(&key).cloned();
        let tree = self.tree.read().map_err(poisoned)?;
        match fault {
            Some(Fault::Code(code)) => {
                return Err(api_error(code, "injected", &key, tree.index));
            }
            Some(Fault::Transport) => {
                return Err(StoreError::Status {
                    endpoint: "memory://".to_string(),
                    status: 503,
                });
            }
            None => {}
        }

        for dir in ancestors(&key) {
            match tree.entries.get(&dir) {
                Some(Entry::Dir { .. }) => {}
                Some(Entry::Leaf { .. }) => {
                    return Err(api_error(ErrorCode::NotDir, "Not a directory", &dir, tree.index));
                }
                None => {
                    return Err(api_error(ErrorCode::KeyNotFound, "Key not found", &dir, tree.index));
                }
            }
        }

        if key != "/" && !tree.entries.contains_key(&key) {
            return Err(api_error(ErrorCode::KeyNotFound, "Key not found", &key, tree.index));
        }

        Ok(Response {
            action: "get".to_string(),
            node: tree.node(&key, opts.recursive, 0),
        })
    }
}
