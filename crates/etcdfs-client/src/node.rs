//! Wire types of the etcd v2 keys API.

use serde::Deserialize;

fn root_key() -> String {
    String::from("/")
}

/// A node of the etcd key tree as returned by a get.
///
/// etcd omits `key` for the root node, so it defaults to `/`. Directory
/// children carry their key and `dir` flag; their own `nodes` are only
/// filled in for recursive gets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Absolute key.
    #[serde(default = "root_key")]
    pub key: String,
    /// Whether the node is a directory.
    #[serde(default)]
    pub dir: bool,
    /// Value of a leaf node.
    #[serde(default)]
    pub value: Option<String>,
    /// Children of a directory node.
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Index at which the node was created.
    #[serde(default)]
    pub created_index: u64,
    /// Index of the last modification.
    #[serde(default)]
    pub modified_index: u64,
    /// Remaining time to live in seconds, for expiring keys.
    #[serde(default)]
    pub ttl: Option<i64>,
}

impl Node {
    /// A leaf node holding `value`.
    pub fn leaf(key: impl Into<String>, value: impl Into<String>) -> Self {
        Node {
            key: key.into(),
            dir: false,
            value: Some(value.into()),
            nodes: Vec::new(),
            created_index: 0,
            modified_index: 0,
            ttl: None,
        }
    }

    /// A directory node with the given children.
    pub fn directory(key: impl Into<String>, nodes: Vec<Node>) -> Self {
        Node {
            key: key.into(),
            dir: true,
            value: None,
            nodes,
            created_index: 0,
            modified_index: 0,
            ttl: None,
        }
    }
}

/// Successful keys API response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Response {
    /// Action performed, `get` for reads.
    pub action: String,
    /// The node read.
    pub node: Node,
}

/// Options of a keys API get.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GetOptions {
    /// Return the whole subtree instead of immediate children.
    pub recursive: bool,
    /// Sort children lexicographically by key.
    pub sort: bool,
    /// Serve the read through raft instead of a possibly stale member.
    pub quorum: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_directory_listing() {
        let body = r#"{
            "action": "get",
            "node": {
                "key": "/root",
                "dir": true,
                "nodes": [
                    {"key": "/root/a", "dir": true, "modifiedIndex": 3, "createdIndex": 3},
                    {"key": "/root/b", "value": "hello", "modifiedIndex": 4, "createdIndex": 4}
                ],
                "modifiedIndex": 2,
                "createdIndex": 2
            }
        }"#;
        let resp: Response = serde_json::from_str(body).unwrap();
        assert_eq!(resp.action, "get");
        assert!(resp.node.dir);
        assert_eq!(resp.node.nodes.len(), 2);
        assert!(resp.node.nodes[0].dir);
        assert_eq!(resp.node.nodes[1].value.as_deref(), Some("hello"));
        assert_eq!(resp.node.nodes[1].modified_index, 4);
    }

    #[test]
    fn test_decode_root_without_key() {
        let body = r#"{"action":"get","node":{"dir":true}}"#;
        let resp: Response = serde_json::from_str(body).unwrap();
        assert_eq!(resp.node.key, "/");
        assert!(resp.node.nodes.is_empty());
    }

    #[test]
    fn test_decode_expiring_leaf() {
        let body = r#"{"action":"get","node":{"key":"/lease","value":"x","ttl":30,"expiration":"2026-01-01T00:00:00Z"}}"#;
        let resp: Response = serde_json::from_str(body).unwrap();
        assert_eq!(resp.node.ttl, Some(30));
        assert!(!resp.node.dir);
    }
}
