#![warn(missing_docs)]

//! etcdfs FUSE subsystem.

pub mod attr;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod inode;
pub mod keypath;
pub mod mount;
pub mod resolver;
pub mod root;
pub mod server;
pub mod vnode;

pub use error::{FsError, Result};
pub use root::EtcdFs;
