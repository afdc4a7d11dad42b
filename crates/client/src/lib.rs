//! Client code for cachekeep.
//!
//! This crate provides the blob store clients (HTTP and filesystem) that back
//! the core `ObjectStore` port, shared by the server and CLI.

pub mod object_store;

pub use object_store::{
    FsObjectStore, HttpObjectStore, HttpObjectStoreConfig, ObjectStoreError, classify_status, key_segments,
    object_store_from_config,
};
