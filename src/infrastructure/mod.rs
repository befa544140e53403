//! Adapters behind the domain ports: the payments API client, an in-memory
//! stand-in for it, and the local stores.

pub mod balanced;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
