// Adapters layer: concrete implementations of the domain ports (REST backend, key-value storage)

pub mod http;
pub mod storage;

pub use http::ApiClient;
pub use storage::{FileKeyValueStore, MemoryKeyValueStore};
