//! Key-value persistence port and its bundled backends.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use file::FileKeyValueStore;
pub use memory::InMemoryKeyValueStore;
pub use traits::KeyValueStore;
