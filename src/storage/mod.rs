pub mod backend;
pub mod blobs;
pub mod disk;
pub mod keys;
pub mod memory;
pub mod progress;
pub mod retry;
pub mod validation;

pub use backend::{ObjectStore, PutOptions};
pub use blobs::{Blob, BlobRegistry, BlobUrl};
pub use disk::DiskObjectStore;
pub use memory::MemoryObjectStore;
