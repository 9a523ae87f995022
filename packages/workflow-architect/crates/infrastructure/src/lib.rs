pub mod adapters;
pub mod cache;

pub use adapters::{ReqwestTransport, ResilientClient};
pub use cache::{DiskCache, KeyedLocks, MemoryCache};
