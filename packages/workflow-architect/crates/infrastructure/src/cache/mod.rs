pub mod disk;
pub mod locks;
pub mod memory;

pub use disk::DiskCache;
pub use locks::KeyedLocks;
pub use memory::MemoryCache;
