pub mod cache;
pub mod http;

pub use cache::{CacheEntry, CacheError, CacheStore};
pub use http::{HttpResponse, HttpTransport, TransportError};
