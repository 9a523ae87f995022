pub mod http;
pub mod resilient;

pub use http::ReqwestTransport;
pub use resilient::ResilientClient;
