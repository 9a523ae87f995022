pub mod discovery;
pub mod generators;
pub mod verification;

pub use discovery::{DiscoveryService, DiscoverySummary};
pub use generators::{write_artifacts, InstallPlan};
