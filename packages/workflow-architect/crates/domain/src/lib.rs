pub mod analyzer;
pub mod ports;
pub mod resolution;
pub mod rules;
pub mod seed;
pub mod verification;

pub use analyzer::{analyze_directory, analyze_file, analyze_str, build_report, AnalyzeError};
pub use ports::{CacheStore, HttpTransport};
pub use seed::curated_registry;
pub use verification::{assert_all_verified, VerificationError};
