pub mod config;
pub mod discovery;
pub mod report;
pub mod sources;
pub mod verification;

pub use config::*;
pub use discovery::*;
pub use report::*;
pub use sources::*;
pub use verification::*;
