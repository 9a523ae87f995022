//! Workflow dependency analysis, upstream version discovery and deployment
//! artifact generation for node-graph image and video workflows.
//!
//! The crates are layered: `domain` holds the pure rules and the ports,
//! `infrastructure` implements the ports over HTTP and the filesystem, and
//! `application` runs discovery, verification and generation on top of both.

pub use application;
pub use domain;
pub use infrastructure;
pub use workflow_manifest as manifest;

pub use application::{DiscoveryService, DiscoverySummary, InstallPlan};
pub use domain::{analyze_directory, analyze_file, build_report, curated_registry};
pub use workflow_manifest::{Registry, Settings};
