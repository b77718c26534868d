//! Cloud Cost Optimizer Library
//!
//! Pulls billing and resource-inventory data from a cloud provider and turns it into
//! cost-optimization recommendations.
//!
//! ## Core Features
//!
//! - **Provider-agnostic collection**: the [`collector::Collector`] trait is the capability
//!   set every provider implements; [`collector::gcp::GcpCollector`] is the GCP variant
//! - **Idle detection**: a fixed, deterministic rule table over normalized resources
//! - **Recommendations**: typed suggestions with a severity, an action and a savings
//!   estimate when billing data can be attributed
//! - **Cost analysis**: service breakdown, period comparison, anomalies, efficiency grade
//!
//! ## Architecture Overview
//!
//! - [`models`] - Common data model shared by every stage
//! - [`error`] - Collector error taxonomy
//! - [`collector`] - Collector trait and provider implementations
//! - [`idle_detector`] - Idle-resource rules
//! - [`recommendations`] - Recommendation engine, prioritization and summaries
//! - [`cost_analyzer`] - Aggregate cost views
//! - [`analyzer`] - End-to-end scan over any collector
//! - [`display`] - Terminal and JSON output
//! - [`config`] - Configuration management with environment variable support
//! - [`logging`] - Structured logging with JSON and pretty-print formats
//! - [`credentials`] - Access token resolution for the CLI
//!
//! Detection and recommendation only depend on [`models`], so a new provider needs no
//! change outside [`collector`].
//!
//! ## Usage Example
//!
//! ```rust
//! use cloud_cost_optimizer::idle_detector::detect_idle_resources;
//! use cloud_cost_optimizer::models::{ResourceRecord, ResourceState, ResourceType, METADATA_ATTACHED};
//! use cloud_cost_optimizer::RecommendationEngine;
//!
//! let resources = vec![
//!     ResourceRecord::new("i1", ResourceType::ComputeInstance, "i1", "demo", ResourceState::Stopped),
//!     ResourceRecord::new("d1", ResourceType::Disk, "d1", "demo", ResourceState::Running)
//!         .with_metadata(METADATA_ATTACHED, "false"),
//! ];
//!
//! let flags = detect_idle_resources(&resources);
//! let recommendations = RecommendationEngine::new()
//!     .get_cost_optimization_recommendations(&resources, &flags);
//! assert_eq!(recommendations.len(), 2);
//! ```

pub mod analyzer;
pub mod collector;
pub mod config;
pub mod cost_analyzer;
pub mod credentials;
pub mod display;
pub mod error;
pub mod idle_detector;
pub mod logging;
pub mod models;
pub mod recommendations;

pub use analyzer::{CostOptimizationAnalyzer, ScanOptions, ScanReport};
pub use collector::Collector;
pub use error::{ApiError, CollectorError, CollectorResult, PartialResults};
pub use idle_detector::{detect_idle_resources, IdleFlag, IdleReason};
pub use models::*;
pub use recommendations::RecommendationEngine;
