//! Configuration for a harvest run.
//!
//! Provides [`HarvestConfig`] and its type-safe builder for configuring the
//! engine with validation and sensible defaults, plus [`env::from_env`] for
//! loading the same configuration from `HARVEST_*` environment variables.

pub mod builder;
pub mod env;
pub mod getters;
pub mod types;

pub use builder::{HarvestConfigBuilder, WithCredentials, WithTargetUrls};
pub use types::HarvestConfig;
