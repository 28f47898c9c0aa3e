//! Herald statistics backend
//!
//! Pulls the full character dump on a fixed cadence, aggregates it into ranked
//! statistics and keeps one counter history per entity on disk so that
//! last-week gains can be computed without keeping old dumps.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod refresh;
pub mod search;
pub mod timeseries;

pub use config::HeraldConfig;
pub use error::{HeraldError, Result};
pub use models::{Character, CharacterSnapshot, Guild};
pub use pipeline::{Query, Statistics, MAX_RESULTS};
pub use refresh::{PublishedStatistics, RefreshOrchestrator, Snapshot};
pub use timeseries::{Category, Metric, SeriesStore, TimeSeries, TimeSeriesEntry};
