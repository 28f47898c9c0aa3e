//! # Aggregation pipeline
//!
//! Turns one flat character snapshot into the global view plus the by-realm,
//! by-class and by-guild partitions, each ranked by RP and XP.
//!
//! Everything here is pure and synchronous; the refresh cycle decides when it
//! runs and what happens with the result.

pub mod query;
pub mod statistics;

pub use query::Query;
pub use statistics::{Statistics, MAX_RESULTS};
