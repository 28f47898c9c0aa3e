//! # Refresh cycle
//!
//! Every cycle:
//! 1. fetch a full snapshot and derive its logical timestamp
//! 2. aggregate it into `Statistics`
//! 3. record guild, realm, class and character counters (four writer tasks,
//!    joined before moving on)
//! 4. read the series back to attach last-week gains and rank the movers
//! 5. swap the finished snapshot in for readers
//!
//! A failed cycle publishes nothing; readers keep the previous snapshot.

pub mod last_week;
pub mod orchestrator;
pub mod published;
pub mod source;
pub mod writer;

pub use last_week::apply_last_week;
pub use orchestrator::{CycleReport, RefreshOrchestrator, RefreshSettings};
pub use published::{PublishedStatistics, Snapshot};
pub use source::{FileDumpSource, HttpDumpSource, SnapshotSource};
pub use writer::{write_timeseries, SeriesUpdate, UpdatePlan, WriteReport};
