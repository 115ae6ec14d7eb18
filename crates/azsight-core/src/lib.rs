//! Shared model for the azsight aggregation pipeline: per-source outcomes,
//! the assembled snapshot, and the TTL cache that bridges failed refreshes.

mod cache;
mod snapshot;

pub use cache::{Clock, SystemClock, TtlCache};
pub use snapshot::{DataOrigin, MetricsSnapshot, Outcome, SourceError, SourceResult};
