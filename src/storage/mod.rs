mod labels;
mod memdb;

pub use labels::{Labels, METRIC_NAME_LABEL};
pub use memdb::{MemDb, MemDbStats};

use crate::profile::NormalizedProfile;
use std::sync::Arc;

/// Hands out write handles for series identities.
#[tonic::async_trait]
pub trait Appendable: Send + Sync {
    /// Returns the appender for the series identified by `labels`, creating
    /// the series on first use. `labels` must be sorted.
    async fn appender(&self, labels: &Labels) -> anyhow::Result<Arc<dyn Appender>>;
}

/// Write handle for a single series.
///
/// Implementations serialize commits per series: concurrent `append` calls
/// for the same series, from any number of requests, are applied one at a
/// time and stored in the order they were applied.
#[tonic::async_trait]
pub trait Appender: Send + Sync {
    async fn append(&self, profile: NormalizedProfile) -> anyhow::Result<()>;
}
