pub mod metric_kind;
pub mod score;
pub mod metrics;

pub use metric_kind::MetricKind;
pub use score::{MetricValue, Score};
pub use metrics::Metrics;
