pub mod codec;
pub mod config;
pub mod error;
pub mod exporter;
pub mod logging;
pub mod point;
pub mod publisher;
pub mod record;
pub mod translate;

pub use config::{ConfigMap, ConfigValue};
pub use error::PublishError;
pub use point::DataPoint;
pub use publisher::{meta, Publisher};
pub use record::{MetricRecord, MetricValue, Namespace, NamespaceSegment};

/// Nanoseconds since the Unix epoch
pub type Time = u64;

/// The only content type `Publisher::publish` accepts
pub const BINARY_CONTENT_TYPE: &str = "kairos.metrics.binary";
