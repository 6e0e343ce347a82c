//! Metrics ring buffer and health aggregation, the observability ambient
//! stack SPEC_FULL.md §2.1 calls out as its own crate. Has no opinion on
//! presentation (dashboards, scrape endpoints); it only collects and
//! snapshots.

mod health;
mod metric;

pub use health::{aggregate_health, GatewayHealthReport, Status};
pub use metric::{MetricRecord, MetricType, MetricsRingBuffer, DEFAULT_RING_BUFFER_SIZE};
