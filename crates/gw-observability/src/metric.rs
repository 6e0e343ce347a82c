use chrono::{DateTime, Utc};
use gw_core::Operation;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

/// Default ring-buffer retention, per SPEC_FULL.md §3 "Lifecycle":
/// "metric records are append-only, bounded-retention (ring buffer,
/// configurable size, default 10000)".
pub const DEFAULT_RING_BUFFER_SIZE: usize = 10_000;

/// The closed set of metric record kinds. Config-subsystem events
/// (`config_load`..`validation_event`) and runtime events
/// (`operation_call`..`circuit_close`) share one enum and one ring buffer;
/// nothing downstream needs to distinguish the two families by type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    ConfigLoad,
    PresetUsage,
    ConfigError,
    ConfigChange,
    ValidationEvent,
    OperationCall,
    CacheHit,
    CacheMiss,
    Retry,
    CircuitOpen,
    CircuitClose,
}

impl MetricType {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricType::ConfigLoad => "config_load",
            MetricType::PresetUsage => "preset_usage",
            MetricType::ConfigError => "config_error",
            MetricType::ConfigChange => "config_change",
            MetricType::ValidationEvent => "validation_event",
            MetricType::OperationCall => "operation_call",
            MetricType::CacheHit => "cache_hit",
            MetricType::CacheMiss => "cache_miss",
            MetricType::Retry => "retry",
            MetricType::CircuitOpen => "circuit_open",
            MetricType::CircuitClose => "circuit_close",
        }
    }
}

/// One append-only record. See SPEC_FULL.md §3 "Metric record".
#[derive(Debug, Clone, Serialize)]
pub struct MetricRecord {
    #[serde(rename = "type")]
    pub kind: MetricType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MetricRecord {
    pub fn new(kind: MetricType) -> Self {
        Self {
            kind,
            operation: None,
            preset: None,
            duration_ms: None,
            timestamp: Utc::now(),
            session_id: None,
            user_context: None,
            error: None,
        }
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = Some(preset.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Process-wide, append-only, bounded-retention store of [`MetricRecord`]s.
/// Oldest entries are dropped once `capacity` is exceeded, matching a ring
/// buffer's eviction order. Safe for concurrent single-producer/multiple-
/// consumer use (§5 "Shared resources").
///
/// Per SPEC_FULL.md §9 (resolved open question): metrics are *always*
/// recorded here; forwarding to the `metrics` crate facade (when the
/// `metrics` feature is enabled) is an additional, optional sink — never a
/// gate on whether the record is kept.
pub struct MetricsRingBuffer {
    capacity: usize,
    buffer: Mutex<VecDeque<MetricRecord>>,
    total_recorded: AtomicUsize,
}

impl MetricsRingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            buffer: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            total_recorded: AtomicUsize::new(0),
        }
    }

    /// Appends `record`, evicting the oldest entry first if at capacity,
    /// and forwards it to the `metrics` crate facade when that feature is
    /// enabled.
    pub fn record(&self, record: MetricRecord) {
        self.total_recorded.fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "metrics")]
        {
            metrics::counter!(
                "gateway_metric_records_total",
                "type" => record.kind.as_str()
            )
            .increment(1);
            if let Some(duration_ms) = record.duration_ms {
                metrics::histogram!(
                    "gateway_metric_duration_ms",
                    "type" => record.kind.as_str()
                )
                .record(duration_ms as f64);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            metric_type = record.kind.as_str(),
            operation = record.operation.map(|o| o.as_str()),
            preset = record.preset.as_deref(),
            "recorded metric"
        );

        let mut buffer = self.buffer.lock();
        if buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(record);
    }

    /// The number of records ever recorded, including ones since evicted
    /// (distinct from the current buffer length).
    pub fn total_recorded(&self) -> usize {
        self.total_recorded.load(Ordering::Relaxed)
    }

    /// Current number of retained records (`<= capacity`).
    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// A point-in-time copy of every retained record, oldest first.
    pub fn snapshot(&self) -> Vec<MetricRecord> {
        self.buffer.lock().iter().cloned().collect()
    }

    /// Retained records matching `kind`, oldest first.
    pub fn snapshot_by_type(&self, kind: MetricType) -> Vec<MetricRecord> {
        self.buffer.lock().iter().filter(|r| r.kind == kind).cloned().collect()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

impl Default for MetricsRingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_RING_BUFFER_SIZE)
    }
}
