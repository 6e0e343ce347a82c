use chrono::{DateTime, Utc};
use gw_cache::{CacheType, HealthCheckReport};
use serde::Serialize;

/// Aggregate health status, the closed set from SPEC_FULL.md §6
/// `GET /internal/health`. Distinct from [`gw_cache::HealthCheckReport`],
/// which only covers the cache tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Healthy,
    Degraded,
    Unhealthy,
}

/// `{status, ai_model_available, resilience_healthy, cache_healthy,
/// cache_type, timestamp, version}`, per SPEC_FULL.md §6.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayHealthReport {
    pub status: Status,
    pub ai_model_available: bool,
    pub resilience_healthy: bool,
    pub cache_healthy: bool,
    pub cache_type: CacheType,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Combines the provider, resilience, and cache health signals into one
/// aggregate report. `redis_requested` distinguishes "the cache is healthy
/// because it was only ever meant to run in memory" from "the cache is
/// healthy but running degraded because the requested Redis tier fell
/// back to memory" (§8 scenario 5: `cache_healthy=true, status=degraded`).
pub fn aggregate_health(
    ai_model_available: bool,
    resilience_healthy: bool,
    cache: &HealthCheckReport,
    redis_requested: bool,
    version: impl Into<String>,
) -> GatewayHealthReport {
    let status = if !ai_model_available || !resilience_healthy || !cache.healthy {
        Status::Unhealthy
    } else if redis_requested && cache.cache_type == CacheType::Memory {
        Status::Degraded
    } else {
        Status::Healthy
    };

    GatewayHealthReport {
        status,
        ai_model_available,
        resilience_healthy,
        cache_healthy: cache.healthy,
        cache_type: cache.cache_type,
        timestamp: Utc::now(),
        version: version.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(healthy: bool, cache_type: CacheType) -> HealthCheckReport {
        HealthCheckReport { healthy, cache_type, errors: vec![], timestamp: 0 }
    }

    #[test]
    fn all_healthy_is_healthy() {
        let r = aggregate_health(true, true, &report(true, CacheType::Memory), false, "0.1.0");
        assert_eq!(r.status, Status::Healthy);
    }

    #[test]
    fn redis_requested_but_fell_back_to_memory_is_degraded() {
        let r = aggregate_health(true, true, &report(true, CacheType::Memory), true, "0.1.0");
        assert_eq!(r.status, Status::Degraded);
        assert!(r.cache_healthy);
    }

    #[test]
    fn unavailable_provider_is_unhealthy() {
        let r = aggregate_health(false, true, &report(true, CacheType::Memory), false, "0.1.0");
        assert_eq!(r.status, Status::Unhealthy);
    }

    #[test]
    fn failed_cache_health_check_is_unhealthy() {
        let r = aggregate_health(true, true, &report(false, CacheType::Memory), false, "0.1.0");
        assert_eq!(r.status, Status::Unhealthy);
    }

    #[test]
    fn redis_active_and_healthy_is_plain_healthy() {
        let r = aggregate_health(true, true, &report(true, CacheType::RedisSecure), true, "0.1.0");
        assert_eq!(r.status, Status::Healthy);
    }
}
