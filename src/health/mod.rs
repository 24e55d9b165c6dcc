use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::state::AppState;

/// Overall health state of a component or the entire system
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Component is functioning normally
    Healthy,
    /// Component has issues but is still functional
    Degraded,
    /// Component is not functional
    Unhealthy,
}

/// Health status for an individual component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: HealthState,
    pub message: Option<String>,
    pub last_check: DateTime<Utc>,
    pub metadata: Option<serde_json::Value>,
    pub check_duration_ms: Option<u64>,
}

impl ComponentHealth {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthState::Healthy,
            message: Some(message.into()),
            last_check: Utc::now(),
            metadata: None,
            check_duration_ms: None,
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthState::Unhealthy,
            message: Some(message.into()),
            last_check: Utc::now(),
            metadata: None,
            check_duration_ms: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.check_duration_ms = Some(duration.as_millis() as u64);
        self
    }
}

/// Complete health status including all components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
    pub checks: HashMap<String, ComponentHealth>,
    pub summary: HealthSummary,
}

/// Summary statistics for the health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSummary {
    pub total_checks: usize,
    pub healthy_count: usize,
    pub unhealthy_count: usize,
    pub total_check_duration_ms: u64,
}

/// Comprehensive health check endpoint
pub async fn health_check(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<HealthStatus>, StatusCode> {
    let start_time = Instant::now();
    let mut checks = HashMap::new();
    let timestamp = Utc::now();

    debug!("Starting comprehensive health check");

    let ledger_check_start = Instant::now();
    checks.insert(
        "ledger".to_string(),
        check_ledger_health(&state)
            .await
            .with_duration(ledger_check_start.elapsed()),
    );

    let event_check_start = Instant::now();
    checks.insert(
        "event_bus".to_string(),
        check_event_bus_health(&state)
            .await
            .with_duration(event_check_start.elapsed()),
    );

    let overall_status = determine_overall_health(&checks);
    let total_duration = start_time.elapsed();
    let summary = calculate_health_summary(&checks, total_duration);

    let health_status = HealthStatus {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime().as_secs(),
        timestamp,
        checks,
        summary,
    };

    info!(
        overall_status = ?health_status.status,
        total_checks = health_status.summary.total_checks,
        healthy_count = health_status.summary.healthy_count,
        unhealthy_count = health_status.summary.unhealthy_count,
        duration_ms = total_duration.as_millis(),
        "Health check completed"
    );

    match health_status.status {
        HealthState::Healthy | HealthState::Degraded => Ok(Json(health_status)),
        HealthState::Unhealthy => {
            error!("System health check failed - returning 503 Service Unavailable");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// Kubernetes liveness probe endpoint
pub async fn liveness_check(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<&'static str, StatusCode> {
    debug!("Performing liveness check");

    // Just ensure the core is responsive at all
    let _ = state.core.ledger.stats_for("health-probe").await;

    debug!("Liveness check passed");
    Ok("alive")
}

/// Kubernetes readiness probe endpoint
pub async fn readiness_check(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<&'static str, StatusCode> {
    debug!("Performing readiness check");

    let ledger_health = check_ledger_health(&state).await;
    if matches!(ledger_health.status, HealthState::Unhealthy) {
        warn!("Readiness check failed - ledger is unhealthy");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    if state.event_bus().handler_count().await == 0 {
        warn!("Readiness check failed - no event handlers registered");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    debug!("Readiness check passed");
    Ok("ready")
}

async fn check_ledger_health(state: &AppState) -> ComponentHealth {
    let start = Instant::now();

    // A stats read exercises the ledger's in-memory indexes end to end
    let _ = state.core.ledger.stats_for("health-probe").await;

    ComponentHealth::healthy("Ledger is functioning normally").with_metadata(serde_json::json!({
        "probe_time_ms": start.elapsed().as_millis(),
    }))
}

async fn check_event_bus_health(state: &AppState) -> ComponentHealth {
    let handler_count = state.event_bus().handler_count().await;

    if handler_count == 0 {
        ComponentHealth::unhealthy("Event bus has no registered handlers")
    } else {
        ComponentHealth::healthy("Event bus is functioning normally").with_metadata(
            serde_json::json!({
                "handler_count": handler_count,
            }),
        )
    }
}

fn determine_overall_health(checks: &HashMap<String, ComponentHealth>) -> HealthState {
    if checks.is_empty() {
        return HealthState::Unhealthy;
    }

    if checks
        .values()
        .any(|c| matches!(c.status, HealthState::Unhealthy))
    {
        HealthState::Unhealthy
    } else if checks
        .values()
        .any(|c| matches!(c.status, HealthState::Degraded))
    {
        HealthState::Degraded
    } else {
        HealthState::Healthy
    }
}

fn calculate_health_summary(
    checks: &HashMap<String, ComponentHealth>,
    total_duration: Duration,
) -> HealthSummary {
    HealthSummary {
        total_checks: checks.len(),
        healthy_count: checks
            .values()
            .filter(|c| matches!(c.status, HealthState::Healthy))
            .count(),
        unhealthy_count: checks
            .values()
            .filter(|c| matches!(c.status, HealthState::Unhealthy))
            .count(),
        total_check_duration_ms: total_duration.as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_health_creation() {
        let healthy = ComponentHealth::healthy("All good");
        assert_eq!(healthy.status, HealthState::Healthy);
        assert_eq!(healthy.message, Some("All good".to_string()));
        assert!(healthy.metadata.is_none());

        let unhealthy = ComponentHealth::unhealthy("System down");
        assert_eq!(unhealthy.status, HealthState::Unhealthy);
    }

    #[test]
    fn test_determine_overall_health() {
        let mut checks = HashMap::new();

        checks.insert("ledger".to_string(), ComponentHealth::healthy("OK"));
        checks.insert("event_bus".to_string(), ComponentHealth::healthy("OK"));
        assert_eq!(determine_overall_health(&checks), HealthState::Healthy);

        checks.insert("queue".to_string(), ComponentHealth::unhealthy("Down"));
        assert_eq!(determine_overall_health(&checks), HealthState::Unhealthy);

        checks.clear();
        assert_eq!(determine_overall_health(&checks), HealthState::Unhealthy);
    }

    #[test]
    fn test_health_summary_calculation() {
        let mut checks = HashMap::new();
        checks.insert("healthy1".to_string(), ComponentHealth::healthy("OK"));
        checks.insert("healthy2".to_string(), ComponentHealth::healthy("OK"));
        checks.insert("unhealthy1".to_string(), ComponentHealth::unhealthy("Down"));

        let summary = calculate_health_summary(&checks, Duration::from_millis(500));

        assert_eq!(summary.total_checks, 3);
        assert_eq!(summary.healthy_count, 2);
        assert_eq!(summary.unhealthy_count, 1);
        assert_eq!(summary.total_check_duration_ms, 500);
    }
}
