use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;

use shared_config::{AppConfig, BackendConfig};
use shared_models::{
    Anomaly, AnomalySeverity, Asset, AssetCategory, HealthAssessment, MaintenanceEvent,
    MetricFamily, MetricSample, MetricSummary, RiskLevel,
};

pub struct TestConfig {
    pub backend_url: String,
    pub metric_keys: Vec<String>,
    pub concurrency_limit: usize,
    pub cycle_timeout: Duration,
    pub inventory_path: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:10051".to_string(),
            metric_keys: vec![
                "system.cpu.util".to_string(),
                "vm.memory.util".to_string(),
            ],
            concurrency_limit: 2,
            cycle_timeout: Duration::from_secs(5),
            inventory_path: "inventory.json".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_backend(url: &str) -> Self {
        Self {
            backend_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            backend: BackendConfig {
                url: self.backend_url.clone(),
                username: "Admin".to_string(),
                password: "zabbix".to_string(),
                api_token: None,
                timeout: Duration::from_secs(5),
            },
            metric_keys: self.metric_keys.clone(),
            retry_attempts: 2,
            retry_backoff: Duration::from_millis(1),
            concurrency_limit: self.concurrency_limit,
            cycle_timeout: self.cycle_timeout,
            inventory_path: self.inventory_path.clone(),
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestAsset {
    pub id: String,
    pub name: String,
    pub category: AssetCategory,
    pub host_id: Option<String>,
    pub monitoring_enabled: bool,
    pub last_maintenance: Option<NaiveDate>,
}

impl Default for TestAsset {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: "Test Workstation".to_string(),
            category: AssetCategory::Desktop,
            host_id: Some("10105".to_string()),
            monitoring_enabled: true,
            last_maintenance: None,
        }
    }
}

impl TestAsset {
    pub fn monitored(id: &str, host_id: &str) -> Self {
        Self {
            id: id.to_string(),
            host_id: Some(host_id.to_string()),
            ..Self::default()
        }
    }

    pub fn unmonitored(id: &str) -> Self {
        Self {
            id: id.to_string(),
            host_id: None,
            monitoring_enabled: false,
            ..Self::default()
        }
    }

    pub fn server(id: &str, host_id: &str) -> Self {
        Self {
            name: "Application Server".to_string(),
            category: AssetCategory::Server,
            ..Self::monitored(id, host_id)
        }
    }

    pub fn to_asset(&self) -> Asset {
        Asset {
            id: self.id.clone(),
            name: self.name.clone(),
            asset_tag: Some(format!("TAG-{}", self.id)),
            category: self.category,
            ip_address: None,
            monitoring_host_id: self.host_id.clone(),
            monitoring_enabled: self.monitoring_enabled,
            last_maintenance: self.last_maintenance,
        }
    }
}

/// Fixed reference instant so sample timestamps are reproducible.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

/// One sample per hour starting at [`base_time`].
pub fn sample_stream(asset_id: &str, metric_name: &str, values: &[f64]) -> Vec<MetricSample> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| MetricSample {
            asset_id: asset_id.to_string(),
            metric_name: metric_name.to_string(),
            timestamp: base_time() + ChronoDuration::hours(i as i64),
            value: *value,
        })
        .collect()
}

pub fn summary_with_avg(metric_name: &str, avg: f64) -> MetricSummary {
    MetricSummary {
        metric_name: metric_name.to_string(),
        family: MetricFamily::classify(metric_name),
        sample_count: 24,
        avg,
        min: avg,
        max: avg,
        p95: avg,
        trend_slope: 0.0,
        latest: Some(avg),
        restart_count: None,
    }
}

pub fn anomaly(metric_name: &str, severity: AnomalySeverity, value: f64) -> Anomaly {
    Anomaly {
        asset_id: "asset-1".to_string(),
        metric_name: metric_name.to_string(),
        timestamp: base_time(),
        value,
        severity,
        description: format!("Unusual value detected in {}: {:.1}", metric_name, value),
    }
}

/// Completed events `days_ago` before `now`, most recent first.
pub fn maintenance_history(asset_id: &str, now: DateTime<Utc>, days_ago: &[i64]) -> Vec<MaintenanceEvent> {
    let mut events: Vec<MaintenanceEvent> = days_ago
        .iter()
        .map(|days| MaintenanceEvent {
            asset_id: asset_id.to_string(),
            completed_at: now - ChronoDuration::days(*days),
        })
        .collect();
    events.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    events
}

/// A scored assessment for `asset_id`, as the analysis cycle would emit it.
pub fn assessment_with_risk(
    asset_id: &str,
    risk_level: RiskLevel,
    health_score: f64,
    assessed_at: DateTime<Utc>,
) -> HealthAssessment {
    let mut assessment = HealthAssessment::no_data(&TestAsset::monitored(asset_id, "10105").to_asset(), assessed_at);
    assessment.asset_name = format!("Asset {}", asset_id);
    assessment.health_score = health_score;
    assessment.risk_level = risk_level;
    assessment.recommendations = vec![
        "High CPU utilization detected (92.0%).".to_string(),
        "Critical anomalies detected in system metrics. Schedule immediate inspection.".to_string(),
        "Verify backup systems and disaster recovery procedures.".to_string(),
        "Last maintenance was 120 days ago. Schedule routine maintenance check.".to_string(),
    ];
    assessment
}

pub struct MockZabbixResponses;

impl MockZabbixResponses {
    pub fn login_response(token: &str) -> serde_json::Value {
        json!({ "jsonrpc": "2.0", "result": token, "id": 1 })
    }

    pub fn host_response(host_id: &str) -> serde_json::Value {
        json!({
            "jsonrpc": "2.0",
            "result": [{
                "hostid": host_id,
                "host": format!("host-{}", host_id),
                "name": format!("Host {}", host_id),
                "status": "0",
                "interfaces": [{ "interfaceid": "1", "ip": "10.0.0.10", "dns": "", "port": "10050" }]
            }],
            "id": 2
        })
    }

    pub fn empty_result() -> serde_json::Value {
        json!({ "jsonrpc": "2.0", "result": [], "id": 3 })
    }

    pub fn items_response(host_id: &str, item_id: &str, key: &str) -> serde_json::Value {
        json!({
            "jsonrpc": "2.0",
            "result": [{
                "itemid": item_id,
                "hostid": host_id,
                "name": key,
                "key_": key,
                "value_type": "0",
                "units": "%"
            }],
            "id": 4
        })
    }

    /// History rows one hour apart starting at [`base_time`].
    pub fn history_response(item_id: &str, values: &[f64]) -> serde_json::Value {
        let rows: Vec<serde_json::Value> = values
            .iter()
            .enumerate()
            .map(|(i, value)| {
                json!({
                    "itemid": item_id,
                    "clock": (base_time().timestamp() + i as i64 * 3600).to_string(),
                    "value": value.to_string(),
                    "ns": "0"
                })
            })
            .collect();

        json!({ "jsonrpc": "2.0", "result": rows, "id": 5 })
    }
}
