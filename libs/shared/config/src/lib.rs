use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_METRIC_KEYS: &[&str] = &[
    "system.cpu.util",
    "vm.memory.util",
    "vfs.fs.size[/,pused]",
    "system.uptime",
    "net.if.in[eth0]",
    "net.if.out[eth0]",
    "sensor.temp.value",
];

/// Accepted ranges for settings that feed timers and date arithmetic.
pub const POLL_INTERVAL_SECS_RANGE: (u64, u64) = (1, 7 * 86_400);
pub const CYCLE_TIMEOUT_SECS_RANGE: (u64, u64) = (1, 86_400);
pub const LOOKBACK_DAYS_RANGE: (i64, i64) = (1, 3_650);
pub const ALERT_WINDOW_HOURS_RANGE: (u64, u64) = (1, 8_760);

/// Warning/critical cutoffs for one metric family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPair {
    pub warning: f64,
    pub critical: f64,
}

impl ThresholdPair {
    pub const fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }
}

/// Average-based cutoffs used by the health score penalties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringThresholds {
    pub cpu: ThresholdPair,
    pub memory: ThresholdPair,
    pub disk: ThresholdPair,
    pub temperature: ThresholdPair,
    pub restart_limit: usize,
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self {
            cpu: ThresholdPair::new(80.0, 90.0),
            memory: ThresholdPair::new(85.0, 95.0),
            disk: ThresholdPair::new(85.0, 95.0),
            temperature: ThresholdPair::new(70.0, 80.0),
            restart_limit: 5,
        }
    }
}

/// Per-sample cutoffs that grade an anomalous point. `warning` maps to high.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityCutoffs {
    pub cpu: ThresholdPair,
    pub memory: ThresholdPair,
    pub disk: ThresholdPair,
    pub temperature: ThresholdPair,
}

impl Default for SeverityCutoffs {
    fn default() -> Self {
        Self {
            cpu: ThresholdPair::new(85.0, 95.0),
            memory: ThresholdPair::new(90.0, 98.0),
            disk: ThresholdPair::new(90.0, 98.0),
            temperature: ThresholdPair::new(75.0, 85.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub api_token: Option<String>,
    pub timeout: Duration,
}

impl BackendConfig {
    /// JSON-RPC endpoint derived from the configured base URL.
    pub fn endpoint(&self) -> String {
        let base = self.url.trim_end_matches('/');
        if base.ends_with("api_jsonrpc.php") {
            base.to_string()
        } else {
            format!("{}/api_jsonrpc.php", base)
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub poll_interval: Duration,
    pub lookback_days: i64,
    pub metric_keys: Vec<String>,
    pub host_cache_ttl: Duration,
    pub item_cache_ttl: Duration,
    pub retry_attempts: u32,
    pub retry_backoff: Duration,
    pub concurrency_limit: usize,
    pub cycle_timeout: Duration,
    pub contamination: f64,
    pub anomaly_seed: u64,
    pub alert_window: Duration,
    pub scoring: ScoringThresholds,
    pub severity: SeverityCutoffs,
    pub redis_url: Option<String>,
    pub alert_webhook_url: Option<String>,
    pub inventory_path: String,
    pub server_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig {
                url: String::new(),
                username: String::new(),
                password: String::new(),
                api_token: None,
                timeout: Duration::from_secs(30),
            },
            poll_interval: Duration::from_secs(3600),
            lookback_days: 30,
            metric_keys: DEFAULT_METRIC_KEYS.iter().map(|k| k.to_string()).collect(),
            host_cache_ttl: Duration::from_secs(60),
            item_cache_ttl: Duration::from_secs(120),
            retry_attempts: 3,
            retry_backoff: Duration::from_millis(200),
            concurrency_limit: 4,
            cycle_timeout: Duration::from_secs(120),
            contamination: 0.1,
            anomaly_seed: 42,
            alert_window: Duration::from_secs(24 * 3600),
            scoring: ScoringThresholds::default(),
            severity: SeverityCutoffs::default(),
            redis_url: None,
            alert_webhook_url: None,
            inventory_path: "inventory.json".to_string(),
            server_port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let backend = BackendConfig {
            url: env::var("ZABBIX_URL").unwrap_or_else(|_| {
                warn!("ZABBIX_URL not set, using empty value");
                String::new()
            }),
            username: env::var("ZABBIX_USERNAME").unwrap_or_else(|_| {
                warn!("ZABBIX_USERNAME not set, using empty value");
                String::new()
            }),
            password: env::var("ZABBIX_PASSWORD").unwrap_or_default(),
            api_token: optional_var("ZABBIX_API_TOKEN"),
            timeout: Duration::from_secs(parse_var(
                "ZABBIX_TIMEOUT_SECONDS",
                defaults.backend.timeout.as_secs(),
            )),
        };

        let metric_keys = optional_var("MONITOR_METRIC_KEYS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|keys| !keys.is_empty())
            .unwrap_or(defaults.metric_keys);

        let scoring = ScoringThresholds {
            cpu: threshold_var("CPU", defaults.scoring.cpu),
            memory: threshold_var("MEMORY", defaults.scoring.memory),
            disk: threshold_var("DISK", defaults.scoring.disk),
            temperature: threshold_var("TEMPERATURE", defaults.scoring.temperature),
            restart_limit: parse_var("MONITOR_RESTART_LIMIT", defaults.scoring.restart_limit),
        };

        let mut contamination = parse_var("MONITOR_CONTAMINATION", defaults.contamination);
        if !(contamination > 0.0 && contamination <= 0.5) {
            warn!(contamination, "MONITOR_CONTAMINATION out of range (0, 0.5], using 0.1");
            contamination = defaults.contamination;
        }

        let config = Self {
            backend,
            poll_interval: Duration::from_secs(bounded_var(
                "MONITOR_POLL_INTERVAL_SECONDS",
                defaults.poll_interval.as_secs(),
                POLL_INTERVAL_SECS_RANGE,
            )),
            lookback_days: bounded_var(
                "MONITOR_LOOKBACK_DAYS",
                defaults.lookback_days,
                LOOKBACK_DAYS_RANGE,
            ),
            metric_keys,
            host_cache_ttl: Duration::from_secs(parse_var(
                "MONITOR_HOST_CACHE_TTL_SECONDS",
                defaults.host_cache_ttl.as_secs(),
            )),
            item_cache_ttl: Duration::from_secs(parse_var(
                "MONITOR_ITEM_CACHE_TTL_SECONDS",
                defaults.item_cache_ttl.as_secs(),
            )),
            retry_attempts: parse_var("MONITOR_RETRY_ATTEMPTS", defaults.retry_attempts).max(1),
            retry_backoff: Duration::from_millis(parse_var(
                "MONITOR_RETRY_BACKOFF_MS",
                defaults.retry_backoff.as_millis() as u64,
            )),
            concurrency_limit: parse_var("MONITOR_CONCURRENCY_LIMIT", defaults.concurrency_limit)
                .max(1),
            cycle_timeout: Duration::from_secs(bounded_var(
                "MONITOR_CYCLE_TIMEOUT_SECONDS",
                defaults.cycle_timeout.as_secs(),
                CYCLE_TIMEOUT_SECS_RANGE,
            )),
            contamination,
            anomaly_seed: parse_var("MONITOR_ANOMALY_SEED", defaults.anomaly_seed),
            alert_window: Duration::from_secs(
                bounded_var("MONITOR_ALERT_WINDOW_HOURS", 24u64, ALERT_WINDOW_HOURS_RANGE) * 3600,
            ),
            scoring,
            severity: defaults.severity,
            redis_url: optional_var("REDIS_URL"),
            alert_webhook_url: optional_var("ALERT_WEBHOOK_URL"),
            inventory_path: env::var("ASSET_INVENTORY_PATH")
                .unwrap_or(defaults.inventory_path),
            server_port: parse_var("SERVER_PORT", defaults.server_port),
        };

        if !config.is_configured() {
            warn!("Monitoring backend not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.backend.url.is_empty()
            && (self.backend.api_token.is_some() || !self.backend.username.is_empty())
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", name, raw);
            default
        }),
        Err(_) => default,
    }
}

fn bounded_var<T>(name: &str, default: T, range: (T, T)) -> T
where
    T: FromStr + Copy + PartialOrd + std::fmt::Display,
{
    clamp_setting(name, parse_var(name, default), range)
}

/// Pulls `value` into `range`, warning when it had to move.
pub fn clamp_setting<T>(name: &str, value: T, (min, max): (T, T)) -> T
where
    T: Copy + PartialOrd + std::fmt::Display,
{
    if value < min {
        warn!("{} = {} is below the minimum, using {}", name, value, min);
        min
    } else if value > max {
        warn!("{} = {} is above the maximum, using {}", name, value, max);
        max
    } else {
        value
    }
}

fn threshold_var(family: &str, default: ThresholdPair) -> ThresholdPair {
    let pair = ThresholdPair {
        warning: parse_var(&format!("MONITOR_{}_WARNING", family), default.warning),
        critical: parse_var(&format!("MONITOR_{}_CRITICAL", family), default.critical),
    };

    if pair.warning > pair.critical {
        warn!("{} warning threshold exceeds critical threshold, using defaults", family);
        return default;
    }

    pair
}
