// =====================================================================================
// ZABBIX JSON-RPC BACKEND
// =====================================================================================

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use shared_config::BackendConfig;

use crate::error::MetricsError;
use crate::models::{BackendItem, HistoryPoint, HostInfo, HostInterface, HostStatus};
use crate::services::backend::MonitoringBackend;

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: String,
}

impl RpcError {
    fn is_auth_failure(&self) -> bool {
        let data = self.data.to_ascii_lowercase();
        data.contains("session terminated")
            || data.contains("not authorized")
            || data.contains("not authorised")
            || data.contains("re-login")
    }
}

#[derive(Debug, Deserialize)]
struct RawInterface {
    interfaceid: String,
    #[serde(default)]
    ip: String,
    #[serde(default)]
    dns: String,
    #[serde(default)]
    port: String,
}

#[derive(Debug, Deserialize)]
struct RawHost {
    hostid: String,
    host: String,
    name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    interfaces: Vec<RawInterface>,
}

impl From<RawHost> for HostInfo {
    fn from(raw: RawHost) -> Self {
        Self {
            host_id: raw.hostid,
            host: raw.host,
            name: raw.name,
            status: if raw.status == "1" {
                HostStatus::Unmonitored
            } else {
                HostStatus::Monitored
            },
            interfaces: raw
                .interfaces
                .into_iter()
                .map(|i| HostInterface {
                    interface_id: i.interfaceid,
                    ip: i.ip,
                    dns: i.dns,
                    port: i.port,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawItem {
    itemid: String,
    #[serde(default)]
    hostid: String,
    #[serde(default)]
    name: String,
    key_: String,
    #[serde(default)]
    value_type: String,
    #[serde(default)]
    units: String,
}

#[derive(Debug, Deserialize)]
struct RawHistory {
    clock: String,
    value: String,
}

pub struct ZabbixBackend {
    client: Client,
    endpoint: String,
    username: String,
    password: String,
    static_token: Option<String>,
    session: RwLock<Option<String>>,
    request_id: AtomicU64,
}

impl ZabbixBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, MetricsError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MetricsError::BackendUnavailable(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            username: config.username.clone(),
            password: config.password.clone(),
            static_token: config.api_token.clone(),
            session: RwLock::new(None),
            request_id: AtomicU64::new(1),
        })
    }

    fn headers(&self, token: Option<&str>) -> Result<HeaderMap, MetricsError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json-rpc"));

        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| MetricsError::Protocol(format!("Invalid API token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    async fn send<T>(&self, method: &str, params: Value, token: Option<&str>) -> Result<T, RpcFailure>
    where
        T: DeserializeOwned,
    {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": self.request_id.fetch_add(1, Ordering::Relaxed),
        });

        debug!(method, endpoint = %self.endpoint, "Zabbix request");

        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers(token).map_err(RpcFailure::Other)?)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcFailure::Other(e.into()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("Zabbix API error ({}): {}", status, text);
            return Err(RpcFailure::Other(MetricsError::BackendUnavailable(format!(
                "HTTP {} from monitoring backend",
                status
            ))));
        }

        let envelope: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| RpcFailure::Other(e.into()))?;

        if let Some(err) = envelope.error {
            if err.is_auth_failure() {
                return Err(RpcFailure::Auth(format!("{} {}", err.message, err.data)));
            }
            return Err(RpcFailure::Other(MetricsError::Protocol(format!(
                "{} ({}): {}",
                err.message, err.code, err.data
            ))));
        }

        envelope.result.ok_or_else(|| {
            RpcFailure::Other(MetricsError::Protocol(format!(
                "{} returned neither result nor error",
                method
            )))
        })
    }

    async fn login(&self) -> Result<String, MetricsError> {
        let params = json!({
            "username": self.username,
            "password": self.password,
        });

        match self.send::<String>("user.login", params, None).await {
            Ok(token) => {
                info!("Successfully authenticated against Zabbix API");
                *self.session.write().await = Some(token.clone());
                Ok(token)
            }
            Err(RpcFailure::Auth(msg)) => {
                error!("Zabbix API authentication failed: {}", msg);
                Err(MetricsError::BackendUnavailable(format!("authentication failed: {}", msg)))
            }
            Err(RpcFailure::Other(MetricsError::Protocol(msg))) => {
                error!("Zabbix API authentication failed: {}", msg);
                Err(MetricsError::BackendUnavailable(format!("authentication failed: {}", msg)))
            }
            Err(RpcFailure::Other(err)) => Err(err),
        }
    }

    async fn token(&self) -> Result<String, MetricsError> {
        if let Some(token) = &self.static_token {
            return Ok(token.clone());
        }
        if let Some(token) = self.session.read().await.clone() {
            return Ok(token);
        }
        self.login().await
    }

    /// Authenticated call; an expired session is re-established once.
    async fn call<T>(&self, method: &str, params: Value) -> Result<T, MetricsError>
    where
        T: DeserializeOwned,
    {
        let token = self.token().await?;

        match self.send(method, params.clone(), Some(&token)).await {
            Ok(result) => Ok(result),
            Err(RpcFailure::Auth(msg)) if self.static_token.is_none() => {
                warn!(method, "Zabbix session rejected ({}), re-authenticating", msg);
                *self.session.write().await = None;
                let token = self.login().await?;
                self.send(method, params, Some(&token))
                    .await
                    .map_err(RpcFailure::into_error)
            }
            Err(failure) => Err(failure.into_error()),
        }
    }
}

enum RpcFailure {
    Auth(String),
    Other(MetricsError),
}

impl RpcFailure {
    fn into_error(self) -> MetricsError {
        match self {
            RpcFailure::Auth(msg) => {
                MetricsError::BackendUnavailable(format!("authentication rejected: {}", msg))
            }
            RpcFailure::Other(err) => err,
        }
    }
}

fn parse_clock(raw: &str) -> Option<DateTime<Utc>> {
    let secs: i64 = raw.parse().ok()?;
    Utc.timestamp_opt(secs, 0).single()
}

#[async_trait]
impl MonitoringBackend for ZabbixBackend {
    #[instrument(skip(self))]
    async fn query_host_info(&self, host_id: &str) -> Result<Option<HostInfo>, MetricsError> {
        let hosts: Vec<RawHost> = self
            .call(
                "host.get",
                json!({
                    "hostids": [host_id],
                    "output": ["hostid", "host", "name", "status"],
                    "selectInterfaces": ["interfaceid", "ip", "dns", "port"],
                }),
            )
            .await?;

        Ok(hosts.into_iter().next().map(HostInfo::from))
    }

    #[instrument(skip(self))]
    async fn query_items(
        &self,
        host_id: &str,
        metric_key: &str,
    ) -> Result<Vec<BackendItem>, MetricsError> {
        let items: Vec<RawItem> = self
            .call(
                "item.get",
                json!({
                    "hostids": [host_id],
                    "search": { "key_": metric_key },
                    "output": ["itemid", "hostid", "name", "key_", "value_type", "units"],
                }),
            )
            .await?;

        Ok(items
            .into_iter()
            .map(|raw| BackendItem {
                item_id: raw.itemid,
                host_id: if raw.hostid.is_empty() { host_id.to_string() } else { raw.hostid },
                name: raw.name,
                key: raw.key_,
                value_type: raw.value_type.parse().unwrap_or(3),
                units: raw.units,
            })
            .collect())
    }

    #[instrument(skip(self, item), fields(item_id = %item.item_id))]
    async fn query_history(
        &self,
        item: &BackendItem,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<HistoryPoint>, MetricsError> {
        let rows: Vec<RawHistory> = self
            .call(
                "history.get",
                json!({
                    "itemids": [item.item_id],
                    "history": item.value_type,
                    "time_from": from.timestamp(),
                    "time_till": to.timestamp(),
                    "sortfield": "clock",
                    "sortorder": "ASC",
                    "output": "extend",
                }),
            )
            .await?;

        let total = rows.len();
        let points: Vec<HistoryPoint> = rows
            .into_iter()
            .filter_map(|row| {
                Some(HistoryPoint {
                    clock: parse_clock(&row.clock)?,
                    value: row.value.trim().parse().ok()?,
                })
            })
            .collect();

        if points.len() < total {
            debug!(
                item = %item.key,
                dropped = total - points.len(),
                "skipped non-numeric history rows"
            );
        }

        Ok(points)
    }
}
