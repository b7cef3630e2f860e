use std::time::Duration;

use blockscout_service_launcher::{
    database::{DatabaseConnectSettings, DatabaseSettings},
    launcher::{ConfigSettings, MetricsSettings, ServerSettings},
    tracing::{JaegerSettings, TracingSettings},
};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub metrics: MetricsSettings,
    #[serde(default)]
    pub tracing: TracingSettings,
    #[serde(default)]
    pub jaeger: JaegerSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub bus: BusSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub pool: PoolSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub dedup: DedupSettings,
    #[serde(default)]
    pub edge: EdgeSettings,
    pub upstream: UpstreamSettings,
}

impl ConfigSettings for Settings {
    const SERVICE_NAME: &'static str = "CURRENCY_SYNC";
}

impl Settings {
    pub fn default(database_url: String) -> Self {
        Self {
            server: Default::default(),
            metrics: Default::default(),
            tracing: Default::default(),
            jaeger: Default::default(),
            database: DatabaseSettings {
                connect: DatabaseConnectSettings::Url(database_url),
                create_database: Default::default(),
                run_migrations: Default::default(),
                connect_options: Default::default(),
            },
            bus: Default::default(),
            retry: Default::default(),
            pool: Default::default(),
            cache: Default::default(),
            dedup: Default::default(),
            edge: Default::default(),
            upstream: UpstreamSettings {
                base_url: Url::parse("https://api.exchangeratesapi.io").unwrap(),
                api_key: String::new(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BusSettings {
    pub brokers: String,
    pub group_id: String,
    pub transactional_id_prefix: String,
    pub enable_idempotence: bool,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            group_id: "currency-sync".to_string(),
            transactional_id_prefix: "currency-sync-producer".to_string(),
            enable_idempotence: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub backoff_ms: u64,
    pub multiplier_millis: u64,
    pub cap_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_ms: 2000,
            multiplier_millis: 2000,
            cap_ms: 5000,
        }
    }
}

impl From<RetrySettings> for currency_sync_logic::upstream::RetrySettings {
    fn from(settings: RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            backoff: Duration::from_millis(settings.backoff_ms),
            multiplier: settings.multiplier_millis as f64 / 1000.0,
            cap: Duration::from_millis(settings.cap_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    pub min: usize,
    pub max: usize,
    pub queue: usize,
    pub idle_sec: u64,
    pub monitor_interval_sec: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            min: 5,
            max: 20,
            queue: 500,
            idle_sec: 60,
            monitor_interval_sec: 30,
        }
    }
}

impl From<PoolSettings> for currency_sync_logic::PoolSettings {
    fn from(settings: PoolSettings) -> Self {
        Self {
            min: settings.min,
            max: settings.max,
            queue_capacity: settings.queue,
            idle_seconds: settings.idle_sec,
            monitor_interval_seconds: settings.monitor_interval_sec,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    pub freshness_sec: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { freshness_sec: 3600 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DedupSettings {
    pub ttl_days: i64,
    pub hard_purge_days: i64,
}

impl Default for DedupSettings {
    fn default() -> Self {
        Self {
            ttl_days: 10,
            hard_purge_days: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct EdgeSettings {
    pub request_timeout_sec: u64,
}

impl Default for EdgeSettings {
    fn default() -> Self {
        Self {
            request_timeout_sec: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UpstreamSettings {
    pub base_url: Url,
    pub api_key: String,
}
