use serde::Deserialize;

/// Env var that overrides `store.auth_token`, so tokens stay out of config files.
pub const AUTH_TOKEN_ENV: &str = "FARMWATCH_AUTH_TOKEN";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub polling: PollingConfig,
    pub publishing: PublishingConfig,
    #[serde(default)]
    pub automation: AutomationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Firebase-style realtime database over REST.
    Rtdb,
    /// In-process tree, optionally seeded from `seed_path`.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_kind")]
    pub kind: StoreKind,
    #[serde(default)]
    pub base_url: String,
    /// User whose device tree is monitored (users/{uid}/devices).
    pub uid: String,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// JSON export of a devices tree, used when kind = "memory".
    #[serde(default)]
    pub seed_path: Option<String>,
}

fn default_store_kind() -> StoreKind {
    StoreKind::Rtdb
}

fn default_request_timeout_ms() -> u64 {
    4000
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    pub interval_ms: u64,
    /// Reload the device list every N ticks (and whenever the registry is empty).
    #[serde(default = "default_device_list_every_ticks")]
    pub device_list_every_ticks: u64,
    /// Dashboard snapshots kept in memory for charts.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// How often to log app stats (ws clients, ticks, failed reads) at INFO level.
    pub stats_log_interval_secs: u64,
}

fn default_device_list_every_ticks() -> u64 {
    12
}

fn default_history_capacity() -> usize {
    720
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    /// Max number of dashboard snapshots buffered for /ws/dashboard (slow clients may lag).
    pub broadcast_capacity: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AutomationConfig {
    /// Write ON to the valves of a zone whose moisture falls into the critical band.
    #[serde(default)]
    pub auto_watering: bool,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        let mut config = Self::load_from_str(&s)?;
        if let Ok(token) = std::env::var(AUTH_TOKEN_ENV) {
            config.store.auth_token = Some(token);
        }
        Ok(config)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(!self.store.uid.is_empty(), "store.uid must be non-empty");
        if self.store.kind == StoreKind::Rtdb {
            anyhow::ensure!(
                !self.store.base_url.is_empty(),
                "store.base_url must be non-empty when store.kind = \"rtdb\""
            );
            anyhow::ensure!(
                self.store.base_url.starts_with("http://")
                    || self.store.base_url.starts_with("https://"),
                "store.base_url must be an http(s) URL, got {}",
                self.store.base_url
            );
        }
        anyhow::ensure!(
            self.store.request_timeout_ms > 0,
            "store.request_timeout_ms must be > 0, got {}",
            self.store.request_timeout_ms
        );
        anyhow::ensure!(
            self.polling.interval_ms > 0,
            "polling.interval_ms must be > 0, got {}",
            self.polling.interval_ms
        );
        anyhow::ensure!(
            self.polling.device_list_every_ticks > 0,
            "polling.device_list_every_ticks must be > 0, got {}",
            self.polling.device_list_every_ticks
        );
        anyhow::ensure!(
            self.polling.history_capacity > 0,
            "polling.history_capacity must be > 0, got {}",
            self.polling.history_capacity
        );
        anyhow::ensure!(
            self.polling.stats_log_interval_secs > 0,
            "polling.stats_log_interval_secs must be > 0, got {}",
            self.polling.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.publishing.broadcast_capacity > 0,
            "publishing.broadcast_capacity must be > 0, got {}",
            self.publishing.broadcast_capacity
        );
        Ok(())
    }
}
