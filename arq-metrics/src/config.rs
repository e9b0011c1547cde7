//! Exporter configuration.
//!
//! Configuration is fixed at construction time. Build it in code with
//! [`MetricsConfig::builder`], or seed the builder from a settings file and
//! `ARQ_METRICS_*` environment variables with
//! [`MetricsConfigBuilder::from_sources`].

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use prometheus::Registry;
use serde::Deserialize;

use crate::duration::parse_duration;
use crate::Error;

/// arq's default queue name.
pub const DEFAULT_QUEUE_NAME: &str = "arq:queue";

/// Suffix arq appends to the queue name to form the health-check key.
pub const HEALTH_CHECK_KEY_SUFFIX: &str = ":health-check";

/// Default time between two health-check reads.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default exposition bind address.
pub const DEFAULT_ADDR: &str = "0.0.0.0";

/// Default exposition port.
pub const DEFAULT_PORT: u16 = 8081;

/// Default prefix for all gauge names.
pub const DEFAULT_NAMESPACE: &str = "arq";

/// Environment variable prefix used by [`MetricsConfigBuilder::from_sources`].
pub const ENV_PREFIX: &str = "ARQ_METRICS";

/// Configuration for the arq metrics exporter.
#[derive(Clone)]
pub struct MetricsConfig {
    queue_name: String,
    health_check_key: String,
    poll_interval: Duration,
    enable_exposition: bool,
    listen_addr: SocketAddr,
    namespace: String,
    registry: Registry,
}

impl MetricsConfig {
    /// Create a new builder for MetricsConfig.
    pub fn builder() -> MetricsConfigBuilder {
        MetricsConfigBuilder::default()
    }

    /// Name of the arq queue being observed.
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Key the health-check string is read from.
    pub fn health_check_key(&self) -> &str {
        &self.health_check_key
    }

    /// Time between two reads. Always greater than zero.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Whether the HTTP exposition server is started.
    pub fn enable_exposition(&self) -> bool {
        self.enable_exposition
    }

    /// Address the exposition server binds to.
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    /// Prefix applied to every gauge name.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Registry the gauges are registered against.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl fmt::Debug for MetricsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsConfig")
            .field("queue_name", &self.queue_name)
            .field("health_check_key", &self.health_check_key)
            .field("poll_interval", &self.poll_interval)
            .field("enable_exposition", &self.enable_exposition)
            .field("listen_addr", &self.listen_addr)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// Builder for MetricsConfig.
#[derive(Default)]
pub struct MetricsConfigBuilder {
    queue_name: Option<String>,
    health_check_key: Option<String>,
    poll_interval: Option<Duration>,
    enable_exposition: Option<bool>,
    addr: Option<String>,
    port: Option<u16>,
    namespace: Option<String>,
    registry: Option<Registry>,
}

/// Settings accepted from files and the environment.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Settings {
    queue_name: Option<String>,
    health_check_key: Option<String>,
    poll_interval: Option<String>,
    enable_exposition: Option<bool>,
    addr: Option<String>,
    port: Option<u16>,
    namespace: Option<String>,
}

impl MetricsConfigBuilder {
    /// Seed a builder from an optional settings file and `ARQ_METRICS_*`
    /// environment variables (environment wins).
    ///
    /// Recognised keys: `queue_name`, `health_check_key`, `poll_interval`
    /// (a duration string such as `"5s"` or `"500ms"`), `enable_exposition`,
    /// `addr`, `port` and `namespace`. The file format is inferred from its
    /// extension. The registry cannot be loaded and must be set in code.
    pub fn from_sources(path: Option<&Path>) -> Result<Self, Error> {
        Self::from_sources_with_prefix(path, ENV_PREFIX)
    }

    /// Like [`from_sources`](Self::from_sources) with a custom environment
    /// variable prefix.
    pub fn from_sources_with_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self, Error> {
        let mut sources = Config::builder();
        if let Some(path) = path {
            sources = sources.add_source(File::from(path));
        }
        let settings: Settings = sources
            .add_source(Environment::with_prefix(env_prefix).try_parsing(true))
            .build()?
            .try_deserialize()?;

        let poll_interval = settings
            .poll_interval
            .as_deref()
            .map(parse_duration)
            .transpose()?;

        Ok(Self {
            queue_name: settings.queue_name,
            health_check_key: settings.health_check_key,
            poll_interval,
            enable_exposition: settings.enable_exposition,
            addr: settings.addr,
            port: settings.port,
            namespace: settings.namespace,
            registry: None,
        })
    }

    /// Set the arq queue name. Defaults to `arq:queue`.
    pub fn queue_name(mut self, name: impl Into<String>) -> Self {
        self.queue_name = Some(name.into());
        self
    }

    /// Override the health-check key. Defaults to `<queue_name>:health-check`.
    pub fn health_check_key(mut self, key: impl Into<String>) -> Self {
        self.health_check_key = Some(key.into());
        self
    }

    /// Set the poll interval. Defaults to 5 seconds.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Enable or disable the HTTP exposition server. Enabled by default.
    pub fn enable_exposition(mut self, enable: bool) -> Self {
        self.enable_exposition = Some(enable);
        self
    }

    /// Set the exposition bind address (an IP address). Defaults to `0.0.0.0`.
    pub fn addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = Some(addr.into());
        self
    }

    /// Set the exposition port. Defaults to 8081; 0 picks a free port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the gauge name prefix. Defaults to `arq`.
    pub fn namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = Some(ns.into());
        self
    }

    /// Set the registry gauges are registered against.
    ///
    /// Defaults to a fresh registry owned by this configuration; pass
    /// `prometheus::default_registry().clone()` to use the process-wide one.
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the MetricsConfig.
    pub fn build(self) -> Result<MetricsConfig, Error> {
        let poll_interval = self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL);
        if poll_interval.is_zero() {
            return Err(Error::InvalidInterval(poll_interval));
        }

        let addr = self.addr.unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let ip: IpAddr = addr
            .trim()
            .parse()
            .map_err(|_| Error::InvalidAddress(addr.clone()))?;
        let listen_addr = SocketAddr::new(ip, self.port.unwrap_or(DEFAULT_PORT));

        let queue_name = self
            .queue_name
            .unwrap_or_else(|| DEFAULT_QUEUE_NAME.to_string());
        let health_check_key = self
            .health_check_key
            .unwrap_or_else(|| format!("{}{}", queue_name, HEALTH_CHECK_KEY_SUFFIX));

        Ok(MetricsConfig {
            queue_name,
            health_check_key,
            poll_interval,
            enable_exposition: self.enable_exposition.unwrap_or(true),
            listen_addr,
            namespace: self
                .namespace
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            registry: self.registry.unwrap_or_default(),
        })
    }
}

impl fmt::Debug for MetricsConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsConfigBuilder")
            .field("queue_name", &self.queue_name)
            .field("health_check_key", &self.health_check_key)
            .field("poll_interval", &self.poll_interval)
            .field("enable_exposition", &self.enable_exposition)
            .field("addr", &self.addr)
            .field("port", &self.port)
            .field("namespace", &self.namespace)
            .field("registry", &self.registry.is_some())
            .finish()
    }
}
