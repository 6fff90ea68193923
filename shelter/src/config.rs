//! Worker configuration.
//!
//! A [`WorkerConfig`] is built once per deployed version and shared by `Arc`.
//! The generation name is derived from it and nothing else, so bumping
//! `version` is the single switch that invalidates every cached entry.
//!
//! ```
//! use shelter::config::WorkerConfig;
//!
//! let config = WorkerConfig::from_yaml(r#"
//! version: v1.0.0
//! cache_prefix: dashboard
//! network_timeout: 5s
//! precache: ["/", "/index.html", "/offline.html"]
//! routes:
//!   - path_prefix: /api/live/
//!     strategy: network-only
//! "#)?;
//!
//! assert_eq!(config.generation_name().as_str(), "dashboard-v1.0.0");
//! # Ok::<(), shelter::config::ConfigError>(())
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use shelter_core::{GenerationName, Origin, RequestKey, Strategy};
use smol_str::SmolStr;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The YAML document could not be deserialized.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// A field holds a value the worker cannot run with.
    #[error("invalid configuration: {field} - {reason}")]
    Invalid {
        /// Offending field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Response synthesized when a non-navigation request cannot be served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineResponse {
    /// Status code, `408 Request Timeout` by default.
    #[serde(default = "default_offline_status")]
    pub status: u16,
    /// Plain-text body.
    #[serde(default = "default_offline_body")]
    pub body: String,
}

impl Default for OfflineResponse {
    fn default() -> Self {
        Self {
            status: default_offline_status(),
            body: default_offline_body(),
        }
    }
}

/// Forces a strategy for every path under `path_prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteOverride {
    /// Path prefix, matched against the request path.
    pub path_prefix: String,
    /// Strategy to use.
    pub strategy: Strategy,
}

/// Shape of notifications built from push payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationDefaults {
    /// Notification title.
    pub title: String,
    /// Body used when the push payload carries no text.
    pub body: String,
    /// Icon URL.
    pub icon: Option<String>,
    /// Badge URL.
    pub badge: Option<String>,
    /// Vibration pattern in milliseconds.
    pub vibrate: Vec<u32>,
    /// URL opened when the notification is clicked.
    pub open_url: String,
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        Self {
            title: "Application update".to_owned(),
            body: "New update available".to_owned(),
            icon: None,
            badge: None,
            vibrate: vec![200, 100, 200],
            open_url: "/".to_owned(),
        }
    }
}

/// URL shape rules used by the default classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierRules {
    /// File extensions (without dot) served cache-first.
    pub static_extensions: Vec<SmolStr>,
    /// Path fragments marking static assets.
    pub asset_markers: Vec<String>,
    /// Path fragments marking API calls.
    pub api_markers: Vec<String>,
    /// Path fragments marking data documents.
    pub data_markers: Vec<String>,
    /// File extensions (without dot) treated as documents.
    pub document_extensions: Vec<SmolStr>,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        let ext = |list: &[&'static str]| list.iter().map(|e| SmolStr::new_static(e)).collect();
        Self {
            static_extensions: ext(&[
                "js", "css", "woff", "woff2", "ttf", "eot", "otf", "svg", "png", "jpg", "jpeg",
                "gif", "ico", "webp", "avif",
            ]),
            asset_markers: vec!["/assets/".to_owned()],
            api_markers: vec!["/api/".to_owned()],
            data_markers: vec![".json".to_owned()],
            document_extensions: ext(&["html", "htm"]),
        }
    }
}

/// Configuration of one deployed worker version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Application origin. `None` treats only origin-relative URLs as
    /// same-origin.
    #[serde(default)]
    pub origin: Option<Origin>,
    /// Generation name prefix.
    #[serde(default = "default_prefix")]
    pub cache_prefix: SmolStr,
    /// Version tag naming the current generation.
    pub version: SmolStr,
    /// Root the manifest and offline page paths are resolved against.
    #[serde(default = "default_app_root")]
    pub app_root: String,
    /// Paths fetched and stored during install, all or nothing.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,
    /// Page served to navigations when nothing else is available.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,
    /// Response served to other requests when nothing else is available.
    #[serde(default)]
    pub offline_response: OfflineResponse,
    /// Upper bound on a single network call.
    #[serde(default, with = "humantime_serde")]
    pub network_timeout: Option<Duration>,
    /// Promote right after install instead of waiting for clients to leave.
    #[serde(default)]
    pub skip_waiting_on_install: bool,
    /// Strategy overrides consulted before the URL shape rules.
    #[serde(default)]
    pub routes: Vec<RouteOverride>,
    /// Push notification defaults.
    #[serde(default)]
    pub notification: NotificationDefaults,
    /// URL shape rules.
    #[serde(default)]
    pub classifier: ClassifierRules,
}

fn default_prefix() -> SmolStr {
    SmolStr::new_static("shelter")
}

fn default_app_root() -> String {
    "/".to_owned()
}

fn default_precache() -> Vec<String> {
    ["/", "/index.html", "/offline.html", "/manifest.json"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

fn default_offline_page() -> String {
    "/offline.html".to_owned()
}

fn default_offline_status() -> u16 {
    408
}

fn default_offline_body() -> String {
    "Network error happened".to_owned()
}

impl WorkerConfig {
    /// Starts a builder with defaults for everything but the version.
    pub fn builder(version: impl Into<SmolStr>) -> WorkerConfigBuilder {
        WorkerConfigBuilder {
            config: WorkerConfig {
                origin: None,
                cache_prefix: default_prefix(),
                version: version.into(),
                app_root: default_app_root(),
                precache: default_precache(),
                offline_page: default_offline_page(),
                offline_response: OfflineResponse::default(),
                network_timeout: None,
                skip_waiting_on_install: false,
                routes: Vec::new(),
                notification: NotificationDefaults::default(),
                classifier: ClassifierRules::default(),
            },
        }
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: WorkerConfig =
            serde_saphyr::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the worker relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.trim().is_empty() {
            return Err(ConfigError::invalid("version", "must not be empty"));
        }
        if self.cache_prefix.trim().is_empty() {
            return Err(ConfigError::invalid("cache_prefix", "must not be empty"));
        }
        if !self.app_root.starts_with('/') {
            return Err(ConfigError::invalid("app_root", "must start with `/`"));
        }
        if let Some(path) = self.precache.iter().find(|path| !path.starts_with('/')) {
            return Err(ConfigError::invalid(
                "precache",
                format!("`{path}` must start with `/`"),
            ));
        }
        if !self.precache.contains(&self.offline_page) {
            return Err(ConfigError::invalid(
                "offline_page",
                format!("`{}` must be listed in precache", self.offline_page),
            ));
        }
        if !(400..=599).contains(&self.offline_response.status) {
            return Err(ConfigError::invalid(
                "offline_response.status",
                "must be a 4xx or 5xx status",
            ));
        }
        if let Some(route) = self.routes.iter().find(|r| !r.path_prefix.starts_with('/')) {
            return Err(ConfigError::invalid(
                "routes",
                format!("`{}` must start with `/`", route.path_prefix),
            ));
        }
        Ok(())
    }

    /// Name of the generation this configuration serves from.
    pub fn generation_name(&self) -> GenerationName {
        GenerationName::new(&self.cache_prefix, &self.version)
    }

    /// Resolves a manifest path against the application root.
    pub fn resolve(&self, path: &str) -> String {
        let root = self.app_root.trim_end_matches('/');
        format!("{root}{path}")
    }

    /// Manifest URLs resolved against the application root, in order.
    pub fn precache_urls(&self) -> impl Iterator<Item = String> + '_ {
        self.precache.iter().map(|path| self.resolve(path))
    }

    /// Store key of the offline page.
    pub fn offline_key(&self) -> RequestKey {
        RequestKey::get(&self.resolve(&self.offline_page))
    }
}

/// Builder for [`WorkerConfig`].
#[derive(Debug, Clone)]
pub struct WorkerConfigBuilder {
    config: WorkerConfig,
}

impl WorkerConfigBuilder {
    /// Sets the application origin.
    pub fn origin(mut self, origin: Origin) -> Self {
        self.config.origin = Some(origin);
        self
    }

    /// Sets the generation name prefix.
    pub fn cache_prefix(mut self, prefix: impl Into<SmolStr>) -> Self {
        self.config.cache_prefix = prefix.into();
        self
    }

    /// Sets the application root.
    pub fn app_root(mut self, root: impl Into<String>) -> Self {
        self.config.app_root = root.into();
        self
    }

    /// Replaces the precache manifest.
    pub fn precache<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.precache = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the offline page path.
    pub fn offline_page(mut self, path: impl Into<String>) -> Self {
        self.config.offline_page = path.into();
        self
    }

    /// Sets the synthetic offline response.
    pub fn offline_response(mut self, status: u16, body: impl Into<String>) -> Self {
        self.config.offline_response = OfflineResponse {
            status,
            body: body.into(),
        };
        self
    }

    /// Bounds every network call.
    pub fn network_timeout(mut self, timeout: Duration) -> Self {
        self.config.network_timeout = Some(timeout);
        self
    }

    /// Promotes the worker right after install.
    pub fn skip_waiting_on_install(mut self, enabled: bool) -> Self {
        self.config.skip_waiting_on_install = enabled;
        self
    }

    /// Adds a strategy override.
    pub fn route(mut self, path_prefix: impl Into<String>, strategy: Strategy) -> Self {
        self.config.routes.push(RouteOverride {
            path_prefix: path_prefix.into(),
            strategy,
        });
        self
    }

    /// Sets notification defaults.
    pub fn notification(mut self, notification: NotificationDefaults) -> Self {
        self.config.notification = notification;
        self
    }

    /// Replaces the classifier rules.
    pub fn classifier(mut self, rules: ClassifierRules) -> Self {
        self.config.classifier = rules;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<WorkerConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
