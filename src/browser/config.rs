// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Interception, interceptor and engine configuration

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::network::{FilterScript, UrlPredicate};

/// Default user agent string
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default session timeout
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Default headroom of the outer guard over the session timeout
pub const DEFAULT_HEADROOM: Duration = Duration::from_millis(5_000);

/// Per-invocation interception configuration.
///
/// Immutable once built. `timeout_ms` is always positive.
#[derive(Debug, Clone)]
pub struct InterceptionConfig {
    timeout_ms: u64,
    url_pattern: Option<Regex>,
    filter_script: Option<String>,
    predicate: Option<Arc<dyn UrlPredicate>>,
    max_requests: Option<usize>,
    page_script: Option<String>,
}

impl InterceptionConfig {
    /// Start building a config with the given session timeout
    pub fn builder(timeout_ms: u64) -> InterceptionConfigBuilder {
        InterceptionConfigBuilder {
            timeout_ms,
            ..Default::default()
        }
    }

    /// Match-everything config with only a timeout
    pub fn with_timeout(timeout_ms: u64) -> Result<Self> {
        Self::builder(timeout_ms).build()
    }

    /// Session timeout in milliseconds
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Session timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Compiled URL pattern; `None` matches every URL
    pub fn url_pattern(&self) -> Option<&Regex> {
        self.url_pattern.as_ref()
    }

    /// Filter script source, if one was given
    pub fn filter_script(&self) -> Option<&str> {
        self.filter_script.as_deref()
    }

    /// Predicate applied after the URL pattern; `None` matches every URL
    pub fn predicate(&self) -> Option<&dyn UrlPredicate> {
        self.predicate.as_deref()
    }

    /// Capture cap; the session completes once it is reached
    pub fn max_requests(&self) -> Option<usize> {
        self.max_requests
    }

    /// Script injected into the page after it loads
    pub fn page_script(&self) -> Option<&str> {
        self.page_script.as_deref()
    }
}

/// Builder for [`InterceptionConfig`]
#[derive(Debug, Default)]
pub struct InterceptionConfigBuilder {
    timeout_ms: u64,
    url_pattern: Option<String>,
    filter_script: Option<String>,
    predicate: Option<Arc<dyn UrlPredicate>>,
    max_requests: Option<usize>,
    page_script: Option<String>,
}

impl InterceptionConfigBuilder {
    /// Regex searched anywhere in the request URL
    pub fn url_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.url_pattern = Some(pattern.into());
        self
    }

    /// Filter script; replaces any custom predicate
    pub fn filter_script(mut self, script: impl Into<String>) -> Self {
        self.filter_script = Some(script.into());
        self.predicate = None;
        self
    }

    /// Custom predicate; replaces any filter script
    pub fn predicate(mut self, predicate: Arc<dyn UrlPredicate>) -> Self {
        self.predicate = Some(predicate);
        self.filter_script = None;
        self
    }

    /// Stop the session after this many captured requests
    pub fn max_requests(mut self, max: usize) -> Self {
        self.max_requests = Some(max);
        self
    }

    /// Script to inject into the page
    pub fn page_script(mut self, script: impl Into<String>) -> Self {
        self.page_script = Some(script.into());
        self
    }

    /// Validate and compile
    pub fn build(self) -> Result<InterceptionConfig> {
        if self.timeout_ms == 0 {
            return Err(Error::config("timeout_ms must be greater than zero"));
        }
        if self.max_requests == Some(0) {
            return Err(Error::config("max_requests must be greater than zero"));
        }

        let url_pattern = self
            .url_pattern
            .map(|p| Regex::new(&p).map_err(|e| Error::invalid_pattern(p.as_str(), e)))
            .transpose()?;

        let filter_script = self.filter_script.filter(|s| !s.trim().is_empty());
        let predicate = match &filter_script {
            Some(script) => Some(Arc::new(FilterScript::parse(script)) as Arc<dyn UrlPredicate>),
            None => self.predicate,
        };

        Ok(InterceptionConfig {
            timeout_ms: self.timeout_ms,
            url_pattern,
            filter_script,
            predicate,
            max_requests: self.max_requests,
            page_script: self.page_script.filter(|s| !s.trim().is_empty()),
        })
    }
}

/// Serializable form of [`InterceptionConfig`], e.g. from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InterceptionSettings {
    pub timeout_ms: u64,
    pub url_pattern: Option<String>,
    pub filter_script: Option<String>,
    pub max_requests: Option<usize>,
    pub page_script: Option<String>,
}

impl Default for InterceptionSettings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            url_pattern: None,
            filter_script: None,
            max_requests: None,
            page_script: None,
        }
    }
}

impl InterceptionSettings {
    /// Parse settings from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Validate and compile into a config
    pub fn into_config(self) -> Result<InterceptionConfig> {
        let mut builder = InterceptionConfig::builder(self.timeout_ms);
        if let Some(pattern) = self.url_pattern {
            builder = builder.url_pattern(pattern);
        }
        if let Some(script) = self.filter_script {
            builder = builder.filter_script(script);
        }
        if let Some(max) = self.max_requests {
            builder = builder.max_requests(max);
        }
        if let Some(script) = self.page_script {
            builder = builder.page_script(script);
        }
        builder.build()
    }
}

impl TryFrom<InterceptionSettings> for InterceptionConfig {
    type Error = Error;

    fn try_from(settings: InterceptionSettings) -> Result<Self> {
        settings.into_config()
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct InterceptorConfig {
    /// Extra time the outer guard allows beyond the session timeout
    pub headroom: Duration,
    /// Configuration for the bundled headless engine
    pub engine: EngineConfig,
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            headroom: DEFAULT_HEADROOM,
            engine: EngineConfig::default(),
        }
    }
}

impl InterceptorConfig {
    /// Create a new interceptor config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set outer guard headroom
    pub fn headroom(mut self, headroom: Duration) -> Self {
        self.headroom = headroom;
        self
    }

    /// Set engine config
    pub fn engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }
}

/// Headless engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// User agent string
    pub user_agent: String,
    /// Timeout for each HTTP fetch
    pub timeout: Duration,
    /// Accept invalid TLS certificates
    pub ignore_https_errors: bool,
    /// Execute page scripts
    pub javascript_enabled: bool,
    /// Proxy URL
    pub proxy: Option<String>,
    /// Headers sent with every fetch
    pub default_headers: Vec<(String, String)>,
    /// Resource types never dispatched
    pub blocked_resources: Vec<ResourceType>,
    /// Hosts never contacted (ad blocking); suffix match
    pub blocked_hosts: Vec<String>,
    /// Upper bound on timer flush rounds after scripts run
    pub max_timer_rounds: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            ignore_https_errors: false,
            javascript_enabled: true,
            proxy: None,
            default_headers: vec![],
            blocked_resources: vec![],
            blocked_hosts: vec![],
            max_timer_rounds: 10,
        }
    }
}

impl EngineConfig {
    /// Create a new engine config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set fetch timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Ignore HTTPS errors
    pub fn ignore_https_errors(mut self, ignore: bool) -> Self {
        self.ignore_https_errors = ignore;
        self
    }

    /// Enable/disable JavaScript
    pub fn javascript_enabled(mut self, enabled: bool) -> Self {
        self.javascript_enabled = enabled;
        self
    }

    /// Set proxy
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Add default header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Block resource types
    pub fn block_resources(mut self, types: Vec<ResourceType>) -> Self {
        self.blocked_resources = types;
        self
    }

    /// Block a host and its subdomains
    pub fn block_host(mut self, host: impl Into<String>) -> Self {
        self.blocked_hosts.push(host.into().to_ascii_lowercase());
        self
    }

    /// Config for recovering script-computed tokens: scripts on, media off,
    /// common ad networks blocked
    pub fn for_token_capture() -> Self {
        let mut config = Self {
            blocked_resources: vec![
                ResourceType::Image,
                ResourceType::Font,
                ResourceType::Stylesheet,
                ResourceType::Media,
            ],
            ..Default::default()
        };
        for host in AD_HOSTS {
            config = config.block_host(*host);
        }
        config
    }

    /// Whether a request to `url` of the given type may be dispatched
    pub fn allows(&self, url: &url::Url, resource: ResourceType) -> bool {
        if self.blocked_resources.contains(&resource) {
            return false;
        }
        let Some(host) = url.host_str() else {
            return true;
        };
        let host = host.to_ascii_lowercase();
        !self.blocked_hosts.iter().any(|blocked| {
            host == *blocked || host.ends_with(&format!(".{}", blocked))
        })
    }
}

const AD_HOSTS: &[&str] = &[
    "doubleclick.net",
    "googlesyndication.com",
    "google-analytics.com",
    "googletagmanager.com",
    "adservice.google.com",
    "popads.net",
    "adsterra.com",
];

/// Resource types a page can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceType {
    /// External scripts
    Script,
    /// Images
    Image,
    /// Stylesheets
    Stylesheet,
    /// Fonts
    Font,
    /// Media (video/audio)
    Media,
    /// Iframes
    Frame,
    /// Script-initiated XHR/fetch/beacon
    Xhr,
    /// Other resources
    Other,
}
