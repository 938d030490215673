//! Client configuration with validated construction.

use std::time::Duration;

use teleplane_core::{PlaneError, PlaneResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings a transport implementation consumes. Construction goes
/// through [`ClientConfigBuilder`] so invalid combinations are rejected before
/// any client exists.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    pub ca_file: Option<String>,
    pub cert_file: Option<String>,
    pub key_file: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn builder(endpoint: &str) -> ClientConfigBuilder {
        ClientConfigBuilder {
            endpoint: endpoint.to_string(),
            ..Default::default()
        }
    }

    /// Read settings from `TELEPLANE_*` environment variables.
    pub fn from_env() -> PlaneResult<Self> {
        let mut builder = Self::builder(&env("TELEPLANE_ENDPOINT").unwrap_or_default());
        if let Some(v) = env("TELEPLANE_USERNAME") {
            builder = builder.username(&v);
        }
        if let Some(v) = env("TELEPLANE_PASSWORD") {
            builder = builder.password(&v);
        }
        if let Some(v) = env("TELEPLANE_API_KEY") {
            builder = builder.api_key(&v);
        }
        if let Some(v) = env("TELEPLANE_TLS_CA") {
            builder = builder.ca_file(&v);
        }
        if let Some(v) = env("TELEPLANE_TLS_CERT") {
            builder = builder.cert_file(&v);
        }
        if let Some(v) = env("TELEPLANE_TLS_KEY") {
            builder = builder.key_file(&v);
        }
        if let Some(v) = env("TELEPLANE_TIMEOUT_SECS") {
            let secs = v.parse::<u64>().map_err(|_| {
                PlaneError::Validation(format!("TELEPLANE_TIMEOUT_SECS must be an integer: {v:?}"))
            })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder.build()
    }
}

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    endpoint: String,
    username: Option<String>,
    password: Option<String>,
    api_key: Option<String>,
    ca_file: Option<String>,
    cert_file: Option<String>,
    key_file: Option<String>,
    timeout: Option<Duration>,
}

impl ClientConfigBuilder {
    pub fn username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    pub fn password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    pub fn ca_file(mut self, path: &str) -> Self {
        self.ca_file = Some(path.to_string());
        self
    }

    pub fn cert_file(mut self, path: &str) -> Self {
        self.cert_file = Some(path.to_string());
        self
    }

    pub fn key_file(mut self, path: &str) -> Self {
        self.key_file = Some(path.to_string());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> PlaneResult<ClientConfig> {
        if self.endpoint.is_empty() {
            return Err(PlaneError::Validation(
                "client endpoint is required".to_string(),
            ));
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(PlaneError::Validation(format!(
                "client endpoint must be an http(s) URL: {:?}",
                self.endpoint
            )));
        }
        if self.cert_file.is_some() != self.key_file.is_some() {
            return Err(PlaneError::Validation(
                "client TLS requires both cert_file and key_file".to_string(),
            ));
        }
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(PlaneError::Validation(
                "client timeout must be greater than zero".to_string(),
            ));
        }
        Ok(ClientConfig {
            endpoint: self.endpoint,
            username: self.username,
            password: self.password,
            api_key: self.api_key,
            ca_file: self.ca_file,
            cert_file: self.cert_file,
            key_file: self.key_file,
            timeout,
        })
    }
}
