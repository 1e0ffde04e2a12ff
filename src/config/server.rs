use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path prefix for the admin report routes.
    #[serde(default = "default_admin_base_path")]
    pub admin_base_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            admin_base_path: default_admin_base_path(),
        }
    }
}

impl ServerConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if !self.admin_base_path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "server.admin_base_path must start with '/', got '{}'",
                self.admin_base_path
            )));
        }
        // Routes are nested under this prefix, and axum cannot nest at the root
        if self.admin_base_path.ends_with('/') {
            return Err(ConfigError::Validation(format!(
                "server.admin_base_path must not end with '/', got '{}'",
                self.admin_base_path
            )));
        }
        Ok(())
    }

    /// `host:port` string suitable for binding a listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

fn default_admin_base_path() -> String {
    "/admin/v1".to_string()
}
