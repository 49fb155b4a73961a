use super::deserialize_string_lax;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use url::Url;

/// Basic (core) server configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    /// HTTP server listen address (e.g., "0.0.0.0", "127.0.0.1").
    /// TOML: `basic.listen_addr`. Default: `0.0.0.0`.
    #[serde(default = "default_listen_ip")]
    pub listen_addr: IpAddr,

    /// HTTP server listen port.
    /// TOML: `basic.listen_port`. Default: `5000`.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Number of runtime worker threads serving requests.
    /// TOML: `basic.workers`. Default: `4`.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Log level for tracing subscriber initialization (e.g., "error", "warn", "info", "debug", "trace").
    /// TOML: `basic.loglevel`. Default: `info`.
    #[serde(default = "default_loglevel")]
    pub loglevel: String,

    /// Key material for the private (encrypted) cookies carrying CSRF tokens and flash messages.
    /// TOML: `basic.secret_key`, env: `SECRET_KEY`. Empty means a random key per process.
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_string_lax")]
    pub secret_key: String,

    /// Absolute base used when building download links (e.g., "https://files.example.com").
    /// TOML: `basic.public_url`. Default: unset, derived from the request `Host` header.
    #[serde(default)]
    pub public_url: Option<Url>,

    /// Emit cookies without the `Secure` attribute (plain HTTP deployments).
    /// TOML: `basic.insecure_cookie`. Default: `true`.
    #[serde(default = "default_insecure_cookie")]
    pub insecure_cookie: bool,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_ip(),
            listen_port: default_listen_port(),
            workers: default_workers(),
            loglevel: default_loglevel(),
            secret_key: String::new(),
            public_url: None,
            insecure_cookie: default_insecure_cookie(),
        }
    }
}

/// Default IP address for the HTTP server listen address.
fn default_listen_ip() -> IpAddr {
    Ipv4Addr::new(0, 0, 0, 0).into()
}

/// Default port for the HTTP server.
fn default_listen_port() -> u16 {
    5000
}

fn default_workers() -> usize {
    4
}

fn default_loglevel() -> String {
    "info".to_string()
}

fn default_insecure_cookie() -> bool {
    true
}
