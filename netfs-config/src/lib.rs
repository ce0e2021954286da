//! Configuration for both `netfs-agent` and `netfs-layer`, read once at
//! startup from the two environment variables spec.md §6 names.

use std::net::Ipv4Addr;

use thiserror::Error;

const SERVER_HOST_VAR: &str = "server15440";
const SERVER_PORT_VAR: &str = "serverport15440";

const DEFAULT_SERVER_HOST: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 1);
const DEFAULT_SERVER_PORT: u16 = 15440;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is set but not a valid IPv4 address: {value:?}")]
    InvalidHost { var: &'static str, value: String },

    #[error("{var} is set but not a valid port number: {value:?}")]
    InvalidPort { var: &'static str, value: String },
}

/// Where to find the remote agent. Both binaries call [`Self::from_env`]
/// exactly once at startup; nothing else in either crate reads these
/// variables directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetfsConfig {
    pub server_host: Ipv4Addr,
    pub server_port: u16,
}

impl NetfsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_host = match std::env::var(SERVER_HOST_VAR) {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidHost {
                    var: SERVER_HOST_VAR,
                    value,
                })?,
            Err(_) => DEFAULT_SERVER_HOST,
        };

        let server_port = match std::env::var(SERVER_PORT_VAR) {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidPort {
                    var: SERVER_PORT_VAR,
                    value,
                })?,
            Err(_) => DEFAULT_SERVER_PORT,
        };

        tracing::debug!(%server_host, server_port, "resolved netfs config");
        Ok(Self {
            server_host,
            server_port,
        })
    }
}

impl Default for NetfsConfig {
    fn default() -> Self {
        Self {
            server_host: DEFAULT_SERVER_HOST,
            server_port: DEFAULT_SERVER_PORT,
        }
    }
}
