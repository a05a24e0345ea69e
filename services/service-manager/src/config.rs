//! Configuration for the service manager.

use corral_id::{IdError, NodeId, ServiceId};
use thiserror::Error;

/// Default control socket handed to service instances.
pub const DEFAULT_SERVICE_SOCKET: &str = "/run/corral/service.sock";

/// Default bound of the event and update channels.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An entry of `CORRAL_SERVICES` is not a valid service id.
    #[error("invalid service id {entry:?} in CORRAL_SERVICES: {source}")]
    InvalidService {
        entry: String,
        #[source]
        source: IdError,
    },
}

/// Service manager configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity of this node.
    pub node_id: NodeId,

    /// Control socket handed to every registered instance.
    pub service_socket: String,

    /// Services to register at startup.
    pub services: Vec<ServiceId>,

    /// Bound of the instance update channel.
    pub channel_capacity: usize,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Node ID can be provided or auto-generated
        let node_id = std::env::var("CORRAL_NODE_ID")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(NodeId::new);

        let service_socket = std::env::var("CORRAL_SERVICE_SOCKET")
            .unwrap_or_else(|_| DEFAULT_SERVICE_SOCKET.to_string());

        let services = match std::env::var("CORRAL_SERVICES") {
            Ok(raw) => parse_services(&raw)?,
            Err(_) => Vec::new(),
        };

        let channel_capacity = std::env::var("CORRAL_CHANNEL_CAPACITY")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_CHANNEL_CAPACITY)
            .max(1);

        let log_level = std::env::var("CORRAL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            node_id,
            service_socket,
            services,
            channel_capacity,
            log_level,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_id: NodeId::new(),
            service_socket: DEFAULT_SERVICE_SOCKET.to_string(),
            services: Vec::new(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            log_level: "info".to_string(),
        }
    }
}

/// Parse a comma-separated list of service ids, ignoring blank entries.
pub fn parse_services(raw: &str) -> Result<Vec<ServiceId>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            ServiceId::parse(entry).map_err(|source| ConfigError::InvalidService {
                entry: entry.to_string(),
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_services() {
        let services = parse_services("dhcpd, pxe,,imageapi ").unwrap();
        let names: Vec<_> = services.iter().map(ServiceId::as_str).collect();
        assert_eq!(names, ["dhcpd", "pxe", "imageapi"]);
    }

    #[test]
    fn test_parse_services_empty() {
        assert!(parse_services("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_services_invalid() {
        let err = parse_services("pxe,bad/name").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidService { ref entry, .. } if entry == "bad/name"));
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.service_socket, DEFAULT_SERVICE_SOCKET);
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert!(config.services.is_empty());
    }
}
