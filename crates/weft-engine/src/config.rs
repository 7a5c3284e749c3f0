//! Bootstrap configuration handed to the engine at node start.

use serde::{Deserialize, Serialize};

/// A well-known peer used to join the network.
///
/// The triple is engine-defined: the engine dials `host:port` and
/// authenticates the peer against `public_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapPeer {
    /// Hostname or IP address
    pub host: String,
    /// UDP/TCP port
    pub port: u16,
    /// Peer's public key, engine encoding
    pub public_key: String,
}

impl BootstrapPeer {
    /// Create a bootstrap peer entry.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, public_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            public_key: public_key.into(),
        }
    }
}

/// Configuration for attaching a node to the network.
///
/// `Default` enables UDP and ships the built-in bootstrap peer list;
/// `name` is filled by the node from its own id when left empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Identity name announced to the engine
    pub name: String,
    /// Whether the engine may use UDP transport
    pub udp_enabled: bool,
    /// Peers used to join the network
    pub bootstraps: Vec<BootstrapPeer>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            udp_enabled: true,
            bootstraps: default_bootstrap_peers(),
        }
    }
}

impl BootstrapConfig {
    /// Config for a named node with the built-in bootstrap list.
    #[must_use]
    pub fn for_node(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// The built-in bootstrap peer list.
#[must_use]
pub fn default_bootstrap_peers() -> Vec<BootstrapPeer> {
    vec![
        BootstrapPeer::new(
            "boot1.weft.network",
            33445,
            "7sRQZpRwHUmXxsNR4KLBcYGpzYo3pTLWmB2jZ8VqZfpW",
        ),
        BootstrapPeer::new(
            "boot2.weft.network",
            33445,
            "A1vUqNyFRFAYdqkWQaWUnXQwHXdYQFoTnvRzQXApsqHb",
        ),
        BootstrapPeer::new(
            "boot3.weft.network",
            33445,
            "HZzpMr1coGzoLzDkVFKyNsT5jcYpGcDEnSV4bXHcTN9X",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_enables_udp_and_bootstraps() {
        let config = BootstrapConfig::default();
        assert!(config.udp_enabled);
        assert!(!config.bootstraps.is_empty());
        assert!(config.name.is_empty());
    }

    #[test]
    fn for_node_sets_name() {
        let config = BootstrapConfig::for_node("alice");
        assert_eq!(config.name, "alice");
        assert_eq!(config.bootstraps, default_bootstrap_peers());
    }
}
