// TastySnake configuration types
// All settings with defaults matching the values the game shipped with

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub pairing: PairingConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    // Name other players see in their device list (empty = generated)
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PairingConfig {
    // How long we ask to stay discoverable, in seconds
    pub discoverable_secs: u64,

    // Scan duration before discovery is cancelled, in milliseconds
    pub discover_timeout_ms: u64,

    // Drop peers whose address is already listed in this round
    pub dedup_peers: bool,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            discoverable_secs: 120,
            discover_timeout_ms: 12_000,
            dedup_peers: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    // UDP port beacons are broadcast to and scanned on
    pub discovery_port: u16,

    // TCP port for incoming game connections (0 = pick a free port)
    pub listen_port: u16,

    // Beacon broadcast interval while discoverable
    pub beacon_interval_ms: u64,

    // Answer discoverable requests with "yes"
    pub allow_discoverable: bool,

    // Start with the radio already switched on (skips the enable prompt)
    pub powered_on_start: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            discovery_port: 47_800,
            listen_port: 0,
            beacon_interval_ms: 1_000,
            allow_discoverable: true,
            powered_on_start: false,
        }
    }
}
