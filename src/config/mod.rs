// Configuration module for TastySnake
// Handles loading and managing pairing configuration from TOML file

pub mod loader;
pub mod types;

pub use loader::{create_default_config, get_config_path, load_config};
pub use types::{Config, DeviceConfig, NetworkConfig, PairingConfig};
