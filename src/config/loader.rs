// Configuration file loading and creation

use super::types::Config;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Get the path to the configuration file
pub fn get_config_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("tastysnake");
    path.push("config.toml");
    path
}

/// Load configuration from `path`, or create a default file if it doesn't exist
pub fn load_config(path: &Path) -> Result<Config, io::Error> {
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        match toml::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("Failed to parse config file {}: {}", path.display(), e);
                warn!("Using default configuration");
                Ok(Config::default())
            }
        }
    } else {
        create_default_config(path)?;
        Ok(Config::default())
    }
}

/// Create a default configuration file with helpful comments
pub fn create_default_config(path: &Path) -> Result<(), io::Error> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    let commented_toml = format!(
        "# TastySnake Configuration File\n\
         # Edit this file to customize device pairing\n\
         # After editing, restart the game for changes to take effect\n\
         #\n\
         # [device] name: leave empty to get a generated \"snake-XXXX\" name\n\
         # [pairing] dedup_peers: hide devices that show up twice in one scan\n\
         # [network] listen_port: 0 picks any free port\n\n\
         {}",
        toml_string
    );

    fs::write(path, commented_toml)?;
    info!("Created default config file at: {}", path.display());
    Ok(())
}
