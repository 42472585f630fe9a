// Debug logging module for TastySnake
// Routes tracing output to a file when --debug is given, stderr otherwise

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "tastysnake-debug.log";

/// Where `--debug` writes unless a path is given
pub fn default_log_path() -> PathBuf {
    std::env::temp_dir().join(LOG_FILE_NAME)
}

/// Install the global tracing subscriber.
///
/// With `enabled`, everything from DEBUG up goes to a truncated log file that
/// starts with a session header. Otherwise only warnings reach stderr so the
/// console screen stays readable. `RUST_LOG` overrides the level either way.
pub fn init(enabled: bool, path: Option<PathBuf>) -> io::Result<()> {
    if !enabled {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        // A subscriber may already be installed (tests); keep the first one
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init();
        return Ok(());
    }

    let path = path.unwrap_or_else(default_log_path);
    let file = open_log_file(&path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tastysnake=debug,info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();

    Ok(())
}

/// Create or truncate the log file and write the session header
fn open_log_file(path: &Path) -> io::Result<std::fs::File> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;

    writeln!(file, "=== TastySnake Debug Log ===")?;
    writeln!(file, "Session started: {:?}", SystemTime::now())?;
    writeln!(file, "To monitor: tail -f {}", path.display())?;
    writeln!(file, "========================================\n")?;

    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_log_file_starts_with_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("debug.log");
        fs::write(&path, "stale contents from last run").unwrap();

        drop(open_log_file(&path).unwrap());

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("=== TastySnake Debug Log ==="));
        assert!(contents.contains(&format!("tail -f {}", path.display())));
        assert!(!contents.contains("stale"));
    }

    #[test]
    fn test_default_path_in_temp_dir() {
        let path = default_log_path();
        assert!(path.starts_with(std::env::temp_dir()));
        assert!(path.ends_with(LOG_FILE_NAME));
    }
}
