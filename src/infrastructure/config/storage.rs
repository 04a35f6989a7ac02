use super::app_config::AppConfig;
use directories::ProjectDirs;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "marquee";
const APP_NAME: &str = "marquee";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Failures while locating, reading or writing the config file.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ConfigError {
    #[error("no configuration directory available on this platform")]
    ConfigDirNotFound,
    #[error("config path {} has no parent directory", .0.display())]
    InvalidPath(PathBuf),
    #[error("failed to access config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("invalid config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Locates, reads and writes the TOML config file.
pub struct StorageManager {
    config_dir: PathBuf,
}

impl StorageManager {
    /// Creates a manager rooted at the platform config directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration directory cannot be determined.
    pub fn new() -> Result<Self, ConfigError> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| Self::with_dir(dirs.config_dir().to_path_buf()))
            .ok_or(ConfigError::ConfigDirNotFound)
    }

    /// Creates a manager rooted at `config_dir`.
    #[must_use]
    pub const fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Directory holding the config file.
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path of the config file, honouring an explicit override.
    #[must_use]
    pub fn config_path(&self, path_override: Option<&Path>) -> PathBuf {
        path_override.map_or_else(|| self.config_dir.join(CONFIG_FILE_NAME), Path::to_path_buf)
    }

    /// Ensures the configuration directory exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the directory cannot be created.
    pub fn ensure_config_dir(&self) -> Result<(), ConfigError> {
        if !self.config_dir.exists() {
            info!(path = ?self.config_dir, "Creating configuration directory");
            fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Loads the configuration, writing defaults if no file exists.
    ///
    /// A file that fails to parse is left untouched and defaults are used.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or written.
    pub fn load_config(&self, path_override: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let path = self.config_path(path_override);

        if !path.exists() {
            info!(path = ?path, "Config file not found, writing defaults");
            let config = AppConfig::default();
            write_atomic(&path, &config)?;
            return Ok(config);
        }

        match read_config(&path) {
            Err(ConfigError::Parse { path, source }) => {
                warn!(error = %source, path = ?path, "Ignoring invalid config file, using defaults");
                Ok(AppConfig::default())
            }
            other => other,
        }
    }

    /// Writes the configuration to the default location.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be written.
    pub fn save_config(&self, config: &AppConfig) -> Result<(), ConfigError> {
        self.ensure_config_dir()?;
        write_atomic(&self.config_path(None), config)
    }
}

/// Strict read: parse failures are reported with the offending path.
fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = ?path, "Loaded config file");
    Ok(config)
}

fn write_atomic(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| ConfigError::InvalidPath(path.to_path_buf()))?;
    fs::create_dir_all(parent)?;

    let content = toml::to_string_pretty(config)?;
    let mut staged = tempfile::NamedTempFile::new_in(parent)?;
    staged.write_all(content.as_bytes())?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::FeedKind;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_config_dir_creates_directory() {
        let dir = tempdir().unwrap();
        let config_dir = dir.path().join("marquee");
        let manager = StorageManager::with_dir(config_dir.clone());

        assert!(!config_dir.exists());
        manager.ensure_config_dir().unwrap();
        assert!(config_dir.exists());
    }

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let manager = StorageManager::with_dir(dir.path().join("nested"));

        let config = manager.load_config(None).unwrap();
        assert!(config.alerts.desktop);
        assert!(dir.path().join("nested").join(CONFIG_FILE_NAME).exists());
    }

    #[test]
    fn test_invalid_file_falls_back_without_overwrite() {
        let dir = tempdir().unwrap();
        let manager = StorageManager::with_dir(dir.path().to_path_buf());
        let config_file = manager.config_path(None);
        fs::write(&config_file, "feed = [").unwrap();

        let config = manager.load_config(None).unwrap();
        assert_eq!(config.feed, FeedKind::default());
        assert_eq!(fs::read_to_string(&config_file).unwrap(), "feed = [");
    }

    #[test]
    fn test_strict_read_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "feed = [").unwrap();

        let error = read_config(&path).unwrap_err();
        assert!(matches!(error, ConfigError::Parse { .. }));
        assert!(error.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_override_path_is_used() {
        let dir = tempdir().unwrap();
        let manager = StorageManager::with_dir(dir.path().join("unused"));
        let custom = dir.path().join("custom.toml");
        fs::write(&custom, "feed = \"admin\"\n").unwrap();

        let config = manager.load_config(Some(&custom)).unwrap();
        assert_eq!(config.feed, FeedKind::Admin);
        assert!(!dir.path().join("unused").exists());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let manager = StorageManager::with_dir(dir.path().to_path_buf());

        let mut config = AppConfig::default();
        config.user_id = Some("15".to_string());
        config.broadcast.auto_reconnect = true;
        manager.save_config(&config).unwrap();

        let loaded = manager.load_config(None).unwrap();
        assert_eq!(loaded.user_id.as_deref(), Some("15"));
        assert!(loaded.broadcast.auto_reconnect);
    }
}
