//! Widget configuration
//!
//! Parses `dmxpro.toml` with serde. Every field has a default, so an empty
//! file (or no file at all) yields a working firmware-v1 widget with a full
//! 512-channel universe.
//!
//! Command-line values are layered on top through [`CliSettings`].

use crate::error::ConfigError;
use dmxpro_protocol::{WidgetParameters, UNIVERSE_SIZE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration filename to search for
pub const CONFIG_FILENAME: &str = "dmxpro.toml";

/// Overrides taken from the command line. Only `Some` values apply.
#[derive(Debug, Default, Clone)]
pub struct CliSettings {
    pub serial_number: Option<u32>,
    pub max_channels: Option<u16>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Emulated widget configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Serial number reported to the host
    pub serial_number: u32,
    /// Channels reserved in the universe (1..=512)
    pub max_channels: u16,
    /// Initial break, mark-after-break and output rate
    pub parameters: WidgetParameters,
    /// TCP front end
    pub server: ServerConfig,
    /// Frame log
    pub log: LogConfig,
}

/// TCP front end settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
        }
    }
}

/// Frame log settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Records kept before the oldest is evicted
    pub capacity: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            serial_number: 1,
            max_channels: 512,
            parameters: WidgetParameters::default(),
            server: ServerConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl WidgetConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With serial number
    #[inline]
    #[must_use]
    pub fn with_serial_number(mut self, serial_number: u32) -> Self {
        self.serial_number = serial_number;
        self
    }

    /// With universe size
    #[inline]
    #[must_use]
    pub fn with_max_channels(mut self, max_channels: u16) -> Self {
        self.max_channels = max_channels;
        self
    }

    /// With initial widget parameters
    #[inline]
    #[must_use]
    pub fn with_parameters(mut self, parameters: WidgetParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Invalid`]
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    ///
    /// # Errors
    /// Returns [`ConfigError::Read`] when the file cannot be read, otherwise
    /// as [`WidgetConfig::from_toml_str`]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Load from an explicit path, or from a discovered `dmxpro.toml`, or
    /// fall back to defaults; then apply CLI overrides and validate.
    ///
    /// # Errors
    /// Propagates load errors and validation of the final values
    pub fn load_with(path: Option<&Path>, settings: &CliSettings) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => match std::env::current_dir().ok().and_then(|dir| Self::discover(&dir)) {
                Some(found) => {
                    tracing::debug!(path = %found.display(), "using discovered config");
                    Self::load(&found)?
                }
                None => Self::default(),
            },
        };
        config.apply(settings);
        config.validate()?;
        Ok(config)
    }

    /// Find `dmxpro.toml` in `start` or any parent directory
    #[must_use]
    pub fn discover(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILENAME))
            .find(|candidate| candidate.is_file())
    }

    /// Apply CLI overrides
    pub fn apply(&mut self, settings: &CliSettings) {
        if let Some(serial_number) = settings.serial_number {
            self.serial_number = serial_number;
        }
        if let Some(max_channels) = settings.max_channels {
            self.max_channels = max_channels;
        }
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first bad field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_channels == 0 || usize::from(self.max_channels) > UNIVERSE_SIZE {
            return Err(ConfigError::Invalid {
                field: "max_channels",
                reason: format!("{} is outside 1..={UNIVERSE_SIZE}", self.max_channels),
            });
        }
        if self.log.capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "log.capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "server.host",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// `host:port` for the TCP front end
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = WidgetConfig::from_toml_str("").unwrap();
        assert_eq!(config, WidgetConfig::default());
        assert_eq!(config.bind_address(), "127.0.0.1:7878");
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = WidgetConfig::from_toml_str(
            r#"
            serial_number = 0x12345678
            max_channels = 24

            [parameters]
            break_time = 20

            [server]
            port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(config.serial_number, 0x1234_5678);
        assert_eq!(config.max_channels, 24);
        assert_eq!(config.parameters.break_time, 20);
        assert_eq!(config.parameters.mark_after_break_time, 1);
        assert_eq!(config.parameters.firmware_version(), 0x0100);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn rejects_out_of_range_channels() {
        let err = WidgetConfig::from_toml_str("max_channels = 513").unwrap_err();
        assert!(err.to_string().contains("max_channels"));
        assert!(WidgetConfig::from_toml_str("max_channels = 0").is_err());
    }

    #[test]
    fn rejects_zero_log_capacity() {
        let err = WidgetConfig::from_toml_str("[log]\ncapacity = 0").unwrap_err();
        assert!(err.to_string().contains("log.capacity"));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = WidgetConfig::from_toml_str("serial_number = \"abc\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn cli_settings_override() {
        let mut config = WidgetConfig::default();
        config.apply(&CliSettings {
            serial_number: Some(42),
            host: Some("0.0.0.0".to_string()),
            ..CliSettings::default()
        });
        assert_eq!(config.serial_number, 42);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.max_channels, 512);
    }

    #[test]
    fn load_and_discover_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "serial_number = 7").unwrap();

        let found = WidgetConfig::discover(&nested).unwrap();
        assert_eq!(found, dir.path().join(CONFIG_FILENAME));
        assert_eq!(WidgetConfig::load(&found).unwrap().serial_number, 7);

        let settings = CliSettings {
            max_channels: Some(8),
            ..CliSettings::default()
        };
        let config = WidgetConfig::load_with(Some(&found), &settings).unwrap();
        assert_eq!(config.max_channels, 8);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = WidgetConfig::load(Path::new("/nonexistent/dmxpro.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
