use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::morse::DEFAULT_WORD_GAP_UNITS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Default log filter; `RUST_LOG` overrides it
    pub log_level: String,
    pub radio: RadioSettings,
    pub keyer: KeyerSettings,
    pub audio: AudioSettings,
    pub ui: UiSettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioSettings {
    /// Transceiver address, `host` or `host:port`
    pub address: String,
    /// Station name of the client to bind to
    pub station: String,
    pub bind_timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyerSettings {
    /// Serial device whose modem-status lines carry the paddle contacts
    pub device: String,
    /// Dit lengths of silence after a character before the word is closed
    pub word_gap_units: u32,
    pub speed_step: u32,
    pub pitch_step_hz: u32,
    pub volume_step: u32,
    pub min_wpm: u32,
    pub max_wpm: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Output device name, or "default"
    pub sink: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    pub font_size: f32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            radio: RadioSettings::default(),
            keyer: KeyerSettings::default(),
            audio: AudioSettings::default(),
            ui: UiSettings::default(),
        }
    }
}

impl Default for RadioSettings {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:4992".to_string(),
            station: "Flex".to_string(),
            bind_timeout_secs: 10,
        }
    }
}

impl Default for KeyerSettings {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".to_string(),
            word_gap_units: DEFAULT_WORD_GAP_UNITS,
            speed_step: 1,
            pitch_step_hz: 10,
            volume_step: 1,
            min_wpm: 5,
            max_wpm: 100,
        }
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sink: "default".to_string(),
        }
    }
}

impl Default for UiSettings {
    fn default() -> Self {
        Self { font_size: 16.0 }
    }
}

/// Command line flags; anything given overrides the settings file.
#[derive(Debug, Default, Parser)]
#[command(name = "cw_keyer", about = "Iambic paddle keyer for a networked transceiver")]
pub struct Args {
    /// Transceiver address (host or host:port)
    #[arg(long)]
    pub radio: Option<String>,
    /// Station name to bind to
    #[arg(long)]
    pub station: Option<String>,
    /// Keyer serial device
    #[arg(long)]
    pub port: Option<String>,
    /// Minimum level of messages to log
    #[arg(long)]
    pub log_level: Option<String>,
    /// Audio output device for the sidetone
    #[arg(long)]
    pub sink: Option<String>,
    /// Settings file to use instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Write the merged settings back to the settings file
    #[arg(long)]
    pub save_config: bool,
    /// Run without a window; decoded text goes to the log
    #[arg(long)]
    pub headless: bool,
}

impl Args {
    pub fn apply(&self, settings: &mut AppSettings) {
        if let Some(radio) = &self.radio {
            settings.radio.address = radio.clone();
        }
        if let Some(station) = &self.station {
            settings.radio.station = station.clone();
        }
        if let Some(port) = &self.port {
            settings.keyer.device = port.clone();
        }
        if let Some(level) = &self.log_level {
            settings.log_level = level.clone();
        }
        if let Some(sink) = &self.sink {
            settings.audio.sink = sink.clone();
        }
    }
}

/// Outcome of reading the settings file.
///
/// Loading happens before logging is set up, so what happened is returned
/// for the caller to log.
pub struct SettingsLoadResult {
    pub settings: AppSettings,
    /// Shown in the window when the file had to be reset
    pub notice: Option<String>,
    /// File the settings came from, if one was read
    pub loaded_from: Option<PathBuf>,
    pub error: Option<ConfigError>,
}

impl AppSettings {
    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("cw_keyer").join("settings.toml")
        } else {
            PathBuf::from("settings.toml")
        }
    }

    /// Load settings from `path`, or return defaults if missing or unreadable.
    ///
    /// A file that exists but does not parse is moved aside so the next save
    /// does not clobber it.
    pub fn load_with_notice(path: &Path) -> SettingsLoadResult {
        if !path.exists() {
            return SettingsLoadResult {
                settings: Self::default(),
                notice: None,
                loaded_from: None,
                error: None,
            };
        }

        match Self::load(path) {
            Ok(settings) => SettingsLoadResult {
                settings,
                notice: None,
                loaded_from: Some(path.to_path_buf()),
                error: None,
            },
            Err(e) => {
                let notice = match backup_settings_file(path) {
                    Some(backup_path) => format!(
                        "Settings file was reset due to an incompatible format. Backup saved to {}",
                        backup_path.display()
                    ),
                    None => "Settings file was reset due to an incompatible format.".to_string(),
                };
                SettingsLoadResult {
                    settings: Self::default(),
                    notice: Some(notice),
                    loaded_from: None,
                    error: Some(e),
                }
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(write_err)?;
        log::info!("saved settings to {}", path.display());
        Ok(())
    }
}

fn backup_settings_file(path: &Path) -> Option<PathBuf> {
    let timestamp = chrono::Utc::now().timestamp();
    let file_name = path.file_name()?.to_string_lossy();
    let backup_path = path.with_file_name(format!("{}.bak.{}", file_name, timestamp));
    std::fs::rename(path, &backup_path).ok()?;
    Some(backup_path)
}
