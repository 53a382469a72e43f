use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable naming the settings file
pub const CONFIG_ENV: &str = "SIGNCAST_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write settings {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where playlists come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SourceSettings {
    /// JSON file on disk, polled for changes
    #[serde(rename_all = "camelCase")]
    File {
        path: PathBuf,
        #[serde(default = "default_file_poll_ms")]
        poll_ms: u64,
    },
    /// Firebase Realtime Database over REST
    #[serde(rename_all = "camelCase")]
    RealtimeDb {
        database_url: String,
        #[serde(default = "default_rtdb_path")]
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auth_token: Option<String>,
        #[serde(default = "default_rtdb_poll_ms")]
        poll_ms: u64,
    },
}

fn default_file_poll_ms() -> u64 {
    2000
}

fn default_rtdb_path() -> String {
    "playlists".to_string()
}

fn default_rtdb_poll_ms() -> u64 {
    5000
}

impl Default for SourceSettings {
    fn default() -> Self {
        SourceSettings::File {
            path: PathBuf::from("playlists.json"),
            poll_ms: default_file_poll_ms(),
        }
    }
}

impl SourceSettings {
    pub fn poll_interval(&self) -> Duration {
        match self {
            SourceSettings::File { poll_ms, .. } | SourceSettings::RealtimeDb { poll_ms, .. } => {
                Duration::from_millis(*poll_ms)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Kiosk window
    #[default]
    Window,
    /// No display, presentations are logged
    Headless,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Draw the now-playing header and progress bar over items
    pub show_overlay: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "signcast".to_string(),
            width: 1280,
            height: 720,
            show_overlay: true,
        }
    }
}

/// Persistent player settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerSettings {
    pub source: SourceSettings,
    pub display: DisplayMode,
    /// Seconds between schedule re-evaluations, 0 disables them
    pub reevaluate_secs: u64,
    pub window: WindowSettings,
    /// Used when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            source: SourceSettings::default(),
            display: DisplayMode::default(),
            reevaluate_secs: 60,
            window: WindowSettings::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl PlayerSettings {
    /// `<config dir>/signcast/player.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("signcast").join("player.json"))
    }

    /// Load from `explicit`, else `$SIGNCAST_CONFIG`, else the default path.
    ///
    /// A missing default file gives defaults; a missing file that was asked
    /// for by name is an error. Returns the settings and the path they belong to.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        if let Some(path) = named {
            let settings = Self::load_from(&path)?;
            return Ok((settings, Some(path)));
        }

        match Self::default_path() {
            Some(path) if path.exists() => {
                let settings = Self::load_from(&path)?;
                Ok((settings, Some(path)))
            }
            path => {
                debug!("no settings file, using defaults");
                Ok((Self::default(), path))
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source: std::io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| write_err(e.into()))?;
        fs::write(path, json).map_err(write_err)?;

        info!(path = %path.display(), "settings saved");
        Ok(())
    }

    pub fn reevaluate_every(&self) -> Option<Duration> {
        (self.reevaluate_secs > 0).then(|| Duration::from_secs(self.reevaluate_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let settings: PlayerSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, PlayerSettings::default());
        assert_eq!(settings.source.poll_interval(), Duration::from_secs(2));
        assert_eq!(settings.reevaluate_every(), Some(Duration::from_secs(60)));
        assert_eq!(settings.display, DisplayMode::Window);
    }

    #[test]
    fn test_realtime_db_source() {
        let settings: PlayerSettings = serde_json::from_str(
            r#"{
                "source": { "kind": "realtimeDb", "databaseUrl": "https://demo.firebaseio.com", "authToken": "t" },
                "display": "headless",
                "reevaluateSecs": 0
            }"#,
        )
        .unwrap();

        assert_eq!(
            settings.source,
            SourceSettings::RealtimeDb {
                database_url: "https://demo.firebaseio.com".to_string(),
                path: "playlists".to_string(),
                auth_token: Some("t".to_string()),
                poll_ms: 5000,
            }
        );
        assert_eq!(settings.display, DisplayMode::Headless);
        assert_eq!(settings.reevaluate_every(), None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("player.json");

        let mut settings = PlayerSettings::default();
        settings.window.show_overlay = false;
        settings.log_filter = "signcast=debug".to_string();
        settings.save(&path).unwrap();

        let (loaded, from) = PlayerSettings::load(Some(&path)).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(from.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = PlayerSettings::load(Some(&dir.path().join("absent.json")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player.json");
        fs::write(&path, "{ \"display\": \"projector\" }").unwrap();

        let err = PlayerSettings::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("player.json"));
    }
}
