use serde::{Deserialize, Serialize};
use skycap_recording::PreviewMode;
use skycap_tello::TelloConfig;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Quit key '{0}' must be an ASCII letter or digit")]
    QuitKey(char),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RecorderConfig {
    pub output_dir: PathBuf,
    pub quit_key: char,
    pub preview: PreviewMode,
    pub webcam: WebcamConfig,
    pub tello: TelloRecorderConfig,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("recordings"),
            quit_key: 'q',
            preview: PreviewMode::Window,
            webcam: WebcamConfig::default(),
            tello: TelloRecorderConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct WebcamConfig {
    pub channel: u32,
    pub poll_interval_ms: u64,
    pub window_title: String,
}

impl Default for WebcamConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            poll_interval_ms: 1,
            window_title: "Webcam - Press 'q' key to quit.".to_string(),
        }
    }
}

impl WebcamConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct TelloRecorderConfig {
    pub drone: TelloConfig,
    pub poll_interval_ms: u64,
    pub window_title: String,
}

impl Default for TelloRecorderConfig {
    fn default() -> Self {
        Self {
            drone: TelloConfig::default(),
            poll_interval_ms: 33,
            window_title: "Frame".to_string(),
        }
    }
}

impl TelloRecorderConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub output_dir: Option<PathBuf>,
    pub poll_interval_ms: Option<u64>,
    pub headless: bool,
}

impl RecorderConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(dir) = overrides.output_dir {
            self.output_dir = dir;
        }

        if let Some(ms) = overrides.poll_interval_ms {
            self.webcam.poll_interval_ms = ms;
            self.tello.poll_interval_ms = ms;
        }

        if overrides.headless {
            self.preview = PreviewMode::Headless;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.quit_key.is_ascii_alphanumeric() {
            return Err(ConfigError::QuitKey(self.quit_key));
        }

        Ok(())
    }
}
