use std::{
    fmt, io,
    path::{Path, PathBuf},
};

use chrono::{Local, NaiveDateTime};
use tracing::info;

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
pub const EXTENSION: &str = "mp4";

/// File name of a recording: `<YYYYMMDD_HHMMSS>[_<source id>]_<suffix>.mp4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputName {
    pub timestamp: NaiveDateTime,
    pub source_id: Option<String>,
    pub suffix: String,
}

impl OutputName {
    /// Stamped with the current local time.
    pub fn now(suffix: impl Into<String>) -> Self {
        Self::at(Local::now().naive_local(), suffix)
    }

    pub fn at(timestamp: NaiveDateTime, suffix: impl Into<String>) -> Self {
        Self {
            timestamp,
            source_id: None,
            suffix: suffix.into(),
        }
    }

    pub fn with_source_id(mut self, source_id: impl fmt::Display) -> Self {
        self.source_id = Some(source_id.to_string());
        self
    }

    pub fn file_name(&self) -> String {
        let timestamp = self.timestamp.format(TIMESTAMP_FORMAT);

        match &self.source_id {
            Some(id) => format!("{timestamp}_{id}_{}.{EXTENSION}", self.suffix),
            None => format!("{timestamp}_{}.{EXTENSION}", self.suffix),
        }
    }

    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }
}

impl fmt::Display for OutputName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum OutputDirError {
    #[error("'{0}' exists and is not a directory")]
    NotADirectory(PathBuf),
    #[error("Creating '{path}'/{source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Creates `dir` and its parents if needed.
pub fn ensure_output_dir(dir: &Path) -> Result<(), OutputDirError> {
    if dir.is_dir() {
        return Ok(());
    }

    if dir.exists() {
        return Err(OutputDirError::NotADirectory(dir.to_path_buf()));
    }

    std::fs::create_dir_all(dir).map_err(|source| OutputDirError::Create {
        path: dir.to_path_buf(),
        source,
    })?;

    info!("Created output directory '{}'", dir.display());

    Ok(())
}
