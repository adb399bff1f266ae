//! On-disk records: the child profile and the single serial-story slot.
//!
//! Both records are pretty-printed JSON files in one data directory. Writes go
//! to a temporary sibling first and are renamed into place.

use crate::profile::ChildProfile;
use crate::serial::SerialStoryRecord;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// File name of the profile record.
pub const PROFILE_FILE: &str = "child_info.json";

/// File name of the serial-story record.
pub const SERIAL_STORY_FILE: &str = "serial_story.json";

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// What [`StoryStore::reset`] found and removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetReport {
    pub profile_removed: bool,
    pub serial_removed: bool,
}

impl fmt::Display for ResetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = |removed: bool| if removed { "removed" } else { "not found" };
        writeln!(f, "Child profile ({PROFILE_FILE}): {}", state(self.profile_removed))?;
        write!(f, "Serial story ({SERIAL_STORY_FILE}): {}", state(self.serial_removed))
    }
}

/// Explicit handle on the data directory.
#[derive(Debug, Clone)]
pub struct StoryStore {
    dir: PathBuf,
}

impl StoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn profile_path(&self) -> PathBuf {
        self.dir.join(PROFILE_FILE)
    }

    pub fn serial_path(&self) -> PathBuf {
        self.dir.join(SERIAL_STORY_FILE)
    }

    /// Load the serial story, or `None` if there is no record.
    ///
    /// A record that exists but doesn't parse is an error, not `None`.
    pub async fn load(&self) -> Result<Option<SerialStoryRecord>, StoreError> {
        read_json(&self.serial_path()).await
    }

    /// Overwrite the serial-story slot.
    pub async fn save(&self, record: &SerialStoryRecord) -> Result<(), StoreError> {
        write_json(&self.serial_path(), record).await?;
        tracing::info!(
            story_id = %record.story_id,
            chapter = record.current_chapter,
            "serial story saved"
        );
        Ok(())
    }

    pub async fn load_profile(&self) -> Result<Option<ChildProfile>, StoreError> {
        read_json(&self.profile_path()).await
    }

    pub async fn save_profile(&self, profile: &ChildProfile) -> Result<(), StoreError> {
        write_json(&self.profile_path(), profile).await
    }

    /// Delete both records. Missing files are reported, not treated as errors.
    pub async fn reset(&self) -> Result<ResetReport, StoreError> {
        let report = ResetReport {
            profile_removed: remove_if_present(&self.profile_path()).await?,
            serial_removed: remove_if_present(&self.serial_path()).await?,
        };
        tracing::info!(?report, "records reset");
        Ok(report)
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let content = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, content).await.map_err(io_err)?;
    fs::rename(&temp_path, path).await.map_err(io_err)?;
    Ok(())
}

async fn remove_if_present(path: &Path) -> Result<bool, StoreError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
