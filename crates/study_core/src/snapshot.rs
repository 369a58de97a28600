//! Loading and saving the config and progress files.
//!
//! Both files use the JSON shape of the config export: camelCase keys with
//! `scheduleByDate`, `completedTasks` and `completedHabits` stored verbatim.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Progress, StudyConfig};

pub fn load_config(path: impl AsRef<Path>) -> Result<StudyConfig> {
    let config: StudyConfig = read_json(path.as_ref())?;
    config.validate()?;
    debug!(
        path = %path.as_ref().display(),
        days = config.schedule_by_date.len(),
        habits = config.habits.len(),
        exams = config.exams.len(),
        "loaded study config"
    );
    Ok(config)
}

/// Reads the progress file. A file that does not exist yet is an empty record.
pub fn load_progress(path: impl AsRef<Path>) -> Result<Progress> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "no progress file, starting empty");
        return Ok(Progress::default());
    }
    read_json(path)
}

pub fn save_config(path: impl AsRef<Path>, config: &StudyConfig) -> Result<()> {
    write_json(path.as_ref(), config)
}

pub fn save_progress(path: impl AsRef<Path>, progress: &Progress) -> Result<()> {
    write_json(path.as_ref(), progress)
}

pub fn config_from_str(raw: &str) -> Result<StudyConfig> {
    let config: StudyConfig = serde_json::from_str(raw)?;
    config.validate()?;
    Ok(config)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| Error::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    let mut payload = serde_json::to_string_pretty(value).map_err(|source| Error::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    payload.push('\n');
    fs::write(path, payload).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "wrote snapshot");
    Ok(())
}
