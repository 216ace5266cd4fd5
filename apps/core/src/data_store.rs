use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("invalid data name '{0}'")]
    InvalidName(String),
    #[error("data io failed for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("data file '{0}' is empty")]
    Empty(String),
}

/// Store `data` under `name` inside `dir`.
pub fn save_data(dir: &Path, name: &str, data: &str) -> Result<(), DataError> {
    let path = data_path(dir, name)?;
    std::fs::write(&path, data).map_err(|source| DataError::Io { path, source })
}

/// First whitespace-separated token on the first line of the `name` file.
pub fn load_data(dir: &Path, name: &str) -> Result<String, DataError> {
    let path = data_path(dir, name)?;
    let raw = std::fs::read_to_string(&path).map_err(|source| DataError::Io { path, source })?;
    raw.lines()
        .next()
        .and_then(|line| line.split_whitespace().next())
        .map(str::to_string)
        .ok_or_else(|| DataError::Empty(name.to_string()))
}

fn data_path(dir: &Path, name: &str) -> Result<PathBuf, DataError> {
    let trimmed = name.trim();
    let plain = Path::new(trimmed)
        .file_name()
        .is_some_and(|file| file == trimmed);
    if trimmed.is_empty() || !plain {
        return Err(DataError::InvalidName(name.to_string()));
    }
    Ok(dir.join(trimmed))
}
