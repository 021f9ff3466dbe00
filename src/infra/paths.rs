// src/infra/paths.rs — Config and data locations
//
// REHEARSAL_HOME overrides everything: config lives directly under it and
// data under $REHEARSAL_HOME/data. Otherwise config uses ~/.rehearsal/ and
// data uses the platform data dir.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

fn rehearsal_home() -> Option<PathBuf> {
    std::env::var_os("REHEARSAL_HOME").map(PathBuf::from)
}

/// Home directory, or the working directory when none can be determined.
pub fn dirs_home() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Configuration directory: $REHEARSAL_HOME/ or ~/.rehearsal/
pub fn config_dir() -> PathBuf {
    if let Some(home) = rehearsal_home() {
        return home;
    }
    dirs_home().join(".rehearsal")
}

/// Data directory: $REHEARSAL_HOME/data/ or the platform-local data dir.
pub fn data_dir() -> PathBuf {
    if let Some(home) = rehearsal_home() {
        return home.join("data");
    }
    ProjectDirs::from("", "", "rehearsal")
        .map(|d| d.data_local_dir().to_path_buf())
        .unwrap_or_else(|| config_dir().join("data"))
}

pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Default database path
pub fn db_path() -> PathBuf {
    data_dir().join("rehearsal.db")
}
