// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ProjectConfig, RawProjectFile};
use crate::errors::Result;

/// Read a project file and deserialize it into a [`RawProjectFile`].
///
/// Only TOML syntax and field types are checked here. Use
/// [`load_and_validate`] for node, edge and calendar validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawProjectFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let raw: RawProjectFile = toml::from_str(&contents)?;
    debug!(
        path = %path.display(),
        nodes = raw.node.len(),
        edges = raw.edge.len(),
        holidays = raw.holiday.len(),
        "project file parsed"
    );

    Ok(raw)
}

/// Read, deserialize and validate a project file.
///
/// On success every node status is valid for its kind, every edge refers to
/// known nodes, the edge set is acyclic, and the calendar is usable.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ProjectConfig> {
    let raw = load_from_path(&path)?;
    ProjectConfig::try_from(raw)
}

/// `Siteplan.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Siteplan.toml")
}
