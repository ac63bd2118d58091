// src/config/mod.rs

//! Project files: TOML model, validation and loading.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{EdgeConfig, NodeConfig, ProjectConfig, RawProjectFile};
