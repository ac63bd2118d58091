// src/engine/mod.rs

//! Per-project orchestration.
//!
//! The pure project state lives in [`core`]; the async single-writer shell
//! and the multi-project registry are implemented in [`runtime`].

pub mod core;
pub mod runtime;

pub use core::{BatchOutcome, ProjectCore, ProjectInfo};
pub use runtime::{ProjectCommand, ProjectHandle, ProjectRegistry, ProjectRuntime};
