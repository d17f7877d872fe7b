// src/config/mod.rs

//! Configuration loading and validation for wesqueue.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load and persist the config document (`loader.rs`).
//! - Validate cross-references between queues and services (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{ConfigStore, default_config, default_config_path, load_and_validate, load_from_str};
pub use model::{OrchestratorConfig, QueueConfig, RawOrchestratorConfig, ServiceEndpoint};
pub use validate::validate_config;
