// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration management for iconharvest.
//!
//! This crate provides:
//! - XDG Base Directory compliant path resolution
//! - Layered configuration from multiple sources
//! - TOML configuration file parsing
//! - Environment variable overrides
//! - Configuration validation

pub mod error;
pub mod layer;
pub mod paths;
pub mod registry;
pub mod runtime;
pub mod sources;
pub mod validation;

use std::path::PathBuf;

pub use error::ConfigError;
pub use layer::ConfigLayer;
pub use paths::PathsConfig;
pub use registry::ConfigRegistry;
pub use runtime::{
	BrowserConfig, FetchConfig, HarvestConfig, LogFormat, LogLevel, LoggingConfig, OutputConfig,
	RetryConfig,
};
pub use sources::{CliOverrides, ConfigSource, Precedence};
pub use validation::validate_config;

/// Load configuration: defaults, then the config file, then `ICONHARVEST_*`
/// variables, then CLI flags.
///
/// `config_file` replaces the user file at
/// `~/.config/iconharvest/config.toml` when given.
pub fn load_config(
	cli: CliOverrides,
	config_file: Option<PathBuf>,
) -> Result<HarvestConfig, ConfigError> {
	let paths = paths::resolve_xdg_paths()?;

	let mut registry = ConfigRegistry::new();
	registry.register(Box::new(sources::DefaultsSource));
	match config_file {
		Some(path) => registry.register(Box::new(sources::FileSource::explicit(path))),
		None => registry.register(Box::new(sources::FileSource::user(&paths))),
	}
	registry.register(Box::new(sources::EnvSource::process()));
	registry.register(Box::new(sources::CliSource::new(cli)));

	registry.load(paths)
}
