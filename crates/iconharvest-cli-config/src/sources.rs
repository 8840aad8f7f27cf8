// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: files, environment, CLI, defaults.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::layer::*;
use crate::paths::PathsConfig;
use crate::ConfigError;

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	UserFile = 30,
	Environment = 50,
	Cli = 60,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	/// Name for logging
	fn name(&self) -> &'static str;

	/// Precedence level
	fn precedence(&self) -> Precedence;

	/// Load configuration layer from this source
	fn load(&self) -> Result<ConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading defaults");
		// Defaults are applied when the runtime config is built.
		Ok(ConfigLayer::default())
	}
}

/// File-based configuration source (TOML).
pub struct FileSource {
	path: PathBuf,
	name: &'static str,
}

impl FileSource {
	/// User config: ~/.config/iconharvest/config.toml
	pub fn user(paths: &PathsConfig) -> Self {
		Self {
			path: paths.user_config_file.clone(),
			name: "user-config",
		}
	}

	/// A file named with `--config`; it replaces the user file.
	pub fn explicit(path: PathBuf) -> Self {
		Self {
			path,
			name: "explicit-config",
		}
	}
}

impl ConfigSource for FileSource {
	fn name(&self) -> &'static str {
		self.name
	}
	fn precedence(&self) -> Precedence {
		Precedence::UserFile
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), source = self.name, "config file not found, skipping");
			return Ok(ConfigLayer::default());
		}

		debug!(path = %self.path.display(), source = self.name, "loading config file");

		let content = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
			path: self.path.clone(),
			source,
		})?;
		let layer: ConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!(source = self.name, "parsed config layer");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: ICONHARVEST_<FIELD>. Credentials are read by the CLI itself
/// and never pass through configuration.
pub struct EnvSource {
	vars: HashMap<String, String>,
}

impl EnvSource {
	/// Snapshot of the process environment.
	pub fn process() -> Self {
		Self::from_vars(std::env::vars())
	}

	pub fn from_vars<I, K, V>(vars: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			vars: vars
				.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.filter(|(k, _)| k.starts_with("ICONHARVEST_"))
				.collect(),
		}
	}

	fn get(&self, key: &str) -> Option<String> {
		self.vars
			.get(key)
			.map(|v| v.trim().to_string())
			.filter(|v| !v.is_empty())
	}

	fn parse<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError>
	where
		T::Err: std::fmt::Display,
	{
		self.get(key)
			.map(|v| {
				v.parse::<T>()
					.map_err(|e| ConfigError::env(key, format!("`{v}`: {e}")))
			})
			.transpose()
	}

	fn parse_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
		self.get(key)
			.map(|v| match v.to_ascii_lowercase().as_str() {
				"1" | "true" | "yes" | "on" => Ok(true),
				"0" | "false" | "no" | "off" => Ok(false),
				_ => Err(ConfigError::env(key, format!("`{v}` is not a boolean"))),
			})
			.transpose()
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!(vars = self.vars.len(), "loading environment variables");
		let mut layer = ConfigLayer::default();

		if let Some(dir) = self.get("ICONHARVEST_OUTPUT_DIR") {
			layer.output_mut().dir = Some(PathBuf::from(dir));
		}
		if let Some(formats) = self.get("ICONHARVEST_FORMAT") {
			layer.output_mut().formats = Some(formats);
		}
		if let Some(size) = self.parse("ICONHARVEST_SOURCE_SIZE")? {
			layer.output_mut().source_size = Some(size);
		}
		if let Some(concurrency) = self.parse("ICONHARVEST_CONCURRENCY")? {
			layer.fetch_mut().concurrency = Some(concurrency);
		}
		if let Some(url) = self.get("ICONHARVEST_WEBDRIVER_URL") {
			layer.browser_mut().webdriver_url = Some(url);
		}
		if let Some(headless) = self.parse_bool("ICONHARVEST_HEADLESS")? {
			layer.browser_mut().headless = Some(headless);
		}
		if let Some(level) = self.get("ICONHARVEST_LOG_LEVEL") {
			layer.logging_mut().level = Some(level);
		}
		if let Some(format) = self.get("ICONHARVEST_LOG_FORMAT") {
			layer.logging_mut().format = Some(format);
		}

		Ok(layer)
	}
}

/// CLI override source.
pub struct CliSource {
	overrides: CliOverrides,
}

/// CLI argument overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
	pub output_dir: Option<PathBuf>,
	pub formats: Option<String>,
	pub source_size: Option<u32>,
	pub keep_png: Option<bool>,
	pub concurrency: Option<usize>,
	pub webdriver_url: Option<String>,
	pub headless: Option<bool>,
	pub log_level: Option<String>,
	pub log_format: Option<String>,
	pub log_file: Option<PathBuf>,
}

impl CliSource {
	pub fn new(overrides: CliOverrides) -> Self {
		Self { overrides }
	}
}

impl ConfigSource for CliSource {
	fn name(&self) -> &'static str {
		"cli"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Cli
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading CLI overrides");
		let cli = self.overrides.clone();
		let mut layer = ConfigLayer::default();

		if cli.output_dir.is_some()
			|| cli.formats.is_some()
			|| cli.source_size.is_some()
			|| cli.keep_png.is_some()
		{
			layer.output = Some(OutputLayer {
				dir: cli.output_dir,
				formats: cli.formats,
				source_size: cli.source_size,
				keep_png: cli.keep_png,
			});
		}
		if cli.concurrency.is_some() {
			layer.fetch_mut().concurrency = cli.concurrency;
		}
		if cli.webdriver_url.is_some() || cli.headless.is_some() {
			let browser = layer.browser_mut();
			browser.webdriver_url = cli.webdriver_url;
			browser.headless = cli.headless;
		}
		if cli.log_level.is_some() || cli.log_format.is_some() || cli.log_file.is_some() {
			layer.logging = Some(LoggingLayer {
				level: cli.log_level,
				file: cli.log_file,
				format: cli.log_format,
			});
		}

		Ok(layer)
	}
}
