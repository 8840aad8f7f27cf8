// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ordered merge of every configuration source into one [`HarvestConfig`].

use tracing::{debug, info};

use crate::layer::ConfigLayer;
use crate::paths::PathsConfig;
use crate::runtime::HarvestConfig;
use crate::sources::ConfigSource;
use crate::validation::validate_config;
use crate::ConfigError;

pub struct ConfigRegistry {
	sources: Vec<Box<dyn ConfigSource>>,
}

impl ConfigRegistry {
	pub fn new() -> Self {
		Self {
			sources: Vec::new(),
		}
	}

	pub fn register(&mut self, source: Box<dyn ConfigSource>) {
		debug!(source = source.name(), precedence = ?source.precedence(), "registering config source");
		self.sources.push(source);
	}

	/// Load configuration from all sources, merge, and validate.
	///
	/// Sources are merged lowest precedence first. A source that fails to
	/// load fails the whole load.
	pub fn load(&self, paths: PathsConfig) -> Result<HarvestConfig, ConfigError> {
		let mut ordered: Vec<&dyn ConfigSource> = self.sources.iter().map(|s| s.as_ref()).collect();
		ordered.sort_by_key(|s| s.precedence());

		let mut merged = ConfigLayer::default();
		for source in ordered {
			let layer = source.load()?;
			debug!(source = source.name(), precedence = ?source.precedence(), "merged config layer");
			merged.merge(layer);
		}

		let config = HarvestConfig::from_layer(merged, paths)?;
		validate_config(&config)?;

		info!(
			output_dir = %config.output.dir.display(),
			formats = %config.output.formats,
			source_size = config.output.source_size,
			concurrency = config.fetch.concurrency,
			"configuration loaded"
		);

		Ok(config)
	}

	pub fn source_count(&self) -> usize {
		self.sources.len()
	}
}

impl Default for ConfigRegistry {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::layer::FetchLayer;
	use crate::sources::{DefaultsSource, EnvSource, FileSource, Precedence};
	use std::io::Write;

	fn paths() -> PathsConfig {
		PathsConfig {
			user_config_file: "/tmp/iconharvest-test/config.toml".into(),
			state_dir: "/tmp/iconharvest-test/state".into(),
		}
	}

	struct Fixed {
		name: &'static str,
		precedence: Precedence,
		concurrency: usize,
	}

	impl ConfigSource for Fixed {
		fn name(&self) -> &'static str {
			self.name
		}
		fn precedence(&self) -> Precedence {
			self.precedence
		}
		fn load(&self) -> Result<ConfigLayer, ConfigError> {
			Ok(ConfigLayer {
				fetch: Some(FetchLayer {
					concurrency: Some(self.concurrency),
					..Default::default()
				}),
				..Default::default()
			})
		}
	}

	#[test]
	fn loads_with_defaults_only() {
		let mut registry = ConfigRegistry::new();
		registry.register(Box::new(DefaultsSource));
		assert_eq!(registry.source_count(), 1);

		let config = registry.load(paths()).unwrap();
		assert_eq!(config.fetch.concurrency, 4);
	}

	#[test]
	fn higher_precedence_wins_regardless_of_registration_order() {
		let mut registry = ConfigRegistry::new();
		registry.register(Box::new(Fixed {
			name: "cli",
			precedence: Precedence::Cli,
			concurrency: 2,
		}));
		registry.register(Box::new(Fixed {
			name: "env",
			precedence: Precedence::Environment,
			concurrency: 8,
		}));
		registry.register(Box::new(DefaultsSource));

		assert_eq!(registry.load(paths()).unwrap().fetch.concurrency, 2);
	}

	#[test]
	fn environment_overrides_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[output]\nformats = \"icns\"\ndir = \"from-file\"").unwrap();

		let mut registry = ConfigRegistry::new();
		registry.register(Box::new(FileSource::explicit(file.path().to_path_buf())));
		registry.register(Box::new(EnvSource::from_vars([(
			"ICONHARVEST_FORMAT",
			"both",
		)])));

		let config = registry.load(paths()).unwrap();
		assert_eq!(config.output.formats.to_string(), "both");
		assert_eq!(config.output.dir, std::path::PathBuf::from("from-file"));
	}

	#[test]
	fn malformed_file_fails_the_load() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "concurrency = = 3").unwrap();

		let mut registry = ConfigRegistry::new();
		registry.register(Box::new(DefaultsSource));
		registry.register(Box::new(FileSource::explicit(file.path().to_path_buf())));

		assert!(matches!(
			registry.load(paths()).unwrap_err(),
			ConfigError::TomlParse { .. }
		));
	}

	#[test]
	fn out_of_range_value_fails_validation() {
		let mut registry = ConfigRegistry::new();
		registry.register(Box::new(Fixed {
			name: "cli",
			precedence: Precedence::Cli,
			concurrency: 64,
		}));
		assert!(matches!(
			registry.load(paths()).unwrap_err(),
			ConfigError::InvalidValue { .. }
		));
	}
}
