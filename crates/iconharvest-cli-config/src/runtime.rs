// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Runtime configuration types with resolved defaults.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use iconharvest_common_core::{
	closest_catalog_size, FormatSelection, CATALOG_SIZES, LARGEST_CATALOG_SIZE,
};
use tracing::warn;
use url::Url;

use crate::layer::*;
use crate::paths::PathsConfig;
use crate::ConfigError;

pub const DEFAULT_OUTPUT_DIR: &str = "data";
pub const DEFAULT_SOURCE_SIZE: u32 = LARGEST_CATALOG_SIZE;
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// The final, validated configuration for iconharvest.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
	pub output: OutputConfig,
	pub browser: BrowserConfig,
	pub fetch: FetchConfig,
	pub retry: RetryConfig,
	pub logging: LoggingConfig,
	pub paths: PathsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
	pub dir: PathBuf,
	pub formats: FormatSelection,
	/// Always one of the catalog sizes.
	pub source_size: u32,
	pub keep_png: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserConfig {
	pub webdriver_url: Url,
	pub headless: bool,
	pub navigation_timeout: Duration,
	pub marker_timeout: Duration,
	pub max_scroll_passes: u32,
	pub settle_delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
	pub concurrency: usize,
	pub request_timeout: Duration,
	pub max_file_size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	pub jitter: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
	pub level: LogLevel,
	pub file: Option<PathBuf>,
	pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
	Error,
	Warn,
	#[default]
	Info,
	Debug,
	Trace,
}

impl LogLevel {
	pub fn as_str(self) -> &'static str {
		match self {
			LogLevel::Error => "error",
			LogLevel::Warn => "warn",
			LogLevel::Info => "info",
			LogLevel::Debug => "debug",
			LogLevel::Trace => "trace",
		}
	}
}

impl FromStr for LogLevel {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"error" => Ok(LogLevel::Error),
			"warn" | "warning" => Ok(LogLevel::Warn),
			"info" => Ok(LogLevel::Info),
			"debug" => Ok(LogLevel::Debug),
			"trace" => Ok(LogLevel::Trace),
			other => Err(ConfigError::invalid_value(
				"logging.level",
				format!("`{other}` (expected error, warn, info, debug or trace)"),
			)),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
	Pretty,
	#[default]
	Compact,
	Json,
}

impl FromStr for LogFormat {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"pretty" => Ok(LogFormat::Pretty),
			"compact" => Ok(LogFormat::Compact),
			"json" => Ok(LogFormat::Json),
			other => Err(ConfigError::invalid_value(
				"logging.format",
				format!("`{other}` (expected pretty, compact or json)"),
			)),
		}
	}
}

impl HarvestConfig {
	/// Build runtime config from a merged layer and paths.
	pub fn from_layer(layer: ConfigLayer, paths: PathsConfig) -> Result<Self, ConfigError> {
		Ok(Self {
			output: build_output_config(layer.output)?,
			browser: build_browser_config(layer.browser)?,
			fetch: build_fetch_config(layer.fetch),
			retry: build_retry_config(layer.retry),
			logging: build_logging_config(layer.logging)?,
			paths,
		})
	}
}

fn build_output_config(layer: Option<OutputLayer>) -> Result<OutputConfig, ConfigError> {
	let layer = layer.unwrap_or_default();
	let formats = match layer.formats.as_deref() {
		Some(s) => FormatSelection::from_str(s)
			.map_err(|e| ConfigError::invalid_value("output.formats", e.to_string()))?,
		None => FormatSelection::default(),
	};

	let requested = layer.source_size.unwrap_or(DEFAULT_SOURCE_SIZE);
	let source_size = closest_catalog_size(requested);
	if source_size != requested {
		warn!(
			requested,
			using = source_size,
			available = ?CATALOG_SIZES,
			"source size is not offered by the catalog, using the closest one"
		);
	}

	Ok(OutputConfig {
		dir: layer
			.dir
			.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
		formats,
		source_size,
		keep_png: layer.keep_png.unwrap_or(false),
	})
}

fn build_browser_config(layer: Option<BrowserLayer>) -> Result<BrowserConfig, ConfigError> {
	let layer = layer.unwrap_or_default();
	let raw = layer
		.webdriver_url
		.unwrap_or_else(|| DEFAULT_WEBDRIVER_URL.to_string());
	let webdriver_url = Url::parse(&raw)
		.map_err(|e| ConfigError::invalid_value("browser.webdriver_url", format!("`{raw}`: {e}")))?;

	Ok(BrowserConfig {
		webdriver_url,
		headless: layer.headless.unwrap_or(true),
		navigation_timeout: Duration::from_secs(layer.navigation_timeout_secs.unwrap_or(60)),
		marker_timeout: Duration::from_secs(layer.marker_timeout_secs.unwrap_or(20)),
		max_scroll_passes: layer.max_scroll_passes.unwrap_or(100),
		settle_delay: Duration::from_millis(layer.settle_delay_ms.unwrap_or(1200)),
	})
}

fn build_fetch_config(layer: Option<FetchLayer>) -> FetchConfig {
	let layer = layer.unwrap_or_default();
	FetchConfig {
		concurrency: layer.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
		request_timeout: Duration::from_secs(layer.request_timeout_secs.unwrap_or(30)),
		max_file_size_bytes: layer.max_file_size_bytes.unwrap_or(DEFAULT_MAX_FILE_SIZE),
	}
}

fn build_retry_config(layer: Option<RetryLayer>) -> RetryConfig {
	let layer = layer.unwrap_or_default();
	RetryConfig {
		max_attempts: layer.max_attempts.unwrap_or(3),
		base_delay: Duration::from_millis(layer.base_delay_ms.unwrap_or(1000)),
		max_delay: Duration::from_millis(layer.max_delay_ms.unwrap_or(10_000)),
		backoff_factor: layer.backoff_factor.unwrap_or(2.0),
		jitter: layer.jitter.unwrap_or(true),
	}
}

fn build_logging_config(layer: Option<LoggingLayer>) -> Result<LoggingConfig, ConfigError> {
	let layer = layer.unwrap_or_default();
	Ok(LoggingConfig {
		level: layer
			.level
			.as_deref()
			.map(LogLevel::from_str)
			.transpose()?
			.unwrap_or_default(),
		file: layer.file,
		format: layer
			.format
			.as_deref()
			.map(LogFormat::from_str)
			.transpose()?
			.unwrap_or_default(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn paths() -> PathsConfig {
		PathsConfig {
			user_config_file: "/tmp/iconharvest-test/config.toml".into(),
			state_dir: "/tmp/iconharvest-test/state".into(),
		}
	}

	#[test]
	fn empty_layer_yields_documented_defaults() {
		let config = HarvestConfig::from_layer(ConfigLayer::default(), paths()).unwrap();

		assert_eq!(config.output.dir, PathBuf::from("data"));
		assert_eq!(config.output.formats, FormatSelection::Ico);
		assert_eq!(config.output.source_size, 512);
		assert!(!config.output.keep_png);
		assert_eq!(config.browser.webdriver_url.as_str(), "http://localhost:9515/");
		assert!(config.browser.headless);
		assert_eq!(config.browser.marker_timeout, Duration::from_secs(20));
		assert_eq!(config.browser.max_scroll_passes, 100);
		assert_eq!(config.fetch.concurrency, 4);
		assert_eq!(config.fetch.max_file_size_bytes, 50 * 1024 * 1024);
		assert_eq!(config.retry.max_delay, Duration::from_secs(10));
		assert_eq!(config.logging.level, LogLevel::Info);
		assert_eq!(config.logging.format, LogFormat::Compact);
	}

	#[test]
	fn unlisted_source_size_snaps_to_catalog() {
		let layer = ConfigLayer {
			output: Some(OutputLayer {
				source_size: Some(200),
				..Default::default()
			}),
			..Default::default()
		};
		let config = HarvestConfig::from_layer(layer, paths()).unwrap();
		assert_eq!(config.output.source_size, 256);
	}

	#[test]
	fn unknown_format_is_rejected() {
		let layer = ConfigLayer {
			output: Some(OutputLayer {
				formats: Some("svg".to_string()),
				..Default::default()
			}),
			..Default::default()
		};
		let err = HarvestConfig::from_layer(layer, paths()).unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "output.formats"));
	}

	#[test]
	fn log_settings_parse_case_insensitively() {
		assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
		assert_eq!("Json".parse::<LogFormat>().unwrap(), LogFormat::Json);
		assert!("loud".parse::<LogLevel>().is_err());
	}
}
