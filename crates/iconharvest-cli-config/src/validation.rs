// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration validation rules.

use std::time::Duration;

use tracing::warn;

use crate::runtime::HarvestConfig;
use crate::ConfigError;

pub const MAX_CONCURRENCY: usize = 16;

/// Smallest body a download may have; anything shorter cannot be an icon.
const MIN_FILE_SIZE: u64 = 50;

/// Validate the configuration.
///
/// Returns Ok(()) if valid, or ConfigError::InvalidValue naming the field.
pub fn validate_config(config: &HarvestConfig) -> Result<(), ConfigError> {
	validate_browser(config)?;
	validate_fetch(config)?;
	validate_retry(config)?;
	Ok(())
}

fn validate_browser(config: &HarvestConfig) -> Result<(), ConfigError> {
	let browser = &config.browser;

	if !matches!(browser.webdriver_url.scheme(), "http" | "https") {
		return Err(ConfigError::invalid_value(
			"browser.webdriver_url",
			"must be an http or https URL",
		));
	}
	if browser.navigation_timeout == Duration::ZERO {
		return Err(ConfigError::invalid_value(
			"browser.navigation_timeout_secs",
			"must be at least 1",
		));
	}
	// One productive pass plus two empty confirmations.
	if browser.max_scroll_passes < 3 {
		return Err(ConfigError::invalid_value(
			"browser.max_scroll_passes",
			"must be at least 3",
		));
	}
	if !browser.headless {
		warn!("running with a visible browser window");
	}

	Ok(())
}

fn validate_fetch(config: &HarvestConfig) -> Result<(), ConfigError> {
	let fetch = &config.fetch;

	if !(1..=MAX_CONCURRENCY).contains(&fetch.concurrency) {
		return Err(ConfigError::invalid_value(
			"fetch.concurrency",
			format!("must be between 1 and {MAX_CONCURRENCY}"),
		));
	}
	if fetch.request_timeout == Duration::ZERO {
		return Err(ConfigError::invalid_value(
			"fetch.request_timeout_secs",
			"must be at least 1",
		));
	}
	if fetch.max_file_size_bytes < MIN_FILE_SIZE {
		return Err(ConfigError::invalid_value(
			"fetch.max_file_size_bytes",
			format!("must be at least {MIN_FILE_SIZE}"),
		));
	}

	Ok(())
}

fn validate_retry(config: &HarvestConfig) -> Result<(), ConfigError> {
	let retry = &config.retry;

	if retry.max_attempts == 0 {
		return Err(ConfigError::invalid_value(
			"retry.max_attempts",
			"must be at least 1",
		));
	}

	if retry.max_attempts > 20 {
		return Err(ConfigError::invalid_value(
			"retry.max_attempts",
			"must be at most 20 (unreasonably high)",
		));
	}

	if !(1.0..=10.0).contains(&retry.backoff_factor) {
		return Err(ConfigError::invalid_value(
			"retry.backoff_factor",
			"must be between 1.0 and 10.0",
		));
	}

	if retry.base_delay > retry.max_delay {
		return Err(ConfigError::invalid_value(
			"retry.base_delay_ms",
			"must not exceed retry.max_delay_ms",
		));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::layer::ConfigLayer;
	use crate::paths::PathsConfig;
	use proptest::prelude::*;

	fn config() -> HarvestConfig {
		let paths = PathsConfig {
			user_config_file: "/tmp/iconharvest-test/config.toml".into(),
			state_dir: "/tmp/iconharvest-test/state".into(),
		};
		HarvestConfig::from_layer(ConfigLayer::default(), paths).unwrap()
	}

	fn field(err: ConfigError) -> String {
		match err {
			ConfigError::InvalidValue { field, .. } => field,
			other => panic!("unexpected {other:?}"),
		}
	}

	#[test]
	fn defaults_are_valid() {
		validate_config(&config()).unwrap();
	}

	#[test]
	fn rejects_non_http_driver() {
		let mut config = config();
		config.browser.webdriver_url = url::Url::parse("file:///tmp/driver").unwrap();
		assert_eq!(field(validate_config(&config).unwrap_err()), "browser.webdriver_url");
	}

	#[test]
	fn rejects_inverted_retry_delays() {
		let mut config = config();
		config.retry.base_delay = Duration::from_secs(20);
		assert_eq!(field(validate_config(&config).unwrap_err()), "retry.base_delay_ms");
	}

	#[test]
	fn rejects_too_few_scroll_passes() {
		let mut config = config();
		config.browser.max_scroll_passes = 2;
		assert_eq!(
			field(validate_config(&config).unwrap_err()),
			"browser.max_scroll_passes"
		);
	}

	proptest! {
		#[test]
		fn concurrency_bounds(concurrency in 0usize..64) {
			let mut config = config();
			config.fetch.concurrency = concurrency;
			let valid = validate_config(&config).is_ok();
			prop_assert_eq!(valid, (1..=MAX_CONCURRENCY).contains(&concurrency));
		}
	}
}
