// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration layer for merging from multiple sources.

use serde::Deserialize;
use std::path::PathBuf;

/// Partial configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
	#[serde(default)]
	pub output: Option<OutputLayer>,
	#[serde(default)]
	pub browser: Option<BrowserLayer>,
	#[serde(default)]
	pub fetch: Option<FetchLayer>,
	#[serde(default)]
	pub retry: Option<RetryLayer>,
	#[serde(default)]
	pub logging: Option<LoggingLayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputLayer {
	#[serde(default)]
	pub dir: Option<PathBuf>,
	/// `ico`, `icns` or `both`
	#[serde(default)]
	pub formats: Option<String>,
	#[serde(default)]
	pub source_size: Option<u32>,
	#[serde(default)]
	pub keep_png: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrowserLayer {
	#[serde(default)]
	pub webdriver_url: Option<String>,
	#[serde(default)]
	pub headless: Option<bool>,
	#[serde(default)]
	pub navigation_timeout_secs: Option<u64>,
	#[serde(default)]
	pub marker_timeout_secs: Option<u64>,
	#[serde(default)]
	pub max_scroll_passes: Option<u32>,
	#[serde(default)]
	pub settle_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchLayer {
	#[serde(default)]
	pub concurrency: Option<usize>,
	#[serde(default)]
	pub request_timeout_secs: Option<u64>,
	#[serde(default)]
	pub max_file_size_bytes: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryLayer {
	#[serde(default)]
	pub max_attempts: Option<u32>,
	#[serde(default)]
	pub base_delay_ms: Option<u64>,
	#[serde(default)]
	pub max_delay_ms: Option<u64>,
	#[serde(default)]
	pub backoff_factor: Option<f64>,
	#[serde(default)]
	pub jitter: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingLayer {
	#[serde(default)]
	pub level: Option<String>,
	#[serde(default)]
	pub file: Option<PathBuf>,
	#[serde(default)]
	pub format: Option<String>,
}

impl ConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ConfigLayer) {
		merge_option(&mut self.output, other.output, OutputLayer::merge);
		merge_option(&mut self.browser, other.browser, BrowserLayer::merge);
		merge_option(&mut self.fetch, other.fetch, FetchLayer::merge);
		merge_option(&mut self.retry, other.retry, RetryLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingLayer::merge);
	}

	pub(crate) fn output_mut(&mut self) -> &mut OutputLayer {
		self.output.get_or_insert_with(OutputLayer::default)
	}

	pub(crate) fn browser_mut(&mut self) -> &mut BrowserLayer {
		self.browser.get_or_insert_with(BrowserLayer::default)
	}

	pub(crate) fn fetch_mut(&mut self) -> &mut FetchLayer {
		self.fetch.get_or_insert_with(FetchLayer::default)
	}

	pub(crate) fn logging_mut(&mut self) -> &mut LoggingLayer {
		self.logging.get_or_insert_with(LoggingLayer::default)
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

fn overlay<T>(target: &mut Option<T>, source: Option<T>) {
	if source.is_some() {
		*target = source;
	}
}

impl OutputLayer {
	fn merge(&mut self, other: OutputLayer) {
		overlay(&mut self.dir, other.dir);
		overlay(&mut self.formats, other.formats);
		overlay(&mut self.source_size, other.source_size);
		overlay(&mut self.keep_png, other.keep_png);
	}
}

impl BrowserLayer {
	fn merge(&mut self, other: BrowserLayer) {
		overlay(&mut self.webdriver_url, other.webdriver_url);
		overlay(&mut self.headless, other.headless);
		overlay(
			&mut self.navigation_timeout_secs,
			other.navigation_timeout_secs,
		);
		overlay(&mut self.marker_timeout_secs, other.marker_timeout_secs);
		overlay(&mut self.max_scroll_passes, other.max_scroll_passes);
		overlay(&mut self.settle_delay_ms, other.settle_delay_ms);
	}
}

impl FetchLayer {
	fn merge(&mut self, other: FetchLayer) {
		overlay(&mut self.concurrency, other.concurrency);
		overlay(&mut self.request_timeout_secs, other.request_timeout_secs);
		overlay(&mut self.max_file_size_bytes, other.max_file_size_bytes);
	}
}

impl RetryLayer {
	fn merge(&mut self, other: RetryLayer) {
		overlay(&mut self.max_attempts, other.max_attempts);
		overlay(&mut self.base_delay_ms, other.base_delay_ms);
		overlay(&mut self.max_delay_ms, other.max_delay_ms);
		overlay(&mut self.backoff_factor, other.backoff_factor);
		overlay(&mut self.jitter, other.jitter);
	}
}

impl LoggingLayer {
	fn merge(&mut self, other: LoggingLayer) {
		overlay(&mut self.level, other.level);
		overlay(&mut self.file, other.file);
		overlay(&mut self.format, other.format);
	}
}
