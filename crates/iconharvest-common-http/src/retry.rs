// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded retries with exponential backoff.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
	/// Total attempts including the first one.
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	pub jitter: bool,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_secs(1),
			max_delay: Duration::from_secs(10),
			backoff_factor: 2.0,
			jitter: true,
		}
	}
}

/// Classifies a failure as transient (worth another attempt) or final.
pub trait RetryableError {
	fn is_retryable(&self) -> bool;
}

/// 408, 429 and every 5xx.
pub fn is_retryable_status(status: StatusCode) -> bool {
	matches!(
		status,
		StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS
	) || status.is_server_error()
}

impl RetryableError for reqwest::Error {
	fn is_retryable(&self) -> bool {
		self.is_timeout()
			|| self.is_connect()
			|| self.status().is_some_and(is_retryable_status)
	}
}

/// Sleep after failed attempt `failed` (zero based).
///
/// `base_delay * backoff_factor^failed`, capped at `max_delay`. With jitter
/// the capped value is scaled by a factor drawn from `[0.5, 1.5)`.
pub fn backoff_delay(cfg: &RetryConfig, failed: u32) -> Duration {
	let exponent = i32::try_from(failed).unwrap_or(i32::MAX);
	let raw = cfg.base_delay.as_secs_f64() * cfg.backoff_factor.powi(exponent);
	let capped = raw.min(cfg.max_delay.as_secs_f64());
	let scale = if cfg.jitter { 0.5 + fastrand::f64() } else { 1.0 };
	Duration::from_secs_f64(capped * scale)
}

/// Run `op` until it succeeds, fails with a final error, or
/// `cfg.max_attempts` attempts have been made.
pub async fn retry<F, Fut, T, E>(cfg: &RetryConfig, mut op: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: RetryableError + std::fmt::Debug,
{
	let max_attempts = cfg.max_attempts.max(1);
	let mut attempt = 1;
	loop {
		let err = match op().await {
			Ok(value) => return Ok(value),
			Err(err) => err,
		};

		if !err.is_retryable() {
			debug!(error = ?err, attempt, "final error, not retrying");
			return Err(err);
		}
		if attempt >= max_attempts {
			warn!(error = ?err, attempt, max_attempts, "giving up after transient errors");
			return Err(err);
		}

		let delay = backoff_delay(cfg, attempt - 1);
		warn!(
			error = ?err,
			attempt,
			max_attempts,
			delay_ms = delay.as_millis() as u64,
			"transient error, backing off"
		);
		tokio::time::sleep(delay).await;
		attempt += 1;
	}
}
