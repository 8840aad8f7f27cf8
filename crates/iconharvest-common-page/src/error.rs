// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum PageError {
	#[error("navigation to {url} failed: {message}")]
	Navigation { url: String, message: String },

	#[error("timed out after {}s waiting for {what}", after.as_secs())]
	Timeout { what: String, after: Duration },

	#[error("page element not found: {0}")]
	ElementNotFound(String),

	#[error("page script failed: {0}")]
	Script(String),

	#[error("browser driver unreachable: {0}")]
	Transport(String),

	#[error("unexpected browser driver response: {0}")]
	Protocol(String),

	#[error("browser session is closed")]
	Closed,
}

impl PageError {
	pub fn timeout(what: impl Into<String>, after: Duration) -> Self {
		Self::Timeout {
			what: what.into(),
			after,
		}
	}

	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout { .. })
	}
}
