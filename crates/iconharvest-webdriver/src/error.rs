// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use iconharvest_common_page::PageError;

#[derive(Debug, thiserror::Error)]
pub enum WebDriverError {
	#[error("request to driver failed: {0}")]
	Http(#[from] reqwest::Error),

	/// The driver answered with a W3C error object.
	#[error("{error}: {message}")]
	Command { error: String, message: String },

	#[error("malformed driver response: {0}")]
	Protocol(String),
}

impl WebDriverError {
	/// W3C error code, when the driver sent one.
	pub fn code(&self) -> Option<&str> {
		match self {
			WebDriverError::Command { error, .. } => Some(error),
			_ => None,
		}
	}
}

impl From<WebDriverError> for PageError {
	fn from(err: WebDriverError) -> Self {
		match err {
			WebDriverError::Http(e) => PageError::Transport(e.to_string()),
			WebDriverError::Command { error, message } => match error.as_str() {
				"no such element" => PageError::ElementNotFound(message),
				"javascript error" => PageError::Script(message),
				"invalid session id" | "no such window" => PageError::Closed,
				_ => PageError::Protocol(format!("{error}: {message}")),
			},
			WebDriverError::Protocol(message) => PageError::Protocol(message),
		}
	}
}
