// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session store error types.

/// Errors that can occur while persisting sessions.
///
/// Loading has no error variant: an unreadable or corrupt session file is
/// reported as "no session", not as an error.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
	#[error("IO error: {0}")]
	Io(String),

	#[error("Serialization error: {0}")]
	Serde(String),

	#[error("Invalid account identifier: {0}")]
	InvalidAccount(String),
}

impl From<std::io::Error> for SessionStoreError {
	fn from(err: std::io::Error) -> Self {
		SessionStoreError::Io(err.to_string())
	}
}

impl From<serde_json::Error> for SessionStoreError {
	fn from(err: serde_json::Error) -> Self {
		SessionStoreError::Serde(err.to_string())
	}
}
