// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Validation error type.

/// Input rejected before any network or filesystem activity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
	/// The input is not a parseable absolute URL.
	#[error("invalid URL: {0}")]
	MalformedUrl(String),

	/// Only `https` may be contacted.
	#[error("only https URLs are allowed, got scheme `{0}`")]
	InsecureScheme(String),

	/// The host is not part of the allow-list.
	#[error("host `{0}` is not on the allow-list")]
	DisallowedHost(String),

	/// The URL carries credentials, a port, a query or a path we do not expect.
	#[error("unexpected URL content: {0}")]
	UnexpectedContent(String),

	/// The path does not look like a catalog collection.
	#[error("not a collection URL: expected a path containing /collection/ or /collections/")]
	NotACollection,

	/// A path segment or name tried to escape its directory.
	#[error("path traversal attempt in {0}")]
	PathTraversal(String),

	/// An e-mail was supplied without a password or the other way round.
	#[error("both email and password must be provided together")]
	IncompleteCredentials,

	/// Catch-all for out-of-range option values.
	#[error("invalid value for {field}: {message}")]
	InvalidValue { field: String, message: String },
}

impl ValidationError {
	pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self::InvalidValue {
			field: field.into(),
			message: message.into(),
		}
	}
}
