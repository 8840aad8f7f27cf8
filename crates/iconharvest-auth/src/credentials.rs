// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Account credentials and where they come from.

use iconharvest_common_core::ValidationError;
use iconharvest_common_secret::SecretString;

use crate::error::AuthenticationError;

/// An e-mail/password pair. Both halves are always present and non-blank.
#[derive(Debug, Clone)]
pub struct Credentials {
	email: String,
	password: SecretString,
}

impl Credentials {
	pub fn new(email: impl Into<String>, password: SecretString) -> Result<Self, ValidationError> {
		let email = email.into().trim().to_string();
		if email.is_empty() || password.is_blank() {
			return Err(ValidationError::IncompleteCredentials);
		}
		if !email.contains('@') {
			return Err(ValidationError::invalid_value(
				"email",
				"expected an e-mail address",
			));
		}
		Ok(Self { email, password })
	}

	/// Combine optionally supplied halves. Neither half yields `None`; exactly
	/// one half is an error.
	pub fn from_parts(
		email: Option<String>,
		password: Option<SecretString>,
	) -> Result<Option<Self>, ValidationError> {
		let email = email.filter(|e| !e.trim().is_empty());
		let password = password.filter(|p| !p.is_blank());
		match (email, password) {
			(None, None) => Ok(None),
			(Some(email), Some(password)) => Self::new(email, password).map(Some),
			_ => Err(ValidationError::IncompleteCredentials),
		}
	}

	pub fn email(&self) -> &str {
		&self.email
	}

	pub fn password(&self) -> &SecretString {
		&self.password
	}
}

/// Supplies credentials the first time a login is actually needed.
///
/// A run that can reuse a stored session never calls it, so an interactive
/// prompt only appears when the session is missing or rejected.
pub trait CredentialSource: Send + Sync {
	fn obtain(&self, account: &str) -> Result<Credentials, AuthenticationError>;
}

/// Credentials known up front.
#[derive(Debug, Clone)]
pub struct StaticCredentials(pub Credentials);

impl CredentialSource for StaticCredentials {
	fn obtain(&self, _account: &str) -> Result<Credentials, AuthenticationError> {
		Ok(self.0.clone())
	}
}
