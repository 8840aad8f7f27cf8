// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use iconharvest_common_page::PageError;

/// Login or session failure. Always fatal for a run.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
	#[error("this collection requires signing in; supply an e-mail and password")]
	CredentialsRequired,

	#[error("the catalog rejected the supplied credentials")]
	Rejected,

	#[error("a CAPTCHA or bot check blocked the login; sign in interactively with a visible browser")]
	ChallengeDetected,

	#[error("timed out after {}s waiting for {what}", after.as_secs())]
	Timeout { what: String, after: Duration },

	#[error("session expired again after its single re-authentication")]
	SessionUnusable,

	#[error("credential source failed: {0}")]
	CredentialSource(String),

	#[error("browser error during login: {0}")]
	Page(#[source] PageError),
}

impl From<PageError> for AuthenticationError {
	fn from(err: PageError) -> Self {
		match err {
			PageError::Timeout { what, after } => AuthenticationError::Timeout { what, after },
			other => AuthenticationError::Page(other),
		}
	}
}
