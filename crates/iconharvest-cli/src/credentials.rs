// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Where the run's account and password come from.

use std::io::{BufRead, BufReader, Stdin, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use iconharvest_auth::{AuthenticationError, CredentialSource, Credentials, StaticCredentials};
use iconharvest_common_core::ValidationError;
use iconharvest_common_secret::SecretString;
use iconharvest_session::mask_account;

pub const PASSWORD_ENV: &str = "ICONHARVEST_PASSWORD";

/// Who the run signs in as.
pub enum CredentialPlan {
	/// No account: only collections visible to guests.
	Anonymous,
	Account {
		email: String,
		/// `None` when only a stored session can be used.
		source: Option<Arc<dyn CredentialSource>>,
	},
}

/// Password given up front, from `ICONHARVEST_PASSWORD` or a password file.
pub fn preset_password(file: Option<&Path>) -> Result<Option<SecretString>> {
	if let Some(path) = file {
		let raw = std::fs::read_to_string(path)
			.with_context(|| format!("cannot read password file {}", path.display()))?;
		let password = raw.trim_end_matches(&['\r', '\n'][..]).to_string();
		return Ok(Some(SecretString::new(password)));
	}
	Ok(std::env::var(PASSWORD_ENV)
		.ok()
		.filter(|p| !p.is_empty())
		.map(SecretString::new))
}

/// Decide how to authenticate.
///
/// An e-mail without any password source is accepted only when a session
/// for that account is already stored; otherwise the two must come
/// together.
pub fn plan_credentials(
	email: Option<String>,
	password: Option<SecretString>,
	password_stdin: bool,
	session_stored: bool,
) -> Result<CredentialPlan, ValidationError> {
	let email = email
		.map(|e| e.trim().to_string())
		.filter(|e| !e.is_empty());

	match (email, password) {
		(None, None) if !password_stdin => Ok(CredentialPlan::Anonymous),
		(None, _) => Err(ValidationError::IncompleteCredentials),
		(Some(email), Some(password)) => {
			let credentials = Credentials::new(email.clone(), password)?;
			Ok(CredentialPlan::Account {
				email,
				source: Some(Arc::new(StaticCredentials(credentials))),
			})
		}
		(Some(email), None) if password_stdin => Ok(CredentialPlan::Account {
			email,
			source: Some(Arc::new(LinePassword::stdin())),
		}),
		(Some(email), None) if session_stored => Ok(CredentialPlan::Account {
			email,
			source: None,
		}),
		(Some(_), None) => Err(ValidationError::IncompleteCredentials),
	}
}

/// Reads one line as the password, only when a login actually happens.
pub struct LinePassword<R> {
	reader: Mutex<R>,
}

impl LinePassword<BufReader<Stdin>> {
	pub fn stdin() -> Self {
		Self::new(BufReader::new(std::io::stdin()))
	}
}

impl<R: BufRead> LinePassword<R> {
	pub fn new(reader: R) -> Self {
		Self {
			reader: Mutex::new(reader),
		}
	}
}

impl<R: BufRead + Send> CredentialSource for LinePassword<R> {
	fn obtain(&self, account: &str) -> Result<Credentials, AuthenticationError> {
		eprint!("Password for {}: ", mask_account(account));
		let _ = std::io::stderr().flush();

		let mut line = String::new();
		let mut reader = self.reader.lock().unwrap_or_else(|p| p.into_inner());
		reader
			.read_line(&mut line)
			.map_err(|e| AuthenticationError::CredentialSource(e.to_string()))?;
		let password = SecretString::new(line.trim_end_matches(&['\r', '\n'][..]).to_string());

		Credentials::new(account, password)
			.map_err(|e| AuthenticationError::CredentialSource(e.to_string()))
	}
}
