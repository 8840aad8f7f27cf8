// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session value types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use iconharvest_common_page::{BrowserCookie, BrowserState};
use iconharvest_common_secret::SecretString;
use serde::{Deserialize, Serialize};

/// Version written into every session file. Files with another version are
/// treated as absent.
pub const SESSION_FORMAT_VERSION: u32 = 1;

/// Runtime session: cookie and storage values stay wrapped in `SecretString`.
///
/// Validity is never stored. Whether a session still works is decided by
/// probing the site with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
	pub account: String,
	pub captured_at: DateTime<Utc>,
	pub state: BrowserState,
}

impl Session {
	pub fn new(account: impl Into<String>, state: BrowserState) -> Self {
		Self {
			account: account.into(),
			captured_at: Utc::now(),
			state,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedCookie {
	pub name: String,
	pub value: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub domain: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
	#[serde(default)]
	pub secure: bool,
	#[serde(default)]
	pub http_only: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expiry: Option<i64>,
}

/// On-disk session representation (JSON serializable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSession {
	pub version: u32,
	pub account: String,
	pub captured_at: DateTime<Utc>,
	#[serde(default)]
	pub cookies: Vec<PersistedCookie>,
	#[serde(default)]
	pub local_storage: BTreeMap<String, String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_agent: Option<String>,
}

impl From<PersistedSession> for Session {
	fn from(persisted: PersistedSession) -> Self {
		Session {
			account: persisted.account,
			captured_at: persisted.captured_at,
			state: BrowserState {
				cookies: persisted
					.cookies
					.into_iter()
					.map(|c| BrowserCookie {
						name: c.name,
						value: SecretString::new(c.value),
						domain: c.domain,
						path: c.path,
						secure: c.secure,
						http_only: c.http_only,
						expiry: c.expiry,
					})
					.collect(),
				local_storage: persisted
					.local_storage
					.into_iter()
					.map(|(k, v)| (k, SecretString::new(v)))
					.collect(),
				user_agent: persisted.user_agent,
			},
		}
	}
}

impl From<&Session> for PersistedSession {
	fn from(session: &Session) -> Self {
		PersistedSession {
			version: SESSION_FORMAT_VERSION,
			account: session.account.clone(),
			captured_at: session.captured_at,
			cookies: session
				.state
				.cookies
				.iter()
				.map(|c| PersistedCookie {
					name: c.name.clone(),
					value: c.value.expose().clone(),
					domain: c.domain.clone(),
					path: c.path.clone(),
					secure: c.secure,
					http_only: c.http_only,
					expiry: c.expiry,
				})
				.collect(),
			local_storage: session
				.state
				.local_storage
				.iter()
				.map(|(k, v)| (k.clone(), v.expose().clone()))
				.collect(),
			user_agent: session.state.user_agent.clone(),
		}
	}
}
