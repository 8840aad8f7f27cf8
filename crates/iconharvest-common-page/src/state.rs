// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Browser state captured after login and replayed on later runs.

use std::collections::BTreeMap;

use iconharvest_common_secret::SecretString;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserCookie {
	pub name: String,
	pub value: SecretString,
	/// Cookie domain as reported by the browser, possibly with a leading dot.
	pub domain: Option<String>,
	pub path: Option<String>,
	pub secure: bool,
	pub http_only: bool,
	/// Expiry as unix seconds; `None` for session cookies.
	pub expiry: Option<i64>,
}

impl BrowserCookie {
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: SecretString::new(value.into()),
			domain: None,
			path: None,
			secure: true,
			http_only: false,
			expiry: None,
		}
	}

	pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
		self.domain = Some(domain.into());
		self
	}

	/// RFC 6265 domain match. Host-only cookies (no domain) match any host the
	/// caller passes, since the browser only exported cookies for the page it
	/// was on.
	pub fn matches_host(&self, host: &str) -> bool {
		let Some(domain) = self.domain.as_deref() else {
			return true;
		};
		let domain = domain.trim_start_matches('.').to_ascii_lowercase();
		let host = host.to_ascii_lowercase();
		host == domain || host.ends_with(&format!(".{domain}"))
	}
}

/// Opaque authenticated state of one browser context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowserState {
	pub cookies: Vec<BrowserCookie>,
	pub local_storage: BTreeMap<String, SecretString>,
	/// `navigator.userAgent` of the browser that produced the state.
	pub user_agent: Option<String>,
}

impl BrowserState {
	pub fn is_empty(&self) -> bool {
		self.cookies.is_empty() && self.local_storage.is_empty()
	}

	/// `Cookie` header value for a request to `host`, if any cookie applies.
	pub fn cookie_header_for(&self, host: &str) -> Option<SecretString> {
		let pairs: Vec<String> = self
			.cookies
			.iter()
			.filter(|c| c.matches_host(host))
			.map(|c| format!("{}={}", c.name, c.value.expose()))
			.collect();
		if pairs.is_empty() {
			None
		} else {
			Some(SecretString::new(pairs.join("; ")))
		}
	}
}
