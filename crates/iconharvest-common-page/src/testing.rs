// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory page driver for tests.
//!
//! [`ScriptedPage`] models just enough of the catalog site to exercise login,
//! session replay and infinite scrolling. Clones share state, so a test can
//! keep one handle for assertions after moving another into the code under
//! test.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::driver::{FormField, Marker, PageDriver, PageState, VisibleAsset};
use crate::error::PageError;
use crate::state::{BrowserCookie, BrowserState};

/// Name of the cookie the scripted site issues on login.
pub const SESSION_COOKIE: &str = "i8_session";

/// User agent reported by [`ScriptedPage::export_state`].
pub const SCRIPTED_USER_AGENT: &str = "ScriptedPage/1.0";

/// A collection tile the way the catalog renders it.
pub fn icon_tile(id: &str, name: &str) -> VisibleAsset {
	VisibleAsset {
		src: Some(format!(
			"https://img.icons8.com/?size=48&id={id}&format=png"
		)),
		srcset: None,
		alt: Some(format!("{name} icon")),
		in_icon_container: true,
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
	Blank,
	Login,
	Collection,
	Other,
}

#[derive(Debug)]
struct Inner {
	accepted: Option<(String, String)>,
	challenge_on_login: bool,
	no_access: bool,
	public: bool,
	passes: Vec<Vec<VisibleAsset>>,
	markup: String,
	token_generation: u32,

	location: Location,
	pass_index: usize,
	jar: Vec<BrowserCookie>,
	filled_email: Option<String>,
	filled_password: Option<String>,
	challenge_active: bool,
	closed: bool,

	navigations: Vec<Url>,
	submits: u32,
	extracts: u32,
	load_mores: u32,
	imports: u32,
}

impl Inner {
	fn valid_token(&self) -> String {
		format!("token-{}", self.token_generation)
	}

	fn signed_in(&self) -> bool {
		let token = self.valid_token();
		self.jar
			.iter()
			.any(|c| c.name == SESSION_COOKIE && *c.value.expose() == token)
	}

	fn visible(&self) -> Vec<VisibleAsset> {
		if self.location != Location::Collection || self.no_access {
			return Vec::new();
		}
		if !self.signed_in() && !self.public {
			return Vec::new();
		}
		if self.passes.is_empty() {
			return Vec::new();
		}
		let index = self.pass_index.min(self.passes.len() - 1);
		self.passes[index].clone()
	}

	fn ensure_open(&self) -> Result<(), PageError> {
		if self.closed {
			Err(PageError::Closed)
		} else {
			Ok(())
		}
	}
}

#[derive(Debug, Clone)]
pub struct ScriptedPage {
	inner: Arc<Mutex<Inner>>,
}

impl Default for ScriptedPage {
	fn default() -> Self {
		Self::new()
	}
}

impl ScriptedPage {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(Mutex::new(Inner {
				accepted: None,
				challenge_on_login: false,
				no_access: false,
				public: false,
				passes: Vec::new(),
				markup: String::new(),
				token_generation: 1,
				location: Location::Blank,
				pass_index: 0,
				jar: Vec::new(),
				filled_email: None,
				filled_password: None,
				challenge_active: false,
				closed: false,
				navigations: Vec::new(),
				submits: 0,
				extracts: 0,
				load_mores: 0,
				imports: 0,
			})),
		}
	}

	fn lock(&self) -> MutexGuard<'_, Inner> {
		self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	/// Only this e-mail/password pair logs in.
	pub fn accept_credentials(self, email: &str, password: &str) -> Self {
		self.lock().accepted = Some((email.to_string(), password.to_string()));
		self
	}

	/// What each extraction returns: pass `i` sees `passes[i]`, and every
	/// later pass sees the last entry.
	pub fn with_passes(self, passes: Vec<Vec<VisibleAsset>>) -> Self {
		self.lock().passes = passes;
		self
	}

	/// Build passes from a fixed collection revealed `batch` tiles per pass.
	pub fn with_collection(self, tiles: Vec<VisibleAsset>, batch: usize) -> Self {
		let batch = batch.max(1);
		let mut passes = Vec::new();
		let mut shown = 0;
		loop {
			shown = (shown + batch).min(tiles.len());
			passes.push(tiles[..shown].to_vec());
			if shown == tiles.len() {
				break;
			}
		}
		self.with_passes(passes)
	}

	/// Markup returned by `page_source` on a viewable collection page.
	pub fn with_page_source(self, html: impl Into<String>) -> Self {
		self.lock().markup = html.into();
		self
	}

	pub fn with_no_access(self) -> Self {
		self.lock().no_access = true;
		self
	}

	/// Guests can see the collection.
	pub fn public(self) -> Self {
		self.lock().public = true;
		self
	}

	pub fn challenge_on_login(self) -> Self {
		self.lock().challenge_on_login = true;
		self
	}

	/// The cookie the site currently accepts, for seeding a stored session.
	pub fn valid_cookie(&self) -> BrowserCookie {
		BrowserCookie::new(SESSION_COOKIE, self.lock().valid_token()).with_domain(".icons8.com")
	}

	pub fn valid_token(&self) -> String {
		self.lock().valid_token()
	}

	/// Server-side invalidation: every previously issued token stops working.
	pub fn rotate_token(&self) {
		self.lock().token_generation += 1;
	}

	pub fn navigations(&self) -> Vec<Url> {
		self.lock().navigations.clone()
	}

	pub fn login_submits(&self) -> u32 {
		self.lock().submits
	}

	pub fn extract_calls(&self) -> u32 {
		self.lock().extracts
	}

	pub fn load_more_calls(&self) -> u32 {
		self.lock().load_mores
	}

	pub fn imports(&self) -> u32 {
		self.lock().imports
	}

	pub fn is_closed(&self) -> bool {
		self.lock().closed
	}
}

#[async_trait]
impl PageDriver for ScriptedPage {
	async fn navigate(&mut self, url: &Url) -> Result<(), PageError> {
		let mut inner = self.lock();
		inner.ensure_open()?;
		inner.navigations.push(url.clone());
		inner.location = if url.path() == "/login" {
			Location::Login
		} else if url.path().contains("/collection") {
			Location::Collection
		} else {
			Location::Other
		};
		inner.pass_index = 0;
		Ok(())
	}

	async fn wait_for(&mut self, marker: Marker, timeout: Duration) -> Result<(), PageError> {
		let inner = self.lock();
		inner.ensure_open()?;
		let present = match marker {
			Marker::LoginForm => inner.location == Location::Login && !inner.challenge_active,
			Marker::SignedIn => inner.signed_in(),
			Marker::AssetGrid => !inner.visible().is_empty(),
		};
		if present {
			Ok(())
		} else {
			Err(PageError::timeout(format!("{marker:?}"), timeout))
		}
	}

	async fn detect(&mut self) -> Result<PageState, PageError> {
		let inner = self.lock();
		inner.ensure_open()?;
		Ok(if inner.challenge_active {
			PageState::Challenge
		} else if inner.location == Location::Collection && inner.no_access {
			PageState::NoAccess
		} else if inner.signed_in() {
			PageState::SignedIn
		} else {
			PageState::Guest
		})
	}

	async fn fill(&mut self, field: FormField, value: &str) -> Result<(), PageError> {
		let mut inner = self.lock();
		inner.ensure_open()?;
		if inner.location != Location::Login {
			return Err(PageError::ElementNotFound(format!("{field:?} input")));
		}
		match field {
			FormField::Email => inner.filled_email = Some(value.to_string()),
			FormField::Password => inner.filled_password = Some(value.to_string()),
		}
		Ok(())
	}

	async fn submit(&mut self) -> Result<(), PageError> {
		let mut inner = self.lock();
		inner.ensure_open()?;
		inner.submits += 1;
		if inner.challenge_on_login {
			inner.challenge_active = true;
			return Ok(());
		}
		let entered = inner
			.filled_email
			.clone()
			.zip(inner.filled_password.clone());
		if entered.is_some() && entered == inner.accepted {
			let cookie = BrowserCookie::new(SESSION_COOKIE, inner.valid_token())
				.with_domain(".icons8.com");
			inner.jar.retain(|c| c.name != SESSION_COOKIE);
			inner.jar.push(cookie);
			inner.location = Location::Other;
		}
		Ok(())
	}

	async fn extract_visible(&mut self) -> Result<Vec<VisibleAsset>, PageError> {
		let mut inner = self.lock();
		inner.ensure_open()?;
		inner.extracts += 1;
		Ok(inner.visible())
	}

	async fn load_more(&mut self) -> Result<(), PageError> {
		let mut inner = self.lock();
		inner.ensure_open()?;
		inner.load_mores += 1;
		inner.pass_index += 1;
		Ok(())
	}

	async fn page_source(&mut self) -> Result<String, PageError> {
		let inner = self.lock();
		inner.ensure_open()?;
		let viewable = inner.location == Location::Collection
			&& !inner.no_access
			&& (inner.public || inner.signed_in());
		Ok(if viewable {
			inner.markup.clone()
		} else {
			"<html><body></body></html>".to_string()
		})
	}

	async fn export_state(&mut self) -> Result<BrowserState, PageError> {
		let inner = self.lock();
		inner.ensure_open()?;
		Ok(BrowserState {
			cookies: inner.jar.clone(),
			local_storage: Default::default(),
			user_agent: Some(SCRIPTED_USER_AGENT.to_string()),
		})
	}

	async fn import_state(&mut self, state: &BrowserState) -> Result<(), PageError> {
		let mut inner = self.lock();
		inner.ensure_open()?;
		inner.imports += 1;
		inner.jar = state.cookies.clone();
		Ok(())
	}

	async fn close(&mut self) -> Result<(), PageError> {
		self.lock().closed = true;
		Ok(())
	}
}
