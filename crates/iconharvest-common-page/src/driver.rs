// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::PageError;
use crate::state::BrowserState;

/// Elements the login and crawl flows wait on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
	/// The e-mail input of the login form.
	LoginForm,
	/// An element only rendered for a signed-in account (avatar, account link).
	SignedIn,
	/// At least one icon tile of a collection grid.
	AssetGrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
	Email,
	Password,
}

/// What the current page says about the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
	SignedIn,
	/// A visible "Sign in" / "Log in" control.
	Guest,
	/// A CAPTCHA or bot check is blocking the page.
	Challenge,
	/// The site states the visitor may not view this collection.
	NoAccess,
	Unknown,
}

/// One image the page currently renders, as raw DOM attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleAsset {
	pub src: Option<String>,
	pub srcset: Option<String>,
	pub alt: Option<String>,
	/// The image sits inside an icon-grid tile rather than page chrome.
	pub in_icon_container: bool,
}

/// The browser capability the authenticator and crawler consume.
///
/// A driver owns one browser context. It is used sequentially by one task at
/// a time, hence `&mut self` throughout. Every wait is bounded by a timeout.
#[async_trait]
pub trait PageDriver: Send {
	/// Load `url` and wait for the document to finish loading.
	async fn navigate(&mut self, url: &Url) -> Result<(), PageError>;

	/// Wait until `marker` is present, failing with [`PageError::Timeout`].
	async fn wait_for(&mut self, marker: Marker, timeout: Duration) -> Result<(), PageError>;

	async fn detect(&mut self) -> Result<PageState, PageError>;

	/// Type `value` into `field`, replacing any previous content.
	async fn fill(&mut self, field: FormField, value: &str) -> Result<(), PageError>;

	/// Submit the login form.
	async fn submit(&mut self) -> Result<(), PageError>;

	/// Images currently rendered in the document.
	async fn extract_visible(&mut self) -> Result<Vec<VisibleAsset>, PageError>;

	/// Trigger the page's incremental loading (scroll to bottom / next page).
	async fn load_more(&mut self) -> Result<(), PageError>;

	/// Serialized markup of the current document.
	async fn page_source(&mut self) -> Result<String, PageError>;

	async fn export_state(&mut self) -> Result<BrowserState, PageError>;

	/// Replace cookies and local storage with `state`.
	async fn import_state(&mut self, state: &BrowserState) -> Result<(), PageError>;

	/// Release the browser context. Further calls fail with [`PageError::Closed`].
	async fn close(&mut self) -> Result<(), PageError> {
		Ok(())
	}
}
