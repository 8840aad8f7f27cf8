// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use iconharvest_common_core::CatalogUrls;
use iconharvest_common_page::{
	BrowserCookie, BrowserState, FormField, Marker, PageDriver, PageError, PageState,
	VisibleAsset,
};
use iconharvest_common_secret::SecretString;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::WebDriverError;
use crate::protocol::{capabilities, WebDriverClient, WireCookie};
use crate::scripts;

/// Default chromedriver address.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:9515";

/// Extra time an HTTP call to the driver may take beyond the page load limit.
const REQUEST_SLACK: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct WebDriverSettings {
	pub endpoint: Url,
	pub headless: bool,
	pub navigation_timeout: Duration,
	pub script_timeout: Duration,
	pub poll_interval: Duration,
	pub window_size: (u32, u32),
}

impl Default for WebDriverSettings {
	fn default() -> Self {
		Self {
			endpoint: Url::parse(DEFAULT_ENDPOINT).expect("static endpoint is valid"),
			headless: true,
			navigation_timeout: Duration::from_secs(60),
			script_timeout: Duration::from_secs(30),
			poll_interval: Duration::from_millis(250),
			window_size: (1366, 2000),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderedImage {
	src: Option<String>,
	srcset: Option<String>,
	alt: Option<String>,
	#[serde(default)]
	in_icon_container: bool,
}

impl From<RenderedImage> for VisibleAsset {
	fn from(img: RenderedImage) -> Self {
		VisibleAsset {
			src: img.src,
			srcset: img.srcset,
			alt: img.alt,
			in_icon_container: img.in_icon_container,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageStorage {
	user_agent: Option<String>,
	#[serde(default)]
	local_storage: BTreeMap<String, String>,
}

/// A browser session driven through chromedriver or geckodriver.
pub struct WebDriverPage {
	client: WebDriverClient,
	session: Option<String>,
	settings: WebDriverSettings,
}

impl std::fmt::Debug for WebDriverPage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WebDriverPage")
			.field("endpoint", &self.settings.endpoint.as_str())
			.field("session", &self.session)
			.finish()
	}
}

impl WebDriverPage {
	/// Start a browser session on the driver at `settings.endpoint`.
	#[instrument(skip_all, fields(endpoint = %settings.endpoint, headless = settings.headless))]
	pub async fn connect(settings: WebDriverSettings) -> Result<Self, PageError> {
		let client = WebDriverClient::new(
			&settings.endpoint,
			settings.navigation_timeout + REQUEST_SLACK,
		)?;
		let session = client
			.new_session(&capabilities(settings.headless, settings.window_size))
			.await?;

		let mut page = Self {
			client,
			session: Some(session),
			settings,
		};
		let timeouts = json!({
			"pageLoad": page.settings.navigation_timeout.as_millis() as u64,
			"script": page.settings.script_timeout.as_millis() as u64,
		});
		if let Err(e) = page.command(Method::POST, "/timeouts", Some(&timeouts)).await {
			if let Err(close_err) = page.close().await {
				debug!(error = %close_err, "failed to close session after setup error");
			}
			return Err(e);
		}
		info!("browser session started");
		Ok(page)
	}

	pub fn session_id(&self) -> Option<&str> {
		self.session.as_deref()
	}

	async fn command(
		&self,
		method: Method,
		path: &str,
		body: Option<&Value>,
	) -> Result<Value, PageError> {
		let session = self.session.as_deref().ok_or(PageError::Closed)?;
		Ok(self.client.command(session, method, path, body).await?)
	}

	async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, PageError> {
		let session = self.session.as_deref().ok_or(PageError::Closed)?;
		Ok(self.client.execute(session, script, args).await?)
	}

	async fn execute_bool(&self, script: &str, args: Vec<Value>) -> Result<bool, PageError> {
		let value = self.execute(script, args).await?;
		value
			.as_bool()
			.ok_or_else(|| PageError::Protocol(format!("expected a boolean, got {value}")))
	}
}

fn marker_name(marker: Marker) -> &'static str {
	match marker {
		Marker::LoginForm => "login_form",
		Marker::SignedIn => "signed_in",
		Marker::AssetGrid => "asset_grid",
	}
}

fn parse_state(value: &Value) -> Result<PageState, PageError> {
	match value.as_str() {
		Some("signed_in") => Ok(PageState::SignedIn),
		Some("guest") => Ok(PageState::Guest),
		Some("challenge") => Ok(PageState::Challenge),
		Some("no_access") => Ok(PageState::NoAccess),
		Some("unknown") => Ok(PageState::Unknown),
		_ => Err(PageError::Protocol(format!("unexpected page state {value}"))),
	}
}

fn to_browser_cookie(wire: WireCookie) -> BrowserCookie {
	BrowserCookie {
		name: wire.name,
		value: SecretString::new(wire.value),
		domain: wire.domain,
		path: wire.path,
		secure: wire.secure,
		http_only: wire.http_only,
		expiry: wire.expiry,
	}
}

fn to_wire_cookie(cookie: &BrowserCookie) -> WireCookie {
	WireCookie {
		name: cookie.name.clone(),
		value: cookie.value.expose().clone(),
		path: cookie.path.clone(),
		domain: cookie.domain.clone(),
		secure: cookie.secure,
		http_only: cookie.http_only,
		expiry: cookie.expiry,
	}
}

#[async_trait]
impl PageDriver for WebDriverPage {
	#[instrument(skip_all, fields(url = %url))]
	async fn navigate(&mut self, url: &Url) -> Result<(), PageError> {
		let body = json!({ "url": url.as_str() });
		let session = self.session.as_deref().ok_or(PageError::Closed)?;
		match self
			.client
			.command(session, Method::POST, "/url", Some(&body))
			.await
		{
			Ok(_) => Ok(()),
			Err(e) if e.code() == Some("timeout") => Err(PageError::timeout(
				format!("page load of {url}"),
				self.settings.navigation_timeout,
			)),
			Err(WebDriverError::Command { error, message }) if error != "invalid session id" => {
				Err(PageError::Navigation {
					url: url.to_string(),
					message: format!("{error}: {message}"),
				})
			}
			Err(e) => Err(e.into()),
		}
	}

	async fn wait_for(&mut self, marker: Marker, timeout: Duration) -> Result<(), PageError> {
		let name = marker_name(marker);
		let deadline = Instant::now() + timeout;
		loop {
			if self
				.execute_bool(scripts::MARKER, vec![json!(name)])
				.await?
			{
				debug!(marker = name, "marker present");
				return Ok(());
			}
			if Instant::now() >= deadline {
				return Err(PageError::timeout(name, timeout));
			}
			tokio::time::sleep(self.settings.poll_interval).await;
		}
	}

	async fn detect(&mut self) -> Result<PageState, PageError> {
		let value = self.execute(scripts::DETECT, Vec::new()).await?;
		parse_state(&value)
	}

	async fn fill(&mut self, field: FormField, value: &str) -> Result<(), PageError> {
		let name = match field {
			FormField::Email => "email",
			FormField::Password => "password",
		};
		if self
			.execute_bool(scripts::FILL, vec![json!(name), json!(value)])
			.await?
		{
			Ok(())
		} else {
			Err(PageError::ElementNotFound(format!("{name} input")))
		}
	}

	async fn submit(&mut self) -> Result<(), PageError> {
		if self.execute_bool(scripts::SUBMIT, Vec::new()).await? {
			Ok(())
		} else {
			Err(PageError::ElementNotFound("login form".to_string()))
		}
	}

	async fn extract_visible(&mut self) -> Result<Vec<VisibleAsset>, PageError> {
		let value = self.execute(scripts::EXTRACT, Vec::new()).await?;
		let images: Vec<RenderedImage> = serde_json::from_value(value)
			.map_err(|e| PageError::Protocol(format!("rendered images: {e}")))?;
		Ok(images.into_iter().map(VisibleAsset::from).collect())
	}

	async fn load_more(&mut self) -> Result<(), PageError> {
		let clicked = self.execute_bool(scripts::LOAD_MORE, Vec::new()).await?;
		debug!(clicked, "requested more assets");
		Ok(())
	}

	async fn page_source(&mut self) -> Result<String, PageError> {
		let value = self.command(Method::GET, "/source", None).await?;
		match value {
			Value::String(html) => Ok(html),
			other => Err(PageError::Protocol(format!("expected page source, got {other}"))),
		}
	}

	async fn export_state(&mut self) -> Result<BrowserState, PageError> {
		let cookies = self.command(Method::GET, "/cookie", None).await?;
		let cookies: Vec<WireCookie> = serde_json::from_value(cookies)
			.map_err(|e| PageError::Protocol(format!("cookies: {e}")))?;
		let storage = self.execute(scripts::READ_STATE, Vec::new()).await?;
		let storage: PageStorage = serde_json::from_value(storage)
			.map_err(|e| PageError::Protocol(format!("page storage: {e}")))?;

		Ok(BrowserState {
			cookies: cookies.into_iter().map(to_browser_cookie).collect(),
			local_storage: storage
				.local_storage
				.into_iter()
				.map(|(k, v)| (k, SecretString::new(v)))
				.collect(),
			user_agent: storage.user_agent,
		})
	}

	/// Cookies can only be set for the current origin, so this lands on the
	/// catalog home page first.
	#[instrument(skip_all, fields(cookies = state.cookies.len()))]
	async fn import_state(&mut self, state: &BrowserState) -> Result<(), PageError> {
		self.navigate(&CatalogUrls::home()).await?;
		self.command(Method::DELETE, "/cookie", None).await?;

		for cookie in &state.cookies {
			let body = json!({ "cookie": to_wire_cookie(cookie) });
			let session = self.session.as_deref().ok_or(PageError::Closed)?;
			match self
				.client
				.command(session, Method::POST, "/cookie", Some(&body))
				.await
			{
				Ok(_) => {}
				Err(e) if e.code() == Some("invalid cookie domain") => {
					warn!(cookie = %cookie.name, "cookie domain not settable from catalog page, skipped");
				}
				Err(e) => return Err(e.into()),
			}
		}

		if !state.local_storage.is_empty() {
			let entries: serde_json::Map<String, Value> = state
				.local_storage
				.iter()
				.map(|(k, v)| (k.clone(), Value::String(v.expose().clone())))
				.collect();
			self.execute(scripts::WRITE_STORAGE, vec![Value::Object(entries)])
				.await?;
		}
		Ok(())
	}

	async fn close(&mut self) -> Result<(), PageError> {
		let Some(session) = self.session.take() else {
			return Ok(());
		};
		self.client
			.command(&session, Method::DELETE, "", None)
			.await?;
		info!("browser session closed");
		Ok(())
	}
}
