// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Minimal W3C WebDriver client: JSON commands against a running driver.

use std::time::Duration;

use reqwest::Method;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::WebDriverError;

#[derive(Debug, Deserialize)]
struct Envelope {
	#[serde(default)]
	value: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorValue {
	error: String,
	#[serde(default)]
	message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewSession {
	session_id: String,
}

/// A cookie as the WebDriver protocol represents it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WireCookie {
	pub name: String,
	pub value: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub domain: Option<String>,
	#[serde(default)]
	pub secure: bool,
	#[serde(default)]
	pub http_only: bool,
	/// Unix seconds. Some drivers report fractional values; drivers expect
	/// an integer back.
	#[serde(
		default,
		deserialize_with = "expiry_seconds",
		skip_serializing_if = "Option::is_none"
	)]
	pub expiry: Option<i64>,
}

fn expiry_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
	Ok(Option::<f64>::deserialize(deserializer)?.map(|secs| secs as i64))
}

/// Capabilities accepted by both chromedriver and geckodriver.
pub fn capabilities(headless: bool, window: (u32, u32)) -> Value {
	let size = format!("--window-size={},{}", window.0, window.1);
	let mut chrome_args = vec![size, "--disable-blink-features=AutomationControlled".to_string()];
	let mut firefox_args = vec![
		format!("--width={}", window.0),
		format!("--height={}", window.1),
	];
	if headless {
		chrome_args.push("--headless=new".to_string());
		firefox_args.push("-headless".to_string());
	}
	json!({
		"capabilities": {
			"alwaysMatch": { "pageLoadStrategy": "normal" },
			"firstMatch": [
				{ "browserName": "chrome", "goog:chromeOptions": { "args": chrome_args } },
				{ "browserName": "firefox", "moz:firefoxOptions": { "args": firefox_args } }
			]
		}
	})
}

#[derive(Debug, Clone)]
pub struct WebDriverClient {
	http: reqwest::Client,
	base: String,
}

impl WebDriverClient {
	/// `request_timeout` must exceed the longest page load the session allows.
	pub fn new(endpoint: &url::Url, request_timeout: Duration) -> Result<Self, WebDriverError> {
		let http = iconharvest_common_http::builder()
			.timeout(request_timeout)
			.build()?;
		Ok(Self {
			http,
			base: endpoint.as_str().trim_end_matches('/').to_string(),
		})
	}

	pub async fn new_session(&self, capabilities: &Value) -> Result<String, WebDriverError> {
		let value = self.send(Method::POST, "/session", Some(capabilities)).await?;
		let session: NewSession = serde_json::from_value(value)
			.map_err(|e| WebDriverError::Protocol(format!("new session: {e}")))?;
		debug!(session_id = %session.session_id, "webdriver session created");
		Ok(session.session_id)
	}

	/// Send a command scoped to `session`; `path` starts with `/` or is empty.
	pub async fn command(
		&self,
		session: &str,
		method: Method,
		path: &str,
		body: Option<&Value>,
	) -> Result<Value, WebDriverError> {
		self.send(method, &format!("/session/{session}{path}"), body)
			.await
	}

	pub async fn execute(
		&self,
		session: &str,
		script: &str,
		args: Vec<Value>,
	) -> Result<Value, WebDriverError> {
		let body = json!({ "script": script, "args": args });
		self.command(session, Method::POST, "/execute/sync", Some(&body))
			.await
	}

	async fn send(
		&self,
		method: Method,
		path: &str,
		body: Option<&Value>,
	) -> Result<Value, WebDriverError> {
		let url = format!("{}{path}", self.base);
		let mut request = self.http.request(method.clone(), &url);
		// Drivers reject POSTs without a JSON body.
		if method == Method::POST {
			request = request.json(body.unwrap_or(&json!({})));
		}

		let response = request.send().await?;
		let status = response.status();
		let envelope: Envelope = response.json().await.map_err(|e| {
			WebDriverError::Protocol(format!("{method} {path} returned {status}: {e}"))
		})?;

		if status.is_success() {
			return Ok(envelope.value);
		}
		match serde_json::from_value::<ErrorValue>(envelope.value) {
			Ok(err) => Err(WebDriverError::Command {
				error: err.error,
				message: err.message,
			}),
			Err(_) => Err(WebDriverError::Protocol(format!(
				"{method} {path} returned {status} without an error object"
			))),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use wiremock::matchers::{body_partial_json, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	async fn client(server: &MockServer) -> WebDriverClient {
		WebDriverClient::new(
			&url::Url::parse(&server.uri()).unwrap(),
			Duration::from_secs(5),
		)
		.unwrap()
	}

	#[tokio::test]
	async fn creates_session_with_capabilities() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/session"))
			.and(body_partial_json(json!({
				"capabilities": { "alwaysMatch": { "pageLoadStrategy": "normal" } }
			})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"value": { "sessionId": "s1", "capabilities": {} }
			})))
			.mount(&server)
			.await;

		let id = client(&server)
			.await
			.new_session(&capabilities(true, (800, 600)))
			.await
			.unwrap();
		assert_eq!(id, "s1");
	}

	#[tokio::test]
	async fn error_objects_become_command_errors() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/session/s1/url"))
			.respond_with(ResponseTemplate::new(500).set_body_json(json!({
				"value": { "error": "timeout", "message": "page load", "stacktrace": "" }
			})))
			.mount(&server)
			.await;

		let err = client(&server)
			.await
			.command("s1", Method::POST, "/url", Some(&json!({ "url": "https://icons8.com/" })))
			.await
			.unwrap_err();
		assert_eq!(err.code(), Some("timeout"));
	}

	#[test]
	fn headless_flags_follow_setting() {
		let caps = capabilities(true, (1, 2)).to_string();
		assert!(caps.contains("--headless=new"));
		assert!(caps.contains("-headless"));
		let caps = capabilities(false, (1, 2)).to_string();
		assert!(!caps.contains("headless"));
	}

	#[test]
	fn cookies_accept_fractional_expiry() {
		let cookie: WireCookie = serde_json::from_value(json!({
			"name": "i8", "value": "v", "domain": ".icons8.com",
			"httpOnly": true, "secure": true, "expiry": 1767225600.5
		}))
		.unwrap();
		assert!(cookie.http_only);
		assert_eq!(cookie.expiry, Some(1767225600));
		assert_eq!(serde_json::to_value(&cookie).unwrap()["expiry"], json!(1767225600));
	}
}
