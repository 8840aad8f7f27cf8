// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The network seam under the fetcher.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use iconharvest_common_core::AllowList;
use iconharvest_common_secret::SecretString;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::redirect::Policy;
use tracing::debug;
use url::Url;

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 5;

/// A complete HTTP response. Non-2xx statuses are responses, not errors.
#[derive(Debug, Clone)]
pub struct TransportResponse {
	pub status: u16,
	pub content_type: Option<String>,
	pub body: Bytes,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
	#[error("request timed out: {0}")]
	Timeout(String),

	#[error("connection failed: {0}")]
	Connect(String),

	#[error("redirect rejected: {0}")]
	Redirect(String),

	#[error("response exceeds {limit} bytes")]
	TooLarge { limit: u64 },

	#[error("{0}")]
	Other(String),
}

impl TransportError {
	/// Timeouts and connection failures are worth another attempt.
	pub fn is_transient(&self) -> bool {
		matches!(self, TransportError::Timeout(_) | TransportError::Connect(_))
	}
}

/// Plain GET with an optional `Cookie` header.
#[async_trait]
pub trait Transport: Send + Sync {
	async fn get(
		&self,
		url: &Url,
		cookie: Option<&SecretString>,
	) -> Result<TransportResponse, TransportError>;
}

#[derive(Debug, Clone)]
pub struct TransportSettings {
	pub request_timeout: Duration,
	pub max_body_bytes: u64,
	/// Browser user agent to present; the iconharvest agent when `None`.
	pub user_agent: Option<String>,
	/// Redirects may only land on asset hosts of this list.
	pub allow: AllowList,
}

impl Default for TransportSettings {
	fn default() -> Self {
		Self {
			request_timeout: Duration::from_secs(30),
			max_body_bytes: 50 * 1024 * 1024,
			user_agent: None,
			allow: AllowList::icons8(),
		}
	}
}

/// [`Transport`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
	client: reqwest::Client,
	max_body_bytes: u64,
}

impl ReqwestTransport {
	pub fn new(settings: TransportSettings) -> Result<Self, TransportError> {
		let allow = settings.allow.clone();
		let policy = Policy::custom(move |attempt| {
			if attempt.previous().len() >= MAX_REDIRECTS {
				attempt.error("too many redirects")
			} else if allow.allows_asset(attempt.url()) {
				attempt.follow()
			} else {
				let target = attempt.url().to_string();
				attempt.error(format!("redirect to non-allow-listed {target}"))
			}
		});

		let builder = match settings.user_agent {
			Some(ua) => iconharvest_common_http::builder_with_user_agent(ua),
			None => iconharvest_common_http::builder(),
		};
		let client = builder
			.timeout(settings.request_timeout)
			.redirect(policy)
			.build()
			.map_err(|e| TransportError::Other(e.to_string()))?;

		Ok(Self {
			client,
			max_body_bytes: settings.max_body_bytes,
		})
	}
}

fn classify(err: reqwest::Error) -> TransportError {
	if err.is_redirect() {
		TransportError::Redirect(err.to_string())
	} else if err.is_timeout() {
		TransportError::Timeout(err.to_string())
	} else if err.is_connect() {
		TransportError::Connect(err.to_string())
	} else {
		TransportError::Other(err.to_string())
	}
}

#[async_trait]
impl Transport for ReqwestTransport {
	async fn get(
		&self,
		url: &Url,
		cookie: Option<&SecretString>,
	) -> Result<TransportResponse, TransportError> {
		let mut request = self.client.get(url.clone());
		if let Some(cookie) = cookie {
			request = request.header(COOKIE, cookie.expose().as_str());
		}

		let mut response = request.send().await.map_err(classify)?;
		let status = response.status().as_u16();
		let content_type = response
			.headers()
			.get(CONTENT_TYPE)
			.and_then(|v| v.to_str().ok())
			.map(str::to_string);

		if response
			.content_length()
			.is_some_and(|len| len > self.max_body_bytes)
		{
			return Err(TransportError::TooLarge {
				limit: self.max_body_bytes,
			});
		}

		let mut body = BytesMut::new();
		while let Some(chunk) = response.chunk().await.map_err(classify)? {
			if body.len() as u64 + chunk.len() as u64 > self.max_body_bytes {
				return Err(TransportError::TooLarge {
					limit: self.max_body_bytes,
				});
			}
			body.extend_from_slice(&chunk);
		}

		debug!(url = %url, status, bytes = body.len(), "response received");
		Ok(TransportResponse {
			status,
			content_type,
			body: body.freeze(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use wiremock::matchers::{header, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn transport(max_body_bytes: u64) -> ReqwestTransport {
		ReqwestTransport::new(TransportSettings {
			request_timeout: Duration::from_secs(5),
			max_body_bytes,
			user_agent: Some("TestBrowser/1.0".to_string()),
			allow: AllowList::icons8(),
		})
		.unwrap()
	}

	fn url(server: &MockServer, p: &str) -> Url {
		Url::parse(&format!("{}{p}", server.uri())).unwrap()
	}

	#[tokio::test]
	async fn returns_status_type_and_body() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/icon.png"))
			.and(header("user-agent", "TestBrowser/1.0"))
			.respond_with(
				ResponseTemplate::new(200)
					.insert_header("content-type", "image/png")
					.set_body_bytes(vec![7u8; 64]),
			)
			.mount(&server)
			.await;

		let response = transport(1024)
			.get(&url(&server, "/icon.png"), None)
			.await
			.unwrap();

		assert_eq!(response.status, 200);
		assert_eq!(response.content_type.as_deref(), Some("image/png"));
		assert_eq!(response.body.len(), 64);
	}

	#[tokio::test]
	async fn sends_cookie_header() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(header("cookie", "i8_session=abc"))
			.respond_with(ResponseTemplate::new(200))
			.expect(1)
			.mount(&server)
			.await;

		let cookie = SecretString::new("i8_session=abc".to_string());
		let response = transport(1024)
			.get(&url(&server, "/x"), Some(&cookie))
			.await
			.unwrap();
		assert_eq!(response.status, 200);
	}

	#[tokio::test]
	async fn error_statuses_are_responses() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(503))
			.mount(&server)
			.await;

		let response = transport(1024)
			.get(&url(&server, "/x"), None)
			.await
			.unwrap();
		assert_eq!(response.status, 503);
	}

	#[tokio::test]
	async fn oversized_bodies_are_refused() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4096]))
			.mount(&server)
			.await;

		let err = transport(1000)
			.get(&url(&server, "/x"), None)
			.await
			.unwrap_err();
		assert!(matches!(err, TransportError::TooLarge { limit: 1000 }));
	}

	#[tokio::test]
	async fn redirects_off_the_allow_list_are_refused() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(
				ResponseTemplate::new(302).insert_header("location", "https://evil.example.com/x.png"),
			)
			.mount(&server)
			.await;

		let err = transport(1024)
			.get(&url(&server, "/x"), None)
			.await
			.unwrap_err();
		assert!(matches!(err, TransportError::Redirect(_)), "{err:?}");
		assert!(!err.is_transient());
	}

	#[tokio::test]
	async fn unreachable_host_is_transient() {
		let err = transport(1024)
			.get(&Url::parse("http://127.0.0.1:9/x").unwrap(), None)
			.await
			.unwrap_err();
		assert!(err.is_transient(), "{err:?}");
	}
}
