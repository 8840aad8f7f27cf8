// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use iconharvest_common_core::{AllowList, AssetRecord, RasterSource};
use iconharvest_common_http::{is_retryable_status, retry, RetryConfig, RetryableError};
use iconharvest_common_secret::SecretString;
use image::ImageReader;
use reqwest::StatusCode;
use tracing::{debug, instrument};

use crate::error::{DownloadError, DownloadErrorKind};
use crate::transport::{Transport, TransportError, TransportResponse};

/// First bytes of every PNG file.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

#[derive(Debug, Clone)]
pub struct FetchSettings {
	pub min_file_size: u64,
	pub max_file_size: u64,
	/// Largest accepted width or height.
	pub max_dimension: u32,
	pub retry: RetryConfig,
}

impl Default for FetchSettings {
	fn default() -> Self {
		Self {
			min_file_size: 50,
			max_file_size: 50 * 1024 * 1024,
			max_dimension: 4096,
			retry: RetryConfig::default(),
		}
	}
}

/// Outcome of a single request, classified for the retry loop.
#[derive(Debug)]
enum AttemptError {
	Transport(TransportError),
	Status(u16),
}

impl RetryableError for AttemptError {
	fn is_retryable(&self) -> bool {
		match self {
			AttemptError::Transport(e) => e.is_transient(),
			AttemptError::Status(code) => {
				StatusCode::from_u16(*code).is_ok_and(is_retryable_status)
			}
		}
	}
}

/// Downloads and validates the source raster of one asset.
///
/// The locator is checked against the allow-list before any request, so a
/// record pointing elsewhere fails without touching the network.
#[derive(Clone)]
pub struct Fetcher {
	transport: Arc<dyn Transport>,
	allow: AllowList,
	settings: FetchSettings,
}

impl std::fmt::Debug for Fetcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Fetcher")
			.field("allow", &self.allow)
			.field("settings", &self.settings)
			.finish_non_exhaustive()
	}
}

impl Fetcher {
	pub fn new(transport: Arc<dyn Transport>, allow: AllowList, settings: FetchSettings) -> Self {
		Self {
			transport,
			allow,
			settings,
		}
	}

	pub fn settings(&self) -> &FetchSettings {
		&self.settings
	}

	#[instrument(skip_all, fields(asset_id = %record.id))]
	pub async fn fetch(
		&self,
		record: &AssetRecord,
		cookie: Option<&SecretString>,
	) -> Result<RasterSource, DownloadError> {
		let fail = |kind, attempts| DownloadError::new(record.id.clone(), kind, attempts);

		self.allow
			.check_asset(&record.source_locator)
			.map_err(|e| fail(DownloadErrorKind::Disallowed(e), 0))?;

		let attempts = AtomicU32::new(0);
		let result = retry(&self.settings.retry, || {
			let attempts = &attempts;
			let transport = &self.transport;
			let url = &record.source_locator;
			async move {
				attempts.fetch_add(1, Ordering::SeqCst);
				let response = transport
					.get(url, cookie)
					.await
					.map_err(AttemptError::Transport)?;
				if (200..300).contains(&response.status) {
					Ok(response)
				} else {
					Err(AttemptError::Status(response.status))
				}
			}
		})
		.await;
		let attempts = attempts.load(Ordering::SeqCst);

		let response = result.map_err(|e| match e {
			AttemptError::Status(401) => fail(DownloadErrorKind::AuthRequired, attempts),
			AttemptError::Status(code) => fail(DownloadErrorKind::Status(code), attempts),
			AttemptError::Transport(e) => fail(DownloadErrorKind::Transport(e), attempts),
		})?;

		let raster = self
			.validate(record, response)
			.map_err(|kind| fail(kind, attempts))?;
		debug!(
			resolution = raster.resolution,
			bytes = raster.bytes.len(),
			attempts,
			"source downloaded"
		);
		Ok(raster)
	}

	fn validate(
		&self,
		record: &AssetRecord,
		response: TransportResponse,
	) -> Result<RasterSource, DownloadErrorKind> {
		let content_type = response.content_type.unwrap_or_default();
		let mime = content_type
			.split(';')
			.next()
			.unwrap_or_default()
			.trim()
			.to_ascii_lowercase();
		if !mime.starts_with("image/") {
			let shown = if content_type.is_empty() {
				"missing".to_string()
			} else {
				content_type
			};
			return Err(DownloadErrorKind::NotAnImage(shown));
		}

		let size = response.body.len() as u64;
		if size < self.settings.min_file_size {
			return Err(DownloadErrorKind::TooSmall {
				size,
				min: self.settings.min_file_size,
			});
		}
		if size > self.settings.max_file_size {
			return Err(DownloadErrorKind::TooLarge {
				size,
				max: self.settings.max_file_size,
			});
		}
		if !response.body.starts_with(&PNG_SIGNATURE) {
			return Err(DownloadErrorKind::InvalidImage(
				"missing PNG signature".to_string(),
			));
		}

		let (width, height) = ImageReader::new(Cursor::new(&response.body[..]))
			.with_guessed_format()
			.map_err(|e| DownloadErrorKind::InvalidImage(e.to_string()))?
			.into_dimensions()
			.map_err(|e| DownloadErrorKind::InvalidImage(e.to_string()))?;
		if width == 0 || height == 0 {
			return Err(DownloadErrorKind::InvalidImage("empty image".to_string()));
		}
		let max = self.settings.max_dimension;
		if width > max || height > max {
			return Err(DownloadErrorKind::Oversized { width, height, max });
		}

		Ok(RasterSource {
			asset_id: record.id.clone(),
			resolution: width.max(height),
			bytes: response.body,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use bytes::Bytes;
	use iconharvest_common_core::{AssetId, CatalogUrls};
	use std::collections::VecDeque;
	use std::sync::Mutex;
	use std::time::Duration;
	use url::Url;

	fn png(width: u32, height: u32) -> Bytes {
		let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 255]));
		let mut out = Cursor::new(Vec::new());
		img.write_to(&mut out, image::ImageFormat::Png).unwrap();
		Bytes::from(out.into_inner())
	}

	fn ok_png(size: u32) -> Result<TransportResponse, TransportError> {
		Ok(TransportResponse {
			status: 200,
			content_type: Some("image/png".to_string()),
			body: png(size, size),
		})
	}

	fn status(code: u16) -> Result<TransportResponse, TransportError> {
		Ok(TransportResponse {
			status: code,
			content_type: Some("text/html".to_string()),
			body: Bytes::from_static(b"<html>nope</html>"),
		})
	}

	/// Replays canned responses in order; the last one repeats.
	struct Scripted {
		responses: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
		calls: AtomicU32,
	}

	impl Scripted {
		fn new(responses: Vec<Result<TransportResponse, TransportError>>) -> Arc<Self> {
			Arc::new(Self {
				responses: Mutex::new(responses.into()),
				calls: AtomicU32::new(0),
			})
		}

		fn calls(&self) -> u32 {
			self.calls.load(Ordering::SeqCst)
		}
	}

	#[async_trait]
	impl Transport for Scripted {
		async fn get(
			&self,
			_url: &Url,
			_cookie: Option<&SecretString>,
		) -> Result<TransportResponse, TransportError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			let mut responses = self.responses.lock().unwrap();
			if responses.len() > 1 {
				responses.pop_front().unwrap()
			} else {
				responses.front().cloned().unwrap()
			}
		}
	}

	fn settings() -> FetchSettings {
		FetchSettings {
			retry: RetryConfig {
				max_attempts: 3,
				base_delay: Duration::from_secs(1),
				max_delay: Duration::from_secs(10),
				backoff_factor: 2.0,
				jitter: false,
			},
			..FetchSettings::default()
		}
	}

	fn fetcher(transport: &Arc<Scripted>) -> Fetcher {
		Fetcher::new(transport.clone(), AllowList::icons8(), settings())
	}

	fn record() -> AssetRecord {
		let id = AssetId::new("abc");
		AssetRecord::new(id.clone(), "Cat", CatalogUrls::icon_png(&id, 256))
	}

	#[tokio::test(start_paused = true)]
	async fn downloads_and_measures_png() {
		let transport = Scripted::new(vec![ok_png(256)]);
		let raster = fetcher(&transport).fetch(&record(), None).await.unwrap();
		assert_eq!(raster.resolution, 256);
		assert_eq!(raster.asset_id, AssetId::new("abc"));
		assert_eq!(transport.calls(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn transient_failures_follow_backoff_schedule() {
		let transport = Scripted::new(vec![status(503), status(429), ok_png(64)]);
		let started = tokio::time::Instant::now();

		let raster = fetcher(&transport).fetch(&record(), None).await.unwrap();

		let elapsed = started.elapsed();
		assert_eq!(raster.resolution, 64);
		assert_eq!(transport.calls(), 3);
		assert!(elapsed >= Duration::from_secs(3), "elapsed {elapsed:?}");
		assert!(elapsed < Duration::from_millis(3100), "elapsed {elapsed:?}");
	}

	#[tokio::test(start_paused = true)]
	async fn persistent_failure_stops_at_ceiling() {
		let transport = Scripted::new(vec![status(502)]);
		let err = fetcher(&transport).fetch(&record(), None).await.unwrap_err();
		assert!(matches!(err.kind, DownloadErrorKind::Status(502)));
		assert_eq!(err.attempts, 3);
		assert_eq!(transport.calls(), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn timeouts_are_retried() {
		let transport = Scripted::new(vec![
			Err(TransportError::Timeout("slow".to_string())),
			ok_png(32),
		]);
		let raster = fetcher(&transport).fetch(&record(), None).await.unwrap();
		assert_eq!(raster.resolution, 32);
		assert_eq!(transport.calls(), 2);
	}

	#[tokio::test(start_paused = true)]
	async fn not_found_and_forbidden_fail_immediately() {
		for code in [404, 403] {
			let transport = Scripted::new(vec![status(code)]);
			let err = fetcher(&transport).fetch(&record(), None).await.unwrap_err();
			assert!(matches!(err.kind, DownloadErrorKind::Status(c) if c == code));
			assert_eq!(err.attempts, 1);
		}
	}

	#[tokio::test(start_paused = true)]
	async fn unauthorized_is_flagged() {
		let transport = Scripted::new(vec![status(401)]);
		let err = fetcher(&transport).fetch(&record(), None).await.unwrap_err();
		assert!(err.is_auth_required());
		assert_eq!(transport.calls(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn disallowed_locator_never_reaches_the_network() {
		let transport = Scripted::new(vec![ok_png(64)]);
		let mut bad = record();
		bad.source_locator = Url::parse("https://evil.example.com/?id=abc").unwrap();

		let err = fetcher(&transport).fetch(&bad, None).await.unwrap_err();
		assert!(matches!(err.kind, DownloadErrorKind::Disallowed(_)));
		assert_eq!(err.attempts, 0);

		bad.source_locator = Url::parse("http://img.icons8.com/?id=abc").unwrap();
		let err = fetcher(&transport).fetch(&bad, None).await.unwrap_err();
		assert!(matches!(err.kind, DownloadErrorKind::Disallowed(_)));
		assert_eq!(transport.calls(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn html_is_not_an_image() {
		let transport = Scripted::new(vec![Ok(TransportResponse {
			status: 200,
			content_type: Some("text/html; charset=utf-8".to_string()),
			body: png(16, 16),
		})]);
		let err = fetcher(&transport).fetch(&record(), None).await.unwrap_err();
		assert!(matches!(err.kind, DownloadErrorKind::NotAnImage(_)));
	}

	#[tokio::test(start_paused = true)]
	async fn tiny_and_foreign_bodies_are_rejected() {
		let transport = Scripted::new(vec![Ok(TransportResponse {
			status: 200,
			content_type: Some("image/png".to_string()),
			body: Bytes::from_static(&PNG_SIGNATURE),
		})]);
		let err = fetcher(&transport).fetch(&record(), None).await.unwrap_err();
		assert!(matches!(err.kind, DownloadErrorKind::TooSmall { size: 8, min: 50 }));

		let transport = Scripted::new(vec![Ok(TransportResponse {
			status: 200,
			content_type: Some("image/svg+xml".to_string()),
			body: Bytes::from(vec![b'<'; 100]),
		})]);
		let err = fetcher(&transport).fetch(&record(), None).await.unwrap_err();
		assert!(matches!(err.kind, DownloadErrorKind::InvalidImage(_)));
	}

	#[tokio::test(start_paused = true)]
	async fn oversized_dimensions_are_rejected() {
		let transport = Scripted::new(vec![Ok(TransportResponse {
			status: 200,
			content_type: Some("image/png".to_string()),
			body: png(4100, 1),
		})]);
		let err = fetcher(&transport).fetch(&record(), None).await.unwrap_err();
		assert!(matches!(
			err.kind,
			DownloadErrorKind::Oversized {
				width: 4100,
				height: 1,
				max: 4096
			}
		));
	}
}
