// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use iconharvest_common_core::{AssetId, ValidationError};

use crate::transport::TransportError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum DownloadErrorKind {
	#[error("locator rejected: {0}")]
	Disallowed(ValidationError),

	#[error("HTTP {0}")]
	Status(u16),

	/// HTTP 401: the session no longer authenticates.
	#[error("authentication required (HTTP 401)")]
	AuthRequired,

	#[error(transparent)]
	Transport(TransportError),

	#[error("not an image (content type {0})")]
	NotAnImage(String),

	#[error("response too small ({size} bytes, minimum {min})")]
	TooSmall { size: u64, min: u64 },

	#[error("response too large ({size} bytes, maximum {max})")]
	TooLarge { size: u64, max: u64 },

	#[error("invalid image: {0}")]
	InvalidImage(String),

	#[error("image dimensions {width}x{height} exceed {max}px")]
	Oversized { width: u32, height: u32, max: u32 },

	#[error("cancelled")]
	Cancelled,
}

/// One asset could not be downloaded. Recorded per asset; never aborts a run.
#[derive(Debug, Clone, thiserror::Error)]
#[error("download of {asset_id} failed after {attempts} attempt(s): {kind}")]
pub struct DownloadError {
	pub asset_id: AssetId,
	pub kind: DownloadErrorKind,
	/// Requests issued, zero when rejected before any network activity.
	pub attempts: u32,
}

impl DownloadError {
	pub fn new(asset_id: AssetId, kind: DownloadErrorKind, attempts: u32) -> Self {
		Self {
			asset_id,
			kind,
			attempts,
		}
	}

	pub fn is_auth_required(&self) -> bool {
		matches!(self.kind, DownloadErrorKind::AuthRequired)
	}
}
