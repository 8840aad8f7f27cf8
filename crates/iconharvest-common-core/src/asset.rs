// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Assets discovered in a collection and the rasters downloaded for them.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// Catalog identifier of one icon. Unique within a crawl.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for AssetId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// One icon found by the crawler.
///
/// Identity is the `id`; two records with the same id are the same asset
/// even if their names or locators differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRecord {
	pub id: AssetId,
	pub display_name: String,
	pub source_locator: Url,
}

impl AssetRecord {
	pub fn new(id: AssetId, display_name: impl Into<String>, source_locator: Url) -> Self {
		Self {
			id,
			display_name: display_name.into(),
			source_locator,
		}
	}
}

impl PartialEq for AssetRecord {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for AssetRecord {}

/// A downloaded raster for one asset, alive only until it is packaged.
#[derive(Clone)]
pub struct RasterSource {
	pub asset_id: AssetId,
	/// Width in pixels of the decoded image (sources are square in practice).
	pub resolution: u32,
	pub bytes: Bytes,
}

impl fmt::Debug for RasterSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RasterSource")
			.field("asset_id", &self.asset_id)
			.field("resolution", &self.resolution)
			.field("len", &self.bytes.len())
			.finish()
	}
}
