// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The fixed set of hosts iconharvest may contact, and the catalog URLs built
//! from them.

use url::Url;

use crate::asset::AssetId;
use crate::error::ValidationError;

pub const CATALOG_HOST: &str = "icons8.com";
pub const CATALOG_WWW_HOST: &str = "www.icons8.com";
pub const IMAGE_HOST: &str = "img.icons8.com";
pub const CDN_HOST: &str = "maxst.icons8.com";

/// Source sizes the catalog renders on demand.
pub const CATALOG_SIZES: [u32; 9] = [16, 24, 32, 48, 64, 96, 128, 256, 512];

/// The largest rendering the catalog offers, fetched unless a size is asked for.
pub const LARGEST_CATALOG_SIZE: u32 = CATALOG_SIZES[CATALOG_SIZES.len() - 1];

/// Hosts permitted for page navigation and for asset downloads.
///
/// Matching is exact: a host is allowed only if it is listed verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
	collection_hosts: Vec<String>,
	asset_hosts: Vec<String>,
}

impl Default for AllowList {
	fn default() -> Self {
		Self::icons8()
	}
}

impl AllowList {
	pub fn icons8() -> Self {
		Self {
			collection_hosts: vec![CATALOG_HOST.to_string(), CATALOG_WWW_HOST.to_string()],
			asset_hosts: vec![
				IMAGE_HOST.to_string(),
				CDN_HOST.to_string(),
				CATALOG_HOST.to_string(),
			],
		}
	}

	pub fn collection_hosts(&self) -> &[String] {
		&self.collection_hosts
	}

	pub fn asset_hosts(&self) -> &[String] {
		&self.asset_hosts
	}

	/// True when `url` is https on one of the collection hosts.
	pub fn allows_page(&self, url: &Url) -> bool {
		check(url, &self.collection_hosts).is_ok()
	}

	/// True when `url` is https on one of the asset hosts.
	pub fn allows_asset(&self, url: &Url) -> bool {
		check(url, &self.asset_hosts).is_ok()
	}

	pub fn check_page(&self, url: &Url) -> Result<(), ValidationError> {
		check(url, &self.collection_hosts)
	}

	pub fn check_asset(&self, url: &Url) -> Result<(), ValidationError> {
		check(url, &self.asset_hosts)
	}
}

fn check(url: &Url, hosts: &[String]) -> Result<(), ValidationError> {
	if url.scheme() != "https" {
		return Err(ValidationError::InsecureScheme(url.scheme().to_string()));
	}
	if !url.username().is_empty() || url.password().is_some() {
		return Err(ValidationError::UnexpectedContent(
			"embedded credentials".to_string(),
		));
	}
	if url.port().is_some() {
		return Err(ValidationError::UnexpectedContent(
			"explicit port".to_string(),
		));
	}
	let host = url
		.host_str()
		.ok_or_else(|| ValidationError::MalformedUrl("missing host".to_string()))?
		.to_ascii_lowercase();
	if hosts.iter().any(|allowed| *allowed == host) {
		Ok(())
	} else {
		Err(ValidationError::DisallowedHost(host))
	}
}

/// Well-known catalog endpoints.
pub struct CatalogUrls;

impl CatalogUrls {
	pub fn home() -> Url {
		Url::parse(&format!("https://{CATALOG_HOST}/")).expect("static URL")
	}

	pub fn login() -> Url {
		Url::parse(&format!("https://{CATALOG_HOST}/login")).expect("static URL")
	}

	/// Rendered PNG for one icon at `size` pixels.
	pub fn icon_png(id: &AssetId, size: u32) -> Url {
		let mut url = Url::parse(&format!("https://{IMAGE_HOST}/")).expect("static URL");
		url.query_pairs_mut()
			.append_pair("size", &size.to_string())
			.append_pair("id", id.as_str())
			.append_pair("format", "png");
		url
	}
}

/// Snap an arbitrary requested size to the nearest size the catalog renders.
pub fn closest_catalog_size(requested: u32) -> u32 {
	CATALOG_SIZES
		.iter()
		.copied()
		.min_by_key(|size| size.abs_diff(requested))
		.unwrap_or(LARGEST_CATALOG_SIZE)
}
