// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Domain types shared across iconharvest.
//!
//! Everything here is pure: no I/O, no network, no clocks. Input validation
//! lives here so it can run before any browser or HTTP activity starts.

pub mod allow_list;
pub mod asset;
pub mod collection;
pub mod error;
pub mod format;
pub mod sanitize;

pub use allow_list::{
	closest_catalog_size, AllowList, CatalogUrls, CATALOG_SIZES, LARGEST_CATALOG_SIZE,
};
pub use asset::{AssetId, AssetRecord, RasterSource};
pub use collection::CollectionRef;
pub use error::ValidationError;
pub use format::{
	FormatSelection, IconArtifact, IconFormat, Layer, LayerSetMismatch, ICNS_SIZES, ICO_SIZES,
};
pub use sanitize::{sanitize_filename, FALLBACK_STEM, MAX_STEM_CHARS};
