// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Turning rendered images into asset records.

use std::collections::HashSet;

use iconharvest_common_core::{AssetId, AssetRecord, CatalogUrls};
use iconharvest_common_page::VisibleAsset;
use once_cell::sync::Lazy;
use regex::Regex;

static ID_QUERY: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"[?&]id=([A-Za-z0-9_-]+)").expect("valid id query pattern"));

static ID_PATH: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"/icon/([A-Za-z0-9_-]+)/").expect("valid id path pattern"));

// Image URLs as they appear in serialized markup, where `&` may be `&amp;`.
static SOURCE_IMAGE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r#"img\.icons8\.com/?\?(?:[^"'<>\s]*?[&;])?id=([A-Za-z0-9_-]+)"#)
		.expect("valid source image pattern")
});

/// Catalog id referenced by an image `src` or `srcset`, if any.
pub fn asset_id_from_urls(src: &str, srcset: &str) -> Option<AssetId> {
	if !src.contains("icons8.com") && !srcset.contains("icons8.com") {
		return None;
	}
	let combined = format!("{src}{srcset}");
	ID_QUERY
		.captures(&combined)
		.or_else(|| ID_PATH.captures(&combined))
		.and_then(|caps| caps.get(1))
		.map(|m| AssetId::new(m.as_str()))
}

/// Display name from an image `alt`, without the trailing " icon" the
/// catalog appends.
pub fn display_name(alt: Option<&str>, id: &AssetId) -> String {
	let trimmed = alt.unwrap_or_default().trim_end();
	let name = trimmed.strip_suffix(" icon").unwrap_or(trimmed).trim();
	if name.is_empty() {
		format!("icon-{id}")
	} else {
		name.to_string()
	}
}

/// Records for every catalog icon among `visible`, in document order.
///
/// When any image sits in an icon-grid tile, images outside tiles are page
/// chrome (logos, recommendations) and are ignored. Duplicates are kept;
/// the caller dedups across passes.
pub fn extract_records(visible: &[VisibleAsset], source_size: u32) -> Vec<AssetRecord> {
	let prefer_tiles = visible.iter().any(|v| v.in_icon_container);

	visible
		.iter()
		.filter(|v| !prefer_tiles || v.in_icon_container)
		.filter_map(|v| {
			let id = asset_id_from_urls(
				v.src.as_deref().unwrap_or_default(),
				v.srcset.as_deref().unwrap_or_default(),
			)?;
			let name = display_name(v.alt.as_deref(), &id);
			let locator = CatalogUrls::icon_png(&id, source_size);
			Some(AssetRecord::new(id, name, locator))
		})
		.collect()
}

/// Records for every catalog image URL found in raw page markup, unique and
/// in document order.
///
/// Used when the grid rendered no tiles the DOM walk could see. The markup
/// carries no alt text, so every record gets the `icon-<id>` name.
pub fn records_from_source(html: &str, source_size: u32) -> Vec<AssetRecord> {
	let mut seen = HashSet::new();
	SOURCE_IMAGE
		.captures_iter(html)
		.filter_map(|caps| caps.get(1))
		.map(|m| AssetId::new(m.as_str()))
		.filter(|id| seen.insert(id.clone()))
		.map(|id| {
			let name = display_name(None, &id);
			let locator = CatalogUrls::icon_png(&id, source_size);
			AssetRecord::new(id, name, locator)
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn img(src: &str, alt: Option<&str>, tile: bool) -> VisibleAsset {
		VisibleAsset {
			src: Some(src.to_string()),
			srcset: None,
			alt: alt.map(str::to_string),
			in_icon_container: tile,
		}
	}

	#[test]
	fn id_from_query_string() {
		assert_eq!(
			asset_id_from_urls("https://img.icons8.com/?size=48&id=Xk9d2_a-&format=png", ""),
			Some(AssetId::new("Xk9d2_a-"))
		);
	}

	#[test]
	fn id_from_path() {
		assert_eq!(
			asset_id_from_urls("https://img.icons8.com/icon/12345/cat", ""),
			Some(AssetId::new("12345"))
		);
	}

	#[test]
	fn id_from_srcset_only() {
		assert_eq!(
			asset_id_from_urls("", "https://img.icons8.com/?size=96&id=abc 2x"),
			Some(AssetId::new("abc"))
		);
	}

	#[test]
	fn foreign_images_are_ignored() {
		assert_eq!(asset_id_from_urls("https://cdn.example.com/?id=abc", ""), None);
		assert_eq!(asset_id_from_urls("https://img.icons8.com/logo.svg", ""), None);
	}

	#[test]
	fn names_drop_icon_suffix() {
		let id = AssetId::new("1");
		assert_eq!(display_name(Some("Cute Cat icon"), &id), "Cute Cat");
		assert_eq!(display_name(Some("Iconic"), &id), "Iconic");
		assert_eq!(display_name(Some(" icon"), &id), "icon-1");
		assert_eq!(display_name(None, &id), "icon-1");
	}

	#[test]
	fn tiles_win_over_page_chrome() {
		let visible = vec![
			img("https://img.icons8.com/?id=logo", Some("Icons8 icon"), false),
			img("https://img.icons8.com/?id=a1", Some("Cat icon"), true),
			img("https://img.icons8.com/?id=b2", Some("Dog icon"), true),
		];
		let records = extract_records(&visible, 256);
		let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
		assert_eq!(ids, ["a1", "b2"]);
		assert_eq!(
			records[0].source_locator.as_str(),
			"https://img.icons8.com/?size=256&id=a1&format=png"
		);
	}

	#[test]
	fn markup_ids_are_unique_and_unnamed() {
		let html = r#"<div><img src="https://img.icons8.com/?size=48&amp;id=Cat9&amp;format=png">
			<img data-src='//img.icons8.com/?id=dog_2'>
			<img src="https://img.icons8.com/?size=96&id=Cat9">
			<a href="https://icons8.com/icon/555/owl">owl</a>
			<img src="https://cdn.example.com/?id=nope"></div>"#;
		let records = records_from_source(html, 512);
		let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
		assert_eq!(ids, ["Cat9", "dog_2"]);
		assert_eq!(records[0].display_name, "icon-Cat9");
		assert_eq!(
			records[1].source_locator.as_str(),
			"https://img.icons8.com/?size=512&id=dog_2&format=png"
		);
	}

	#[test]
	fn markup_without_catalog_images_yields_nothing() {
		assert!(records_from_source("<html><body></body></html>", 256).is_empty());
	}

	#[test]
	fn without_tiles_every_catalog_image_counts() {
		let visible = vec![
			img("https://img.icons8.com/?id=a1", None, false),
			img("https://example.com/banner.png", None, false),
		];
		assert_eq!(extract_records(&visible, 64).len(), 1);
	}
}
