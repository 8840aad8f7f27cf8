// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Validated reference to a catalog collection.

use std::fmt;

use url::Url;

use crate::allow_list::AllowList;
use crate::error::ValidationError;

/// A collection URL that passed validation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRef {
	url: Url,
	slug: String,
}

impl CollectionRef {
	/// Validate and normalise user input.
	///
	/// The URL must be https on an allow-listed catalog host, point at a
	/// `/collection/` or `/collections/` path, and carry no credentials,
	/// port, query, or traversal segments. The fragment is dropped.
	pub fn parse(input: &str, allow: &AllowList) -> Result<Self, ValidationError> {
		let trimmed = input.trim();
		if trimmed.is_empty() {
			return Err(ValidationError::MalformedUrl("empty".to_string()));
		}
		if trimmed.contains('\\') {
			return Err(ValidationError::UnexpectedContent("backslash".to_string()));
		}

		let raw_path = raw_path_of(trimmed);
		if has_traversal(raw_path) {
			return Err(ValidationError::PathTraversal("collection URL".to_string()));
		}

		let mut url =
			Url::parse(trimmed).map_err(|e| ValidationError::MalformedUrl(e.to_string()))?;
		allow.check_page(&url)?;

		if url.query().is_some_and(|q| !q.is_empty()) {
			return Err(ValidationError::UnexpectedContent("query string".to_string()));
		}
		url.set_query(None);
		url.set_fragment(None);

		let segments: Vec<String> = url
			.path_segments()
			.map(|s| s.filter(|seg| !seg.is_empty()).map(String::from).collect())
			.unwrap_or_default();
		let marker = segments
			.iter()
			.position(|seg| *seg == "collection" || *seg == "collections")
			.ok_or(ValidationError::NotACollection)?;
		let slug = segments
			.get(marker + 1)
			.ok_or(ValidationError::NotACollection)?
			.to_string();
		if !slug
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
		{
			return Err(ValidationError::UnexpectedContent(format!(
				"collection id `{slug}`"
			)));
		}

		let normalised_path = format!("/{}", segments.join("/"));
		url.set_path(&normalised_path);

		Ok(Self { url, slug })
	}

	pub fn url(&self) -> &Url {
		&self.url
	}

	/// The collection identifier taken from the path.
	pub fn slug(&self) -> &str {
		&self.slug
	}
}

impl fmt::Display for CollectionRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.url.as_str())
	}
}

/// Path portion of the unparsed input, before `Url` resolves dot segments.
fn raw_path_of(input: &str) -> &str {
	let after_scheme = input.split_once("://").map(|(_, rest)| rest).unwrap_or(input);
	let path_start = after_scheme.find('/').unwrap_or(after_scheme.len());
	let path = &after_scheme[path_start..];
	let end = path.find(['?', '#']).unwrap_or(path.len());
	&path[..end]
}

fn has_traversal(path: &str) -> bool {
	let lowered = path.to_ascii_lowercase();
	if lowered.contains("%2e") || lowered.contains("%2f") || lowered.contains("%5c") {
		return true;
	}
	path.split('/').any(|seg| seg == ".." || seg == ".")
}
