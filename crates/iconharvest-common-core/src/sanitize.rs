// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Turning catalog display names into safe file stems.

/// Longest stem produced, in characters.
pub const MAX_STEM_CHARS: usize = 200;

/// Stem used when nothing usable survives sanitising.
pub const FALLBACK_STEM: &str = "icon";

/// Sanitise a display name into a file stem.
///
/// The result only contains alphanumerics, `-` and `_`, so it can never
/// name a parent directory, an absolute path or a hidden file.
pub fn sanitize_filename(name: &str) -> String {
	let flattened = name
		.replace(['/', '\\'], "_")
		.replace('\0', "")
		.replace("..", "_");

	let kept: String = flattened
		.chars()
		.filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '_')
		.collect();

	let stem: String = kept
		.trim_end()
		.replace(' ', "_")
		.chars()
		.take(MAX_STEM_CHARS)
		.collect();

	if stem.is_empty() || stem.chars().all(|c| c == '_') {
		FALLBACK_STEM.to_string()
	} else {
		stem
	}
}
