// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Turning the crawl result into a work queue with unique file names.

use std::collections::HashSet;

use iconharvest_common_core::{sanitize_filename, AssetId, AssetRecord, MAX_STEM_CHARS};

#[derive(Debug, Clone)]
pub(crate) struct Job {
	pub record: AssetRecord,
	pub stem: String,
}

#[derive(Debug, Clone)]
pub(crate) enum Planned {
	Job(Job),
	Duplicate(AssetRecord),
}

/// Assign every record a file stem, unique case-insensitively within the
/// run. A display name already taken is disambiguated with the asset id.
pub(crate) fn plan(records: Vec<AssetRecord>) -> Vec<Planned> {
	let mut ids: HashSet<AssetId> = HashSet::new();
	let mut stems: HashSet<String> = HashSet::new();

	records
		.into_iter()
		.map(|record| {
			if !ids.insert(record.id.clone()) {
				return Planned::Duplicate(record);
			}
			let stem = unique_stem(&record, &mut stems);
			Planned::Job(Job { record, stem })
		})
		.collect()
}

fn unique_stem(record: &AssetRecord, taken: &mut HashSet<String>) -> String {
	let base = sanitize_filename(&record.display_name);
	if taken.insert(base.to_lowercase()) {
		return base;
	}

	let suffix = sanitize_filename(record.id.as_str());
	let room = MAX_STEM_CHARS.saturating_sub(suffix.chars().count() + 1);
	let trimmed: String = base.chars().take(room).collect();
	let candidate = format!("{trimmed}_{suffix}");
	if taken.insert(candidate.to_lowercase()) {
		return candidate;
	}

	let mut n = 2;
	loop {
		let numbered = format!("{candidate}_{n}");
		if taken.insert(numbered.to_lowercase()) {
			return numbered;
		}
		n += 1;
	}
}
