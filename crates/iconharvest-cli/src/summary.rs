// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt::Write;
use std::path::PathBuf;

use iconharvest_pipeline::PipelineResult;

/// Human-readable end-of-run report printed to stdout.
pub fn render(result: &PipelineResult, output_dirs: &[PathBuf]) -> String {
	let mut out = String::new();
	let _ = writeln!(out, "Collection: {}", result.collection);
	let _ = writeln!(
		out,
		"Succeeded: {}  Failed: {}  Skipped: {}",
		result.succeeded(),
		result.failed(),
		result.skipped()
	);

	let mut failures = result.failures().peekable();
	if failures.peek().is_some() {
		let _ = writeln!(out, "Failed assets:");
		for (outcome, failure) in failures {
			let _ = writeln!(
				out,
				"  - {} ({}): {}",
				outcome.display_name, outcome.asset_id, failure
			);
		}
	}

	if result.succeeded() > 0 {
		let _ = writeln!(out, "Output:");
		for dir in output_dirs {
			let _ = writeln!(out, "  {}", dir.display());
		}
	}
	if result.cancelled {
		let _ = writeln!(out, "Interrupted: remaining assets were not processed.");
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use iconharvest_common_core::AssetId;
	use iconharvest_packager::PackageOutput;
	use iconharvest_pipeline::{AssetFailure, AssetOutcome, OutcomeStatus};

	fn outcome(id: &str, name: &str, status: OutcomeStatus) -> AssetOutcome {
		AssetOutcome {
			asset_id: AssetId::new(id),
			display_name: name.to_string(),
			status,
		}
	}

	#[test]
	fn lists_counts_failures_and_directories() {
		let result = PipelineResult {
			collection: "https://icons8.com/collection/abc".to_string(),
			outcomes: vec![
				outcome("1", "Cat", OutcomeStatus::Succeeded(PackageOutput::default())),
				outcome("2", "Dog", OutcomeStatus::Failed(AssetFailure::Cancelled)),
				outcome("1", "Cat", OutcomeStatus::SkippedDuplicate),
			],
			cancelled: true,
		};

		let text = render(&result, &[PathBuf::from("data/ico")]);
		assert!(text.starts_with("Collection: https://icons8.com/collection/abc\n"));
		assert!(text.contains("Succeeded: 1  Failed: 1  Skipped: 1"));
		assert!(text.contains("  - Dog (2): cancelled"));
		assert!(text.contains("  data/ico"));
		assert!(text.contains("Interrupted"));
	}

	#[test]
	fn no_output_section_when_nothing_succeeded() {
		let result = PipelineResult {
			collection: "c".to_string(),
			outcomes: Vec::new(),
			cancelled: false,
		};
		let text = render(&result, &[PathBuf::from("data/ico")]);
		assert!(!text.contains("Output:"));
		assert!(!text.contains("Failed assets:"));
	}
}
