// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use iconharvest_common_core::AssetId;
use iconharvest_fetch::DownloadError;
use iconharvest_packager::{PackageOutput, PackagingError};

use crate::error::exit_code;

/// Why one asset produced nothing.
#[derive(Debug, thiserror::Error)]
pub enum AssetFailure {
	#[error(transparent)]
	Download(DownloadError),

	#[error("packaging failed: {0}")]
	Packaging(PackagingError),

	#[error("packaging task aborted: {0}")]
	Worker(String),

	#[error("cancelled")]
	Cancelled,
}

#[derive(Debug)]
pub enum OutcomeStatus {
	Succeeded(PackageOutput),
	/// The id already appeared earlier in the queue.
	SkippedDuplicate,
	Failed(AssetFailure),
}

/// The single terminal outcome of one queued asset.
#[derive(Debug)]
pub struct AssetOutcome {
	pub asset_id: AssetId,
	pub display_name: String,
	pub status: OutcomeStatus,
}

impl AssetOutcome {
	pub fn is_success(&self) -> bool {
		matches!(self.status, OutcomeStatus::Succeeded(_))
	}

	pub fn failure(&self) -> Option<&AssetFailure> {
		match &self.status {
			OutcomeStatus::Failed(failure) => Some(failure),
			_ => None,
		}
	}
}

/// Tally of a completed run, in queue order.
#[derive(Debug)]
pub struct PipelineResult {
	pub collection: String,
	pub outcomes: Vec<AssetOutcome>,
	/// Cancellation was requested while assets were being processed.
	pub cancelled: bool,
}

impl PipelineResult {
	pub fn succeeded(&self) -> usize {
		self.outcomes.iter().filter(|o| o.is_success()).count()
	}

	pub fn skipped(&self) -> usize {
		self.outcomes
			.iter()
			.filter(|o| matches!(o.status, OutcomeStatus::SkippedDuplicate))
			.count()
	}

	pub fn failed(&self) -> usize {
		self.outcomes.iter().filter(|o| o.failure().is_some()).count()
	}

	pub fn failures(&self) -> impl Iterator<Item = (&AssetOutcome, &AssetFailure)> {
		self.outcomes
			.iter()
			.filter_map(|o| o.failure().map(|failure| (o, failure)))
	}

	/// Partial success still counts as success.
	pub fn exit_code(&self) -> i32 {
		if self.succeeded() > 0 {
			exit_code::SUCCESS
		} else if self.cancelled {
			exit_code::CANCELLED
		} else {
			exit_code::NOTHING_PRODUCED
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use iconharvest_fetch::DownloadErrorKind;

	fn outcome(id: &str, status: OutcomeStatus) -> AssetOutcome {
		AssetOutcome {
			asset_id: AssetId::new(id),
			display_name: id.to_string(),
			status,
		}
	}

	fn not_found(id: &str) -> OutcomeStatus {
		OutcomeStatus::Failed(AssetFailure::Download(DownloadError::new(
			AssetId::new(id),
			DownloadErrorKind::Status(404),
			1,
		)))
	}

	#[test]
	fn partial_success_exits_zero() {
		let result = PipelineResult {
			collection: "c".to_string(),
			outcomes: vec![
				outcome("a", OutcomeStatus::Succeeded(PackageOutput::default())),
				outcome("b", not_found("b")),
				outcome("a", OutcomeStatus::SkippedDuplicate),
			],
			cancelled: false,
		};
		assert_eq!(result.succeeded(), 1);
		assert_eq!(result.failed(), 1);
		assert_eq!(result.skipped(), 1);
		assert_eq!(result.failures().count(), 1);
		assert_eq!(result.exit_code(), 0);
	}

	#[test]
	fn nothing_produced_is_a_failure() {
		let mut result = PipelineResult {
			collection: "c".to_string(),
			outcomes: vec![outcome("b", not_found("b"))],
			cancelled: false,
		};
		assert_eq!(result.exit_code(), 1);

		result.cancelled = true;
		assert_eq!(result.exit_code(), 130);
	}
}
