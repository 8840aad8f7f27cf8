// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use iconharvest_auth::AuthenticationError;
use iconharvest_common_core::ValidationError;
use iconharvest_crawl::CollectionAccessError;
use iconharvest_fetch::TransportError;
use iconharvest_packager::PackagingError;

/// Process exit codes.
pub mod exit_code {
	/// At least one asset was produced.
	pub const SUCCESS: i32 = 0;
	/// The run finished but produced nothing.
	pub const NOTHING_PRODUCED: i32 = 1;
	pub const AUTHENTICATION: i32 = 2;
	pub const COLLECTION_ACCESS: i32 = 3;
	pub const VALIDATION: i32 = 4;
	/// Interrupted before any asset succeeded (128 + SIGINT).
	pub const CANCELLED: i32 = 130;
}

/// A failure that ends the run with nothing to process.
///
/// Per-asset problems never surface here; they are recorded in the
/// [`PipelineResult`](crate::PipelineResult).
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
	#[error(transparent)]
	Validation(#[from] ValidationError),

	#[error("authentication failed: {0}")]
	Authentication(#[from] AuthenticationError),

	#[error("collection unavailable: {0}")]
	CollectionAccess(#[from] CollectionAccessError),

	#[error("cannot prepare output directory: {0}")]
	Output(#[source] PackagingError),

	#[error("cannot set up downloads: {0}")]
	Transport(#[source] TransportError),

	#[error("cancelled")]
	Cancelled,
}

impl PipelineError {
	pub fn exit_code(&self) -> i32 {
		match self {
			PipelineError::Validation(_) => exit_code::VALIDATION,
			PipelineError::Authentication(_) => exit_code::AUTHENTICATION,
			PipelineError::CollectionAccess(_) => exit_code::COLLECTION_ACCESS,
			PipelineError::Output(_) | PipelineError::Transport(_) => exit_code::NOTHING_PRODUCED,
			PipelineError::Cancelled => exit_code::CANCELLED,
		}
	}
}
