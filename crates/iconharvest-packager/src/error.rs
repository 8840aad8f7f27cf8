// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::io;
use std::path::PathBuf;

use iconharvest_common_core::{LayerSetMismatch, ValidationError};

/// Packaging one asset failed. Recorded per asset; the destination path is
/// never left holding a partial file.
#[derive(Debug, thiserror::Error)]
pub enum PackagingError {
	#[error("cannot decode source raster: {0}")]
	Decode(String),

	#[error("cannot encode {size}px layer: {message}")]
	Encode { size: u32, message: String },

	#[error(transparent)]
	LayerSet(#[from] LayerSetMismatch),

	#[error(transparent)]
	Validation(#[from] ValidationError),

	/// A layer or the whole container exceeds what the format can address.
	#[error("{format} container limit exceeded: {message}")]
	Limit {
		format: &'static str,
		message: String,
	},

	#[error("malformed {format} container: {message}")]
	Malformed {
		format: &'static str,
		message: String,
	},

	#[error("failed to {action} {path}: {source}")]
	Io {
		action: &'static str,
		path: PathBuf,
		#[source]
		source: io::Error,
	},
}

impl PackagingError {
	pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
		Self::Io {
			action,
			path: path.into(),
			source,
		}
	}

	pub(crate) fn malformed(format: &'static str, message: impl Into<String>) -> Self {
		Self::Malformed {
			format,
			message: message.into(),
		}
	}
}
