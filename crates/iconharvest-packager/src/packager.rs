// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fs;
use std::path::{Path, PathBuf};

use iconharvest_common_core::{FormatSelection, IconFormat, RasterSource, ValidationError};
use tracing::{debug, info, instrument, warn};

use crate::container;
use crate::error::PackagingError;
use crate::publish::{publish, sweep_stale_temps};
use crate::resample::{build_artifact, decode};

/// Subdirectory for downloaded sources kept alongside the artifacts.
pub const PNG_SUBDIR: &str = "png";

/// Files written for one asset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageOutput {
	pub artifacts: Vec<PathBuf>,
	pub source_png: Option<PathBuf>,
}

/// Turns source rasters into published icon containers under
/// `<output_dir>/<format>/<stem>.<format>`.
#[derive(Debug, Clone)]
pub struct Packager {
	output_dir: PathBuf,
	formats: FormatSelection,
	keep_png: bool,
}

impl Packager {
	pub fn new(output_dir: impl Into<PathBuf>, formats: FormatSelection) -> Self {
		Self {
			output_dir: output_dir.into(),
			formats,
			keep_png: false,
		}
	}

	pub fn with_keep_png(mut self, keep_png: bool) -> Self {
		self.keep_png = keep_png;
		self
	}

	pub fn output_dir(&self) -> &Path {
		&self.output_dir
	}

	pub fn formats(&self) -> FormatSelection {
		self.formats
	}

	/// Every directory this packager writes into.
	pub fn directories(&self) -> Vec<PathBuf> {
		let mut dirs: Vec<PathBuf> = self
			.formats
			.formats()
			.iter()
			.map(|f| self.output_dir.join(f.subdir()))
			.collect();
		if self.keep_png {
			dirs.push(self.output_dir.join(PNG_SUBDIR));
		}
		dirs
	}

	pub fn artifact_path(&self, format: IconFormat, stem: &str) -> PathBuf {
		self.output_dir
			.join(format.subdir())
			.join(format!("{stem}.{}", format.extension()))
	}

	/// Create the output directories and clear temporaries from an earlier
	/// interrupted run. Returns how many were removed.
	pub fn prepare(&self) -> Result<usize, PackagingError> {
		let mut removed = 0;
		for dir in self.directories() {
			fs::create_dir_all(&dir).map_err(|e| PackagingError::io("create", &dir, e))?;
			removed += sweep_stale_temps(&dir)?;
		}
		if removed > 0 {
			info!(removed, "cleared temporary files from an interrupted run");
		}
		Ok(removed)
	}

	/// Render, serialise and publish every selected format for one source.
	///
	/// All containers are built in memory before the first one is published.
	/// The source and every intermediate buffer are released on return,
	/// whatever the outcome.
	#[instrument(skip_all, fields(asset_id = %source.asset_id, stem = %stem))]
	pub fn package(&self, stem: &str, source: RasterSource) -> Result<PackageOutput, PackagingError> {
		check_stem(stem)?;

		let decoded = decode(&source)?;
		let encoded = self
			.formats
			.formats()
			.iter()
			.map(|&format| {
				let artifact = build_artifact(&source.asset_id, &decoded, format)?;
				Ok((format, container::encode(&artifact)?))
			})
			.collect::<Result<Vec<_>, PackagingError>>()?;
		drop(decoded);

		let mut output = PackageOutput::default();
		if let Err(e) = self.publish_all(stem, encoded, &source, &mut output) {
			discard(&output);
			return Err(e);
		}
		Ok(output)
	}

	/// Publish each file in turn, recording it in `output` as soon as it is
	/// in place.
	fn publish_all(
		&self,
		stem: &str,
		encoded: Vec<(IconFormat, Vec<u8>)>,
		source: &RasterSource,
		output: &mut PackageOutput,
	) -> Result<(), PackagingError> {
		for (format, bytes) in encoded {
			let dir = self.output_dir.join(format.subdir());
			fs::create_dir_all(&dir).map_err(|e| PackagingError::io("create", &dir, e))?;
			let file_name = format!("{stem}.{}", format.extension());
			output.artifacts.push(publish(&dir, &file_name, &bytes)?);
		}

		if self.keep_png {
			let dir = self.output_dir.join(PNG_SUBDIR);
			fs::create_dir_all(&dir).map_err(|e| PackagingError::io("create", &dir, e))?;
			output.source_png = Some(publish(&dir, &format!("{stem}.png"), &source.bytes)?);
		}
		Ok(())
	}
}

/// Remove what an asset already published, so a failed asset leaves no
/// partial set of siblings.
fn discard(output: &PackageOutput) {
	for path in output.artifacts.iter().chain(output.source_png.iter()) {
		match fs::remove_file(path) {
			Ok(()) => debug!(path = ?path, "removed sibling of a failed asset"),
			Err(e) => warn!(path = ?path, error = %e, "failed to remove sibling of a failed asset"),
		}
	}
}

/// Stems come from the sanitiser; anything that could leave its directory
/// is refused outright.
fn check_stem(stem: &str) -> Result<(), PackagingError> {
	let unsafe_stem = stem.is_empty()
		|| stem.starts_with('.')
		|| stem.contains("..")
		|| stem.contains(['/', '\\', '\0']);
	if unsafe_stem {
		return Err(ValidationError::PathTraversal(format!("file name `{stem}`")).into());
	}
	Ok(())
}
