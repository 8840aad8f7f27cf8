// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Atomic publication of finished files.
//!
//! Content is written to a hidden temporary file in the destination
//! directory, flushed to disk and renamed over the final name. A reader
//! of the final path sees either nothing or the complete file.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::PackagingError;

pub const TEMP_PREFIX: &str = ".iconharvest-";
pub const TEMP_SUFFIX: &str = ".tmp";

pub fn is_temp_name(name: &str) -> bool {
	name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)
}

/// Removes the temporary file unless disarmed, including on unwind.
struct TempGuard {
	path: PathBuf,
	armed: bool,
}

impl Drop for TempGuard {
	fn drop(&mut self) {
		if self.armed {
			if let Err(e) = fs::remove_file(&self.path) {
				if e.kind() != io::ErrorKind::NotFound {
					warn!(path = ?self.path, error = %e, "failed to remove temporary file");
				}
			}
		}
	}
}

/// Write `bytes` to `dir/file_name` atomically.
pub fn publish(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, PackagingError> {
	publish_with(dir, file_name, |file| file.write_all(bytes))
}

pub(crate) fn publish_with<F>(
	dir: &Path,
	file_name: &str,
	write: F,
) -> Result<PathBuf, PackagingError>
where
	F: FnOnce(&mut File) -> io::Result<()>,
{
	let final_path = dir.join(file_name);
	let temp_path = dir.join(format!("{TEMP_PREFIX}{}{TEMP_SUFFIX}", Uuid::new_v4()));

	let mut guard = TempGuard {
		path: temp_path.clone(),
		armed: true,
	};

	let mut file =
		File::create(&temp_path).map_err(|e| PackagingError::io("create", &temp_path, e))?;
	write(&mut file).map_err(|e| PackagingError::io("write", &temp_path, e))?;
	file
		.sync_all()
		.map_err(|e| PackagingError::io("sync", &temp_path, e))?;
	drop(file);

	fs::rename(&temp_path, &final_path)
		.map_err(|e| PackagingError::io("rename into", &final_path, e))?;
	guard.armed = false;

	debug!(path = ?final_path, "published");
	Ok(final_path)
}

/// Delete temporary files left in `dir` by an interrupted run.
pub fn sweep_stale_temps(dir: &Path) -> Result<usize, PackagingError> {
	let entries = match fs::read_dir(dir) {
		Ok(entries) => entries,
		Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
		Err(e) => return Err(PackagingError::io("read directory", dir, e)),
	};

	let mut removed = 0;
	for entry in entries {
		let entry = entry.map_err(|e| PackagingError::io("read directory", dir, e))?;
		let name = entry.file_name();
		if !is_temp_name(&name.to_string_lossy()) {
			continue;
		}
		let path = entry.path();
		match fs::remove_file(&path) {
			Ok(()) => {
				debug!(path = ?path, "removed stale temporary file");
				removed += 1;
			}
			Err(e) => warn!(path = ?path, error = %e, "failed to remove stale temporary file"),
		}
	}
	Ok(removed)
}
