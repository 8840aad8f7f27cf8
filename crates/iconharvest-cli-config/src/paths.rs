// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Where iconharvest keeps its config file and stored sessions.

use std::path::{Path, PathBuf};

use crate::ConfigError;

const APP_DIR: &str = "iconharvest";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathsConfig {
	/// `$XDG_CONFIG_HOME/iconharvest/config.toml`
	pub user_config_file: PathBuf,
	/// `$XDG_STATE_HOME/iconharvest`
	pub state_dir: PathBuf,
}

impl PathsConfig {
	fn under(config_home: &Path, state_home: &Path) -> Self {
		Self {
			user_config_file: config_home.join(APP_DIR).join("config.toml"),
			state_dir: state_home.join(APP_DIR),
		}
	}

	/// One session file per account lives here.
	pub fn session_dir(&self) -> PathBuf {
		self.state_dir.join("sessions")
	}
}

/// `XDG_CONFIG_HOME` and `XDG_STATE_HOME` when set, `~/.config` and
/// `~/.local/state` otherwise.
pub fn resolve_xdg_paths() -> Result<PathsConfig, ConfigError> {
	let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;
	let config_home = std::env::var_os("XDG_CONFIG_HOME")
		.map(PathBuf::from)
		.unwrap_or_else(|| home.join(".config"));
	let state_home = std::env::var_os("XDG_STATE_HOME")
		.map(PathBuf::from)
		.unwrap_or_else(|| home.join(".local").join("state"));

	let paths = PathsConfig::under(&config_home, &state_home);
	tracing::debug!(
		config_file = %paths.user_config_file.display(),
		state_dir = %paths.state_dir.display(),
		"resolved paths"
	);
	Ok(paths)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn layout_under_given_homes() {
		let paths = PathsConfig::under(Path::new("/cfg"), Path::new("/state"));
		assert_eq!(
			paths.user_config_file,
			PathBuf::from("/cfg/iconharvest/config.toml")
		);
		assert_eq!(paths.session_dir(), PathBuf::from("/state/iconharvest/sessions"));
	}

	#[test]
	fn resolved_paths_are_namespaced() {
		let paths = resolve_xdg_paths().unwrap();
		assert!(paths.user_config_file.ends_with("iconharvest/config.toml"));
		assert!(paths.session_dir().ends_with("iconharvest/sessions"));
	}
}
