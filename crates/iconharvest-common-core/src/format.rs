// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Icon container formats and the artifacts built from them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::asset::AssetId;
use crate::error::ValidationError;

/// Layer sizes of a Windows `.ico`.
pub const ICO_SIZES: [u32; 6] = [16, 32, 48, 64, 128, 256];

/// Layer sizes of a macOS `.icns`.
pub const ICNS_SIZES: [u32; 7] = [16, 32, 64, 128, 256, 512, 1024];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconFormat {
	Ico,
	Icns,
}

impl IconFormat {
	/// The exact, ascending layer set an artifact of this format must carry.
	pub fn required_sizes(self) -> &'static [u32] {
		match self {
			IconFormat::Ico => &ICO_SIZES,
			IconFormat::Icns => &ICNS_SIZES,
		}
	}

	pub fn largest_size(self) -> u32 {
		self.required_sizes().last().copied().unwrap_or(0)
	}

	pub fn extension(self) -> &'static str {
		match self {
			IconFormat::Ico => "ico",
			IconFormat::Icns => "icns",
		}
	}

	/// Subdirectory of the output directory holding artifacts of this format.
	pub fn subdir(self) -> &'static str {
		self.extension()
	}
}

impl fmt::Display for IconFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.extension())
	}
}

/// Which containers a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatSelection {
	#[default]
	Ico,
	Icns,
	Both,
}

impl FormatSelection {
	pub fn formats(self) -> &'static [IconFormat] {
		match self {
			FormatSelection::Ico => &[IconFormat::Ico],
			FormatSelection::Icns => &[IconFormat::Icns],
			FormatSelection::Both => &[IconFormat::Ico, IconFormat::Icns],
		}
	}
}

impl FromStr for FormatSelection {
	type Err = ValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"ico" => Ok(FormatSelection::Ico),
			"icns" => Ok(FormatSelection::Icns),
			"both" => Ok(FormatSelection::Both),
			other => Err(ValidationError::invalid_value(
				"format",
				format!("`{other}` (expected ico, icns or both)"),
			)),
		}
	}
}

impl fmt::Display for FormatSelection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			FormatSelection::Ico => "ico",
			FormatSelection::Icns => "icns",
			FormatSelection::Both => "both",
		})
	}
}

/// One encoded image inside a container.
#[derive(Clone, PartialEq, Eq)]
pub struct Layer {
	pub resolution: u32,
	/// PNG-encoded RGBA pixels.
	pub encoded: Vec<u8>,
}

impl fmt::Debug for Layer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Layer")
			.field("resolution", &self.resolution)
			.field("len", &self.encoded.len())
			.finish()
	}
}

/// A complete multi-resolution icon ready to serialise.
///
/// Construct with [`IconArtifact::new`], which enforces that layers are
/// ascending, unique and exactly the format's required set.
#[derive(Debug, Clone)]
pub struct IconArtifact {
	asset_id: AssetId,
	format: IconFormat,
	layers: Vec<Layer>,
}

/// Why a set of layers does not form a valid artifact.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{format} layers {actual:?} do not match required {required:?}")]
pub struct LayerSetMismatch {
	pub format: IconFormat,
	pub required: Vec<u32>,
	pub actual: Vec<u32>,
}

impl IconArtifact {
	pub fn new(
		asset_id: AssetId,
		format: IconFormat,
		mut layers: Vec<Layer>,
	) -> Result<Self, LayerSetMismatch> {
		layers.sort_by_key(|l| l.resolution);
		let actual: Vec<u32> = layers.iter().map(|l| l.resolution).collect();
		if actual != format.required_sizes() {
			return Err(LayerSetMismatch {
				format,
				required: format.required_sizes().to_vec(),
				actual,
			});
		}
		Ok(Self {
			asset_id,
			format,
			layers,
		})
	}

	pub fn asset_id(&self) -> &AssetId {
		&self.asset_id
	}

	pub fn format(&self) -> IconFormat {
		self.format
	}

	pub fn layers(&self) -> &[Layer] {
		&self.layers
	}
}
