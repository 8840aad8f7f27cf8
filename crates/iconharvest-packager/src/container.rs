// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! ICO and ICNS serialisation and inspection.
//!
//! Both containers embed PNG-compressed layers.
//!
//! ICO: a 6-byte header (reserved, type 1, count), one 16-byte directory
//! entry per image (width, height, palette, reserved, planes, bit depth,
//! payload length, payload offset), then the payloads. Widths and heights
//! of 256 are stored as 0. All integers little-endian.
//!
//! ICNS: the `icns` magic and total file length, then one chunk per layer of
//! a four-character type and a length that includes the 8-byte chunk header.
//! All integers big-endian.

use iconharvest_common_core::{IconArtifact, IconFormat};

use crate::error::PackagingError;

const ICO_HEADER_LEN: usize = 6;
const ICO_ENTRY_LEN: usize = 16;
const ICO_TYPE_ICON: u16 = 1;

const ICNS_MAGIC: &[u8; 4] = b"icns";
const ICNS_HEADER_LEN: usize = 8;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// ICNS chunk types for PNG payloads, by pixel size.
const ICNS_TYPES: [(u32, &[u8; 4]); 7] = [
	(16, b"icp4"),
	(32, b"icp5"),
	(64, b"icp6"),
	(128, b"ic07"),
	(256, b"ic08"),
	(512, b"ic09"),
	(1024, b"ic10"),
];

fn icns_type_for(size: u32) -> Option<&'static [u8; 4]> {
	ICNS_TYPES
		.iter()
		.find(|(s, _)| *s == size)
		.map(|(_, tag)| *tag)
}

fn icns_size_for(tag: &[u8]) -> Option<u32> {
	ICNS_TYPES
		.iter()
		.find(|(_, t)| t.as_slice() == tag)
		.map(|(s, _)| *s)
}

/// Serialise an artifact in its own format.
pub fn encode(artifact: &IconArtifact) -> Result<Vec<u8>, PackagingError> {
	match artifact.format() {
		IconFormat::Ico => encode_ico(artifact),
		IconFormat::Icns => encode_icns(artifact),
	}
}

pub fn encode_ico(artifact: &IconArtifact) -> Result<Vec<u8>, PackagingError> {
	let layers = artifact.layers();
	let limit = |message: String| PackagingError::Limit {
		format: "ico",
		message,
	};
	let count = u16::try_from(layers.len()).map_err(|_| limit("too many layers".to_string()))?;

	let payload_len: usize = layers.iter().map(|l| l.encoded.len()).sum();
	let directory_len = ICO_HEADER_LEN + ICO_ENTRY_LEN * layers.len();
	let mut out = Vec::with_capacity(directory_len + payload_len);

	out.extend_from_slice(&0u16.to_le_bytes());
	out.extend_from_slice(&ICO_TYPE_ICON.to_le_bytes());
	out.extend_from_slice(&count.to_le_bytes());

	let mut offset = directory_len;
	for layer in layers {
		let dimension = match layer.resolution {
			256 => 0u8,
			n => u8::try_from(n).map_err(|_| limit(format!("{n}px layer")))?,
		};
		let len = u32::try_from(layer.encoded.len())
			.map_err(|_| limit(format!("{}px payload too large", layer.resolution)))?;
		let at = u32::try_from(offset).map_err(|_| limit("file too large".to_string()))?;

		out.push(dimension);
		out.push(dimension);
		out.push(0); // palette colours
		out.push(0); // reserved
		out.extend_from_slice(&1u16.to_le_bytes()); // planes
		out.extend_from_slice(&32u16.to_le_bytes()); // bits per pixel
		out.extend_from_slice(&len.to_le_bytes());
		out.extend_from_slice(&at.to_le_bytes());
		offset += layer.encoded.len();
	}

	for layer in layers {
		out.extend_from_slice(&layer.encoded);
	}
	Ok(out)
}

pub fn encode_icns(artifact: &IconArtifact) -> Result<Vec<u8>, PackagingError> {
	let limit = |message: String| PackagingError::Limit {
		format: "icns",
		message,
	};

	let mut body = Vec::new();
	for layer in artifact.layers() {
		let tag = icns_type_for(layer.resolution)
			.ok_or_else(|| limit(format!("no chunk type for {}px", layer.resolution)))?;
		let len = u32::try_from(layer.encoded.len() + ICNS_HEADER_LEN)
			.map_err(|_| limit(format!("{}px payload too large", layer.resolution)))?;
		body.extend_from_slice(tag);
		body.extend_from_slice(&len.to_be_bytes());
		body.extend_from_slice(&layer.encoded);
	}

	let total = u32::try_from(body.len() + ICNS_HEADER_LEN)
		.map_err(|_| limit("file too large".to_string()))?;
	let mut out = Vec::with_capacity(body.len() + ICNS_HEADER_LEN);
	out.extend_from_slice(ICNS_MAGIC);
	out.extend_from_slice(&total.to_be_bytes());
	out.extend_from_slice(&body);
	Ok(out)
}

/// One image found in a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
	/// Size declared by the container's own metadata.
	pub declared: u32,
	/// ICNS chunk type; `None` for ICO.
	pub tag: Option<String>,
	pub payload_len: usize,
	/// Width and height read from the payload's PNG header.
	pub png_dimensions: Option<(u32, u32)>,
}

fn png_dimensions(payload: &[u8]) -> Option<(u32, u32)> {
	if payload.len() < 24 || payload[..8] != PNG_SIGNATURE || &payload[12..16] != b"IHDR" {
		return None;
	}
	let width = u32::from_be_bytes(payload[16..20].try_into().ok()?);
	let height = u32::from_be_bytes(payload[20..24].try_into().ok()?);
	Some((width, height))
}

fn read_u16_le(data: &[u8], at: usize) -> Option<u16> {
	data.get(at..at + 2)?.try_into().ok().map(u16::from_le_bytes)
}

fn read_u32_le(data: &[u8], at: usize) -> Option<u32> {
	data.get(at..at + 4)?.try_into().ok().map(u32::from_le_bytes)
}

fn read_u32_be(data: &[u8], at: usize) -> Option<u32> {
	data.get(at..at + 4)?.try_into().ok().map(u32::from_be_bytes)
}

/// Identify the container by its leading bytes and list its layers.
pub fn inspect(data: &[u8]) -> Result<(IconFormat, Vec<LayerInfo>), PackagingError> {
	if data.starts_with(ICNS_MAGIC) {
		Ok((IconFormat::Icns, inspect_icns(data)?))
	} else if read_u16_le(data, 0) == Some(0) && read_u16_le(data, 2) == Some(ICO_TYPE_ICON) {
		Ok((IconFormat::Ico, inspect_ico(data)?))
	} else {
		Err(PackagingError::malformed(
			"icon",
			"neither an ICO nor an ICNS file",
		))
	}
}

pub fn inspect_ico(data: &[u8]) -> Result<Vec<LayerInfo>, PackagingError> {
	let truncated = || PackagingError::malformed("ico", "truncated directory");
	if read_u16_le(data, 0) != Some(0) || read_u16_le(data, 2) != Some(ICO_TYPE_ICON) {
		return Err(PackagingError::malformed("ico", "bad header"));
	}
	let count = read_u16_le(data, 4).ok_or_else(truncated)? as usize;

	(0..count)
		.map(|i| {
			let entry = ICO_HEADER_LEN + i * ICO_ENTRY_LEN;
			let raw = *data.get(entry).ok_or_else(truncated)?;
			let declared = if raw == 0 { 256 } else { raw as u32 };
			let len = read_u32_le(data, entry + 8).ok_or_else(truncated)? as usize;
			let offset = read_u32_le(data, entry + 12).ok_or_else(truncated)? as usize;
			let payload = offset
				.checked_add(len)
				.and_then(|end| data.get(offset..end))
				.ok_or_else(|| {
					PackagingError::malformed("ico", format!("image {i} runs past end of file"))
				})?;
			Ok(LayerInfo {
				declared,
				tag: None,
				payload_len: len,
				png_dimensions: png_dimensions(payload),
			})
		})
		.collect()
}

pub fn inspect_icns(data: &[u8]) -> Result<Vec<LayerInfo>, PackagingError> {
	if !data.starts_with(ICNS_MAGIC) {
		return Err(PackagingError::malformed("icns", "bad magic"));
	}
	let total = read_u32_be(data, 4)
		.ok_or_else(|| PackagingError::malformed("icns", "truncated header"))? as usize;
	if total != data.len() {
		return Err(PackagingError::malformed(
			"icns",
			format!("declared length {total} but file is {} bytes", data.len()),
		));
	}

	let mut layers = Vec::new();
	let mut at = ICNS_HEADER_LEN;
	while at < total {
		let tag = data
			.get(at..at + 4)
			.ok_or_else(|| PackagingError::malformed("icns", "truncated chunk header"))?;
		let len = read_u32_be(data, at + 4)
			.ok_or_else(|| PackagingError::malformed("icns", "truncated chunk header"))?
			as usize;
		if len < ICNS_HEADER_LEN || at + len > total {
			return Err(PackagingError::malformed(
				"icns",
				format!("chunk at offset {at} has invalid length {len}"),
			));
		}
		// Table-of-contents and other metadata chunks carry no image.
		if let Some(declared) = icns_size_for(tag) {
			let payload = &data[at + ICNS_HEADER_LEN..at + len];
			layers.push(LayerInfo {
				declared,
				tag: Some(String::from_utf8_lossy(tag).into_owned()),
				payload_len: payload.len(),
				png_dimensions: png_dimensions(payload),
			});
		}
		at += len;
	}
	Ok(layers)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::resample::build_artifact;
	use iconharvest_common_core::AssetId;
	use image::{Rgba, RgbaImage};

	fn artifact(format: IconFormat) -> IconArtifact {
		let source = RgbaImage::from_pixel(300, 300, Rgba([0, 128, 255, 200]));
		build_artifact(&AssetId::new("round"), &source, format).unwrap()
	}

	fn assert_matches_required(format: IconFormat, layers: &[LayerInfo]) {
		let declared: Vec<u32> = layers.iter().map(|l| l.declared).collect();
		assert_eq!(declared, format.required_sizes());
		for layer in layers {
			assert_eq!(
				layer.png_dimensions,
				Some((layer.declared, layer.declared)),
				"{layer:?}"
			);
		}
	}

	#[test]
	fn ico_round_trip_reports_required_layers() {
		let bytes = encode(&artifact(IconFormat::Ico)).unwrap();
		let (format, layers) = inspect(&bytes).unwrap();
		assert_eq!(format, IconFormat::Ico);
		assert_matches_required(IconFormat::Ico, &layers);
	}

	#[test]
	fn ico_directory_layout() {
		let bytes = encode_ico(&artifact(IconFormat::Ico)).unwrap();
		assert_eq!(&bytes[..6], &[0, 0, 1, 0, 6, 0]);
		// Last entry is the 256px layer, stored as 0.
		let last = ICO_HEADER_LEN + 5 * ICO_ENTRY_LEN;
		assert_eq!(bytes[last], 0);
		assert_eq!(bytes[last + 1], 0);
		assert_eq!(read_u16_le(&bytes, last + 4), Some(1));
		assert_eq!(read_u16_le(&bytes, last + 6), Some(32));
		// First payload starts right after the directory.
		assert_eq!(
			read_u32_le(&bytes, ICO_HEADER_LEN + 12),
			Some((ICO_HEADER_LEN + 6 * ICO_ENTRY_LEN) as u32)
		);
	}

	#[test]
	fn icns_round_trip_reports_required_layers() {
		let bytes = encode(&artifact(IconFormat::Icns)).unwrap();
		assert_eq!(&bytes[..4], b"icns");
		assert_eq!(read_u32_be(&bytes, 4), Some(bytes.len() as u32));

		let (format, layers) = inspect(&bytes).unwrap();
		assert_eq!(format, IconFormat::Icns);
		assert_matches_required(IconFormat::Icns, &layers);
		let tags: Vec<&str> = layers.iter().filter_map(|l| l.tag.as_deref()).collect();
		assert_eq!(tags, ["icp4", "icp5", "icp6", "ic07", "ic08", "ic09", "ic10"]);
	}

	#[test]
	fn icns_skips_metadata_chunks() {
		let mut bytes = encode_icns(&artifact(IconFormat::Icns)).unwrap();
		let mut toc = b"TOC ".to_vec();
		toc.extend_from_slice(&8u32.to_be_bytes());
		bytes.splice(8..8, toc);
		let total = bytes.len() as u32;
		bytes[4..8].copy_from_slice(&total.to_be_bytes());

		assert_eq!(inspect_icns(&bytes).unwrap().len(), 7);
	}

	#[test]
	fn truncated_files_are_malformed_not_panics() {
		let ico = encode_ico(&artifact(IconFormat::Ico)).unwrap();
		for cut in [0, 3, 6, 20, 100, ico.len() - 1] {
			assert!(inspect(&ico[..cut]).is_err(), "cut at {cut}");
		}
		let icns = encode_icns(&artifact(IconFormat::Icns)).unwrap();
		for cut in [4, 8, 12, icns.len() - 1] {
			assert!(inspect(&icns[..cut]).is_err(), "cut at {cut}");
		}
	}

	#[test]
	fn unknown_bytes_are_rejected() {
		let err = inspect(b"GIF89a........").unwrap_err();
		assert!(matches!(err, PackagingError::Malformed { .. }));
	}
}
