// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Deriving every layer of a container from one source raster.

use std::io::Cursor;

use iconharvest_common_core::{AssetId, IconArtifact, IconFormat, Layer, RasterSource};
use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbaImage};
use tracing::{debug, warn};

use crate::error::PackagingError;

pub fn decode(source: &RasterSource) -> Result<RgbaImage, PackagingError> {
	let image = image::load_from_memory(&source.bytes)
		.map_err(|e| PackagingError::Decode(e.to_string()))?;
	Ok(image.into_rgba8())
}

/// Fit `image` into a transparent `size`x`size` square.
///
/// The aspect ratio is kept and the scaled image is centred; padding stays
/// fully transparent.
pub fn render(image: &RgbaImage, size: u32) -> RgbaImage {
	let (width, height) = image.dimensions();
	let longest = width.max(height).max(1) as f64;
	let scale = size as f64 / longest;
	let scaled_w = ((width as f64 * scale).round() as u32).clamp(1, size);
	let scaled_h = ((height as f64 * scale).round() as u32).clamp(1, size);

	let resized = imageops::resize(image, scaled_w, scaled_h, FilterType::Lanczos3);
	if scaled_w == size && scaled_h == size {
		return resized;
	}

	let mut canvas = RgbaImage::new(size, size);
	let x = ((size - scaled_w) / 2) as i64;
	let y = ((size - scaled_h) / 2) as i64;
	imageops::replace(&mut canvas, &resized, x, y);
	canvas
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, PackagingError> {
	let mut out = Cursor::new(Vec::new());
	image
		.write_to(&mut out, ImageFormat::Png)
		.map_err(|e| PackagingError::Encode {
			size: image.width(),
			message: e.to_string(),
		})?;
	Ok(out.into_inner())
}

/// Build the full layer set of `format` from a decoded source.
pub fn build_artifact(
	asset_id: &AssetId,
	source: &RgbaImage,
	format: IconFormat,
) -> Result<IconArtifact, PackagingError> {
	let source_size = source.width().max(source.height());
	if source_size < format.largest_size() {
		warn!(
			asset_id = %asset_id,
			%format,
			source_size,
			largest_layer = format.largest_size(),
			"upscaling small source, larger layers will look soft"
		);
	}

	let layers = format
		.required_sizes()
		.iter()
		.map(|&size| {
			let encoded = encode_png(&render(source, size))?;
			Ok(Layer {
				resolution: size,
				encoded,
			})
		})
		.collect::<Result<Vec<_>, PackagingError>>()?;

	debug!(asset_id = %asset_id, %format, layers = layers.len(), "layers rendered");
	Ok(IconArtifact::new(asset_id.clone(), format, layers)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use image::Rgba;

	#[test]
	fn square_sources_fill_the_layer() {
		let source = RgbaImage::from_pixel(64, 64, Rgba([10, 20, 30, 255]));
		let layer = render(&source, 16);
		assert_eq!(layer.dimensions(), (16, 16));
		assert_eq!(layer.get_pixel(0, 0)[3], 255);
	}

	#[test]
	fn wide_sources_are_letterboxed_transparently() {
		let source = RgbaImage::from_pixel(200, 100, Rgba([255, 0, 0, 255]));
		let layer = render(&source, 32);

		assert_eq!(layer.dimensions(), (32, 32));
		assert_eq!(*layer.get_pixel(16, 0), Rgba([0, 0, 0, 0]));
		assert_eq!(*layer.get_pixel(16, 31), Rgba([0, 0, 0, 0]));
		assert_eq!(layer.get_pixel(16, 16)[3], 255);
	}

	#[test]
	fn transparency_survives_resampling() {
		let source = RgbaImage::from_pixel(256, 256, Rgba([0, 0, 0, 0]));
		let layer = render(&source, 48);
		assert!(layer.pixels().all(|p| p[3] == 0));
	}

	#[test]
	fn small_sources_are_upscaled_not_skipped() {
		let source = RgbaImage::from_pixel(16, 16, Rgba([1, 2, 3, 255]));
		let artifact = build_artifact(&AssetId::new("a"), &source, IconFormat::Icns).unwrap();
		let sizes: Vec<u32> = artifact.layers().iter().map(|l| l.resolution).collect();
		assert_eq!(sizes, IconFormat::Icns.required_sizes());
	}

	#[test]
	fn encoded_layers_decode_at_their_resolution() {
		let source = RgbaImage::from_pixel(256, 256, Rgba([9, 9, 9, 128]));
		let artifact = build_artifact(&AssetId::new("a"), &source, IconFormat::Ico).unwrap();
		for layer in artifact.layers() {
			let decoded = image::load_from_memory(&layer.encoded).unwrap();
			assert_eq!(decoded.width(), layer.resolution);
			assert_eq!(decoded.height(), layer.resolution);
		}
	}
}
