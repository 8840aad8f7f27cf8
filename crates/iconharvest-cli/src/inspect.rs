// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};
use iconharvest_common_core::IconFormat;
use iconharvest_packager::{inspect, LayerInfo};

pub fn inspect_file(path: &Path) -> Result<String> {
	let data = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
	let (format, layers) =
		inspect(&data).with_context(|| format!("{} is not a readable icon", path.display()))?;
	Ok(render_table(path, format, &layers))
}

fn render_table(path: &Path, format: IconFormat, layers: &[LayerInfo]) -> String {
	let mut out = String::new();
	let _ = writeln!(
		out,
		"{}: {} with {} layer(s)",
		path.display(),
		format.extension().to_uppercase(),
		layers.len()
	);
	let _ = writeln!(out, "{:>6}  {:<5} {:>9}  png", "size", "tag", "bytes");
	for layer in layers {
		let png = match layer.png_dimensions {
			Some((w, h)) => format!("{w}x{h}"),
			None => "-".to_string(),
		};
		let _ = writeln!(
			out,
			"{:>6}  {:<5} {:>9}  {}",
			layer.declared,
			layer.tag.as_deref().unwrap_or("-"),
			layer.payload_len,
			png
		);
	}
	out
}
