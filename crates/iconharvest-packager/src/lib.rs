// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Icon packaging: resample a source raster to every layer a container
//! needs, serialise ICO and ICNS files, and publish them atomically.

pub mod container;
pub mod error;
pub mod packager;
pub mod publish;
pub mod resample;

pub use container::{inspect, inspect_icns, inspect_ico, LayerInfo};
pub use error::PackagingError;
pub use packager::{PackageOutput, Packager, PNG_SUBDIR};
pub use publish::{is_temp_name, publish, sweep_stale_temps, TEMP_PREFIX, TEMP_SUFFIX};
