// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Collection discovery behind an infinite-scroll view.
//!
//! The crawler repeatedly triggers the page's incremental loading, extracts
//! every visible icon and merges by id until two consecutive passes find
//! nothing new.

mod crawler;
mod error;
mod extract;

pub use crawler::{CrawlSettings, Crawler, EMPTY_PASSES_TO_STOP};
pub use error::CollectionAccessError;
pub use extract::{asset_id_from_urls, display_name, extract_records, records_from_source};
