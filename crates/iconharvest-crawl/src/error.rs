// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use iconharvest_common_page::PageError;

/// The collection could not be enumerated. Always fatal for a run.
#[derive(Debug, thiserror::Error)]
pub enum CollectionAccessError {
	#[error("the catalog says this account may not view {collection}")]
	AccessDenied { collection: String },

	#[error(
		"no icons found in {collection}: the collection is empty, or this account cannot see it"
	)]
	EmptyOrInaccessible { collection: String },

	#[error("collection kept growing for {passes} passes ({found} icons so far); the page layout may have changed")]
	DidNotConverge { passes: u32, found: usize },

	#[error("a CAPTCHA or bot check is blocking the collection page")]
	ChallengeDetected,

	#[error("browser error while crawling: {0}")]
	Page(#[from] PageError),
}
