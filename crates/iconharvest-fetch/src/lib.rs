// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Downloading icon source rasters.
//!
//! Every locator is checked against the allow-list before a request is made.
//! Transient failures are retried with exponential backoff, and the body must
//! be a plausible PNG before it is handed on for packaging.

pub mod error;
pub mod fetcher;
pub mod transport;

pub use error::{DownloadError, DownloadErrorKind};
pub use fetcher::{FetchSettings, Fetcher, PNG_SIGNATURE};
pub use transport::{
	ReqwestTransport, Transport, TransportError, TransportResponse, TransportSettings,
	MAX_REDIRECTS,
};
