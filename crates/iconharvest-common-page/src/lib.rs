// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The page capability behind login and collection discovery.
//!
//! The catalog's DOM is an implicit contract that changes without notice, so
//! nothing outside a [`PageDriver`] implementation knows about selectors or
//! scripts. The authenticator and crawler only see markers, page states and
//! the raw attributes of visible images.

mod driver;
mod error;
mod state;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use driver::{FormField, Marker, PageDriver, PageState, VisibleAsset};
pub use error::PageError;
pub use state::{BrowserCookie, BrowserState};
