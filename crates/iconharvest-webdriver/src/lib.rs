// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Drives a real browser for iconharvest through a W3C WebDriver server
//! such as chromedriver or geckodriver.

mod error;
mod page;
mod protocol;
mod scripts;

pub use error::WebDriverError;
pub use page::{WebDriverPage, WebDriverSettings, DEFAULT_ENDPOINT};
pub use protocol::{capabilities, WebDriverClient, WireCookie};
