// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Persistence of authenticated browser sessions, one per account.
//!
//! # Features
//!
//! - **SessionStore trait**: `load` / `save` / `invalidate` keyed by account
//! - **FileSessionStore**: one JSON file per account with secure permissions
//! - **MemorySessionStore**: in-memory storage for testing
//!
//! Only browser state is stored. The account password never reaches this
//! crate.

mod error;
mod store;
mod value;

pub use error::SessionStoreError;
pub use store::{account_file_name, FileSessionStore, MemorySessionStore, SessionStore};
pub use value::{PersistedCookie, PersistedSession, Session, SESSION_FORMAT_VERSION};

/// Mask an account e-mail for user-facing output: `jo***@example.com`.
pub fn mask_account(account: &str) -> String {
	match account.split_once('@') {
		Some((local, domain)) => {
			let visible: String = local.chars().take(2).collect();
			format!("{visible}***@{domain}")
		}
		None => {
			let visible: String = account.chars().take(2).collect();
			format!("{visible}***")
		}
	}
}
