// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Catalog login as an explicit state machine:
//! `NoSession → Authenticating → Authenticated → Expired`.
//!
//! A stored session is replayed into the browser and probed against the
//! target collection. Only when the site refuses it does the authenticator
//! sign in, and an expired session is refreshed at most once.

mod authenticator;
mod credentials;
mod error;

pub use authenticator::{ActiveSession, AuthState, Authenticator, DEFAULT_MARKER_TIMEOUT};
pub use credentials::{CredentialSource, Credentials, StaticCredentials};
pub use error::AuthenticationError;
