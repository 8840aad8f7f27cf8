// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared access to the authenticated session during the download phase.

use iconharvest_auth::{ActiveSession, AuthenticationError, Authenticator};
use iconharvest_common_page::PageDriver;
use iconharvest_common_secret::SecretString;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Credentials a worker should send, stamped with the session generation
/// they came from.
#[derive(Debug, Clone)]
pub struct SessionTicket {
	pub generation: u64,
	pub cookie: Option<SecretString>,
}

struct GuardState {
	authenticator: Authenticator,
	page: Box<dyn PageDriver>,
	session: ActiveSession,
	generation: u64,
	refreshed: bool,
}

impl GuardState {
	fn ticket(&self, cookie_host: &str) -> SessionTicket {
		SessionTicket {
			generation: self.generation,
			cookie: self.session.cookie_header_for(cookie_host),
		}
	}
}

/// Owns the authenticator and browser once crawling is done.
///
/// Workers read tickets concurrently. The first worker to report an
/// expired session performs the run's only re-authentication while the
/// others wait on the lock; workers holding an older ticket then pick up
/// the refreshed one instead of logging in again.
pub struct SessionGuard {
	state: Mutex<GuardState>,
	cookie_host: String,
}

impl std::fmt::Debug for SessionGuard {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionGuard")
			.field("cookie_host", &self.cookie_host)
			.finish_non_exhaustive()
	}
}

impl SessionGuard {
	pub fn new(
		authenticator: Authenticator,
		page: Box<dyn PageDriver>,
		session: ActiveSession,
		cookie_host: impl Into<String>,
	) -> Self {
		Self {
			state: Mutex::new(GuardState {
				authenticator,
				page,
				session,
				generation: 0,
				refreshed: false,
			}),
			cookie_host: cookie_host.into(),
		}
	}

	pub async fn ticket(&self) -> SessionTicket {
		self.state.lock().await.ticket(&self.cookie_host)
	}

	/// Replace the session a request holding `seen` was refused with.
	///
	/// Without anything to sign in with this fails with
	/// [`AuthenticationError::CredentialsRequired`] and leaves the one
	/// permitted re-authentication unused.
	pub async fn refresh(&self, seen: u64) -> Result<SessionTicket, AuthenticationError> {
		let mut guard = self.state.lock().await;
		let state = &mut *guard;

		if state.generation != seen {
			return Ok(state.ticket(&self.cookie_host));
		}
		if !state.authenticator.can_sign_in() {
			return Err(AuthenticationError::CredentialsRequired);
		}
		if state.refreshed {
			return Err(AuthenticationError::SessionUnusable);
		}
		state.refreshed = true;

		state.authenticator.mark_expired();
		let session = state
			.authenticator
			.reauthenticate(state.page.as_mut())
			.await?;
		state.session = session;
		state.generation += 1;
		info!(generation = state.generation, "session refreshed");
		Ok(state.ticket(&self.cookie_host))
	}

	/// Number of successful refreshes so far.
	pub async fn generation(&self) -> u64 {
		self.state.lock().await.generation
	}

	/// Shut the browser down and hand back the authenticator.
	pub async fn close(self) -> Authenticator {
		let mut state = self.state.into_inner();
		if let Err(e) = state.page.close().await {
			warn!(error = %e, "failed to close browser");
		}
		state.authenticator
	}
}
