// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;
use std::time::Duration;

use iconharvest_common_core::{CatalogUrls, CollectionRef};
use iconharvest_common_page::{
	BrowserState, FormField, Marker, PageDriver, PageError, PageState,
};
use iconharvest_common_secret::SecretString;
use iconharvest_session::{mask_account, Session, SessionStore};
use tracing::{debug, info, instrument, warn};

use crate::credentials::{CredentialSource, Credentials};
use crate::error::AuthenticationError;

/// Default wait for login form and signed-in markers.
pub const DEFAULT_MARKER_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
	NoSession,
	Authenticating,
	Authenticated,
	Expired,
}

/// Browser state handed to the crawler and fetcher.
#[derive(Debug, Clone)]
pub struct ActiveSession {
	/// `None` for an anonymous session on a public collection.
	pub account: Option<String>,
	pub browser: BrowserState,
}

impl ActiveSession {
	pub fn is_anonymous(&self) -> bool {
		self.account.is_none()
	}

	pub fn cookie_header_for(&self, host: &str) -> Option<SecretString> {
		self.browser.cookie_header_for(host)
	}

	pub fn user_agent(&self) -> Option<&str> {
		self.browser.user_agent.as_deref()
	}
}

/// Drives login through a [`PageDriver`] and caches the result in a
/// [`SessionStore`].
///
/// The session is never trusted without a live probe. A login is attempted
/// at most once per transition, and an expired session gets exactly one
/// re-authentication before the failure becomes final.
pub struct Authenticator {
	store: Arc<dyn SessionStore>,
	account: Option<String>,
	source: Option<Arc<dyn CredentialSource>>,
	credentials: Option<Credentials>,
	marker_timeout: Duration,
	state: AuthState,
	reauth_attempted: bool,
	login_attempts: u32,
}

impl std::fmt::Debug for Authenticator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Authenticator")
			.field("account", &self.account.as_deref().map(mask_account))
			.field("state", &self.state)
			.field("login_attempts", &self.login_attempts)
			.finish_non_exhaustive()
	}
}

impl Authenticator {
	/// `account` selects the stored session and the login identity. Without
	/// one the authenticator only accepts collections visible to guests.
	pub fn new(
		store: Arc<dyn SessionStore>,
		account: Option<String>,
		source: Option<Arc<dyn CredentialSource>>,
	) -> Self {
		Self {
			store,
			account: account.map(|a| a.trim().to_string()).filter(|a| !a.is_empty()),
			source,
			credentials: None,
			marker_timeout: DEFAULT_MARKER_TIMEOUT,
			state: AuthState::NoSession,
			reauth_attempted: false,
			login_attempts: 0,
		}
	}

	pub fn with_marker_timeout(mut self, timeout: Duration) -> Self {
		self.marker_timeout = timeout;
		self
	}

	pub fn state(&self) -> AuthState {
		self.state
	}

	pub fn account(&self) -> Option<&str> {
		self.account.as_deref()
	}

	/// True when a login form could be filled: an account plus credentials
	/// already obtained or a source to obtain them from.
	pub fn can_sign_in(&self) -> bool {
		self.account.is_some() && (self.credentials.is_some() || self.source.is_some())
	}

	/// Number of login forms submitted so far.
	pub fn login_attempts(&self) -> u32 {
		self.login_attempts
	}

	/// Produce a usable session for `collection`, reusing the stored one when
	/// the site still accepts it.
	#[instrument(skip_all, fields(collection = %collection))]
	pub async fn authenticate(
		&mut self,
		page: &mut dyn PageDriver,
		collection: &CollectionRef,
	) -> Result<ActiveSession, AuthenticationError> {
		let Some(account) = self.account.clone() else {
			return self.anonymous(page, collection).await;
		};

		if let Some(stored) = self.store.load(&account).await {
			debug!(captured_at = %stored.captured_at, "probing stored session");
			page.import_state(&stored.state).await?;
			if self.probe(page, collection).await? {
				info!(account = %mask_account(&account), "stored session accepted");
				return self.enter_authenticated(page, &account).await;
			}

			info!(account = %mask_account(&account), "stored session rejected by the site");
			self.state = AuthState::Expired;
			return self.reauthenticate(page).await;
		}

		self.login(page, &account).await
	}

	/// A downstream request was refused for lack of authentication.
	pub fn mark_expired(&mut self) {
		if self.state == AuthState::Authenticated {
			warn!("session marked expired");
			self.state = AuthState::Expired;
		}
	}

	/// The single re-authentication permitted for an expired session.
	///
	/// Reuses the credentials obtained for the first login. Any later call in
	/// the same run fails with [`AuthenticationError::SessionUnusable`], even
	/// after the re-login succeeded.
	#[instrument(skip_all)]
	pub async fn reauthenticate(
		&mut self,
		page: &mut dyn PageDriver,
	) -> Result<ActiveSession, AuthenticationError> {
		if self.reauth_attempted {
			self.state = AuthState::NoSession;
			return Err(AuthenticationError::SessionUnusable);
		}
		self.reauth_attempted = true;

		let Some(account) = self.account.clone() else {
			self.state = AuthState::NoSession;
			return Err(AuthenticationError::CredentialsRequired);
		};

		if let Err(e) = self.store.invalidate(&account).await {
			warn!(error = %e, "failed to discard expired session");
		}
		self.login(page, &account).await
	}

	async fn anonymous(
		&mut self,
		page: &mut dyn PageDriver,
		collection: &CollectionRef,
	) -> Result<ActiveSession, AuthenticationError> {
		self.state = AuthState::Authenticating;
		page.navigate(collection.url()).await?;
		let usable = match page.detect().await? {
			PageState::Challenge => {
				self.state = AuthState::NoSession;
				return Err(AuthenticationError::ChallengeDetected);
			}
			PageState::NoAccess => false,
			PageState::SignedIn | PageState::Guest | PageState::Unknown => {
				self.grid_visible(page).await?
			}
		};

		if !usable {
			self.state = AuthState::NoSession;
			return Err(AuthenticationError::CredentialsRequired);
		}

		info!("collection is public, continuing without an account");
		self.state = AuthState::Authenticated;
		Ok(ActiveSession {
			account: None,
			browser: page.export_state().await?,
		})
	}

	/// True when the imported state gives a usable view of `collection`.
	async fn probe(
		&mut self,
		page: &mut dyn PageDriver,
		collection: &CollectionRef,
	) -> Result<bool, AuthenticationError> {
		page.navigate(collection.url()).await?;
		match page.detect().await? {
			PageState::SignedIn => Ok(true),
			PageState::Challenge => Err(AuthenticationError::ChallengeDetected),
			PageState::Guest | PageState::NoAccess => Ok(false),
			PageState::Unknown => self.grid_visible(page).await,
		}
	}

	async fn grid_visible(&self, page: &mut dyn PageDriver) -> Result<bool, AuthenticationError> {
		match page.wait_for(Marker::AssetGrid, self.marker_timeout).await {
			Ok(()) => Ok(true),
			Err(e) if e.is_timeout() => Ok(false),
			Err(e) => Err(e.into()),
		}
	}

	async fn login(
		&mut self,
		page: &mut dyn PageDriver,
		account: &str,
	) -> Result<ActiveSession, AuthenticationError> {
		self.state = AuthState::Authenticating;
		let credentials = match self.credentials_for(account) {
			Ok(credentials) => credentials,
			Err(e) => {
				self.state = AuthState::NoSession;
				return Err(e);
			}
		};

		self.login_attempts += 1;
		info!(account = %mask_account(account), "signing in");
		if let Err(e) = self.submit_login(page, &credentials).await {
			warn!(error = %e, "sign-in failed");
			self.state = AuthState::NoSession;
			return Err(e);
		}
		self.enter_authenticated(page, account).await
	}

	fn credentials_for(&mut self, account: &str) -> Result<Credentials, AuthenticationError> {
		if let Some(credentials) = &self.credentials {
			return Ok(credentials.clone());
		}
		let source = self
			.source
			.as_ref()
			.ok_or(AuthenticationError::CredentialsRequired)?;
		let credentials = source.obtain(account)?;
		self.credentials = Some(credentials.clone());
		Ok(credentials)
	}

	async fn submit_login(
		&self,
		page: &mut dyn PageDriver,
		credentials: &Credentials,
	) -> Result<(), AuthenticationError> {
		page.navigate(&CatalogUrls::login()).await?;
		if let Err(e) = page.wait_for(Marker::LoginForm, self.marker_timeout).await {
			return Err(self.classify_failure(page, e).await);
		}

		page.fill(FormField::Email, credentials.email()).await?;
		page.fill(FormField::Password, credentials.password().expose())
			.await?;
		page.submit().await?;

		match page.wait_for(Marker::SignedIn, self.marker_timeout).await {
			Ok(()) => Ok(()),
			Err(e) => Err(self.classify_failure(page, e).await),
		}
	}

	/// Turn a marker timeout into the most specific error the page explains.
	async fn classify_failure(&self, page: &mut dyn PageDriver, err: PageError) -> AuthenticationError {
		if !err.is_timeout() {
			return err.into();
		}
		match page.detect().await {
			Ok(PageState::Challenge) => AuthenticationError::ChallengeDetected,
			Ok(PageState::Guest) => {
				if page.wait_for(Marker::LoginForm, Duration::ZERO).await.is_ok() {
					AuthenticationError::Rejected
				} else {
					err.into()
				}
			}
			_ => err.into(),
		}
	}

	async fn enter_authenticated(
		&mut self,
		page: &mut dyn PageDriver,
		account: &str,
	) -> Result<ActiveSession, AuthenticationError> {
		let browser = page.export_state().await?;
		let session = Session::new(account, browser.clone());
		if let Err(e) = self.store.save(account, &session).await {
			warn!(error = %e, "failed to persist session; the next run will sign in again");
		}
		self.state = AuthState::Authenticated;
		Ok(ActiveSession {
			account: Some(account.to_string()),
			browser,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::credentials::StaticCredentials;
	use iconharvest_common_core::AllowList;
	use iconharvest_common_page::testing::{icon_tile, ScriptedPage, SESSION_COOKIE};
	use iconharvest_common_page::BrowserCookie;
	use iconharvest_session::MemorySessionStore;

	const EMAIL: &str = "jo@example.com";
	const PASSWORD: &str = "correct horse";

	fn collection() -> CollectionRef {
		CollectionRef::parse(
			"https://icons8.com/icons/collections/abc",
			&AllowList::icons8(),
		)
		.unwrap()
	}

	fn source(password: &str) -> Arc<dyn CredentialSource> {
		Arc::new(StaticCredentials(
			Credentials::new(EMAIL, SecretString::new(password.to_string())).unwrap(),
		))
	}

	fn site() -> ScriptedPage {
		ScriptedPage::new()
			.accept_credentials(EMAIL, PASSWORD)
			.with_collection(vec![icon_tile("1", "Cat")], 1)
	}

	fn authenticator(store: &Arc<MemorySessionStore>, password: Option<&str>) -> Authenticator {
		Authenticator::new(
			store.clone(),
			Some(EMAIL.to_string()),
			password.map(source),
		)
		.with_marker_timeout(Duration::from_millis(10))
	}

	async fn seed(store: &MemorySessionStore, cookie: BrowserCookie) {
		let state = BrowserState {
			cookies: vec![cookie],
			..Default::default()
		};
		store.save(EMAIL, &Session::new(EMAIL, state)).await.unwrap();
	}

	#[tokio::test]
	async fn fresh_login_persists_session() {
		let store = Arc::new(MemorySessionStore::new());
		let page = site();
		let mut auth = authenticator(&store, Some(PASSWORD));

		let session = auth
			.authenticate(&mut page.clone(), &collection())
			.await
			.unwrap();

		assert_eq!(auth.state(), AuthState::Authenticated);
		assert_eq!(page.login_submits(), 1);
		assert_eq!(store.save_count(), 1);
		assert_eq!(session.account.as_deref(), Some(EMAIL));
		let stored = store.load(EMAIL).await.unwrap();
		assert_eq!(stored.state.cookies[0].name, SESSION_COOKIE);
	}

	#[tokio::test]
	async fn valid_stored_session_skips_login() {
		let store = Arc::new(MemorySessionStore::new());
		let page = site();
		seed(&store, page.valid_cookie()).await;
		let mut auth = authenticator(&store, None);

		auth.authenticate(&mut page.clone(), &collection())
			.await
			.unwrap();

		assert_eq!(page.login_submits(), 0);
		assert_eq!(page.imports(), 1);
		assert_eq!(auth.login_attempts(), 0);
		assert_eq!(store.save_count(), 2, "re-persisted on entering Authenticated");
	}

	#[tokio::test]
	async fn stale_stored_session_reauthenticates_once() {
		let store = Arc::new(MemorySessionStore::new());
		let page = site();
		seed(&store, page.valid_cookie()).await;
		page.rotate_token();
		let mut auth = authenticator(&store, Some(PASSWORD));

		auth.authenticate(&mut page.clone(), &collection())
			.await
			.unwrap();

		assert_eq!(page.login_submits(), 1);
		assert_eq!(auth.state(), AuthState::Authenticated);
		let stored = store.load(EMAIL).await.unwrap();
		assert_eq!(stored.state.cookies[0].value.expose(), &page.valid_token());
	}

	#[tokio::test]
	async fn wrong_password_is_rejected_without_retry() {
		let store = Arc::new(MemorySessionStore::new());
		let page = site();
		let mut auth = authenticator(&store, Some("wrong"));

		let err = auth
			.authenticate(&mut page.clone(), &collection())
			.await
			.unwrap_err();

		assert!(matches!(err, AuthenticationError::Rejected), "{err:?}");
		assert_eq!(auth.state(), AuthState::NoSession);
		assert_eq!(page.login_submits(), 1);
		assert_eq!(store.save_count(), 0);
	}

	#[tokio::test]
	async fn challenge_is_reported() {
		let store = Arc::new(MemorySessionStore::new());
		let page = site().challenge_on_login();
		let mut auth = authenticator(&store, Some(PASSWORD));

		let err = auth
			.authenticate(&mut page.clone(), &collection())
			.await
			.unwrap_err();

		assert!(matches!(err, AuthenticationError::ChallengeDetected), "{err:?}");
	}

	#[tokio::test]
	async fn account_without_credentials_requires_them() {
		let store = Arc::new(MemorySessionStore::new());
		let page = site();
		let mut auth = authenticator(&store, None);

		let err = auth
			.authenticate(&mut page.clone(), &collection())
			.await
			.unwrap_err();

		assert!(matches!(err, AuthenticationError::CredentialsRequired));
		assert_eq!(page.login_submits(), 0);
	}

	#[tokio::test]
	async fn anonymous_public_collection_is_usable() {
		let store = Arc::new(MemorySessionStore::new());
		let page = site().public();
		let mut auth = Authenticator::new(store.clone(), None, None)
			.with_marker_timeout(Duration::from_millis(10));

		let session = auth
			.authenticate(&mut page.clone(), &collection())
			.await
			.unwrap();

		assert!(session.is_anonymous());
		assert_eq!(store.save_count(), 0);
	}

	#[tokio::test]
	async fn anonymous_private_collection_requires_credentials() {
		let store = Arc::new(MemorySessionStore::new());
		let page = site();
		let mut auth = Authenticator::new(store, None, None)
			.with_marker_timeout(Duration::from_millis(10));

		let err = auth
			.authenticate(&mut page.clone(), &collection())
			.await
			.unwrap_err();

		assert!(matches!(err, AuthenticationError::CredentialsRequired));
	}

	#[tokio::test]
	async fn expired_session_gets_exactly_one_reauthentication() {
		let store = Arc::new(MemorySessionStore::new());
		let page = site();
		let mut auth = authenticator(&store, Some(PASSWORD));
		let mut driver = page.clone();

		auth.authenticate(&mut driver, &collection()).await.unwrap();
		page.rotate_token();
		auth.mark_expired();
		assert_eq!(auth.state(), AuthState::Expired);

		let refreshed = auth.reauthenticate(&mut driver).await.unwrap();
		assert_eq!(page.login_submits(), 2);
		assert_eq!(
			refreshed.browser.cookies[0].value.expose(),
			&page.valid_token()
		);
	}

	#[tokio::test]
	async fn failed_reauthentication_is_final() {
		let store = Arc::new(MemorySessionStore::new());
		let page = site();
		seed(&store, BrowserCookie::new(SESSION_COOKIE, "stale")).await;
		let mut auth = authenticator(&store, Some("wrong"));
		let mut driver = page.clone();

		let err = auth.authenticate(&mut driver, &collection()).await.unwrap_err();
		assert!(matches!(err, AuthenticationError::Rejected));

		let err = auth.reauthenticate(&mut driver).await.unwrap_err();
		assert!(matches!(err, AuthenticationError::SessionUnusable));
		assert_eq!(page.login_submits(), 1);
		assert!(store.load(EMAIL).await.is_none());
	}

	#[tokio::test]
	async fn relogin_after_stale_session_uses_up_the_reauthentication() {
		let store = Arc::new(MemorySessionStore::new());
		let page = site();
		seed(&store, page.valid_cookie()).await;
		page.rotate_token();
		let mut auth = authenticator(&store, Some(PASSWORD));
		let mut driver = page.clone();

		auth.authenticate(&mut driver, &collection()).await.unwrap();
		assert_eq!(page.login_submits(), 1);

		page.rotate_token();
		auth.mark_expired();
		let err = auth.reauthenticate(&mut driver).await.unwrap_err();
		assert!(matches!(err, AuthenticationError::SessionUnusable));
		assert_eq!(page.login_submits(), 1);
	}

	#[test]
	fn sign_in_needs_account_and_credentials() {
		let store = Arc::new(MemorySessionStore::new());
		assert!(authenticator(&store, Some(PASSWORD)).can_sign_in());
		assert!(!authenticator(&store, None).can_sign_in());
		assert!(!Authenticator::new(store, None, None).can_sign_in());
	}
}
