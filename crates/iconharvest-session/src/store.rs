// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session storage backends.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use iconharvest_common_core::sanitize_filename;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::SessionStoreError;
use crate::value::{PersistedSession, Session, SESSION_FORMAT_VERSION};

/// Trait for session storage backends, keyed by account (the login e-mail).
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug {
	/// Load the session for an account. Missing or unreadable ⇒ `None`.
	async fn load(&self, account: &str) -> Option<Session>;

	/// Save (replace) the session for an account.
	async fn save(&self, account: &str, session: &Session) -> Result<(), SessionStoreError>;

	/// Forget the session for an account. Forgetting nothing is not an error.
	async fn invalidate(&self, account: &str) -> Result<(), SessionStoreError>;

	async fn exists(&self, account: &str) -> bool {
		self.load(account).await.is_some()
	}
}

/// File name used for an account's session.
///
/// Accounts map to a sanitised stem so an e-mail can never name a path
/// outside the session directory. Sanitising folds distinct accounts
/// together (`jo.doe` and `jo_doe`), so the stem carries a digest of the
/// normalised account.
pub fn account_file_name(account: &str) -> Result<String, SessionStoreError> {
	let normalized = account.trim().to_lowercase();
	if normalized.is_empty() {
		return Err(SessionStoreError::InvalidAccount("empty".to_string()));
	}
	let spaced = normalized.replace('@', " at ").replace('.', " ");
	let digest = hex::encode(Sha256::digest(normalized.as_bytes()));
	Ok(format!("{}-{}.json", sanitize_filename(&spaced), &digest[..8]))
}

/// Directory of JSON session files, one per account.
///
/// Files are written atomically with restricted permissions (0600 on Unix).
#[derive(Debug, Clone)]
pub struct FileSessionStore {
	dir: PathBuf,
}

impl FileSessionStore {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	pub fn path_for(&self, account: &str) -> Result<PathBuf, SessionStoreError> {
		Ok(self.dir.join(account_file_name(account)?))
	}

	async fn read_session(&self, path: &Path, account: &str) -> Option<Session> {
		let contents = match fs::read_to_string(path).await {
			Ok(contents) => contents,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
			Err(e) => {
				warn!(path = ?path, error = %e, "Session file unreadable, ignoring");
				return None;
			}
		};

		let persisted: PersistedSession = match serde_json::from_str(&contents) {
			Ok(persisted) => persisted,
			Err(e) => {
				warn!(path = ?path, error = %e, "Session file corrupt, ignoring");
				return None;
			}
		};

		if persisted.version != SESSION_FORMAT_VERSION {
			warn!(
				path = ?path,
				version = persisted.version,
				"Session file has unknown format version, ignoring"
			);
			return None;
		}
		if !persisted.account.eq_ignore_ascii_case(account.trim()) {
			warn!(path = ?path, "Session file belongs to another account, ignoring");
			return None;
		}

		Some(Session::from(persisted))
	}

	async fn write_session(&self, path: &Path, session: &Session) -> Result<(), SessionStoreError> {
		fs::create_dir_all(&self.dir).await?;
		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			let perms = std::fs::Permissions::from_mode(0o700);
			if let Err(e) = std::fs::set_permissions(&self.dir, perms) {
				warn!(path = ?self.dir, error = %e, "Failed to set directory permissions to 0700");
			}
		}

		let contents = serde_json::to_string_pretty(&PersistedSession::from(session))?;

		let temp_path = path.with_extension("json.tmp");
		let mut file = fs::File::create(&temp_path).await?;

		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			let perms = std::fs::Permissions::from_mode(0o600);
			if let Err(e) = std::fs::set_permissions(&temp_path, perms) {
				warn!(path = ?temp_path, error = %e, "Failed to set file permissions to 0600");
			}
		}

		file.write_all(contents.as_bytes()).await?;
		file.sync_all().await?;
		drop(file);

		fs::rename(&temp_path, path).await?;

		debug!(path = ?path, "Session written");
		Ok(())
	}
}

#[async_trait]
impl SessionStore for FileSessionStore {
	async fn load(&self, account: &str) -> Option<Session> {
		let path = self.path_for(account).ok()?;
		self.read_session(&path, account).await
	}

	async fn save(&self, account: &str, session: &Session) -> Result<(), SessionStoreError> {
		let path = self.path_for(account)?;
		self.write_session(&path, session).await
	}

	async fn invalidate(&self, account: &str) -> Result<(), SessionStoreError> {
		let path = self.path_for(account)?;
		match fs::remove_file(&path).await {
			Ok(()) => {
				debug!(path = ?path, "Session removed");
				Ok(())
			}
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e.into()),
		}
	}
}

/// In-memory session store for testing.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
	sessions: tokio::sync::RwLock<HashMap<String, Session>>,
	saves: AtomicU32,
}

impl MemorySessionStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of successful `save` calls so far.
	pub fn save_count(&self) -> u32 {
		self.saves.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl SessionStore for MemorySessionStore {
	async fn load(&self, account: &str) -> Option<Session> {
		let sessions = self.sessions.read().await;
		sessions.get(&account.trim().to_lowercase()).cloned()
	}

	async fn save(&self, account: &str, session: &Session) -> Result<(), SessionStoreError> {
		let mut sessions = self.sessions.write().await;
		sessions.insert(account.trim().to_lowercase(), session.clone());
		self.saves.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}

	async fn invalidate(&self, account: &str) -> Result<(), SessionStoreError> {
		let mut sessions = self.sessions.write().await;
		sessions.remove(&account.trim().to_lowercase());
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use iconharvest_common_page::{BrowserCookie, BrowserState};

	fn session(account: &str, cookie: &str) -> Session {
		Session::new(
			account,
			BrowserState {
				cookies: vec![BrowserCookie::new("i8_session", cookie).with_domain(".icons8.com")],
				local_storage: Default::default(),
				user_agent: Some("UA/1".to_string()),
			},
		)
	}

	#[tokio::test]
	async fn test_memory_store_roundtrip() {
		let store = MemorySessionStore::new();
		store
			.save("jo@example.com", &session("jo@example.com", "c1"))
			.await
			.unwrap();

		let loaded = store.load("JO@example.com").await.unwrap();
		assert_eq!(loaded.state.cookies[0].value.expose(), "c1");
		assert_eq!(store.save_count(), 1);

		store.invalidate("jo@example.com").await.unwrap();
		assert!(!store.exists("jo@example.com").await);
	}

	#[tokio::test]
	async fn test_file_store_roundtrip() {
		let temp_dir = tempfile::tempdir().unwrap();
		let store = FileSessionStore::new(temp_dir.path().join("sessions"));
		let original = session("jo@example.com", "c1");

		store.save("jo@example.com", &original).await.unwrap();
		let loaded = store.load("jo@example.com").await.unwrap();
		assert_eq!(loaded, original);
		assert!(store.load("someone@example.com").await.is_none());
	}

	#[tokio::test]
	async fn test_file_store_replaces_session() {
		let temp_dir = tempfile::tempdir().unwrap();
		let store = FileSessionStore::new(temp_dir.path());

		store
			.save("jo@example.com", &session("jo@example.com", "old"))
			.await
			.unwrap();
		store
			.save("jo@example.com", &session("jo@example.com", "new"))
			.await
			.unwrap();

		let loaded = store.load("jo@example.com").await.unwrap();
		assert_eq!(loaded.state.cookies[0].value.expose(), "new");
		let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path())
			.unwrap()
			.filter_map(|e| e.ok())
			.filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
			.collect();
		assert!(leftovers.is_empty());
	}

	#[tokio::test]
	async fn test_corrupt_file_is_absent() {
		let temp_dir = tempfile::tempdir().unwrap();
		let store = FileSessionStore::new(temp_dir.path());
		let path = store.path_for("jo@example.com").unwrap();
		std::fs::write(&path, "{ not json").unwrap();

		assert!(store.load("jo@example.com").await.is_none());
	}

	#[tokio::test]
	async fn test_unknown_version_is_absent() {
		let temp_dir = tempfile::tempdir().unwrap();
		let store = FileSessionStore::new(temp_dir.path());
		let path = store.path_for("jo@example.com").unwrap();
		std::fs::write(
			&path,
			r#"{"version":99,"account":"jo@example.com","captured_at":"2025-01-01T00:00:00Z"}"#,
		)
		.unwrap();

		assert!(store.load("jo@example.com").await.is_none());
	}

	#[tokio::test]
	async fn test_invalidate_missing_is_ok() {
		let temp_dir = tempfile::tempdir().unwrap();
		let store = FileSessionStore::new(temp_dir.path());
		store.invalidate("nobody@example.com").await.unwrap();
	}

	#[tokio::test]
	async fn test_file_never_contains_password_field() {
		let temp_dir = tempfile::tempdir().unwrap();
		let store = FileSessionStore::new(temp_dir.path());
		store
			.save("jo@example.com", &session("jo@example.com", "c1"))
			.await
			.unwrap();

		let raw = std::fs::read_to_string(store.path_for("jo@example.com").unwrap()).unwrap();
		assert!(!raw.to_lowercase().contains("password"));
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn test_file_permissions() {
		use std::os::unix::fs::PermissionsExt;

		let temp_dir = tempfile::tempdir().unwrap();
		let store = FileSessionStore::new(temp_dir.path().join("sessions"));
		store
			.save("jo@example.com", &session("jo@example.com", "c1"))
			.await
			.unwrap();

		let mode = std::fs::metadata(store.path_for("jo@example.com").unwrap())
			.unwrap()
			.permissions()
			.mode();
		assert_eq!(mode & 0o777, 0o600);
	}

	#[test]
	fn test_account_file_names_stay_in_directory() {
		let name = account_file_name("Jo.Doe@Example.com").unwrap();
		assert!(name.starts_with("jo_doe_at_example_com-"), "{name}");
		assert!(name.ends_with(".json"));
		let traversal = account_file_name("../../etc/passwd").unwrap();
		assert!(!traversal.contains('/'));
		assert!(!traversal.starts_with(".."));
		assert!(account_file_name("   ").is_err());
	}

	#[test]
	fn test_account_file_names_separate_look_alike_accounts() {
		let dotted = account_file_name("jo.doe@example.com").unwrap();
		let underscored = account_file_name("jo_doe@example.com").unwrap();
		assert_ne!(dotted, underscored);
		assert_eq!(dotted, account_file_name(" JO.DOE@example.com ").unwrap());
	}

	#[tokio::test]
	async fn test_look_alike_accounts_keep_their_own_sessions() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileSessionStore::new(dir.path());
		store
			.save("jo.doe@example.com", &session("jo.doe@example.com", "dotted"))
			.await
			.unwrap();
		store
			.save("jo_doe@example.com", &session("jo_doe@example.com", "underscored"))
			.await
			.unwrap();

		store.invalidate("jo_doe@example.com").await.unwrap();

		assert!(store.load("jo.doe@example.com").await.is_some());
		assert!(store.load("jo_doe@example.com").await.is_none());
	}
}
