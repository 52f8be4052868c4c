//! Session token persistence
//!
//! The signed-in session survives restarts through a [`CredentialStore`].
//! Two backends exist: the operating system's native keyring (Keychain on
//! macOS, Secret Service on Linux, Windows Credential Manager on Windows)
//! and a plain JSON file for headless machines and tests.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::api::UserProfile;
use crate::config::{AuthConfig, CredentialBackend};
use crate::error::{QuerychatError, Result};

const KEYRING_SERVICE: &str = "querychat";
const KEYRING_ACCOUNT: &str = "session";

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// A persisted sign-in.
///
/// # Examples
///
/// ```
/// use querychat::auth::Credentials;
///
/// let creds = Credentials::bearer("tok");
/// assert_eq!(creds.authorization_header(), "Bearer tok");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credentials {
    /// Token attached to every chat request
    pub access_token: String,

    /// Token scheme, normally `"Bearer"`
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Account the token belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,

    /// When the token was stored locally
    pub saved_at: DateTime<Utc>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Credentials {
    /// Bearer credentials with no account details
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            user: None,
            saved_at: Utc::now(),
        }
    }

    /// Value of the `Authorization` header for this token.
    ///
    /// Servers commonly report the scheme in lower case (`bearer`); the
    /// header always uses the canonical `Bearer` spelling for that scheme.
    pub fn authorization_header(&self) -> String {
        let scheme = if self.token_type.eq_ignore_ascii_case("bearer") || self.token_type.is_empty()
        {
            "Bearer"
        } else {
            self.token_type.as_str()
        };
        format!("{} {}", scheme, self.access_token)
    }
}

// ---------------------------------------------------------------------------
// CredentialStore
// ---------------------------------------------------------------------------

/// Backend that persists at most one [`Credentials`] record.
pub trait CredentialStore: Send + Sync {
    /// Returns the stored record, `Ok(None)` when nothing is stored
    fn load(&self) -> Result<Option<Credentials>>;

    /// Replaces the stored record
    fn save(&self, credentials: &Credentials) -> Result<()>;

    /// Removes the stored record; succeeds when nothing is stored
    fn clear(&self) -> Result<()>;
}

/// Open the backend selected in configuration.
///
/// # Errors
///
/// Returns [`QuerychatError::Storage`] when the file backend has no explicit
/// path and the user data directory cannot be determined.
pub fn open_store(config: &AuthConfig) -> Result<Box<dyn CredentialStore>> {
    match config.store {
        CredentialBackend::Keyring => Ok(Box::new(KeyringStore::default())),
        CredentialBackend::File => {
            let path = match &config.credentials_path {
                Some(path) => PathBuf::from(path),
                None => FileStore::default_path()?,
            };
            Ok(Box::new(FileStore::new(path)))
        }
    }
}

// ---------------------------------------------------------------------------
// KeyringStore
// ---------------------------------------------------------------------------

/// Stores the record as JSON in the OS keyring.
pub struct KeyringStore {
    service: String,
    account: String,
}

impl KeyringStore {
    /// Keyring accessor for a custom service/account pair
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, &self.account)
            .map_err(|e| QuerychatError::Keyring(e).into())
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(KEYRING_SERVICE, KEYRING_ACCOUNT)
    }
}

impl CredentialStore for KeyringStore {
    fn load(&self) -> Result<Option<Credentials>> {
        match self.entry()?.get_password() {
            Ok(json_str) => Ok(Some(serde_json::from_str(&json_str)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(QuerychatError::Keyring(e).into()),
        }
    }

    fn save(&self, credentials: &Credentials) -> Result<()> {
        let json_str = serde_json::to_string(credentials)?;
        self.entry()?
            .set_password(&json_str)
            .map_err(QuerychatError::Keyring)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(QuerychatError::Keyring(e).into()),
        }
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// Stores the record as a JSON file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// File store at `path`; parent directories are created on save
    ///
    /// # Examples
    ///
    /// ```
    /// use querychat::auth::{CredentialStore, FileStore};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let store = FileStore::new(dir.path().join("credentials.json"));
    /// assert!(store.load().unwrap().is_none());
    /// ```
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// `credentials.json` inside the user data directory
    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "querychat", "querychat")
            .ok_or_else(|| QuerychatError::Storage("Could not determine data directory".into()))?;
        Ok(proj_dirs.data_dir().join("credentials.json"))
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileStore {
    fn load(&self) -> Result<Option<Credentials>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            QuerychatError::Storage(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn save(&self, credentials: &Credentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                QuerychatError::Storage(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        let json_str = serde_json::to_string_pretty(credentials)?;
        std::fs::write(&self.path, json_str).map_err(|e| {
            QuerychatError::Storage(format!("Failed to write {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(QuerychatError::Storage(format!(
                "Failed to remove {}: {}",
                self.path.display(),
                e
            ))
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_header_normalises_scheme() {
        let mut creds = Credentials::bearer("abc");
        creds.token_type = "bearer".to_string();
        assert_eq!(creds.authorization_header(), "Bearer abc");

        creds.token_type = "Token".to_string();
        assert_eq!(creds.authorization_header(), "Token abc");
    }

    #[test]
    fn test_file_store_roundtrip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("credentials.json"));

        assert!(store.load().unwrap().is_none());

        let mut creds = Credentials::bearer("tok");
        creds.user = Some(UserProfile {
            id: Some("1".into()),
            email: Some("ana@example.com".into()),
            username: None,
            full_name: None,
        });
        store.save(&creds).unwrap();
        assert_eq!(store.load().unwrap(), Some(creds));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_corrupt_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(FileStore::new(path).load().is_err());
    }

    #[test]
    fn test_credentials_default_token_type_when_missing() {
        let creds: Credentials = serde_json::from_str(
            r#"{"access_token":"t","saved_at":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(creds.token_type, "Bearer");
        assert!(creds.user.is_none());
    }

    #[test]
    fn test_open_store_file_backend_uses_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        let config = AuthConfig {
            store: CredentialBackend::File,
            credentials_path: Some(path.to_string_lossy().to_string()),
        };
        let store = open_store(&config).unwrap();
        store.save(&Credentials::bearer("x")).unwrap();
        assert!(path.exists());
    }
}
