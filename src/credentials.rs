//! Local credential store.
//!
//! The access token lives in a small YAML record, `authaccess.yaml`, inside a
//! private directory (`~/.cmdb` by default):
//!
//! ```text
//! ~/.cmdb/                 mode 0700
//! └── authaccess.yaml      mode 0600
//!     access_token: 3f9a...
//!     version: CMDB_hg19_v1.0
//! ```
//!
//! The store does no locking. Two invocations writing at once leave whichever
//! record was written last.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::error::{CmdbError, Result};
use crate::protocol::constants::DATASET_VERSION;
use crate::types::CredentialRecord;

/// Name of the default store directory under the home directory.
pub const STORE_DIR: &str = ".cmdb";

/// File name of the credential record.
pub const STORE_FILE: &str = "authaccess.yaml";

#[cfg(unix)]
const DIR_MODE: u32 = 0o700;
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Reads and writes the credential record in a given directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    /// Store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CredentialStore { dir: dir.into() }
    }

    /// Store at `~/.cmdb`.
    ///
    /// # Errors
    ///
    /// [`CmdbError::InvalidArgument`] if the home directory cannot be resolved.
    pub fn default_location() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            CmdbError::InvalidArgument("Cannot determine the home directory".to_string())
        })?;
        Ok(Self::new(home.join(STORE_DIR)))
    }

    /// Store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the credential record.
    pub fn path(&self) -> PathBuf {
        self.dir.join(STORE_FILE)
    }

    /// Whether a credential record is present.
    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    /// Make sure the directory and the record file exist with owner-only
    /// permissions. Existing files are left untouched.
    pub fn create(&self) -> Result<()> {
        if !self.dir.is_dir() {
            create_private_dir(&self.dir)?;
            tracing::debug!(dir = %self.dir.display(), "created credential directory");
        }

        let path = self.path();
        if !path.is_file() {
            create_private_file(&path)?;
            tracing::debug!(path = %path.display(), "created credential file");
        }
        Ok(())
    }

    /// Read the credential record.
    ///
    /// A missing `version` falls back to the current dataset version.
    ///
    /// # Errors
    ///
    /// - [`CmdbError::NotLoggedIn`] if there is no record
    /// - [`CmdbError::InvalidCredential`] if the record is not a YAML mapping or
    ///   `access_token` is missing or not a string
    pub fn read(&self) -> Result<CredentialRecord> {
        if !self.exists() {
            return Err(CmdbError::NotLoggedIn);
        }

        let content = fs::read_to_string(self.path())?;
        let record: Value = serde_yaml::from_str(&content)
            .map_err(|e| CmdbError::InvalidCredential(format!("unreadable record: {}", e)))?;

        let mapping = record.as_mapping().ok_or_else(|| {
            CmdbError::InvalidCredential("record is not a key/value mapping".to_string())
        })?;

        let access_token = match mapping.get("access_token") {
            Some(Value::String(token)) => token.clone(),
            Some(_) => {
                return Err(CmdbError::InvalidCredential(
                    "access_token is not a string".to_string(),
                ))
            }
            None => {
                return Err(CmdbError::InvalidCredential(
                    "access_token is missing".to_string(),
                ))
            }
        };

        let version = mapping
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or(DATASET_VERSION)
            .to_string();

        Ok(CredentialRecord {
            access_token,
            version,
        })
    }

    /// Overwrite the record with `token` and the current dataset version.
    ///
    /// Owner-only permissions are re-applied afterwards, whatever the umask.
    pub fn write(&self, token: &str) -> Result<()> {
        let record = CredentialRecord {
            access_token: token.to_string(),
            version: DATASET_VERSION.to_string(),
        };
        let content = serde_yaml::to_string(&record)
            .map_err(|e| CmdbError::InvalidCredential(format!("cannot serialize record: {}", e)))?;

        let path = self.path();
        fs::write(&path, content)?;
        restrict_file(&path)?;
        tracing::debug!(path = %path.display(), "credential record written");
        Ok(())
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new()
        .recursive(true)
        .mode(DIR_MODE)
        .create(dir)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    Ok(())
}

#[cfg(unix)]
fn create_private_file(path: &Path) -> Result<()> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .append(true)
        .create(true)
        .mode(FILE_MODE)
        .open(path)?;
    restrict_file(path)
}

#[cfg(not(unix))]
fn create_private_file(path: &Path) -> Result<()> {
    OpenOptions::new().append(true).create(true).open(path)?;
    Ok(())
}

#[cfg(unix)]
fn restrict_file(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(FILE_MODE))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_file(_path: &Path) -> Result<()> {
    Ok(())
}
