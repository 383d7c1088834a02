use crate::paths;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// A cached Okta session. One logical slot exists per (org, user); saving a
/// new session for the pair replaces the old entry.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OktaSessionEntry {
    pub user_id: String,
    pub org: String,
    pub session_id: String,
    /// RFC 3339 timestamp.
    pub expires_at: String,
}

impl OktaSessionEntry {
    /// Parsed expiry; unparseable timestamps count as already expired.
    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::parse(self.expires_at.as_str(), &Rfc3339).ok()
    }
}

/// Dumb full-file JSON list store for Okta sessions at `~/.bmx/sessions`.
/// Expiry filtering is the caller's responsibility.
pub struct OktaSessionStorage {
    path: PathBuf,
}

impl OktaSessionStorage {
    pub fn new() -> Result<OktaSessionStorage> {
        Ok(OktaSessionStorage {
            path: paths::sessions_file()?,
        })
    }

    pub fn with_path(path: PathBuf) -> OktaSessionStorage {
        OktaSessionStorage { path }
    }

    /// Loads all cached sessions. A missing or corrupt file yields an empty
    /// list; corruption is logged, never surfaced.
    pub fn load(&self) -> Vec<OktaSessionEntry> {
        load_json_list(self.path.as_path())
    }

    /// Rewrites the whole session file.
    pub fn save(&self, sessions: &[OktaSessionEntry]) -> Result<()> {
        save_json_list(self.path.as_path(), sessions)
    }

    /// Persists a fresh session, superseding any prior entry for the same
    /// (org, user) pair and dropping expired entries along the way.
    pub fn upsert(&self, entry: OktaSessionEntry) -> Result<()> {
        let now = OffsetDateTime::now_utc();

        let mut sessions: Vec<OktaSessionEntry> = self
            .load()
            .into_iter()
            .filter(|session| session.expires_at().is_some_and(|expires| expires > now))
            .filter(|session| !(session.org == entry.org && session.user_id == entry.user_id))
            .collect();
        sessions.push(entry);

        self.save(&sessions)
    }
}

pub(crate) fn load_json_list<T: serde::de::DeserializeOwned>(path: &Path) -> Vec<T> {
    if !path.exists() {
        return vec![];
    }

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            log::warn!("could not read cache file {}: {}", path.display(), e);
            return vec![];
        }
    };

    match serde_json::from_str(contents.as_str()) {
        Ok(list) => list,
        Err(e) => {
            log::warn!("ignoring corrupt cache file {}: {}", path.display(), e);
            vec![]
        }
    }
}

/// Full overwrite with owner-only permissions, via write-temp-then-rename so
/// a crash mid-write can't leave a truncated file.
pub(crate) fn save_json_list<T: Serialize>(path: &Path, list: &[T]) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    let json = serde_json::to_string(list)?;
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, json)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&tmp_path, perms)?;
    }

    std::fs::rename(&tmp_path, path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(org: &str, user: &str, session_id: &str) -> OktaSessionEntry {
        OktaSessionEntry {
            user_id: user.to_string(),
            org: org.to_string(),
            session_id: session_id.to_string(),
            expires_at: String::from("2099-01-01T00:00:00Z"),
        }
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let dir = TempDir::new().unwrap();
        let storage = OktaSessionStorage::with_path(dir.path().join("sessions"));

        let sessions = vec![entry("acme", "bob", "sid-1"), entry("acme", "alice", "sid-2")];
        storage.save(&sessions).unwrap();

        assert_eq!(storage.load(), sessions);
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let storage = OktaSessionStorage::with_path(dir.path().join("sessions"));

        assert!(storage.load().is_empty());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions");
        std::fs::write(&path, "{ not json ").unwrap();

        let storage = OktaSessionStorage::with_path(path);
        assert!(storage.load().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions");
        let storage = OktaSessionStorage::with_path(path.clone());
        storage.save(&[entry("acme", "bob", "sid-1")]).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_unparseable_expiry_counts_as_expired() {
        let mut e = entry("acme", "bob", "sid-1");
        e.expires_at = String::from("not-a-timestamp");
        assert!(e.expires_at().is_none());
    }
}
