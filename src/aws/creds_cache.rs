use crate::aws::AwsCredentials;
use crate::okta::session_cache::{load_json_list, save_json_list};
use crate::paths;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use time::{Duration, OffsetDateTime};

/// One cached credential set, keyed by (org, user, account, role).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsCacheEntry {
    pub org: String,
    pub user: String,
    pub account_name: String,
    pub role_name: String,
    pub credentials: AwsCredentials,
}

impl AwsCacheEntry {
    fn matches(&self, org: &str, user: &str, account: &str, role: &str) -> bool {
        self.org == org
            && self.user == user
            && self.account_name.eq_ignore_ascii_case(account)
            && self.role_name.eq_ignore_ascii_case(role)
    }

    fn expiration(&self) -> Option<OffsetDateTime> {
        self.credentials.expiration()
    }
}

/// Full-file JSON store for AWS credentials at `~/.bmx/creds-cache`, with its
/// own freshness window on reads and pruning on writes.
pub struct AwsCredentialCache {
    path: PathBuf,
}

impl AwsCredentialCache {
    pub fn new() -> Result<AwsCredentialCache> {
        Ok(AwsCredentialCache {
            path: paths::creds_cache_file()?,
        })
    }

    pub fn with_path(path: PathBuf) -> AwsCredentialCache {
        AwsCredentialCache { path }
    }

    /// Returns a cached credential that still satisfies the requested
    /// duration's freshness window, if one exists.
    ///
    /// The window is `15min` for durations above 20 minutes, otherwise
    /// `duration - 5min` — which can go non-positive for very short
    /// durations. That quirk is intentional and must not be "fixed".
    pub fn get(
        &self,
        org: &str,
        user: &str,
        account: &str,
        role: &str,
        duration_minutes: i64,
    ) -> Option<AwsCredentials> {
        let window = if duration_minutes > 20 {
            Duration::minutes(15)
        } else {
            Duration::minutes(duration_minutes - 5)
        };
        let cutoff = OffsetDateTime::now_utc() + window;

        self.load()
            .into_iter()
            .find(|entry| {
                entry.matches(org, user, account, role)
                    && entry.expiration().is_some_and(|expiration| expiration >= cutoff)
            })
            .map(|entry| entry.credentials)
    }

    /// Appends a credential and compacts the file: only the current (org,
    /// user)'s entries survive, minus anything expiring within the next 10
    /// minutes, keeping one entry per (account, role) — the freshest.
    pub fn set(
        &self,
        org: &str,
        user: &str,
        account: &str,
        role: &str,
        credentials: &AwsCredentials,
    ) -> Result<()> {
        let mut entries = self.load();
        entries.push(AwsCacheEntry {
            org: org.to_string(),
            user: user.to_string(),
            account_name: account.to_string(),
            role_name: role.to_string(),
            credentials: credentials.clone(),
        });

        let keep_cutoff = OffsetDateTime::now_utc() + Duration::minutes(10);
        let mut pruned: Vec<AwsCacheEntry> = vec![];
        for entry in entries {
            if entry.org != org || entry.user != user {
                continue;
            }
            if !entry.expiration().is_some_and(|expiration| expiration >= keep_cutoff) {
                continue;
            }

            match pruned.iter_mut().find(|kept| {
                kept.account_name.eq_ignore_ascii_case(entry.account_name.as_str())
                    && kept.role_name.eq_ignore_ascii_case(entry.role_name.as_str())
            }) {
                Some(kept) => {
                    if entry.expiration() > kept.expiration() {
                        *kept = entry;
                    }
                }
                None => pruned.push(entry),
            }
        }

        self.save(&pruned)
    }

    fn load(&self) -> Vec<AwsCacheEntry> {
        load_json_list(self.path.as_path())
    }

    fn save(&self, entries: &[AwsCacheEntry]) -> Result<()> {
        save_json_list(self.path.as_path(), entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::CREDENTIALS_VERSION;
    use tempfile::TempDir;
    use time::format_description::well_known::Rfc3339;

    fn credentials(expires_in: Duration) -> AwsCredentials {
        AwsCredentials {
            session_token: String::from("token"),
            access_key_id: String::from("AKIA"),
            secret_access_key: String::from("secret"),
            expiration: (OffsetDateTime::now_utc() + expires_in)
                .format(&Rfc3339)
                .unwrap(),
            version: CREDENTIALS_VERSION,
        }
    }

    fn cache(dir: &TempDir) -> AwsCredentialCache {
        AwsCredentialCache::with_path(dir.path().join("creds-cache"))
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        let creds = credentials(Duration::hours(1));

        cache.set("acme", "bob", "Dev", "Dev-Foo", &creds).unwrap();

        let loaded = cache.get("acme", "bob", "Dev", "Dev-Foo", 60).unwrap();
        assert_eq!(loaded, creds);
    }

    #[test]
    fn test_get_is_case_insensitive_on_account_and_role() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        let creds = credentials(Duration::hours(1));

        cache.set("acme", "bob", "Dev", "Dev-Foo", &creds).unwrap();

        assert!(cache.get("acme", "bob", "dev", "DEV-FOO", 60).is_some());
    }

    #[test]
    fn test_get_misses_when_inside_freshness_window() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        // expires in 12 minutes: inside the 15 minute window for long
        // durations
        let creds = credentials(Duration::minutes(12));

        cache.set("acme", "bob", "Dev", "Dev-Foo", &creds).unwrap();

        assert!(cache.get("acme", "bob", "Dev", "Dev-Foo", 60).is_none());
    }

    #[test]
    fn test_get_short_duration_uses_reduced_window() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        // 12 minutes of validity satisfies a 15 minute request, whose window
        // is 15 - 5 = 10 minutes
        let creds = credentials(Duration::minutes(12));

        cache.set("acme", "bob", "Dev", "Dev-Foo", &creds).unwrap();

        assert!(cache.get("acme", "bob", "Dev", "Dev-Foo", 15).is_some());
    }

    #[test]
    fn test_get_very_short_duration_window_goes_negative() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        // duration 3 gives a window of -2 minutes: an entry expiring 11
        // minutes from now passes both the write-time prune and the read
        let creds = credentials(Duration::minutes(11));

        cache.set("acme", "bob", "Dev", "Dev-Foo", &creds).unwrap();

        assert!(cache.get("acme", "bob", "Dev", "Dev-Foo", 3).is_some());
    }

    #[test]
    fn test_set_keeps_latest_expiration_per_account_role() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        let older = credentials(Duration::minutes(30));
        let newer = credentials(Duration::hours(1));

        cache.set("acme", "bob", "Dev", "Dev-Foo", &older).unwrap();
        cache.set("acme", "bob", "dev", "dev-foo", &newer).unwrap();

        let loaded = cache.get("acme", "bob", "Dev", "Dev-Foo", 60).unwrap();
        assert_eq!(loaded, newer);

        // exactly one entry remains for the pair
        let raw = std::fs::read_to_string(dir.path().join("creds-cache")).unwrap();
        let entries: Vec<AwsCacheEntry> = serde_json::from_str(raw.as_str()).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_set_drops_entries_expiring_within_ten_minutes() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        let stale = credentials(Duration::minutes(5));
        let fresh = credentials(Duration::hours(1));

        cache.set("acme", "bob", "Dev", "Dev-Foo", &stale).unwrap();
        cache.set("acme", "bob", "Prod", "Prod-Bar", &fresh).unwrap();

        let raw = std::fs::read_to_string(dir.path().join("creds-cache")).unwrap();
        let entries: Vec<AwsCacheEntry> = serde_json::from_str(raw.as_str()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].role_name, "Prod-Bar");
    }

    #[test]
    fn test_set_compacts_to_current_org_and_user() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        let creds = credentials(Duration::hours(1));

        cache.set("acme", "alice", "Dev", "Dev-Foo", &creds).unwrap();
        cache.set("acme", "bob", "Dev", "Dev-Foo", &creds).unwrap();

        let raw = std::fs::read_to_string(dir.path().join("creds-cache")).unwrap();
        let entries: Vec<AwsCacheEntry> = serde_json::from_str(raw.as_str()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user, "bob");
    }

    #[test]
    fn test_corrupt_cache_file_treated_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("creds-cache");
        std::fs::write(&path, "[{ broken").unwrap();

        let cache = AwsCredentialCache::with_path(path);
        assert!(cache.get("acme", "bob", "Dev", "Dev-Foo", 60).is_none());

        // a write self-heals the file
        cache
            .set("acme", "bob", "Dev", "Dev-Foo", &credentials(Duration::hours(1)))
            .unwrap();
        assert!(cache.get("acme", "bob", "Dev", "Dev-Foo", 60).is_some());
    }

    #[test]
    fn test_version_tag_round_trips() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        cache
            .set("acme", "bob", "Dev", "Dev-Foo", &credentials(Duration::hours(1)))
            .unwrap();

        let raw = std::fs::read_to_string(dir.path().join("creds-cache")).unwrap();
        assert!(raw.contains(r#""version":1"#));
    }
}
