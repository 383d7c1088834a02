use crate::paths;
use anyhow::Result;
use ini::Ini;
use std::path::Path;

/// Static defaults read from the ini file at `~/.bmx/config`.
///
/// Every field is optional; callers fall back to prompting (or fail in
/// non-interactive mode) when a value is absent here and on the command line.
#[derive(Debug, Default, Clone)]
pub struct BmxConfig {
    pub org: Option<String>,
    pub user: Option<String>,
    pub account: Option<String>,
    pub role: Option<String>,
    pub duration: Option<i64>,
    pub profile: Option<String>,
}

impl BmxConfig {
    /// Reads the config file, treating a missing or unreadable file as empty
    /// defaults. A malformed file is logged and ignored.
    pub fn load() -> BmxConfig {
        match paths::config_file() {
            Ok(path) => BmxConfig::load_from(path.as_path()),
            Err(_) => BmxConfig::default(),
        }
    }

    pub fn load_from(path: &Path) -> BmxConfig {
        if !path.exists() {
            return BmxConfig::default();
        }

        let ini = match Ini::load_from_file(path) {
            Ok(ini) => ini,
            Err(e) => {
                log::warn!("ignoring malformed config file {}: {}", path.display(), e);
                return BmxConfig::default();
            }
        };

        let get = |key: &str| ini.get_from(None::<&str>, key).map(String::from);

        BmxConfig {
            org: get("org"),
            user: get("user"),
            account: get("account"),
            role: get("role"),
            duration: ini
                .get_from(None::<&str>, "duration")
                .and_then(|v| v.parse().ok()),
            profile: get("profile"),
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = paths::config_file()?;
        self.save_to(path.as_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let mut ini = Ini::new();
        let mut set = |key: &str, value: &Option<String>| {
            if let Some(value) = value {
                ini.set_to(None::<&str>, key.to_string(), value.clone());
            }
        };
        set("org", &self.org);
        set("user", &self.user);
        set("account", &self.account);
        set("role", &self.role);
        set("profile", &self.profile);
        if let Some(duration) = self.duration {
            ini.set_to(None::<&str>, "duration".to_string(), duration.to_string());
        }

        ini.write_to_file(path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_config() {
        let dir = TempDir::new().unwrap();
        let config = BmxConfig::load_from(&dir.path().join("config"));

        assert!(config.org.is_none());
        assert!(config.duration.is_none());
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config");

        let config = BmxConfig {
            org: Some(String::from("acme")),
            user: Some(String::from("bob")),
            account: None,
            role: Some(String::from("Dev-Foo")),
            duration: Some(45),
            profile: None,
        };
        config.save_to(&path).unwrap();

        let loaded = BmxConfig::load_from(&path);
        assert_eq!(loaded.org.as_deref(), Some("acme"));
        assert_eq!(loaded.user.as_deref(), Some("bob"));
        assert_eq!(loaded.role.as_deref(), Some("Dev-Foo"));
        assert_eq!(loaded.duration, Some(45));
        assert!(loaded.account.is_none());
    }

    #[test]
    fn test_malformed_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config");
        std::fs::write(&path, "[unterminated\norg acme").unwrap();

        let config = BmxConfig::load_from(&path);
        assert!(config.org.is_none());
    }
}
