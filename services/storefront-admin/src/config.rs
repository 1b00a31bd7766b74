//! Configuration types and loading
//!
//! Config precedence: env vars > config file > defaults. A missing file at
//! the default location means "all defaults"; a missing file that was asked
//! for explicitly is an error.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use storefront_client::ClientConfig;

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "storefront-admin.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Backend connection settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Treat 403 responses as an expired access token
    #[serde(default = "default_refresh_on_forbidden")]
    pub refresh_on_forbidden: bool,
}

/// Where the login session is persisted between runs
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_credential_file")]
    pub credential_file: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            refresh_on_forbidden: default_refresh_on_forbidden(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            credential_file: default_credential_file(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000/api".into()
}

fn default_timeout() -> u64 {
    30
}

fn default_refresh_on_forbidden() -> bool {
    true
}

fn default_credential_file() -> PathBuf {
    PathBuf::from(".storefront-session.json")
}

/// Resolved config file location and whether the user named it
#[derive(Debug, PartialEq, Eq)]
pub struct ConfigPath {
    pub path: PathBuf,
    pub explicit: bool,
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(location: &ConfigPath) -> common::Result<Self> {
        let mut config = match std::fs::read_to_string(&location.path) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !location.explicit => {
                Config::default()
            }
            Err(e) => return Err(e.into()),
        };

        if let Ok(url) = std::env::var("STOREFRONT_API_URL") {
            config.api.base_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.session.credential_file.as_os_str().is_empty() {
            return Err(common::Error::Config(
                "credential_file must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or STOREFRONT_CONFIG env var.
    pub fn resolve_path(cli_path: Option<&Path>) -> ConfigPath {
        if let Some(p) = cli_path {
            return ConfigPath {
                path: p.to_path_buf(),
                explicit: true,
            };
        }
        if let Ok(p) = std::env::var("STOREFRONT_CONFIG") {
            return ConfigPath {
                path: PathBuf::from(p),
                explicit: true,
            };
        }
        ConfigPath {
            path: PathBuf::from(DEFAULT_CONFIG_FILE),
            explicit: false,
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api.base_url.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
            refresh_on_forbidden: self.api.refresh_on_forbidden,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that touch process environment variables.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn explicit(path: &Path) -> ConfigPath {
        ConfigPath {
            path: path.to_path_buf(),
            explicit: true,
        }
    }

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storefront-admin.toml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_valid_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("STOREFRONT_API_URL") };
        let (_dir, path) = write_config(
            r#"
[api]
base_url = "https://shop.example.com/api"
timeout_secs = 10
refresh_on_forbidden = false

[session]
credential_file = "/var/lib/storefront/session.json"
"#,
        );

        let config = Config::load(&explicit(&path)).unwrap();
        assert_eq!(config.api.base_url, "https://shop.example.com/api");
        assert_eq!(config.api.timeout_secs, 10);
        assert!(!config.api.refresh_on_forbidden);
        assert_eq!(
            config.session.credential_file,
            PathBuf::from("/var/lib/storefront/session.json")
        );

        let client = config.client_config();
        assert_eq!(client.timeout, Duration::from_secs(10));
        assert!(!client.refresh_on_forbidden);
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("STOREFRONT_API_URL") };
        let (_dir, path) = write_config("[api]\n");

        let config = Config::load(&explicit(&path)).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:3000/api");
        assert_eq!(config.api.timeout_secs, 30);
        assert!(config.api.refresh_on_forbidden);
        assert_eq!(
            config.session.credential_file,
            PathBuf::from(".storefront-session.json")
        );
    }

    #[test]
    fn test_missing_default_file_uses_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("STOREFRONT_API_URL") };
        let dir = tempfile::tempdir().unwrap();
        let location = ConfigPath {
            path: dir.path().join("absent.toml"),
            explicit: false,
        };

        let config = Config::load(&location).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:3000/api");
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result = Config::load(&explicit(Path::new("/nonexistent/path/config.toml")));
        assert!(matches!(result, Err(common::Error::Io(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let (_dir, path) = write_config("not valid {{{{ toml");
        let result = Config::load(&explicit(&path));
        assert!(matches!(result, Err(common::Error::Toml(_))));
    }

    #[test]
    fn test_api_url_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let (_dir, path) = write_config("[api]\nbase_url = \"http://file-value/api\"\n");

        unsafe { set_env("STOREFRONT_API_URL", "https://env-value/api") };
        let config = Config::load(&explicit(&path));
        unsafe { remove_env("STOREFRONT_API_URL") };

        assert_eq!(config.unwrap().api.base_url, "https://env-value/api");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("STOREFRONT_API_URL") };
        let (_dir, path) = write_config("[api]\nbase_url = \"shop.example.com/api\"\n");

        let err = Config::load(&explicit(&path)).unwrap_err().to_string();
        assert!(
            err.contains("base_url must start with http"),
            "error message should explain the issue, got: {err}"
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("STOREFRONT_API_URL") };
        let (_dir, path) = write_config("[api]\ntimeout_secs = 0\n");

        let result = Config::load(&explicit(&path));
        assert!(result.is_err(), "timeout_secs = 0 must be rejected");
    }

    #[test]
    fn test_resolve_path_cli_arg() {
        let location = Config::resolve_path(Some(Path::new("/custom/path.toml")));
        assert_eq!(location, explicit(Path::new("/custom/path.toml")));
    }

    #[test]
    fn test_resolve_path_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("STOREFRONT_CONFIG", "/env/path.toml") };
        let location = Config::resolve_path(None);
        unsafe { remove_env("STOREFRONT_CONFIG") };
        assert_eq!(location, explicit(Path::new("/env/path.toml")));
    }

    #[test]
    fn test_resolve_path_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("STOREFRONT_CONFIG") };
        let location = Config::resolve_path(None);
        assert_eq!(location.path, PathBuf::from(DEFAULT_CONFIG_FILE));
        assert!(!location.explicit);
    }

    #[test]
    fn test_resolve_path_cli_overrides_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("STOREFRONT_CONFIG", "/env/should-lose.toml") };
        let location = Config::resolve_path(Some(Path::new("/cli/wins.toml")));
        unsafe { remove_env("STOREFRONT_CONFIG") };
        assert_eq!(
            location.path,
            PathBuf::from("/cli/wins.toml"),
            "CLI arg must take precedence over STOREFRONT_CONFIG env var"
        );
    }
}
