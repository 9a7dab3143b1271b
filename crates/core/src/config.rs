//! Configuration management for sitepush
//!
//! Settings are layered: built-in defaults, then the config file, then the
//! environment, then command-line flags.

use crate::error::{Error, Result};
use crate::metadata::CachePolicy;
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration directory name
const CONFIG_DIR: &str = "sitepush";

/// Configuration file name inside the configuration directory
const CONFIG_FILE: &str = "config.toml";

/// Project-local configuration file, looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "sitepush.toml";

/// Build output directory uploaded when nothing else is configured
pub const DEFAULT_SOURCE_DIR: &str = "dist";

/// Region used when neither the file nor `AWS_REGION` names one
pub const DEFAULT_REGION: &str = "us-east-1";

/// Configuration file structure; every field is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub cache: CachePolicy,
}

/// `[storage]` section of the configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_path_style: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
}

/// Settings needed to build the storage client
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub region: String,
    pub endpoint: Option<String>,
    pub force_path_style: bool,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
}

/// Fully resolved settings for one deployment
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub bucket: String,
    pub source_dir: PathBuf,
    pub site_url: Option<String>,
    pub storage: StorageConfig,
    pub cache: CachePolicy,
}

/// Values taken from environment variables
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
}

impl EnvOverrides {
    /// Read the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read through `lookup`; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            bucket: get("SITEPUSH_BUCKET"),
            region: get("AWS_REGION"),
            endpoint: get("AWS_ENDPOINT_URL"),
            access_key_id: get("AWS_ACCESS_KEY_ID"),
            secret_access_key: get("AWS_SECRET_ACCESS_KEY"),
            session_token: get("AWS_SESSION_TOKEN"),
        }
    }
}

/// Values given as command-line flags
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bucket: Option<String>,
    pub source_dir: Option<PathBuf>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    /// `Some(false)` turns off path-style addressing enabled in the file
    pub force_path_style: Option<bool>,
    pub site_url: Option<String>,
}

/// Merge the layers into a [`DeployConfig`]
pub fn resolve_config(
    file: Option<ConfigFile>,
    env: EnvOverrides,
    cli: CliOverrides,
) -> Result<DeployConfig> {
    let file = file.unwrap_or_default();

    let bucket = cli.bucket.or(env.bucket).or(file.bucket).ok_or_else(|| {
        Error::Config(
            "No bucket configured. Pass --bucket, set SITEPUSH_BUCKET, or add 'bucket' to sitepush.toml"
                .to_string(),
        )
    })?;

    // Key id and secret come from a single layer, never mixed
    let (access_key_id, secret_access_key, session_token) =
        if env.access_key_id.is_some() || env.secret_access_key.is_some() {
            (env.access_key_id, env.secret_access_key, env.session_token)
        } else {
            (file.storage.access_key_id, file.storage.secret_access_key, None)
        };

    let storage = StorageConfig {
        region: cli
            .region
            .or(env.region)
            .or(file.storage.region)
            .unwrap_or_else(|| DEFAULT_REGION.to_string()),
        endpoint: cli.endpoint.or(env.endpoint).or(file.storage.endpoint),
        force_path_style: cli
            .force_path_style
            .or(file.storage.force_path_style)
            .unwrap_or(false),
        access_key_id,
        secret_access_key,
        session_token,
    };

    Ok(DeployConfig {
        bucket,
        source_dir: cli
            .source_dir
            .or(file.source_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE_DIR)),
        site_url: cli.site_url.or(file.site_url),
        storage,
        cache: file.cache,
    })
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let home = home_dir().ok_or_else(|| Error::Config("Cannot determine home directory".to_string()))?;
    Ok(home.join(".config").join(CONFIG_DIR))
}

/// Get the user-wide configuration file path
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE))
}

/// Locate the configuration file to use.
///
/// An explicit path must exist. Otherwise `./sitepush.toml` wins over the
/// user-wide file; having neither is fine.
pub fn find_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        return Ok(Some(path.to_path_buf()));
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Ok(Some(local));
    }

    Ok(get_config_path().ok().filter(|p| p.exists()))
}

/// Load a configuration file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Err(Error::ConfigNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|e| {
        Error::InvalidConfig(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let config: ConfigFile = toml::from_str(&content).map_err(|e| {
        Error::InvalidConfig(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    Ok(config)
}

/// Find and load the configuration file, if there is one
pub fn load_config(explicit: Option<&Path>) -> Result<Option<(PathBuf, ConfigFile)>> {
    match find_config_file(explicit)? {
        Some(path) => {
            let config = load_config_file(&path)?;
            Ok(Some((path, config)))
        }
        None => Ok(None),
    }
}

/// Save configuration to file
pub fn save_config(path: &Path, config: &ConfigFile, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
    }

    let content = toml::to_string_pretty(config)?;

    fs::write(path, content)
        .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

    // Config may hold access keys
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)?;
    }

    Ok(())
}

/// Starter configuration written by `config init`
pub fn config_template(bucket: &str) -> ConfigFile {
    ConfigFile {
        bucket: Some(bucket.to_string()),
        source_dir: Some(PathBuf::from(DEFAULT_SOURCE_DIR)),
        site_url: None,
        storage: StorageSection {
            region: Some(DEFAULT_REGION.to_string()),
            ..StorageSection::default()
        },
        cache: CachePolicy::default(),
    }
}

/// Validate configuration
pub fn validate_config(config: &DeployConfig) -> Result<()> {
    validate_bucket_name(&config.bucket)?;

    if config.source_dir.as_os_str().is_empty() {
        return Err(Error::InvalidInput("Source directory cannot be empty".to_string()));
    }

    if config.storage.region.trim().is_empty() {
        return Err(Error::InvalidInput("Region cannot be empty".to_string()));
    }

    if config.cache.immutable_prefix.is_empty() {
        return Err(Error::InvalidInput(
            "cache.immutable_prefix cannot be empty".to_string(),
        ));
    }

    if config.cache.immutable.trim().is_empty() || config.cache.default.trim().is_empty() {
        return Err(Error::InvalidInput(
            "Cache-control directives cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_bucket_name(bucket: &str) -> Result<()> {
    if !(3..=63).contains(&bucket.len()) {
        return Err(Error::InvalidInput(format!(
            "Invalid bucket name '{}' (expected 3 to 63 characters, got {})",
            bucket,
            bucket.len()
        )));
    }

    let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.';
    if !bucket.chars().all(allowed) {
        return Err(Error::InvalidInput(format!(
            "Invalid bucket name '{}' (only lowercase letters, digits, '-' and '.')",
            bucket
        )));
    }

    let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    if !edge_ok(bucket.chars().next()) || !edge_ok(bucket.chars().last()) {
        return Err(Error::InvalidInput(format!(
            "Invalid bucket name '{}' (must start and end with a letter or digit)",
            bucket
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn make_valid_config() -> DeployConfig {
        resolve_config(
            None,
            EnvOverrides::default(),
            CliOverrides {
                bucket: Some("site-staging".to_string()),
                ..CliOverrides::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_defaults() {
        let config = make_valid_config();
        assert_eq!(config.bucket, "site-staging");
        assert_eq!(config.source_dir, PathBuf::from("dist"));
        assert_eq!(config.storage.region, "us-east-1");
        assert!(config.storage.endpoint.is_none());
        assert!(!config.storage.force_path_style);
        assert_eq!(config.cache, CachePolicy::default());
    }

    #[test]
    fn test_resolve_requires_bucket() {
        let err = resolve_config(None, EnvOverrides::default(), CliOverrides::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_resolve_precedence() {
        let file: ConfigFile = toml::from_str(
            r#"
            bucket = "from-file"
            source_dir = "build"
            site_url = "https://example.com"

            [storage]
            region = "eu-west-1"
            endpoint = "http://file:9000"
            force_path_style = true
            access_key_id = "file-key"
            secret_access_key = "file-secret"
            "#,
        )
        .unwrap();

        let env = EnvOverrides {
            bucket: Some("from-env".to_string()),
            region: Some("eu-central-1".to_string()),
            access_key_id: Some("env-key".to_string()),
            ..EnvOverrides::default()
        };

        let cli = CliOverrides {
            region: Some("ap-south-1".to_string()),
            ..CliOverrides::default()
        };

        let config = resolve_config(Some(file), env, cli).unwrap();
        assert_eq!(config.bucket, "from-env");
        assert_eq!(config.source_dir, PathBuf::from("build"));
        assert_eq!(config.site_url.as_deref(), Some("https://example.com"));
        assert_eq!(config.storage.region, "ap-south-1");
        assert_eq!(config.storage.endpoint.as_deref(), Some("http://file:9000"));
        assert!(config.storage.force_path_style);
        assert_eq!(config.storage.access_key_id.as_deref(), Some("env-key"));
        // A half pair in the environment still shadows the whole file pair
        assert!(config.storage.secret_access_key.is_none());
    }

    fn file_with_keys() -> ConfigFile {
        toml::from_str(
            r#"
            bucket = "from-file"

            [storage]
            force_path_style = true
            access_key_id = "file-key"
            secret_access_key = "file-secret"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_credentials_from_file_pair() {
        let env = EnvOverrides {
            session_token: Some("env-token".to_string()),
            ..EnvOverrides::default()
        };
        let config = resolve_config(Some(file_with_keys()), env, CliOverrides::default()).unwrap();
        assert_eq!(config.storage.access_key_id.as_deref(), Some("file-key"));
        assert_eq!(config.storage.secret_access_key.as_deref(), Some("file-secret"));
        assert!(config.storage.session_token.is_none());
    }

    #[test]
    fn test_resolve_credentials_from_env_pair() {
        let env = EnvOverrides {
            access_key_id: Some("env-key".to_string()),
            secret_access_key: Some("env-secret".to_string()),
            session_token: Some("env-token".to_string()),
            ..EnvOverrides::default()
        };
        let config = resolve_config(Some(file_with_keys()), env, CliOverrides::default()).unwrap();
        assert_eq!(config.storage.access_key_id.as_deref(), Some("env-key"));
        assert_eq!(config.storage.secret_access_key.as_deref(), Some("env-secret"));
        assert_eq!(config.storage.session_token.as_deref(), Some("env-token"));
    }

    #[test]
    fn test_cli_can_disable_path_style() {
        let cli = CliOverrides {
            force_path_style: Some(false),
            ..CliOverrides::default()
        };
        let config = resolve_config(Some(file_with_keys()), EnvOverrides::default(), cli).unwrap();
        assert!(!config.storage.force_path_style);

        let config =
            resolve_config(Some(file_with_keys()), EnvOverrides::default(), CliOverrides::default())
                .unwrap();
        assert!(config.storage.force_path_style);
    }

    #[test]
    fn test_env_lookup_ignores_empty_values() {
        let vars: HashMap<&str, &str> = [
            ("AWS_ACCESS_KEY_ID", "AKID"),
            ("AWS_SECRET_ACCESS_KEY", ""),
            ("AWS_REGION", "us-west-2"),
        ]
        .into_iter()
        .collect();

        let env = EnvOverrides::from_lookup(|name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(env.access_key_id.as_deref(), Some("AKID"));
        assert!(env.secret_access_key.is_none());
        assert_eq!(env.region.as_deref(), Some("us-west-2"));
        assert!(env.bucket.is_none());
    }

    #[test]
    fn test_partial_cache_section_keeps_defaults() {
        let file: ConfigFile = toml::from_str(
            r#"
            [cache]
            immutable_prefix = "static/"
            "#,
        )
        .unwrap();
        assert_eq!(file.cache.immutable_prefix, "static/");
        assert_eq!(file.cache.immutable, "max-age=31536000");
        assert_eq!(file.cache.default, "max-age=0");
    }

    #[test]
    fn test_validate_config_valid() {
        assert!(validate_config(&make_valid_config()).is_ok());
    }

    #[test]
    fn test_validate_config_bad_bucket_names() {
        let too_long = "a".repeat(64);
        for bucket in ["ab", "Site-Bucket", "bucket_name", "-bucket", "bucket.", too_long.as_str()] {
            let mut config = make_valid_config();
            config.bucket = bucket.to_string();
            assert!(validate_config(&config).is_err(), "{} should be rejected", bucket);
        }
    }

    #[test]
    fn test_validate_config_bucket_boundary() {
        let mut config = make_valid_config();
        config.bucket = "a".repeat(63);
        assert!(validate_config(&config).is_ok());
        config.bucket = "my.site-1".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_config_empty_cache_prefix() {
        let mut config = make_valid_config();
        config.cache.immutable_prefix = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_config_empty_region() {
        let mut config = make_valid_config();
        config.storage.region = " ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_find_config_file_explicit_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(matches!(
            find_config_file(Some(&path)),
            Err(Error::ConfigNotFound(p)) if p == path
        ));
    }

    #[test]
    fn test_save_and_load_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("sitepush.toml");

        save_config(&path, &config_template("site-staging"), false).unwrap();

        let loaded = load_config_file(&path).unwrap();
        assert_eq!(loaded.bucket.as_deref(), Some("site-staging"));
        assert_eq!(loaded.source_dir, Some(PathBuf::from("dist")));
        assert_eq!(loaded.storage.region.as_deref(), Some("us-east-1"));
        assert!(loaded.storage.secret_access_key.is_none());

        let (found, _) = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(found, path);
    }

    #[test]
    fn test_save_config_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sitepush.toml");
        save_config(&path, &config_template("first-bucket"), false).unwrap();

        assert!(save_config(&path, &config_template("second-bucket"), false).is_err());
        save_config(&path, &config_template("second-bucket"), true).unwrap();
        assert_eq!(
            load_config_file(&path).unwrap().bucket.as_deref(),
            Some("second-bucket")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_save_config_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sitepush.toml");
        save_config(&path, &config_template("site-staging"), false).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sitepush.toml");
        fs::write(&path, "bucket = [").unwrap();
        assert!(matches!(load_config_file(&path), Err(Error::InvalidConfig(_))));
    }
}
