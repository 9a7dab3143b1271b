//! Per-object metadata: content type and cache-control

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix whose objects are served with the long-lived directive
pub const DEFAULT_IMMUTABLE_PREFIX: &str = "assets/";

/// One year
pub const DEFAULT_IMMUTABLE_DIRECTIVE: &str = "max-age=31536000";

/// Directive for keys outside the immutable prefix
pub const DEFAULT_NO_CACHE_DIRECTIVE: &str = "max-age=0";

/// Guess the content type of a file from its extension.
///
/// Unknown or missing extensions fall back to `application/octet-stream`.
pub fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string()
}

/// Prefix rule mapping object keys to a `Cache-Control` directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    /// Keys starting with this prefix get `immutable`
    #[serde(default = "default_immutable_prefix")]
    pub immutable_prefix: String,
    /// Directive for keys under the prefix
    #[serde(default = "default_immutable")]
    pub immutable: String,
    /// Directive for every other key
    #[serde(default = "default_directive")]
    pub default: String,
}

impl CachePolicy {
    /// Cache-control directive for an object key
    pub fn cache_control_for(&self, key: &str) -> &str {
        if key.starts_with(&self.immutable_prefix) {
            &self.immutable
        } else {
            &self.default
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            immutable_prefix: default_immutable_prefix(),
            immutable: default_immutable(),
            default: default_directive(),
        }
    }
}

fn default_immutable_prefix() -> String {
    DEFAULT_IMMUTABLE_PREFIX.to_string()
}

fn default_immutable() -> String {
    DEFAULT_IMMUTABLE_DIRECTIVE.to_string()
}

fn default_directive() -> String {
    DEFAULT_NO_CACHE_DIRECTIVE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_known_extensions() {
        assert_eq!(content_type_for(Path::new("index.html")), "text/html");
        assert_eq!(content_type_for(Path::new("assets/logo.png")), "image/png");
        assert_eq!(content_type_for(Path::new("assets/app.css")), "text/css");
        assert_eq!(content_type_for(Path::new("data/site.json")), "application/json");
    }

    #[test]
    fn test_content_type_fallback() {
        assert_eq!(
            content_type_for(Path::new("blob.unknownext")),
            "application/octet-stream"
        );
        assert_eq!(content_type_for(Path::new("LICENSE")), "application/octet-stream");
    }

    #[test]
    fn test_cache_control_assets_prefix() {
        let policy = CachePolicy::default();
        assert_eq!(policy.cache_control_for("assets/logo.png"), "max-age=31536000");
        assert_eq!(policy.cache_control_for("assets/js/app.1234.js"), "max-age=31536000");
    }

    #[test]
    fn test_cache_control_other_keys() {
        let policy = CachePolicy::default();
        assert_eq!(policy.cache_control_for("index.html"), "max-age=0");
        // Prefix match is on the key, not on a path segment anywhere
        assert_eq!(policy.cache_control_for("static/assets/logo.png"), "max-age=0");
        assert_eq!(policy.cache_control_for("assets"), "max-age=0");
        assert_eq!(policy.cache_control_for("assetsfoo.js"), "max-age=0");
    }

    #[test]
    fn test_cache_policy_custom() {
        let policy = CachePolicy {
            immutable_prefix: "static/".to_string(),
            immutable: "public, max-age=86400, immutable".to_string(),
            default: "no-cache".to_string(),
        };
        assert_eq!(
            policy.cache_control_for("static/a.js"),
            "public, max-age=86400, immutable"
        );
        assert_eq!(policy.cache_control_for("assets/a.js"), "no-cache");
    }
}
