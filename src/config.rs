use std::env;

pub const DEFAULT_TELNYX_API_BASE: &str = "https://api.telnyx.com";
pub const DEFAULT_DOCUMO_API_BASE: &str = "https://api.documo.com";
pub const DEFAULT_HUMBLEFAX_API_BASE: &str = "https://api.humblefax.com";

/// Process configuration, read once at startup and shared read-only with
/// every request.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub port: u16,
    /// Origin used for media and callback URLs. Derived from the request
    /// when unset.
    pub public_base_url: Option<String>,
    /// Configured provider name; resolved per request.
    pub fax_provider: Option<String>,
    /// Outbound caller id.
    pub fax_from: Option<String>,
    pub basic_auth_user: Option<String>,
    pub basic_auth_pass: Option<String>,
    /// Directory for the filesystem blob store. In-memory when unset.
    pub blob_dir: Option<String>,

    pub telnyx_api_key: Option<String>,
    pub telnyx_connection_id: Option<String>,
    pub telnyx_api_base: String,

    pub documo_api_key: Option<String>,
    pub documo_api_base: String,

    pub humblefax_access_key: Option<String>,
    pub humblefax_secret_key: Option<String>,
    pub humblefax_api_base: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source. Empty values are
    /// treated as absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            port: get("PORT").and_then(|p| p.parse().ok()).unwrap_or(3000),
            public_base_url: get("PUBLIC_BASE_URL").map(|u| u.trim_end_matches('/').to_string()),
            fax_provider: get("FAX_PROVIDER"),
            fax_from: get("FAX_FROM"),
            basic_auth_user: get("BASIC_AUTH_USER"),
            basic_auth_pass: get("BASIC_AUTH_PASS"),
            blob_dir: get("BLOB_DIR"),

            telnyx_api_key: get("TELNYX_API_KEY"),
            telnyx_connection_id: get("TELNYX_CONNECTION_ID"),
            telnyx_api_base: api_base(get("TELNYX_API_BASE"), DEFAULT_TELNYX_API_BASE),

            documo_api_key: get("DOCUMO_API_KEY"),
            documo_api_base: api_base(get("DOCUMO_API_BASE"), DEFAULT_DOCUMO_API_BASE),

            humblefax_access_key: get("HUMBLEFAX_ACCESS_KEY"),
            humblefax_secret_key: get("HUMBLEFAX_SECRET_KEY"),
            humblefax_api_base: api_base(get("HUMBLEFAX_API_BASE"), DEFAULT_HUMBLEFAX_API_BASE),
        }
    }

    /// Basic auth is enforced only when a user or a password is configured.
    pub fn auth_enabled(&self) -> bool {
        self.basic_auth_user.is_some() || self.basic_auth_pass.is_some()
    }
}

fn api_base(value: Option<String>, default: &str) -> String {
    value
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.telnyx_api_base, DEFAULT_TELNYX_API_BASE);
        assert!(config.fax_provider.is_none());
        assert!(!config.auth_enabled());
    }

    #[test]
    fn test_empty_values_are_absent() {
        let config = config_from(&[("TELNYX_API_KEY", "  "), ("FAX_FROM", "")]);
        assert!(config.telnyx_api_key.is_none());
        assert!(config.fax_from.is_none());
    }

    #[test]
    fn test_trailing_slashes_trimmed() {
        let config = config_from(&[
            ("PUBLIC_BASE_URL", "https://fax.example.com/"),
            ("DOCUMO_API_BASE", "http://127.0.0.1:9000/"),
        ]);
        assert_eq!(config.public_base_url.as_deref(), Some("https://fax.example.com"));
        assert_eq!(config.documo_api_base, "http://127.0.0.1:9000");
    }
}
