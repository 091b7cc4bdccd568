//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup; nothing here is consulted from
//! ambient global state afterwards. Cookie attributes in particular are an
//! explicit [`CookieOptions`] value handed to the auth handlers.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID for the document store
    pub gcp_project_id: String,

    /// Signing secret for short-lived access tokens (raw bytes)
    pub access_token_secret: Vec<u8>,
    /// Access token lifetime in seconds
    pub access_token_ttl_secs: i64,
    /// Signing secret for long-lived refresh tokens (raw bytes)
    pub refresh_token_secret: Vec<u8>,
    /// Refresh token lifetime in seconds
    pub refresh_token_ttl_secs: i64,

    /// Media host endpoint and credentials
    pub media: MediaConfig,

    /// Attributes applied to the auth cookies
    pub cookies: CookieOptions,
}

/// Remote media host settings.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// API base URL, e.g. `https://api.media-host.example`
    pub base_url: String,
    /// Account namespace on the host
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Attributes for the `accessToken`/`refreshToken` cookies.
///
/// Clearing on logout must use the same attributes, so these live in one
/// place instead of being rebuilt per handler.
#[derive(Debug, Clone)]
pub struct CookieOptions {
    /// Set the `Secure` attribute (disabled for plain-HTTP local dev)
    pub secure: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            // Absent means the default; present but unparsable is an error.
            port: match env::var("PORT") {
                Err(_) => 8080,
                Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            },
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),

            access_token_secret: env::var("ACCESS_TOKEN_SECRET")
                .map_err(|_| ConfigError::Missing("ACCESS_TOKEN_SECRET"))?
                .into_bytes(),
            access_token_ttl_secs: parse_ttl("ACCESS_TOKEN_TTL_SECS", 15 * 60)?,
            refresh_token_secret: env::var("REFRESH_TOKEN_SECRET")
                .map_err(|_| ConfigError::Missing("REFRESH_TOKEN_SECRET"))?
                .into_bytes(),
            refresh_token_ttl_secs: parse_ttl("REFRESH_TOKEN_TTL_SECS", 10 * 24 * 60 * 60)?,

            media: MediaConfig {
                base_url: env::var("MEDIA_BASE_URL")
                    .map_err(|_| ConfigError::Missing("MEDIA_BASE_URL"))?,
                cloud_name: env::var("MEDIA_CLOUD_NAME")
                    .map_err(|_| ConfigError::Missing("MEDIA_CLOUD_NAME"))?,
                api_key: env::var("MEDIA_API_KEY")
                    .map(|v| v.trim().to_string())
                    .map_err(|_| ConfigError::Missing("MEDIA_API_KEY"))?,
                api_secret: env::var("MEDIA_API_SECRET")
                    .map(|v| v.trim().to_string())
                    .map_err(|_| ConfigError::Missing("MEDIA_API_SECRET"))?,
            },

            cookies: CookieOptions {
                secure: env::var("COOKIE_SECURE")
                    .map(|v| v != "false" && v != "0")
                    .unwrap_or(true),
            },
        })
    }

    /// Default config for tests only.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            access_token_secret: b"test_access_secret_32_bytes_min!".to_vec(),
            access_token_ttl_secs: 15 * 60,
            refresh_token_secret: b"test_refresh_secret_32_bytes_ok!".to_vec(),
            refresh_token_ttl_secs: 10 * 24 * 60 * 60,
            media: MediaConfig {
                base_url: "http://localhost:9999".to_string(),
                cloud_name: "test-cloud".to_string(),
                api_key: "test_key".to_string(),
                api_secret: "test_secret".to_string(),
            },
            cookies: CookieOptions { secure: true },
        }
    }
}

fn parse_ttl(name: &'static str, default_secs: i64) -> Result<i64, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default_secs),
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid(name)),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("ACCESS_TOKEN_SECRET", "access_secret_for_tests_32bytes!");
        env::set_var("REFRESH_TOKEN_SECRET", "refresh_secret_for_tests_32byte!");
        env::set_var("MEDIA_BASE_URL", "http://localhost:9999");
        env::set_var("MEDIA_CLOUD_NAME", "test-cloud");
        env::set_var("MEDIA_API_KEY", "k");
        env::set_var("MEDIA_API_SECRET", "s");
        env::remove_var("ACCESS_TOKEN_TTL_SECS");
        env::remove_var("PORT");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.port, 8080);
        assert_eq!(config.access_token_ttl_secs, 15 * 60);
        assert_eq!(config.media.cloud_name, "test-cloud");
        assert!(config.cookies.secure);

        // A PORT that is set but unparsable is rejected, not defaulted.
        env::set_var("PORT", "not-a-port");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("PORT"))
        ));
        env::remove_var("PORT");
    }
}
