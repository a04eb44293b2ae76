//! Environment-based server configuration.

use ims_auth::AuthConfig;
use ims_db::DbConfig;

/// Full server configuration, assembled from `IMS_*` environment
/// variables with sensible defaults for local development.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub auth: AuthConfig,
    /// Debug mode exposes internal error detail in responses.
    pub debug: bool,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    /// Load configuration from the environment.
    pub fn from_env() -> Self {
        let db_defaults = DbConfig::default();
        let auth_defaults = AuthConfig::default();

        let db = DbConfig {
            url: env_or("IMS_DB_URL", &db_defaults.url),
            namespace: env_or("IMS_DB_NAMESPACE", &db_defaults.namespace),
            database: env_or("IMS_DB_DATABASE", &db_defaults.database),
            username: env_or("IMS_DB_USERNAME", &db_defaults.username),
            password: env_or("IMS_DB_PASSWORD", &db_defaults.password),
        };

        let auth = AuthConfig {
            jwt_private_key_pem: env_or("IMS_JWT_PRIVATE_KEY", ""),
            jwt_public_key_pem: env_or("IMS_JWT_PUBLIC_KEY", ""),
            token_lifetime_secs: env_parse_or(
                "IMS_TOKEN_LIFETIME_SECS",
                auth_defaults.token_lifetime_secs,
            ),
            jwt_issuer: env_or("IMS_JWT_ISSUER", &auth_defaults.jwt_issuer),
            pepper: std::env::var("IMS_PASSWORD_PEPPER").ok(),
            min_password_length: env_parse_or(
                "IMS_MIN_PASSWORD_LENGTH",
                auth_defaults.min_password_length,
            ),
            max_failed_login_attempts: env_parse_or(
                "IMS_MAX_FAILED_LOGIN_ATTEMPTS",
                auth_defaults.max_failed_login_attempts,
            ),
            lockout_duration_secs: env_parse_or(
                "IMS_LOCKOUT_DURATION_SECS",
                auth_defaults.lockout_duration_secs,
            ),
            reset_token_lifetime_secs: env_parse_or(
                "IMS_RESET_TOKEN_LIFETIME_SECS",
                auth_defaults.reset_token_lifetime_secs,
            ),
        };

        Self {
            db,
            auth,
            debug: env_parse_or("IMS_DEBUG", false),
        }
    }
}
