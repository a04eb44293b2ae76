//! Authentication configuration.

/// Configuration for the authentication service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// PEM-encoded Ed25519 private key for JWT signing.
    pub jwt_private_key_pem: String,
    /// PEM-encoded Ed25519 public key for JWT verification.
    pub jwt_public_key_pem: String,
    /// Session token lifetime in seconds (default: 86_400 = 24 hours).
    pub token_lifetime_secs: u64,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Optional pepper prepended to passwords before Argon2id
    /// verification. Must match the pepper the user repository hashes
    /// with.
    pub pepper: Option<String>,
    /// Minimum password length for policy enforcement.
    pub min_password_length: usize,
    /// Max consecutive failed login attempts before lockout
    /// (default: 5).
    pub max_failed_login_attempts: u64,
    /// Lockout duration in seconds, also the failure-counter window
    /// (default: 900 = 15 min).
    pub lockout_duration_secs: u64,
    /// Password-reset token lifetime in seconds
    /// (default: 1800 = 30 min).
    pub reset_token_lifetime_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_private_key_pem: String::new(),
            jwt_public_key_pem: String::new(),
            token_lifetime_secs: 86_400,
            jwt_issuer: "ims".into(),
            pepper: None,
            min_password_length: 8,
            max_failed_login_attempts: 5,
            lockout_duration_secs: 900,
            reset_token_lifetime_secs: 1800,
        }
    }
}
