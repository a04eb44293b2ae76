//! Per-request token extraction.
//!
//! Framework-free: the serving layer hands over the raw
//! `Authorization` header and cookie values, and gets back the bearer
//! token (or nothing). The rest of the gate — validation, user
//! resolution, site-context resolution — lives on
//! [`crate::service::AuthService::authenticate`].

/// Bearer scheme prefix in the `Authorization` header.
const BEARER_PREFIX: &str = "Bearer ";

/// Cookie names accepted as a fallback token location.
pub const TOKEN_COOKIES: [&str; 2] = ["access_token", "auth_token"];

/// Extract the session token from the `Authorization` header (bearer
/// scheme) or a fallback cookie value, in that order.
pub fn extract_token<'a>(
    authorization: Option<&'a str>,
    cookie: Option<&'a str>,
) -> Option<&'a str> {
    if let Some(header) = authorization {
        if let Some(token) = header.strip_prefix(BEARER_PREFIX) {
            if !token.is_empty() {
                return Some(token);
            }
        }
    }

    cookie.filter(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_wins_over_cookie() {
        assert_eq!(
            extract_token(Some("Bearer abc.def.ghi"), Some("cookie-token")),
            Some("abc.def.ghi")
        );
    }

    #[test]
    fn cookie_is_the_fallback() {
        assert_eq!(extract_token(None, Some("cookie-token")), Some("cookie-token"));
        // A non-bearer header does not short-circuit the fallback.
        assert_eq!(
            extract_token(Some("Basic dXNlcjpwdw=="), Some("cookie-token")),
            Some("cookie-token")
        );
    }

    #[test]
    fn absent_everywhere_is_none() {
        assert_eq!(extract_token(None, None), None);
        assert_eq!(extract_token(Some("Bearer "), Some("")), None);
    }
}
