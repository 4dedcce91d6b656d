//! Request authentication. The service only needs one question answered,
//! which user does this bearer token belong to, so the collaborator trait
//! is exactly that.

use std::collections::HashMap;

use crate::config::AuthConfig;

pub type UserId = i64;

pub trait Authenticator: Send + Sync {
    /// Resolve a bearer token to a user id, or `None` for unknown tokens.
    fn resolve(&self, token: &str) -> Option<UserId>;
}

/// Static token table from the config file. Fits single-box deployments;
/// anything fancier implements [`Authenticator`] instead.
pub struct TokenAuthenticator {
    tokens: HashMap<String, UserId>,
}

impl TokenAuthenticator {
    pub fn new(tokens: HashMap<String, UserId>) -> Self {
        Self { tokens }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.tokens.clone())
    }
}

impl Authenticator for TokenAuthenticator {
    fn resolve(&self, token: &str) -> Option<UserId> {
        self.tokens.get(token).copied()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> TokenAuthenticator {
        let mut tokens = HashMap::new();
        tokens.insert("alpha-token".to_string(), 1);
        tokens.insert("beta-token".to_string(), 2);
        TokenAuthenticator::new(tokens)
    }

    #[test]
    fn test_known_tokens_resolve() {
        let auth = authenticator();
        assert_eq!(auth.resolve("alpha-token"), Some(1));
        assert_eq!(auth.resolve("beta-token"), Some(2));
    }

    #[test]
    fn test_unknown_token_is_rejected() {
        let auth = authenticator();
        assert_eq!(auth.resolve("gamma-token"), None);
        assert_eq!(auth.resolve(""), None);
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(bearer_token("Bearer  spaced "), Some("spaced"));
        assert_eq!(bearer_token("Basic abc123"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc123"), None);
    }

    #[test]
    fn test_empty_config_rejects_everyone() {
        let auth = TokenAuthenticator::from_config(&AuthConfig::default());
        assert_eq!(auth.resolve("anything"), None);
    }
}
