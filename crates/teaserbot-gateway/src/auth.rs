//! Bearer-token authentication for the HTTP boundary

use axum::http::{header, HeaderMap};
use teaserbot_core::{AuthConfig, AuthMode, Error, Result};

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

#[derive(Clone, Debug)]
pub struct ResolvedAuth {
    pub mode: AuthMode,
    pub token: Option<String>,
}

impl ResolvedAuth {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            mode: config.mode.clone(),
            token: config.token.clone(),
        }
    }

    pub fn none() -> Self {
        Self {
            mode: AuthMode::None,
            token: None,
        }
    }

    pub fn token(token: impl Into<String>) -> Self {
        Self {
            mode: AuthMode::Token,
            token: Some(token.into()),
        }
    }

    pub fn verify_token(&self, provided: Option<&str>) -> Result<()> {
        match self.mode {
            AuthMode::None => Ok(()),
            AuthMode::Token => {
                let expected = self
                    .token
                    .as_deref()
                    .ok_or_else(|| Error::auth_failed("no token configured"))?;
                let provided = provided.ok_or_else(|| Error::auth_failed("token required"))?;
                if !constant_time_eq(expected.as_bytes(), provided.as_bytes()) {
                    return Err(Error::auth_failed("invalid token"));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_token_auth() {
        let auth = ResolvedAuth::token("test-token-123");
        assert!(auth.verify_token(Some("test-token-123")).is_ok());
        assert!(auth.verify_token(Some("wrong-token")).is_err());
        assert!(auth.verify_token(Some("test-token-12")).is_err());
        assert!(auth.verify_token(None).is_err());
    }

    #[test]
    fn test_token_mode_without_token_rejects() {
        let auth = ResolvedAuth::from_config(&AuthConfig::default());
        let err = auth.verify_token(Some("anything")).unwrap_err();
        assert!(err.to_string().contains("no token configured"));
    }

    #[test]
    fn test_no_auth() {
        let auth = ResolvedAuth::none();
        assert!(auth.verify_token(None).is_ok());
        assert!(auth.verify_token(Some("anything")).is_ok());
    }

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc "));
        assert_eq!(bearer_token(&headers), Some("abc"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }
}
