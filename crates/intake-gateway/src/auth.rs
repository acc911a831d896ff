// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-token authentication middleware for the gateway.
//!
//! When no token is configured, all requests are rejected (fail-closed).

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

/// Authentication configuration for the gateway.
#[derive(Clone)]
pub struct AuthConfig {
    /// Expected bearer token. If `None`, every protected route answers 401.
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

impl AuthConfig {
    fn accepts(&self, header: Option<&str>) -> bool {
        match (&self.bearer_token, header.and_then(|v| v.strip_prefix("Bearer "))) {
            (Some(expected), Some(token)) => token == expected,
            _ => false,
        }
    }
}

/// Middleware that validates the `Authorization: Bearer <token>` header.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth.bearer_token.is_none() {
        tracing::error!("gateway has no bearer token configured -- rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let header = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok());

    if auth.accepts(header) {
        Ok(next.run(request).await)
    } else {
        tracing::debug!(path = %request.uri().path(), "gateway auth rejected");
        Err(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_token(token: Option<&str>) -> AuthConfig {
        AuthConfig {
            bearer_token: token.map(str::to_string),
        }
    }

    #[test]
    fn debug_redacts_token() {
        let debug = format!("{:?}", with_token(Some("secret-token")));
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[redacted]"));
    }

    #[test]
    fn accepts_only_exact_bearer() {
        let auth = with_token(Some("s3cret"));
        assert!(auth.accepts(Some("Bearer s3cret")));
        assert!(!auth.accepts(Some("Bearer wrong")));
        assert!(!auth.accepts(Some("s3cret")));
        assert!(!auth.accepts(Some("Basic s3cret")));
        assert!(!auth.accepts(None));
    }

    #[test]
    fn no_token_rejects_everything() {
        assert!(!with_token(None).accepts(Some("Bearer anything")));
    }
}
