//! Access guard: origin allow-list and bearer-credential resolution.
//!
//! Runs before any payload work or paid upstream call. The origin check is
//! local; the credential is resolved through an [`IdentityResolver`], which in
//! production asks the identity service who the token belongs to.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header::{AUTHORIZATION, ORIGIN};
use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;

use reditto_core::{Identity, PipelineError};

use crate::config::IdentityConfig;

/// Resolves a bearer credential to a caller identity.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Identity, PipelineError>;
}

/// Resolver backed by a Supabase-style `GET /auth/v1/user` endpoint.
pub struct HttpIdentityResolver {
    client: reqwest::Client,
    user_endpoint: String,
    api_key: String,
}

impl HttpIdentityResolver {
    pub fn new(client: reqwest::Client, config: &IdentityConfig) -> Self {
        HttpIdentityResolver {
            client,
            user_endpoint: format!("{}/auth/v1/user", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: Option<String>,
}

#[async_trait]
impl IdentityResolver for HttpIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<Identity, PipelineError> {
        let response = self
            .client
            .get(&self.user_endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| PipelineError::Internal(format!("identity service unreachable: {err}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PipelineError::Unauthenticated);
        }
        if !status.is_success() {
            return Err(PipelineError::Internal(format!(
                "identity service returned {status}"
            )));
        }

        let user: UserResponse = response
            .json()
            .await
            .map_err(|err| PipelineError::Internal(format!("identity response unreadable: {err}")))?;

        user.id
            .filter(|id| !id.is_empty())
            .map(|user_id| Identity { user_id })
            .ok_or(PipelineError::Unauthenticated)
    }
}

/// Origin and credential checks shared by both flows.
#[derive(Clone)]
pub struct AccessGuard {
    allowed_origins: Vec<String>,
    resolver: Arc<dyn IdentityResolver>,
}

impl AccessGuard {
    pub fn new(allowed_origins: Vec<String>, resolver: Arc<dyn IdentityResolver>) -> Self {
        AccessGuard {
            allowed_origins,
            resolver,
        }
    }

    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    /// Rejects requests whose declared origin is not allow-listed.
    ///
    /// Requests without an `Origin` header (non-browser clients) pass.
    pub fn check_origin(&self, headers: &HeaderMap) -> Result<(), PipelineError> {
        let Some(origin) = headers.get(ORIGIN) else {
            return Ok(());
        };
        let origin = origin
            .to_str()
            .map_err(|_| PipelineError::ForbiddenOrigin)?
            .trim_end_matches('/');
        if self.allowed_origins.iter().any(|allowed| allowed == origin) {
            Ok(())
        } else {
            Err(PipelineError::ForbiddenOrigin)
        }
    }

    /// Origin check, then credential resolution.
    pub async fn authorize(&self, headers: &HeaderMap) -> Result<Identity, PipelineError> {
        self.check_origin(headers)?;
        let token = bearer_token(headers)?;
        self.resolver.resolve(token).await
    }
}

/// Extracts the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, PipelineError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(PipelineError::Unauthenticated)?
        .to_str()
        .map_err(|_| PipelineError::Unauthenticated)?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(PipelineError::Unauthenticated)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer")
        || token.is_empty()
        || token.contains(char::is_whitespace)
    {
        return Err(PipelineError::Unauthenticated);
    }
    Ok(token)
}
