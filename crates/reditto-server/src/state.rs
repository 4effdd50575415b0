//! Application state shared by all handlers.
//!
//! [`AppState`] holds the [`Pipeline`] behind an `Arc`. The pipeline is
//! immutable after construction, so no lock is needed.

use std::sync::Arc;

use crate::config::{ConfigError, ServerConfig};
use crate::guard::{AccessGuard, HttpIdentityResolver, IdentityResolver};
use crate::llm_provider::{ModelGateway, OpenRouterGateway};
use crate::pipeline::{ExtractTextFlow, GradeEssayFlow, Pipeline};

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    /// Builds state with the production identity resolver and model gateway.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        let upstream_client = reqwest::Client::builder()
            .timeout(config.upstream.timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        let identity_client = reqwest::Client::builder()
            .timeout(config.identity.timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        let resolver = Arc::new(HttpIdentityResolver::new(identity_client, &config.identity));
        let gateway = Arc::new(OpenRouterGateway::new(upstream_client, &config.upstream));
        Ok(Self::with_collaborators(config, resolver, gateway))
    }

    /// Builds state around caller-supplied collaborators (used by tests).
    pub fn with_collaborators(
        config: &ServerConfig,
        resolver: Arc<dyn IdentityResolver>,
        gateway: Arc<dyn ModelGateway>,
    ) -> Self {
        let guard = AccessGuard::new(config.allowed_origins.clone(), resolver);
        let pipeline = Pipeline::new(
            guard,
            gateway,
            config.limits,
            ExtractTextFlow {
                settings: config.upstream.extraction.clone(),
            },
            GradeEssayFlow {
                settings: config.upstream.grading.clone(),
            },
        );
        AppState {
            pipeline: Arc::new(pipeline),
        }
    }
}
