//! HTTP service for essay text extraction and rubric grading.
//!
//! Wires the pure validator and coercer from `reditto-core` to an access
//! guard, an upstream model gateway and an axum router. This crate contains
//! the configuration, pipeline orchestration, error mapping and routes.

pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod llm_provider;
pub mod pipeline;
pub mod router;
pub mod schema;
pub mod state;
