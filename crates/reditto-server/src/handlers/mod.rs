//! HTTP handler modules.
//!
//! Handlers are thin: they hand headers and body to the [`Pipeline`] and wrap
//! the result. No business logic lives here.
//!
//! [`Pipeline`]: crate::pipeline::Pipeline

pub mod health;
pub mod submissions;
