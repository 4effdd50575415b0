//! API schema types for response bodies.
//!
//! Request bodies are parsed by the validator in `reditto-core`, so only the
//! success envelopes live here. Error bodies come from [`crate::error::ApiError`].

pub mod submissions;
