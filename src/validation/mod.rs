//! Unified validation framework for request payloads.
//!
//! Reusable validation rules applied consistently across all API
//! endpoints.

pub mod rules;

pub use validator::Validate;
