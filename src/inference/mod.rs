//! HTTP transport for the generation service.
//!
//! [`GenerationClient`] issues exactly one request per call; retry policy lives in
//! [`crate::backoff`] and admission control in [`crate::queue`].

pub mod client;
pub mod types;

pub use client::GenerationClient;
pub use types::{GenerateRequest, GenerationConfig};
