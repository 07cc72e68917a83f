//! Client for the inference server's generate endpoint.
//!
//! One operation: `POST {endpoint}` with `{context, batch_size, ...params}`,
//! answered by either `{tokens, attention}` or `{context}`.

pub mod client;
pub mod error;
pub mod types;

pub use client::{InferenceClient, InferenceClientBuilder};
pub use error::{ClientError, Result};
pub use types::{GenerateRequest, GenerateResponse};
