//! Gemini adapter for link discovery and pool summaries
//!
//! Responses are parsed against a strict schema at this boundary; chunk
//! shapes the schema does not know contribute nothing.

mod client;
mod types;

pub use client::{GeminiClient, GeminiError};
