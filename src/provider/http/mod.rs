//! Shared HTTP plumbing for the API client.

mod client;
mod sse;

pub use client::HttpClient;
pub use sse::SseParser;
