//! NVIDIA chat-completions client.
//!
//! A thin OpenAI-compatible API layer: an HTTP wrapper with bearer auth,
//! an incremental SSE parser, and the Nemotron client that relays streamed
//! text deltas over a channel.

mod error;
mod http;
mod nemotron;
mod types;

pub use error::{Error, format_api_error};
pub use nemotron::NemotronClient;
pub use types::*;
