#![allow(clippy::missing_errors_doc)]

pub mod chat;
pub mod config;
pub mod error;
pub mod input;
pub mod menu;
pub mod provider;
pub mod tts;
