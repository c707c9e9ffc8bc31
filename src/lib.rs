//! Ask Em All - ask many LLMs the same question through one aggregator API

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod schemas;
pub mod server;
pub mod services;

// Re-export commonly used types
pub use config::Settings;
pub use error::ApiError;
pub use server::App;
pub use services::{FanOut, OpenRouterService, Upstream};
