//! Services module
//!
//! Contains the upstream aggregator client and the fan-out dispatcher.

pub mod fanout;
pub mod upstream;

#[cfg(test)]
pub(crate) mod fake;

pub use fanout::{display_completion, Completion, DispatchResult, FanOut, FanOutConfig, ERROR_MARKER};
pub use upstream::{ModelListing, OpenRouterService, Upstream, UpstreamError};
