//! Application state container
//!
//! This module defines the shared application state that is passed
//! to all request handlers via Axum's state extraction.

use crate::config::Settings;
use crate::services::{FanOut, FanOutConfig, OpenRouterService, Upstream};
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
///
/// Cheaply cloneable; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Upstream aggregator client
    pub upstream: Arc<dyn Upstream>,

    /// Fan-out dispatcher sharing the same upstream client
    pub fanout: FanOut,

    /// Application start time (for uptime calculation)
    pub start_time: Instant,
}

impl AppState {
    /// Create the application state with the OpenRouter client
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        tracing::debug!(base_url = %settings.upstream.base_url, "Creating upstream client");
        let upstream = OpenRouterService::new(&settings.upstream)?;

        Ok(Self::with_upstream(settings, Arc::new(upstream)))
    }

    /// Create the application state around any upstream implementation
    pub fn with_upstream(settings: Settings, upstream: Arc<dyn Upstream>) -> Self {
        let fanout = FanOut::new(Arc::clone(&upstream), FanOutConfig::from(&settings.fanout));

        tracing::info!(
            max_concurrency = fanout.config().max_concurrency,
            deadline = ?fanout.config().deadline,
            "Application state initialized"
        );

        Self {
            settings: Arc::new(settings),
            upstream,
            fanout,
            start_time: Instant::now(),
        }
    }

    /// Get the application uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
