//! In-memory [`Upstream`] for tests

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::schemas::{ApiKey, Message, ModelDescriptor};
use crate::services::upstream::{ModelListing, Upstream, UpstreamError};

/// Answers `"<model>: <last message>"` after a fixed latency
#[derive(Default)]
pub struct FakeUpstream {
    latency: Duration,
    per_model_latency: HashMap<String, Duration>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    catalogue: Vec<ModelDescriptor>,
    list_fails: bool,
    calls: AtomicUsize,
    list_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeUpstream {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn failing(mut self, models: &[&str]) -> Self {
        self.failing.extend(models.iter().map(|m| m.to_string()));
        self
    }

    pub fn panicking(mut self, models: &[&str]) -> Self {
        self.panicking.extend(models.iter().map(|m| m.to_string()));
        self
    }

    pub fn with_latency(mut self, model: &str, latency: Duration) -> Self {
        self.per_model_latency.insert(model.to_string(), latency);
        self
    }

    pub fn with_catalogue(mut self, ids: &[&str]) -> Self {
        self.catalogue = ids
            .iter()
            .map(|id| ModelDescriptor {
                id: id.to_string(),
                name: id.to_uppercase(),
            })
            .collect();
        self
    }

    pub fn listing_fails(mut self) -> Self {
        self.list_fails = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Upstream for FakeUpstream {
    async fn list_models(&self, api_key: &ApiKey) -> ModelListing {
        if api_key.is_empty() {
            return ModelListing::default();
        }
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.list_fails {
            return ModelListing::degraded();
        }
        ModelListing::available(self.catalogue.clone())
    }

    async fn complete(
        &self,
        _api_key: &ApiKey,
        model: &str,
        messages: &[Message],
    ) -> Result<String, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let latency = self.per_model_latency.get(model).copied().unwrap_or(self.latency);
        tokio::time::sleep(latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panicking.contains(model) {
            panic!("fake upstream panicked for {}", model);
        }
        if self.failing.contains(model) {
            return Err(UpstreamError::Status {
                status: 503,
                message: format!("{} is unavailable", model),
            });
        }

        let last = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        Ok(format!("{}: {}", model, last))
    }
}
