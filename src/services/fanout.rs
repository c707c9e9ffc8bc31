//! Fan-out dispatch
//!
//! Sends the same transcript to many models at once and gathers every answer
//! keyed by model id. Each model runs as its own tokio task; a per-dispatch
//! semaphore caps how many upstream calls are in flight. One entry per
//! requested model is always returned, whatever happened to its call.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::FanOutSettings;
use crate::schemas::{ApiKey, Message};
use crate::services::upstream::{Upstream, UpstreamError};

/// Prefix of every flattened failure string
pub const ERROR_MARKER: &str = "Error: ";

/// Outcome of one model's completion
pub type Completion = Result<String, UpstreamError>;

/// Fan-out limits
#[derive(Debug, Clone)]
pub struct FanOutConfig {
    /// Maximum simultaneous upstream calls per dispatch
    pub max_concurrency: usize,
    /// Overall deadline; `None` waits for every call's own timeout
    pub deadline: Option<Duration>,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            deadline: None,
        }
    }
}

impl From<&FanOutSettings> for FanOutConfig {
    fn from(settings: &FanOutSettings) -> Self {
        Self {
            max_concurrency: settings.max_concurrency,
            deadline: settings.deadline_seconds.map(Duration::from_secs),
        }
    }
}

/// Per-model results of one dispatch
#[derive(Debug, Default)]
pub struct DispatchResult {
    replies: HashMap<String, Completion>,
}

impl DispatchResult {
    pub fn len(&self) -> usize {
        self.replies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }

    pub fn get(&self, model: &str) -> Option<&Completion> {
        self.replies.get(model)
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.replies.keys().map(String::as_str)
    }

    pub fn failure_count(&self) -> usize {
        self.replies.values().filter(|r| r.is_err()).count()
    }

    /// Flatten every outcome to display text, failures as `"Error: <detail>"`
    pub fn into_display_map(self) -> BTreeMap<String, String> {
        self.replies
            .into_iter()
            .map(|(model, outcome)| {
                let text = display_completion(&outcome);
                (model, text)
            })
            .collect()
    }
}

/// Render one completion for the caller
pub fn display_completion(outcome: &Completion) -> String {
    match outcome {
        Ok(text) => text.clone(),
        Err(e) => format!("{}{}", ERROR_MARKER, e),
    }
}

/// Bounded parallel dispatcher over an [`Upstream`]
#[derive(Clone)]
pub struct FanOut {
    upstream: Arc<dyn Upstream>,
    config: FanOutConfig,
}

impl FanOut {
    pub fn new(upstream: Arc<dyn Upstream>, config: FanOutConfig) -> Self {
        Self { upstream, config }
    }

    pub fn config(&self) -> &FanOutConfig {
        &self.config
    }

    /// Ask every model in `models` to complete `messages`
    ///
    /// Duplicate ids are collapsed. The returned key set always equals the
    /// set of requested ids: calls that panic, or are still running when the
    /// deadline fires, get an error entry.
    pub async fn dispatch(
        &self,
        api_key: &ApiKey,
        models: &[String],
        messages: &[Message],
    ) -> DispatchResult {
        let started = Instant::now();
        let targets: BTreeSet<String> = models.iter().cloned().collect();

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let api_key = Arc::new(api_key.clone());
        let messages: Arc<[Message]> = Arc::from(messages);

        let mut tasks = JoinSet::new();
        for model in &targets {
            let upstream = Arc::clone(&self.upstream);
            let semaphore = Arc::clone(&semaphore);
            let api_key = Arc::clone(&api_key);
            let messages = Arc::clone(&messages);
            let model = model.clone();

            tasks.spawn(async move {
                let outcome = match semaphore.acquire().await {
                    Ok(_permit) => upstream.complete(&api_key, &model, &messages).await,
                    Err(_) => Err(UpstreamError::Aborted("concurrency limiter closed".to_string())),
                };
                (model, outcome)
            });
        }

        let deadline = self
            .config
            .deadline
            .map(|limit| (limit, tokio::time::Instant::now() + limit));
        let mut replies: HashMap<String, Completion> = HashMap::with_capacity(targets.len());
        let mut timed_out = false;

        loop {
            let next = match deadline {
                Some((_, at)) => match tokio::time::timeout_at(at, tasks.join_next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        timed_out = true;
                        tasks.abort_all();
                        break;
                    }
                },
                None => tasks.join_next().await,
            };

            match next {
                Some(Ok((model, outcome))) => {
                    match &outcome {
                        Ok(text) => tracing::debug!(
                            model = %model,
                            response_chars = text.chars().count(),
                            "Model completed"
                        ),
                        Err(e) => tracing::warn!(model = %model, error = %e, "Model failed"),
                    }
                    replies.insert(model, outcome);
                }
                Some(Err(e)) => {
                    tracing::error!(error = %e, "Completion task did not finish");
                }
                None => break,
            }
        }

        for model in targets {
            if replies.contains_key(&model) {
                continue;
            }
            let err = match deadline {
                Some((limit, _)) if timed_out => UpstreamError::DeadlineExceeded(limit),
                _ => UpstreamError::Aborted("task panicked or was cancelled".to_string()),
            };
            tracing::warn!(model = %model, error = %err, "Model did not report back");
            replies.insert(model, Err(err));
        }

        let result = DispatchResult { replies };

        tracing::info!(
            model_count = result.len(),
            failures = result.failure_count(),
            timed_out,
            duration_ms = %format!("{:.2}", started.elapsed().as_secs_f64() * 1000.0),
            "Fan-out dispatch finished"
        );

        result
    }
}
