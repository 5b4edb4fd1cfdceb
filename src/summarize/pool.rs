//! Bounded worker pool for summarizer calls.
//!
//! Calls run concurrently up to a fixed ceiling, each under its own timeout
//! and retry policy. Results are returned in group order regardless of the
//! order in which calls finish.

use std::collections::HashMap;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};
use tracing::{debug, warn};

use crate::change::ChangeGroup;
use crate::error::SummarizerError;
use crate::summarize::retry::{DEFAULT_MAX_ATTEMPTS, retry_with_backoff};
use crate::summarize::{Summarizer, Summary};

/// Environment variable to configure the per-call timeout (in seconds).
pub const TIMEOUT_ENV_VAR: &str = "SCRIVENER_SUMMARY_TIMEOUT";

/// Environment variable to configure how many calls run at once.
pub const CONCURRENCY_ENV_VAR: &str = "SCRIVENER_SUMMARY_CONCURRENCY";

/// Environment variable to configure total attempts per call.
pub const ATTEMPTS_ENV_VAR: &str = "SCRIVENER_SUMMARY_ATTEMPTS";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryPoolConfig {
    /// Deadline for a single summarizer call.
    pub timeout: Duration,
    /// Maximum calls in flight.
    pub concurrency: usize,
    /// Total attempts per call, including the first.
    pub max_attempts: u32,
}

impl Default for SummaryPoolConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl SummaryPoolConfig {
    /// Defaults overridden by the `SCRIVENER_SUMMARY_*` environment variables.
    ///
    /// Unparseable values are reported and ignored.
    pub fn from_env() -> Self {
        Self {
            timeout: Duration::from_secs(env_or(TIMEOUT_ENV_VAR, DEFAULT_TIMEOUT_SECS)),
            concurrency: env_or(CONCURRENCY_ENV_VAR, DEFAULT_CONCURRENCY),
            max_attempts: env_or(ATTEMPTS_ENV_VAR, DEFAULT_MAX_ATTEMPTS),
        }
    }
}

fn env_or<T: FromStr + Display + PartialEq + Default>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(v) if !v.is_empty() => match v.parse::<T>() {
            Ok(value) if value != T::default() => value,
            _ => {
                warn!("Invalid {} value '{}', using default {}", name, v, default);
                default
            }
        },
        _ => default,
    }
}

/// What happened to one group's summarizer call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    Ready(Summary),
    /// The call failed or timed out.
    Missing(SummarizerError),
    /// The call was cancelled before it finished.
    Unfinished,
}

/// Outcomes in group order, plus the fatal error that stopped the run, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryBatch {
    pub outcomes: Vec<SummaryOutcome>,
    pub failure: Option<SummarizerError>,
}

#[derive(Debug, Clone, Default)]
pub struct SummaryPool {
    config: SummaryPoolConfig,
}

impl SummaryPool {
    pub fn new(config: SummaryPoolConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SummaryPoolConfig {
        &self.config
    }

    /// Summarize every group.
    ///
    /// A fatal error (unavailable summarizer, panicked task) cancels the calls
    /// still in flight; summaries that already completed are kept.
    pub async fn summarize_all(
        &self,
        summarizer: Arc<dyn Summarizer>,
        groups: &[ChangeGroup],
    ) -> SummaryBatch {
        let mut outcomes: Vec<SummaryOutcome> =
            groups.iter().map(|_| SummaryOutcome::Unfinished).collect();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut task_groups: HashMap<Id, usize> = HashMap::with_capacity(groups.len());

        for (index, group) in groups.iter().enumerate() {
            let summarizer = Arc::clone(&summarizer);
            let semaphore = Arc::clone(&semaphore);
            let group = group.clone();
            let config = self.config.clone();

            let handle = tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (
                        index,
                        Err(SummarizerError::Unavailable("summary pool closed".to_string())),
                    );
                };
                let result = summarize_one(summarizer.as_ref(), &group, &config).await;
                (index, result)
            });
            task_groups.insert(handle.id(), index);
        }

        debug!(
            "Summarizing {} groups with concurrency {}",
            groups.len(),
            self.config.concurrency.max(1)
        );

        let mut failure: Option<SummarizerError> = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(summary))) => outcomes[index] = SummaryOutcome::Ready(summary),
                Ok((index, Err(e))) => {
                    warn!("Summary for group {} failed: {}", index + 1, e);
                    if e.is_fatal() {
                        failure.get_or_insert_with(|| e.clone());
                        tasks.abort_all();
                    }
                    outcomes[index] = SummaryOutcome::Missing(e);
                }
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    let error = match task_groups.get(&e.id()) {
                        Some(&index) => {
                            let error =
                                SummarizerError::Panicked(format!("group {}: {}", index + 1, e));
                            outcomes[index] = SummaryOutcome::Missing(error.clone());
                            error
                        }
                        None => SummarizerError::Panicked(e.to_string()),
                    };
                    warn!("{}", error);
                    failure.get_or_insert(error);
                    tasks.abort_all();
                }
            }
        }

        if failure.is_some() {
            let unfinished = outcomes
                .iter()
                .filter(|o| matches!(o, SummaryOutcome::Unfinished))
                .count();
            debug!("Cancelled {} outstanding summaries", unfinished);
        }

        SummaryBatch { outcomes, failure }
    }
}

/// One call under the configured timeout and retry policy.
async fn summarize_one(
    summarizer: &dyn Summarizer,
    group: &ChangeGroup,
    config: &SummaryPoolConfig,
) -> Result<Summary, SummarizerError> {
    let timeout = config.timeout;
    retry_with_backoff(
        config.max_attempts,
        || async {
            match tokio::time::timeout(timeout, summarizer.summarize(group)).await {
                Ok(result) => result,
                Err(_) => Err(SummarizerError::Timeout(timeout.as_secs())),
            }
        },
        SummarizerError::is_fatal,
        |e| SummarizerError::RetriesExhausted(Box::new(e)),
    )
    .await
}
