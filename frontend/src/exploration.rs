//! Step-by-step exploration/validation runs driven against a host.

use crate::api::{ApiError, HostApi};
use crate::error::Result;
use garde::Validate;
use navgraph_types::api::{ExplorationItemResult, ExplorationStepRequest, ExplorationStepResponse};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Host reported no more items
    Completed,
    /// The stop flag was raised
    Stopped,
    /// Host answered `success: false`
    Failed(String),
}

/// Aggregate of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplorationSummary {
    pub exploration_id: Option<String>,
    pub completed_items: u32,
    pub total_items: u32,
    pub results: Vec<ExplorationItemResult>,
    pub outcome: RunOutcome,
}

impl ExplorationSummary {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }
}

/// Polls `/server/exploration/next` until the host runs out of items.
pub struct ExplorationRunner {
    api: Arc<dyn HostApi>,
    poll_interval: Duration,
}

impl ExplorationRunner {
    pub fn new(api: Arc<dyn HostApi>, poll_interval: Duration) -> Self {
        Self { api, poll_interval }
    }

    /// Run to completion, calling `on_step` after every host response.
    ///
    /// Transport errors are returned; a host refusing to continue ends the run
    /// with [`RunOutcome::Failed`].
    pub async fn run<F>(
        &self,
        mut request: ExplorationStepRequest,
        stop: &AtomicBool,
        mut on_step: F,
    ) -> Result<ExplorationSummary>
    where
        F: FnMut(&ExplorationStepResponse),
    {
        request.validate()?;
        info!(
            "Starting exploration of tree {} on {}/{}",
            request.tree_id, request.host_name, request.device_id
        );

        let mut summary = ExplorationSummary {
            exploration_id: request.exploration_id.clone(),
            completed_items: 0,
            total_items: 0,
            results: Vec::new(),
            outcome: RunOutcome::Stopped,
        };

        loop {
            if stop.load(Ordering::SeqCst) {
                info!("Exploration stopped after {} items", summary.completed_items);
                summary.outcome = RunOutcome::Stopped;
                break;
            }

            let response = match self.api.exploration_step(&request).await {
                Ok(response) => response,
                Err(ApiError::Rejected(message)) => {
                    warn!("Host ended exploration: {}", message);
                    summary.outcome = RunOutcome::Failed(message);
                    break;
                }
                Err(e) => return Err(e.into()),
            };
            on_step(&response);

            if request.exploration_id.is_none() {
                request.exploration_id = response.exploration_id.clone();
                summary.exploration_id = response.exploration_id.clone();
            }
            summary.completed_items = response.completed_items;
            summary.total_items = response.total_items;
            if let Some(result) = response.result {
                debug!("Explored {}: passed={}", result.item, result.passed);
                summary.results.push(result);
            }

            if !response.has_more_items {
                info!(
                    "Exploration finished: {}/{} items",
                    summary.completed_items, summary.total_items
                );
                summary.outcome = RunOutcome::Completed;
                break;
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        Ok(summary)
    }
}
