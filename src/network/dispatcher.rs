//! Fan-out of one logical operation to every node.
//!
//! Every node is called concurrently and every outcome is awaited; a slow or
//! failing node only ever costs its own slot. The batch is then classified
//! against the caller's threshold. No retries happen here.

use std::future::Future;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::time::{Instant, timeout_at};

use crate::error::{QuorumError, QuorumResult};
use crate::network::consensus;
use crate::network::endpoint::{Endpoint, compose_node_url};
use crate::network::node_set::NodeSet;

/// Where a single call goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTarget {
    pub node_url: String,
    pub full_url: String,
}

/// A per-node failure, captured instead of thrown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFailure {
    pub node_url: String,
    pub full_url: String,
    pub error: QuorumError,
}

/// Outcome of a dispatched batch.
#[derive(Debug, Clone)]
pub enum BatchResult<T> {
    /// At least `threshold` nodes succeeded. Values keep node-set order.
    Success { values: Vec<T> },
    /// Fewer than `threshold` nodes succeeded.
    Rejected {
        /// Most common per-node error.
        error: QuorumError,
        failed_node_urls: Vec<String>,
        failures: Vec<NodeFailure>,
        successes: usize,
        threshold: usize,
    },
}

impl<T> BatchResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Turn a rejected batch into a [`QuorumError::QuorumNotReached`].
    pub fn into_result(self) -> QuorumResult<Vec<T>> {
        match self {
            Self::Success { values } => Ok(values),
            Self::Rejected {
                error,
                failed_node_urls,
                successes,
                threshold,
                ..
            } => Err(QuorumError::QuorumNotReached {
                error: Box::new(error),
                failed_node_urls,
                successes,
                threshold,
            }),
        }
    }
}

/// Issues one request per node and classifies the batch.
#[derive(Debug, Clone, Copy)]
pub struct RequestDispatcher {
    per_call_timeout: Duration,
    overall_deadline: Option<Duration>,
}

impl RequestDispatcher {
    pub fn new(per_call_timeout: Duration) -> Self {
        Self {
            per_call_timeout,
            overall_deadline: None,
        }
    }

    /// Bound the whole batch. Calls still running at the deadline count as
    /// per-node failures.
    #[must_use]
    pub fn with_overall_deadline(mut self, deadline: Duration) -> Self {
        self.overall_deadline = Some(deadline);
        self
    }

    pub fn per_call_timeout(&self) -> Duration {
        self.per_call_timeout
    }

    /// Dispatch to every node of `node_set`.
    ///
    /// Every base URL is validated before anything is sent; an invalid URL is
    /// a fatal error, not a per-node failure.
    pub async fn dispatch<T, F, Fut>(
        &self,
        node_set: &NodeSet,
        endpoint: &Endpoint,
        request_factory: F,
        threshold: usize,
    ) -> QuorumResult<BatchResult<T>>
    where
        F: Fn(NodeTarget) -> Fut,
        Fut: Future<Output = QuorumResult<T>>,
    {
        if threshold == 0 {
            return Err(QuorumError::InvalidInput(
                "Dispatch threshold must be at least 1".to_string(),
            ));
        }

        let targets = node_set
            .urls()
            .iter()
            .map(|node_url| {
                Ok(NodeTarget {
                    node_url: node_url.clone(),
                    full_url: compose_node_url(node_url, endpoint)?,
                })
            })
            .collect::<QuorumResult<Vec<_>>>()?;

        let started = Instant::now();
        let call_deadline = started + self.per_call_timeout;
        let deadline = match self.overall_deadline {
            Some(overall) => call_deadline.min(started + overall),
            None => call_deadline,
        };
        let timeout_ms = u64::try_from(deadline.duration_since(started).as_millis())
            .unwrap_or(u64::MAX);

        let calls = targets.into_iter().map(|target| {
            let future = request_factory(target.clone());
            async move {
                let outcome = match timeout_at(deadline, future).await {
                    Ok(result) => result,
                    Err(_) => Err(QuorumError::NodeTimeout(timeout_ms)),
                };
                (target, outcome)
            }
        });

        let outcomes = join_all(calls).await;

        let mut values = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (target, outcome) in outcomes {
            match outcome {
                Ok(value) => values.push(value),
                Err(error) => {
                    tracing::warn!(
                        node_url = %target.node_url,
                        full_url = %target.full_url,
                        error = %error,
                        "Node request failed"
                    );
                    failures.push(NodeFailure {
                        node_url: target.node_url,
                        full_url: target.full_url,
                        error,
                    });
                }
            }
        }

        let successes = values.len();
        tracing::debug!(
            path = %endpoint.path,
            successes,
            failures = failures.len(),
            threshold,
            elapsed_ms = started.elapsed().as_millis(),
            "Dispatch settled"
        );

        if successes >= threshold {
            return Ok(BatchResult::Success { values });
        }

        let error = most_common_error(&failures).unwrap_or_else(|| {
            QuorumError::InvalidInput(format!(
                "Node set of {} cannot satisfy threshold {threshold}",
                node_set.len()
            ))
        });

        tracing::warn!(
            path = %endpoint.path,
            successes,
            threshold,
            error = %error,
            "Quorum not reached"
        );

        Ok(BatchResult::Rejected {
            error,
            failed_node_urls: failures.iter().map(|f| f.node_url.clone()).collect(),
            failures,
            successes,
            threshold,
        })
    }
}

/// Pick the representative failure: the first error of the most common kind.
fn most_common_error(failures: &[NodeFailure]) -> Option<QuorumError> {
    let kind = consensus::most_common(
        failures
            .iter()
            .map(|f| f.error.error_code().unwrap_or("INTERNAL")),
    )?;
    failures
        .iter()
        .find(|f| f.error.error_code().unwrap_or("INTERNAL") == kind)
        .map(|f| f.error.clone())
}
