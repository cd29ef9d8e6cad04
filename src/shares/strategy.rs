//! Choosing one node response out of many.
//!
//! Nodes running user code may return different strings. The default pick is
//! the least common response: a single honest node that noticed something the
//! others did not should not be outvoted.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::str::FromStr;
use std::sync::Arc;

use crate::network::consensus;

/// Built-in strategies, selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StrategyKind {
    #[default]
    LeastCommon,
    MostCommon,
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', '-'], "").as_str() {
            "leastcommon" => Ok(Self::LeastCommon),
            "mostcommon" => Ok(Self::MostCommon),
            other => Err(format!("Unknown response strategy: {other}")),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LeastCommon => f.write_str("leastCommon"),
            Self::MostCommon => f.write_str("mostCommon"),
        }
    }
}

/// Caller-supplied filter over all node responses.
pub type CustomFilter = Arc<dyn Fn(&[String]) -> Result<String, String> + Send + Sync>;

/// How to pick the final response of an executeJs call.
#[derive(Clone, Default)]
pub enum ResponseStrategy {
    #[default]
    LeastCommon,
    MostCommon,
    /// Falls back to [`ResponseStrategy::LeastCommon`] when the filter is
    /// missing, returns an error, or panics.
    Custom(Option<CustomFilter>),
}

impl ResponseStrategy {
    pub fn custom<F>(filter: F) -> Self
    where
        F: Fn(&[String]) -> Result<String, String> + Send + Sync + 'static,
    {
        Self::Custom(Some(Arc::new(filter)))
    }

    /// Pick one response. `None` only for an empty input.
    pub fn resolve(&self, responses: &[String]) -> Option<String> {
        if responses.is_empty() {
            return None;
        }

        match self {
            Self::LeastCommon => consensus::least_common(responses.iter().cloned()),
            Self::MostCommon => consensus::most_common(responses.iter().cloned()),
            Self::Custom(None) => {
                tracing::error!("Custom response strategy has no filter, using leastCommon");
                consensus::least_common(responses.iter().cloned())
            }
            Self::Custom(Some(filter)) => {
                match catch_unwind(AssertUnwindSafe(|| filter(responses))) {
                    Ok(Ok(response)) => Some(response),
                    Ok(Err(error)) => {
                        tracing::error!(
                            error = %error,
                            "Custom response filter failed, using leastCommon"
                        );
                        consensus::least_common(responses.iter().cloned())
                    }
                    Err(_) => {
                        tracing::error!("Custom response filter panicked, using leastCommon");
                        consensus::least_common(responses.iter().cloned())
                    }
                }
            }
        }
    }
}

impl From<StrategyKind> for ResponseStrategy {
    fn from(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::LeastCommon => Self::LeastCommon,
            StrategyKind::MostCommon => Self::MostCommon,
        }
    }
}

impl std::fmt::Debug for ResponseStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LeastCommon => f.write_str("LeastCommon"),
            Self::MostCommon => f.write_str("MostCommon"),
            Self::Custom(filter) => f
                .debug_tuple("Custom")
                .field(&filter.as_ref().map(|_| "<filter>"))
                .finish(),
        }
    }
}
