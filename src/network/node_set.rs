//! Node membership tracking.
//!
//! A node set is the list of base URLs the client fans requests out to. It is
//! replaced wholesale when a handshake reports different membership and never
//! edited in place.

use serde::{Deserialize, Serialize};

use crate::error::{QuorumError, QuorumResult};

/// Ordered collection of node base URLs with multiset equality.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeSet {
    urls: Vec<String>,
}

impl NodeSet {
    /// Build a node set, rejecting duplicate URLs.
    pub fn new(urls: Vec<String>) -> QuorumResult<Self> {
        let mut seen = std::collections::HashSet::with_capacity(urls.len());
        for url in &urls {
            if !seen.insert(url.as_str()) {
                return Err(QuorumError::InvalidInput(format!(
                    "Duplicate node URL in node set: {url}"
                )));
            }
        }
        Ok(Self { urls })
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Whether `other` has different membership than `self`.
    pub fn differs_from(&self, other: &Self) -> bool {
        diff(&self.urls, &other.urls)
    }
}

impl PartialEq for NodeSet {
    fn eq(&self, other: &Self) -> bool {
        !self.differs_from(other)
    }
}

impl Eq for NodeSet {}

/// Compare two URL lists as multisets.
///
/// Lists of different length always differ; otherwise sorted copies are
/// compared element by element, so duplicates count by frequency.
pub fn diff<S: AsRef<str>>(old: &[S], new: &[S]) -> bool {
    if old.len() != new.len() {
        return true;
    }

    let mut old_sorted: Vec<&str> = old.iter().map(AsRef::as_ref).collect();
    let mut new_sorted: Vec<&str> = new.iter().map(AsRef::as_ref).collect();
    old_sorted.sort_unstable();
    new_sorted.sort_unstable();

    old_sorted
        .iter()
        .zip(new_sorted.iter())
        .any(|(a, b)| a != b)
}
