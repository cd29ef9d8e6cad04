//! Agreement over values reported by independent nodes.
//!
//! Every vote in the crate goes through [`FrequencyTable`]: epoch agreement
//! during the handshake, public key and sig-type agreement during share
//! combination, error classification in the dispatcher and response selection
//! for serverless results.
//!
//! Ties are broken by first appearance: among values sharing the extreme
//! count, the one seen earliest in the input wins.
//!
//! A plurality is not a Byzantine-fault-tolerant quorum. Callers that need a
//! real majority use [`strict_majority`] or [`pick`] with
//! [`ConsensusMode::StrictMajority`].

use std::collections::HashMap;
use std::hash::Hash;

use crate::config::ConsensusMode;

/// Occurrence counts of distinct values, remembering first-appearance order.
#[derive(Debug, Clone)]
pub struct FrequencyTable<T> {
    order: Vec<T>,
    counts: HashMap<T, usize>,
    total: usize,
}

impl<T> FrequencyTable<T>
where
    T: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            counts: HashMap::new(),
            total: 0,
        }
    }

    pub fn add(&mut self, value: T) {
        self.total += 1;
        match self.counts.get_mut(&value) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(value.clone(), 1);
                self.order.push(value);
            }
        }
    }

    pub fn count(&self, value: &T) -> usize {
        self.counts.get(value).copied().unwrap_or(0)
    }

    /// Number of votes recorded.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of distinct values.
    pub fn distinct(&self) -> usize {
        self.order.len()
    }

    /// Most frequent value and its count.
    pub fn most_common(&self) -> Option<(&T, usize)> {
        let mut best: Option<(&T, usize)> = None;
        for value in &self.order {
            let count = self.count(value);
            if best.is_none_or(|(_, best_count)| count > best_count) {
                best = Some((value, count));
            }
        }
        best
    }

    /// Least frequent value and its count.
    pub fn least_common(&self) -> Option<(&T, usize)> {
        let mut best: Option<(&T, usize)> = None;
        for value in &self.order {
            let count = self.count(value);
            if best.is_none_or(|(_, best_count)| count < best_count) {
                best = Some((value, count));
            }
        }
        best
    }
}

impl<T> Default for FrequencyTable<T>
where
    T: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for FrequencyTable<T>
where
    T: Eq + Hash + Clone,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut table = Self::new();
        for value in iter {
            table.add(value);
        }
        table
    }
}

/// Plurality vote. `None` only for an empty input.
pub fn most_common<T, I>(values: I) -> Option<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let table: FrequencyTable<T> = values.into_iter().collect();
    table.most_common().map(|(value, _)| value.clone())
}

/// Rarest value. `None` only for an empty input.
pub fn least_common<T, I>(values: I) -> Option<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let table: FrequencyTable<T> = values.into_iter().collect();
    table.least_common().map(|(value, _)| value.clone())
}

/// Plurality winner, only if it holds more than half of the votes.
pub fn strict_majority<T, I>(values: I) -> Option<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let table: FrequencyTable<T> = values.into_iter().collect();
    let total = table.total();
    table
        .most_common()
        .filter(|(_, count)| count * 2 > total)
        .map(|(value, _)| value.clone())
}

/// Vote according to the configured consensus mode.
pub fn pick<T, I>(values: I, mode: ConsensusMode) -> Option<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    match mode {
        ConsensusMode::Plurality => most_common(values),
        ConsensusMode::StrictMajority => strict_majority(values),
    }
}

/// Plurality vote over JSON values, compared by their serialized form.
pub fn most_common_json<'a, I>(values: I) -> Option<serde_json::Value>
where
    I: IntoIterator<Item = &'a serde_json::Value>,
{
    let mut originals: HashMap<String, &serde_json::Value> = HashMap::new();
    let keys = values.into_iter().map(|value| {
        let key = value.to_string();
        originals.entry(key.clone()).or_insert(value);
        key
    });
    let winner = most_common(keys.collect::<Vec<_>>())?;
    originals.get(&winner).map(|value| (*value).clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_common_plurality() {
        assert_eq!(most_common(["a", "b", "a"]), Some("a"));
        assert_eq!(most_common(vec![5u64, 4, 5, 4, 5]), Some(5));
    }

    #[test]
    fn test_single_value() {
        assert_eq!(most_common(["only"]), Some("only"));
        assert_eq!(least_common(["only"]), Some("only"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(most_common(Vec::<String>::new()), None);
        assert_eq!(least_common(Vec::<String>::new()), None);
        assert_eq!(strict_majority(Vec::<String>::new()), None);
    }

    #[test]
    fn test_ties_break_on_first_appearance() {
        assert_eq!(most_common(["b", "a", "a", "b"]), Some("b"));
        assert_eq!(most_common(["x", "y", "z"]), Some("x"));
        assert_eq!(least_common(["a", "a", "c", "b"]), Some("c"));
    }

    #[test]
    fn test_least_common() {
        assert_eq!(least_common(["a", "b", "a", "a", "b", "c"]), Some("c"));
    }

    #[test]
    fn test_structural_equality_for_lists() {
        let keys = vec![
            vec!["k1".to_string(), "k2".to_string()],
            vec!["k1".to_string()],
            vec!["k1".to_string(), "k2".to_string()],
        ];
        assert_eq!(
            most_common(keys),
            Some(vec!["k1".to_string(), "k2".to_string()])
        );
    }

    #[test]
    fn test_strict_majority_requires_more_than_half() {
        assert_eq!(strict_majority(["a", "a", "b"]), Some("a"));
        assert_eq!(strict_majority(["a", "a", "b", "b"]), None);
        assert_eq!(strict_majority(["a", "b", "c", "a"]), None);
    }

    #[test]
    fn test_pick_by_mode() {
        let votes = ["a", "b", "c", "a"];
        assert_eq!(pick(votes, ConsensusMode::Plurality), Some("a"));
        assert_eq!(pick(votes, ConsensusMode::StrictMajority), None);
    }

    #[test]
    fn test_most_common_json() {
        let values = [
            serde_json::json!({"a": 1}),
            serde_json::json!({"b": 2}),
            serde_json::json!({"a": 1}),
        ];
        assert_eq!(
            most_common_json(values.iter()),
            Some(serde_json::json!({"a": 1}))
        );
    }

    #[test]
    fn test_frequency_table_counts() {
        let table: FrequencyTable<&str> = ["a", "b", "a"].into_iter().collect();
        assert_eq!(table.total(), 3);
        assert_eq!(table.distinct(), 2);
        assert_eq!(table.count(&"a"), 2);
        assert_eq!(table.count(&"z"), 0);
    }
}
