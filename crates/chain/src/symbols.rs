//! State label resolution and the zero-mean correlation labeling.

use std::collections::BTreeMap;

/// How state labels are supplied.
#[derive(Debug, Clone)]
pub enum SymbolsSpec {
    /// `K` anonymous states labeled `"0" .. "K-1"`.
    Count(usize),
    /// Explicit label -> index mapping.
    Map(BTreeMap<String, usize>),
    /// Ordered labels; position is the index.
    Labels(Vec<String>),
}

/// Bidirectional mapping between user labels and internal state indices.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    index: BTreeMap<String, usize>,
    labels: Vec<String>,
}

impl SymbolTable {
    /// Builds the table from a [`SymbolsSpec`].
    pub fn resolve(spec: &SymbolsSpec) -> Self {
        match spec {
            SymbolsSpec::Count(k) => Self::from_count(*k),
            SymbolsSpec::Map(map) => Self::from_map(map.clone()),
            SymbolsSpec::Labels(labels) => Self::from_labels(labels.clone()),
        }
    }

    /// Identity table of size `k`: label `"i"` maps to index `i`.
    pub fn from_count(k: usize) -> Self {
        Self::from_labels((0..k).map(|i| i.to_string()).collect())
    }

    /// Table from an ordered label list; the position is the index.
    pub fn from_labels(labels: Vec<String>) -> Self {
        let index = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect();
        Self { index, labels }
    }

    /// Table from an explicit mapping.
    pub fn from_map(index: BTreeMap<String, usize>) -> Self {
        let k = index.values().map(|&i| i + 1).max().unwrap_or(0);
        let mut labels = vec![String::new(); k];
        for (label, &i) in &index {
            labels[i] = label.clone();
        }
        Self { index, labels }
    }

    /// Number of states.
    pub fn k(&self) -> usize {
        self.labels.len()
    }

    /// Index of a label, if known.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// Label of an index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= k()`.
    pub fn label(&self, index: usize) -> &str {
        &self.labels[index]
    }
}

/// Zero-mean integer labeling used as the correlation variate.
///
/// Odd `K` yields `[0, +1, -1, +2, -2, …]`; even `K` yields
/// `[+1, -1, +2, -2, …]`. Either way the labels sum to zero.
pub fn correlation_labels(k: usize) -> Vec<i64> {
    let mut labels = Vec::with_capacity(k);
    if k % 2 == 1 {
        labels.push(0);
    }
    let mut magnitude = 1;
    while labels.len() < k {
        labels.push(magnitude);
        labels.push(-magnitude);
        magnitude += 1;
    }
    labels.truncate(k);
    labels
}
