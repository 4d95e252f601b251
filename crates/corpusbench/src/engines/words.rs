// Corpusbench - CPU vs GPU Corpus Statistics
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Word frequency.
//!
//! There is no device path for this engine. Tokenization produces irregular,
//! variable-length output per record and serves as the control case next to
//! the two accelerated engines.

use super::Timed;
use crate::core::Stopwatch;
use std::collections::HashMap;

/// A token and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordCount {
    /// Lowercase token.
    pub word: String,
    /// Occurrences across the corpus.
    pub count: u64,
}

/// Token counts that remember first-seen order.
#[derive(Debug, Clone, Default)]
pub struct FrequencyTable {
    index: HashMap<String, usize>,
    entries: Vec<(String, u64)>,
    total: u64,
}

impl FrequencyTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one occurrence of `token`.
    pub fn add(&mut self, token: &str) {
        self.total += 1;
        if let Some(&i) = self.index.get(token) {
            self.entries[i].1 += 1;
        } else {
            self.index.insert(token.to_owned(), self.entries.len());
            self.entries.push((token.to_owned(), 1));
        }
    }

    /// Tokenizes `text` and counts every token.
    pub fn add_text(&mut self, text: &str) {
        let lowered = text.to_lowercase();
        for token in tokenize(&lowered) {
            self.add(token);
        }
    }

    /// Occurrences of `token`.
    pub fn count(&self, token: &str) -> u64 {
        self.index
            .get(token)
            .map(|&i| self.entries[i].1)
            .unwrap_or(0)
    }

    /// Total tokens counted.
    pub fn total_tokens(&self) -> u64 {
        self.total
    }

    /// Distinct tokens counted.
    pub fn unique_tokens(&self) -> usize {
        self.entries.len()
    }

    /// The `n` most frequent tokens, by count descending and then by
    /// first occurrence.
    pub fn top_n(&self, n: usize) -> Vec<WordCount> {
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by(|&a, &b| {
            self.entries[b]
                .1
                .cmp(&self.entries[a].1)
                .then_with(|| a.cmp(&b))
        });
        order
            .into_iter()
            .take(n)
            .map(|i| WordCount {
                word: self.entries[i].0.clone(),
                count: self.entries[i].1,
            })
            .collect()
    }
}

/// Splits already-lowercased text into runs of alphanumerics and underscores.
pub fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
}

/// Word frequency summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordFrequency {
    /// Tokens in the corpus.
    pub total_tokens: u64,
    /// Distinct tokens in the corpus.
    pub unique_tokens: usize,
    /// Most frequent tokens.
    pub top: Vec<WordCount>,
}

/// Counts words across `texts` and keeps the `top_n` most frequent.
pub fn word_frequency_cpu<S: AsRef<str>>(
    texts: &[S],
    top_n: usize,
) -> Timed<WordFrequency> {
    let stopwatch = Stopwatch::start();
    let mut table = FrequencyTable::new();
    for text in texts {
        table.add_text(text.as_ref());
    }
    let summary = WordFrequency {
        total_tokens: table.total_tokens(),
        unique_tokens: table.unique_tokens(),
        top: table.top_n(top_n),
    };
    Timed::new(summary, stopwatch.stop())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        let tokens: Vec<&str> = tokenize("it's snake_case, 42 times--done").collect();
        assert_eq!(tokens, vec!["it", "s", "snake_case", "42", "times", "done"]);
    }

    #[test]
    fn test_tokenize_unicode() {
        let tokens: Vec<&str> = tokenize("naïve café über").collect();
        assert_eq!(tokens, vec!["naïve", "café", "über"]);
    }

    #[test]
    fn test_tie_break_by_first_seen() {
        let timed = word_frequency_cpu(&["the cat sat", "the dog sat"], 10);
        let top = &timed.value.top;
        assert_eq!(top[0], WordCount { word: "the".to_string(), count: 2 });
        assert_eq!(top[1], WordCount { word: "sat".to_string(), count: 2 });
        assert_eq!(top[2].word, "cat");
        assert_eq!(top[3].word, "dog");
    }

    #[test]
    fn test_counts_are_case_insensitive() {
        let mut table = FrequencyTable::new();
        table.add_text("Rust rust RUST");
        assert_eq!(table.count("rust"), 3);
        assert_eq!(table.count("Rust"), 0);
        assert_eq!(table.unique_tokens(), 1);
    }

    #[test]
    fn test_totals() {
        let timed = word_frequency_cpu(&["a b c", "a b", "a"], 2);
        assert_eq!(timed.value.total_tokens, 6);
        assert_eq!(timed.value.unique_tokens, 3);
        assert_eq!(timed.value.top.len(), 2);
        assert_eq!(timed.value.top[0].word, "a");
        assert_eq!(timed.value.top[1].word, "b");
    }

    #[test]
    fn test_higher_count_beats_earlier_token() {
        let timed = word_frequency_cpu(&["alpha beta beta"], 2);
        assert_eq!(timed.value.top[0].word, "beta");
        assert_eq!(timed.value.top[1].word, "alpha");
    }

    #[test]
    fn test_empty_input() {
        let texts: [&str; 0] = [];
        let timed = word_frequency_cpu(&texts, 5);
        assert_eq!(timed.value.total_tokens, 0);
        assert!(timed.value.top.is_empty());
    }
}
