//! Periodicity and recurring-sequence detection.

use std::collections::HashMap;

use serde::Serialize;

use crate::game::Move;

/// Longest trailing span inspected for a cycle.
pub const CYCLE_SPAN: usize = 24;
/// Shortest span that can confirm any cycle.
pub const MIN_CYCLE_SPAN: usize = 6;

pub const DEFAULT_MAX_PERIOD: usize = 8;

const MIN_SEQUENCE_LEN: usize = 2;
const MAX_SEQUENCE_LEN: usize = 4;
const TOP_SEQUENCES: usize = 3;
const MIN_SEQUENCE_COUNT: u32 = 2;

/// Smallest period `p` in `1..=max_period` such that the trailing span of
/// `history` (at most 24 moves, at least `max(6, 2p)`) repeats with period
/// `p`.
pub fn detect_cycle(history: &[Move], max_period: usize) -> Option<usize> {
    let span = history.len().min(CYCLE_SPAN);
    let tail = &history[history.len() - span..];
    (1..=max_period).find(|&p| {
        span >= MIN_CYCLE_SPAN.max(2 * p) && (p..span).all(|i| tail[i] == tail[i - p])
    })
}

/// A subsequence that keeps coming back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceSummary {
    pub pattern: Vec<Move>,
    pub count: u32,
    /// Occurrences over the number of windows of that length.
    pub frequency: f64,
}

/// The most frequent recurring subsequences of length 2..=4, strongest first.
///
/// A length is only considered once the history holds two full copies of it.
pub fn strongest_sequences(history: &[Move]) -> Vec<SequenceSummary> {
    let mut found = Vec::new();
    for len in MIN_SEQUENCE_LEN..=MAX_SEQUENCE_LEN {
        if history.len() < 2 * len {
            continue;
        }
        let mut counts: HashMap<&[Move], u32> = HashMap::new();
        for window in history.windows(len) {
            *counts.entry(window).or_default() += 1;
        }
        let windows = (history.len() - len + 1) as f64;
        found.extend(
            counts
                .into_iter()
                .filter(|&(_, c)| c >= MIN_SEQUENCE_COUNT)
                .map(|(pattern, count)| SequenceSummary {
                    pattern: pattern.to_vec(),
                    count,
                    frequency: count as f64 / windows,
                }),
        );
    }
    // Stable order: count, then longer patterns, then move order.
    found.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then(b.pattern.len().cmp(&a.pattern.len()))
            .then(a.pattern.cmp(&b.pattern))
    });
    found.truncate(TOP_SEQUENCES);
    found
}
