//! Sequence-pattern tables.
//!
//! For every context of length 1..=max_order seen in a history window, counts
//! which move followed it. The table is maintained incrementally as moves
//! enter and leave the window and always equals a fresh recount of the
//! window (see [`TransitionTable::from_history`]).

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::game::{Move, ALL_MOVES};

/// Longest context tracked by default (the highest Markov order).
pub const MAX_PATTERN_ORDER: usize = 3;

/// A context of up to eight moves, packed base-3 with the oldest move most
/// significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternKey {
    order: u8,
    code: u16,
}

impl PatternKey {
    /// Packs a context. Contexts longer than eight moves are truncated to
    /// their last eight.
    pub fn of(context: &[Move]) -> Self {
        let context = &context[context.len().saturating_sub(8)..];
        let code = context
            .iter()
            .fold(0u16, |acc, m| acc * 3 + m.index() as u16);
        PatternKey {
            order: context.len() as u8,
            code,
        }
    }

    pub fn order(&self) -> usize {
        self.order as usize
    }

    /// Unpacks the context, oldest move first.
    pub fn moves(&self) -> Vec<Move> {
        let mut out = vec![Move::Rock; self.order as usize];
        let mut code = self.code as usize;
        for slot in out.iter_mut().rev() {
            *slot = Move::from_index(code % 3);
            code /= 3;
        }
        out
    }
}

impl fmt::Display for PatternKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.moves().iter().map(|m| m.name()).collect();
        f.write_str(&names.join("-"))
    }
}

/// Next-move counts observed after one context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransitionCounts {
    pub counts: [u32; 3],
    pub total: u32,
}

impl TransitionCounts {
    pub fn get(&self, m: Move) -> u32 {
        self.counts[m.index()]
    }

    /// Most frequent next move; ties go to priority order.
    pub fn modal(&self) -> Option<Move> {
        if self.total == 0 {
            return None;
        }
        let mut best = Move::Rock;
        for m in ALL_MOVES {
            if self.get(m) > self.get(best) {
                best = m;
            }
        }
        Some(best)
    }
}

/// Context → next-move counts for one move history.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionTable {
    max_order: usize,
    table: BTreeMap<PatternKey, TransitionCounts>,
}

impl Default for TransitionTable {
    fn default() -> Self {
        TransitionTable::new(MAX_PATTERN_ORDER)
    }
}

impl TransitionTable {
    pub fn new(max_order: usize) -> Self {
        TransitionTable {
            max_order: max_order.clamp(1, 8),
            table: BTreeMap::new(),
        }
    }

    /// Counts every transition inside `history`.
    pub fn from_history(history: &[Move], max_order: usize) -> Self {
        let mut table = TransitionTable::new(max_order);
        for i in 0..history.len() {
            table.record(&history[..i], history[i]);
        }
        table
    }

    pub fn max_order(&self) -> usize {
        self.max_order
    }

    /// Records that `next` followed `history` (the window before `next` is
    /// appended).
    pub fn record(&mut self, history: &[Move], next: Move) {
        for k in 1..=self.max_order.min(history.len()) {
            let key = PatternKey::of(&history[history.len() - k..]);
            let entry = self.table.entry(key).or_default();
            entry.counts[next.index()] += 1;
            entry.total += 1;
        }
    }

    /// Forgets the transitions that start at the front of `history`, which is
    /// about to be evicted from the window.
    pub fn evict_front(&mut self, history: &[Move]) {
        for k in 1..=self.max_order {
            if history.len() <= k {
                break;
            }
            let key = PatternKey::of(&history[..k]);
            let next = history[k];
            if let Some(entry) = self.table.get_mut(&key) {
                let slot = &mut entry.counts[next.index()];
                if *slot > 0 {
                    *slot -= 1;
                    entry.total -= 1;
                }
                if entry.total == 0 {
                    self.table.remove(&key);
                }
            }
        }
    }

    pub fn get(&self, context: &[Move]) -> Option<&TransitionCounts> {
        self.table.get(&PatternKey::of(context))
    }

    /// Counts for the context formed by the last `order` moves of `history`.
    pub fn current(&self, history: &[Move], order: usize) -> Option<&TransitionCounts> {
        if order == 0 || order > self.max_order || history.len() < order {
            return None;
        }
        self.get(&history[history.len() - order..])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PatternKey, &TransitionCounts)> {
        self.table.iter()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }
}
