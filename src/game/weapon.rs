//! Per-turn weapon stat snapshots supplied by the caller.

use serde::{Deserialize, Serialize};

use super::moves::{Move, ALL_MOVES};

/// Attack and defense values of one weapon.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StatLine {
    pub attack: f64,
    pub defense: f64,
}

/// The opponent's weapon stats for each of its three actions.
///
/// Never persisted: the engine only uses it for the decision it arrives with.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WeaponStats {
    pub rock: StatLine,
    pub paper: StatLine,
    pub scissors: StatLine,
}

impl WeaponStats {
    pub fn new(rock: StatLine, paper: StatLine, scissors: StatLine) -> Self {
        WeaponStats {
            rock,
            paper,
            scissors,
        }
    }

    pub fn get(&self, m: Move) -> StatLine {
        match m {
            Move::Rock => self.rock,
            Move::Paper => self.paper,
            Move::Scissors => self.scissors,
        }
    }

    /// Attack values in move order, negatives clamped to zero.
    pub fn attacks(&self) -> [f64; 3] {
        ALL_MOVES.map(|m| self.get(m).attack.max(0.0))
    }

    /// Defense values in move order, negatives clamped to zero.
    pub fn defenses(&self) -> [f64; 3] {
        ALL_MOVES.map(|m| self.get(m).defense.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_follow_move_order() {
        let stats = WeaponStats::new(
            StatLine {
                attack: 5.0,
                defense: 1.0,
            },
            StatLine {
                attack: -2.0,
                defense: 3.0,
            },
            StatLine {
                attack: 1.0,
                defense: 0.0,
            },
        );
        assert_eq!(stats.attacks(), [5.0, 0.0, 1.0]);
        assert_eq!(stats.defenses(), [1.0, 3.0, 0.0]);
        assert_eq!(stats.get(Move::Paper).defense, 3.0);
    }
}
