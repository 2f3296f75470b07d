//! Moves, the beats-relation, round outcomes and legal-move sets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// One of the three combat actions.
///
/// Declaration order is the fixed priority used for every deterministic
/// tie-break: Rock, then Paper, then Scissors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

/// All moves in priority order.
pub const ALL_MOVES: [Move; 3] = [Move::Rock, Move::Paper, Move::Scissors];

impl Move {
    /// Dense index used for distribution arrays.
    pub const fn index(self) -> usize {
        match self {
            Move::Rock => 0,
            Move::Paper => 1,
            Move::Scissors => 2,
        }
    }

    /// Inverse of [`Move::index`]. Indices wrap modulo 3.
    pub const fn from_index(i: usize) -> Move {
        match i % 3 {
            0 => Move::Rock,
            1 => Move::Paper,
            _ => Move::Scissors,
        }
    }

    /// The move that defeats `self`.
    pub const fn counter(self) -> Move {
        match self {
            Move::Rock => Move::Paper,
            Move::Paper => Move::Scissors,
            Move::Scissors => Move::Rock,
        }
    }

    /// The move that `self` defeats.
    pub const fn beaten(self) -> Move {
        match self {
            Move::Rock => Move::Scissors,
            Move::Paper => Move::Rock,
            Move::Scissors => Move::Paper,
        }
    }

    /// Returns true if `self` defeats `other`.
    pub const fn beats(self, other: Move) -> bool {
        other.counter().index() == self.index()
    }

    /// Name as spelled by the game service.
    pub const fn name(self) -> &'static str {
        match self {
            Move::Rock => "rock",
            Move::Paper => "paper",
            Move::Scissors => "scissor",
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Move {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rock" => Ok(Move::Rock),
            "paper" => Ok(Move::Paper),
            "scissor" | "scissors" => Ok(Move::Scissors),
            _ => Err(EngineError::InvalidObservation(s.to_string())),
        }
    }
}

/// Result of a round from our side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Tie,
}

impl Outcome {
    /// Resolves a round.
    pub const fn of(ours: Move, theirs: Move) -> Outcome {
        if ours.index() == theirs.index() {
            Outcome::Tie
        } else if ours.beats(theirs) {
            Outcome::Win
        } else {
            Outcome::Loss
        }
    }

    /// The same round seen from the other side.
    pub const fn flipped(self) -> Outcome {
        match self {
            Outcome::Win => Outcome::Loss,
            Outcome::Loss => Outcome::Win,
            Outcome::Tie => Outcome::Tie,
        }
    }

    /// +1 for a win, -1 for a loss, 0 for a tie.
    pub const fn reward(self) -> f64 {
        match self {
            Outcome::Win => 1.0,
            Outcome::Loss => -1.0,
            Outcome::Tie => 0.0,
        }
    }

    /// Hedge loss: 0 for a win, 1 for a loss, 0.5 for a tie.
    pub const fn hedge_loss(self) -> f64 {
        match self {
            Outcome::Win => 0.0,
            Outcome::Loss => 1.0,
            Outcome::Tie => 0.5,
        }
    }
}

/// Set of moves that are currently legal, stored as a 3-bit mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MoveSet(u8);

impl MoveSet {
    /// Every move available.
    pub const ALL: MoveSet = MoveSet(0b111);

    /// No move available.
    pub const EMPTY: MoveSet = MoveSet(0);

    /// Builds a set from explicit moves.
    pub fn of(moves: &[Move]) -> Self {
        moves.iter().copied().collect()
    }

    /// Builds a set from remaining charges; an action with zero charge is out.
    pub fn from_charges(charges: Charges) -> Self {
        ALL_MOVES
            .iter()
            .copied()
            .filter(|&m| charges.get(m) > 0)
            .collect()
    }

    pub const fn contains(self, m: Move) -> bool {
        self.0 & (1 << m.index()) != 0
    }

    pub fn insert(&mut self, m: Move) {
        self.0 |= 1 << m.index();
    }

    pub fn remove(&mut self, m: Move) {
        self.0 &= !(1 << m.index());
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members in priority order.
    pub fn iter(self) -> impl Iterator<Item = Move> {
        ALL_MOVES.into_iter().filter(move |&m| self.contains(m))
    }

    /// Members collected into a vector, in priority order.
    pub fn to_vec(self) -> Vec<Move> {
        self.iter().collect()
    }
}

impl FromIterator<Move> for MoveSet {
    fn from_iter<I: IntoIterator<Item = Move>>(iter: I) -> Self {
        let mut set = MoveSet::EMPTY;
        for m in iter {
            set.insert(m);
        }
        set
    }
}

/// Remaining charge per action, supplied fresh by the caller every turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Charges {
    pub rock: u32,
    pub paper: u32,
    pub scissors: u32,
}

impl Charges {
    pub const fn new(rock: u32, paper: u32, scissors: u32) -> Self {
        Charges {
            rock,
            paper,
            scissors,
        }
    }

    pub const fn get(&self, m: Move) -> u32 {
        match m {
            Move::Rock => self.rock,
            Move::Paper => self.paper,
            Move::Scissors => self.scissors,
        }
    }

    pub fn get_mut(&mut self, m: Move) -> &mut u32 {
        match m {
            Move::Rock => &mut self.rock,
            Move::Paper => &mut self.paper,
            Move::Scissors => &mut self.scissors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_is_a_three_cycle() {
        for m in ALL_MOVES {
            assert!(m.counter().beats(m));
            assert!(m.beats(m.beaten()));
            assert_eq!(m.counter().counter().counter(), m);
            assert_eq!(m.counter().beaten(), m);
            assert!(!m.beats(m));
        }
    }

    #[test]
    fn outcome_of_rounds() {
        assert_eq!(Outcome::of(Move::Paper, Move::Rock), Outcome::Win);
        assert_eq!(Outcome::of(Move::Rock, Move::Paper), Outcome::Loss);
        assert_eq!(Outcome::of(Move::Scissors, Move::Scissors), Outcome::Tie);
        assert_eq!(Outcome::of(Move::Rock, Move::Scissors), Outcome::Win);
        assert_eq!(Outcome::Win.flipped(), Outcome::Loss);
    }

    #[test]
    fn parse_service_spelling() {
        assert_eq!("scissor".parse::<Move>().unwrap(), Move::Scissors);
        assert_eq!("Scissors".parse::<Move>().unwrap(), Move::Scissors);
        assert_eq!(" ROCK ".parse::<Move>().unwrap(), Move::Rock);
        assert!(matches!(
            "lizard".parse::<Move>(),
            Err(EngineError::InvalidObservation(_))
        ));
    }

    #[test]
    fn move_set_from_charges() {
        let set = MoveSet::from_charges(Charges::new(0, 2, 1));
        assert!(!set.contains(Move::Rock));
        assert!(set.contains(Move::Paper));
        assert!(set.contains(Move::Scissors));
        assert_eq!(set.len(), 2);
        assert_eq!(set.to_vec(), vec![Move::Paper, Move::Scissors]);
        assert!(MoveSet::from_charges(Charges::default()).is_empty());
    }

    #[test]
    fn move_set_insert_remove() {
        let mut set = MoveSet::ALL;
        set.remove(Move::Paper);
        assert_eq!(set, MoveSet::of(&[Move::Rock, Move::Scissors]));
        set.insert(Move::Paper);
        assert_eq!(set, MoveSet::ALL);
    }
}
