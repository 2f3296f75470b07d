//! Game primitives.
//!
//! Moves and their cyclic beats-relation, round outcomes, legal-move sets
//! derived from weapon charges, distributions over the opponent's next
//! move, and the weapon stat snapshot supplied with each decision request.

pub mod distribution;
pub mod moves;
pub mod weapon;

pub use distribution::{Blend, Distribution, SUM_TOLERANCE};
pub use moves::{Charges, Move, MoveSet, Outcome, ALL_MOVES};
pub use weapon::{StatLine, WeaponStats};
