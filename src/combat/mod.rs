//! Combat encounter module
//!
//! Implements encounter tracking:
//! - Combat lifecycle (setup, active, ended) with a single live combat
//! - Initiative roster ordered by roll
//! - Per-participant battle state (damage, conditions, current turn)
//! - Turn advance with round wrap

mod error;
mod model;
mod store;
mod turn;

pub use error::CombatError;
pub use model::{
    Combat, CombatUpdate, Initiative, InitiativeUpdate, NewCombat, NewInitiative, Phase,
};
pub use store::CombatStore;
pub use turn::{next_turn, sort_roster, TurnAdvance};
