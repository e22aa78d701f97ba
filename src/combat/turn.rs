//! Turn order
//!
//! Highest order first; equal orders keep insertion order (lower id first).

use std::cmp::Ordering;

use super::Initiative;

/// Result of advancing the turn marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnAdvance {
    /// Participant whose turn starts
    pub next_id: i64,
    /// True when the marker wrapped past the last participant
    pub new_round: bool,
}

fn turn_order(a: &Initiative, b: &Initiative) -> Ordering {
    b.order.cmp(&a.order).then_with(|| a.id.cmp(&b.id))
}

/// Sort a roster into turn order
pub fn sort_roster(roster: &mut [Initiative]) {
    roster.sort_by(turn_order);
}

/// Pick the next participant in a roster already in turn order.
///
/// With nobody active the first participant starts. Returns `None` for an
/// empty roster.
pub fn next_turn(roster: &[Initiative]) -> Option<TurnAdvance> {
    let first = roster.first()?;

    let current = roster.iter().position(|i| i.is_active);
    let advance = match current {
        None => TurnAdvance {
            next_id: first.id,
            new_round: false,
        },
        Some(idx) if idx + 1 >= roster.len() => TurnAdvance {
            next_id: first.id,
            new_round: true,
        },
        Some(idx) => TurnAdvance {
            next_id: roster[idx + 1].id,
            new_round: false,
        },
    };

    Some(advance)
}
