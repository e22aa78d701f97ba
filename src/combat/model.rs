//! Combat and initiative records plus their request shapes

use serde::{Deserialize, Serialize};
use serde_with::rust::double_option;

use super::CombatError;

/// Lifecycle stage of a combat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Setup,
    Active,
    Ended,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::Active => "active",
            Phase::Ended => "ended",
        }
    }
}

/// One participant in a combat
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Initiative {
    pub id: i64,
    pub combat_id: i64,
    pub name: String,
    pub initiative_roll: i32,
    pub armor_class: i32,
    pub damage_taken: i32,
    pub max_hp: i32,
    /// `max_hp - damage_taken` as i64, not clamped
    pub current_hp: i64,
    pub is_player: bool,
    pub conditions: Option<String>,
    pub notes: Option<String>,
    /// Marks whose turn it currently is
    pub is_active: bool,
    /// Turn-order key, kept equal to the initiative roll
    pub order: i32,
    pub created_at: String,
    pub updated_at: String,
}

/// An encounter with its roster attached
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Combat {
    pub id: i64,
    pub name: String,
    pub session_id: Option<String>,
    pub phase: Phase,
    pub round: i32,
    pub is_active: bool,
    pub outcome: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    /// Ordered by roll, highest first
    pub initiatives: Vec<Initiative>,
}

impl Combat {
    /// The participant whose turn it is, if any
    pub fn current_turn(&self) -> Option<&Initiative> {
        self.initiatives.iter().find(|i| i.is_active)
    }
}

/// Request to start a new combat
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCombat {
    pub name: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub phase: Option<Phase>,
}

impl NewCombat {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            session_id: None,
            phase: None,
        }
    }

    pub fn validate(&self) -> Result<(), CombatError> {
        validate_name(&self.name)
    }
}

/// Partial update of a combat; only fields that are present are applied.
///
/// For the text fields an explicit `null` clears the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CombatUpdate {
    pub phase: Option<Phase>,
    pub round: Option<i32>,
    pub is_active: Option<bool>,
    #[serde(default, with = "double_option")]
    pub outcome: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl CombatUpdate {
    pub fn validate(&self) -> Result<(), CombatError> {
        match self.round {
            Some(round) if round < 0 => Err(CombatError::Validation(format!(
                "round must not be negative (got {})",
                round
            ))),
            _ => Ok(()),
        }
    }
}

/// Request to add a participant to a combat
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInitiative {
    pub name: String,
    pub initiative_roll: i32,
    pub armor_class: i32,
    pub max_hp: i32,
    #[serde(default)]
    pub is_player: bool,
    #[serde(default)]
    pub damage_taken: Option<i32>,
}

impl NewInitiative {
    pub fn new(name: impl Into<String>, initiative_roll: i32) -> Self {
        Self {
            name: name.into(),
            initiative_roll,
            armor_class: 10,
            max_hp: 1,
            is_player: false,
            damage_taken: None,
        }
    }

    pub fn validate(&self) -> Result<(), CombatError> {
        validate_name(&self.name)
    }
}

/// Partial update of a participant's battle state
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InitiativeUpdate {
    /// Unbounded: negative values and over-damage are stored as given
    pub damage_taken: Option<i32>,
    /// `null` clears
    #[serde(default, with = "double_option")]
    pub conditions: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    pub notes: Option<Option<String>>,
    pub is_active: Option<bool>,
    /// Re-roll; also moves the entry in turn order
    pub initiative_roll: Option<i32>,
}

fn validate_name(name: &str) -> Result<(), CombatError> {
    if name.trim().is_empty() {
        return Err(CombatError::Validation("name must not be empty".to_string()));
    }
    Ok(())
}
