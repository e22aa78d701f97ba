//! Combat persistence and roster operations

use std::collections::HashMap;

use chrono::SecondsFormat;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::turn::{next_turn, sort_roster};
use super::{
    Combat, CombatError, CombatUpdate, Initiative, InitiativeUpdate, NewCombat, NewInitiative,
    Phase,
};

const COMBAT_COLUMNS: &str =
    "id, name, session_id, phase, round, is_active, outcome, notes, created_at, updated_at";

const INITIATIVE_COLUMNS: &str = "id, combat_id, name, initiative_roll, armor_class, damage_taken, \
     max_hp, is_player, conditions, notes, is_active, sort_order, created_at, updated_at";

/// Combat storage with database backing
#[derive(Clone)]
pub struct CombatStore {
    pool: SqlitePool,
}

impl CombatStore {
    /// Create a new combat store with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All combats, newest first, each with its roster in turn order
    pub async fn list(&self) -> Result<Vec<Combat>, CombatError> {
        let mut conn = self.pool.acquire().await?;

        let rows: Vec<CombatRow> = sqlx::query_as(&format!(
            "SELECT {} FROM combats ORDER BY created_at DESC, id DESC",
            COMBAT_COLUMNS
        ))
        .fetch_all(&mut *conn)
        .await?;

        let entries: Vec<InitiativeRow> =
            sqlx::query_as(&format!("SELECT {} FROM initiatives", INITIATIVE_COLUMNS))
                .fetch_all(&mut *conn)
                .await?;

        let mut rosters: HashMap<i64, Vec<Initiative>> = HashMap::new();
        for entry in entries {
            rosters
                .entry(entry.combat_id)
                .or_default()
                .push(entry.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let mut roster = rosters.remove(&row.id).unwrap_or_default();
                sort_roster(&mut roster);
                row.into_combat(roster)
            })
            .collect())
    }

    /// Get a combat by ID
    pub async fn get(&self, id: i64) -> Result<Combat, CombatError> {
        let mut conn = self.pool.acquire().await?;
        fetch_combat(&mut conn, id)
            .await?
            .ok_or(CombatError::CombatNotFound(id))
    }

    /// The live combat, if there is one
    pub async fn active(&self) -> Result<Option<Combat>, CombatError> {
        let mut conn = self.pool.acquire().await?;

        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM combats WHERE is_active = 1")
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some((id,)) => fetch_combat(&mut conn, id).await,
            None => Ok(None),
        }
    }

    /// Start a new combat, retiring whichever combat was live
    pub async fn create(&self, req: &NewCombat) -> Result<Combat, CombatError> {
        req.validate()?;
        let now = timestamp();
        let phase = req.phase.unwrap_or_default();

        let mut tx = self.pool.begin().await?;

        let retired = deactivate_other_combats(&mut tx, None, &now).await?;

        let id = sqlx::query(
            r#"
            INSERT INTO combats (name, session_id, phase, round, is_active, created_at, updated_at)
            VALUES (?, ?, ?, 1, 1, ?, ?)
            "#,
        )
        .bind(req.name.trim())
        .bind(req.session_id.as_deref())
        .bind(phase.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let combat = fetch_combat(&mut tx, id)
            .await?
            .ok_or(CombatError::CombatNotFound(id))?;

        tx.commit().await?;

        info!(
            "Combat {} '{}' created (retired {} active)",
            combat.id, combat.name, retired
        );
        Ok(combat)
    }

    /// Apply a partial update to a combat
    pub async fn update(&self, id: i64, update: &CombatUpdate) -> Result<Combat, CombatError> {
        update.validate()?;
        let now = timestamp();

        let mut tx = self.pool.begin().await?;

        // Others must be cleared before this row can take the single-active slot
        if update.is_active == Some(true) {
            deactivate_other_combats(&mut tx, Some(id), &now).await?;
        }

        let result = sqlx::query(
            r#"
            UPDATE combats
            SET phase = COALESCE(?, phase),
                round = COALESCE(?, round),
                is_active = COALESCE(?, is_active),
                outcome = CASE WHEN ? THEN ? ELSE outcome END,
                notes = CASE WHEN ? THEN ? ELSE notes END,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.phase.map(|p| p.as_str()))
        .bind(update.round)
        .bind(update.is_active)
        .bind(update.outcome.is_some())
        .bind(update.outcome.clone().flatten())
        .bind(update.notes.is_some())
        .bind(update.notes.clone().flatten())
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CombatError::CombatNotFound(id));
        }

        let combat = fetch_combat(&mut tx, id)
            .await?
            .ok_or(CombatError::CombatNotFound(id))?;

        tx.commit().await?;

        debug!("Combat {} updated: {:?}", id, update);
        Ok(combat)
    }

    /// Delete a combat; its roster goes with it via the schema cascade
    pub async fn delete(&self, id: i64) -> Result<(), CombatError> {
        let result = sqlx::query("DELETE FROM combats WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CombatError::CombatNotFound(id));
        }

        info!("Combat {} deleted", id);
        Ok(())
    }

    /// Pass the turn to the next participant in order.
    ///
    /// Wrapping past the last participant starts a new round. A combat still
    /// in setup becomes active on its first turn.
    pub async fn next_turn(&self, id: i64) -> Result<Combat, CombatError> {
        let now = timestamp();

        let mut tx = self.pool.begin().await?;

        // Write first so the transaction holds the write lock before reading
        let touched = sqlx::query("UPDATE combats SET updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(CombatError::CombatNotFound(id));
        }

        let combat = fetch_combat(&mut tx, id)
            .await?
            .ok_or(CombatError::CombatNotFound(id))?;

        if combat.phase == Phase::Ended {
            return Err(CombatError::Validation(format!(
                "combat {} has ended",
                id
            )));
        }

        let advance = next_turn(&combat.initiatives).ok_or_else(|| {
            CombatError::Validation(format!("combat {} has no participants", id))
        })?;

        sqlx::query(
            "UPDATE initiatives SET is_active = 0, updated_at = ? WHERE combat_id = ? AND is_active = 1",
        )
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE initiatives SET is_active = 1, updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(advance.next_id)
            .execute(&mut *tx)
            .await?;

        let round = if advance.new_round {
            combat.round.checked_add(1).ok_or_else(|| {
                CombatError::Validation(format!("combat {} is at the round limit", id))
            })?
        } else {
            combat.round
        };

        sqlx::query("UPDATE combats SET round = ?, phase = ? WHERE id = ?")
            .bind(round)
            .bind(Phase::Active.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let combat = fetch_combat(&mut tx, id)
            .await?
            .ok_or(CombatError::CombatNotFound(id))?;

        tx.commit().await?;

        info!(
            "Combat {} round {}: turn passes to initiative {}",
            id, combat.round, advance.next_id
        );
        Ok(combat)
    }

    /// Add a participant to a combat
    pub async fn add_initiative(
        &self,
        combat_id: i64,
        req: &NewInitiative,
    ) -> Result<Initiative, CombatError> {
        req.validate()?;
        let now = timestamp();

        // Selecting from combats makes the insert a no-op for unknown combats
        let result = sqlx::query(
            r#"
            INSERT INTO initiatives
                (combat_id, name, initiative_roll, armor_class, damage_taken, max_hp,
                 is_player, is_active, sort_order, created_at, updated_at)
            SELECT id, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?
            FROM combats WHERE id = ?
            "#,
        )
        .bind(req.name.trim())
        .bind(req.initiative_roll)
        .bind(req.armor_class)
        .bind(req.damage_taken.unwrap_or(0))
        .bind(req.max_hp)
        .bind(req.is_player)
        .bind(req.initiative_roll)
        .bind(&now)
        .bind(&now)
        .bind(combat_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CombatError::CombatNotFound(combat_id));
        }

        let id = result.last_insert_rowid();
        let mut conn = self.pool.acquire().await?;
        let entry = fetch_initiative(&mut conn, combat_id, id)
            .await?
            .ok_or(CombatError::InitiativeNotFound {
                combat_id,
                initiative_id: id,
            })?;

        info!(
            "Combat {}: '{}' joins with initiative {}",
            combat_id, entry.name, entry.initiative_roll
        );
        Ok(entry)
    }

    /// Apply a partial update to a participant's battle state
    pub async fn update_initiative(
        &self,
        combat_id: i64,
        id: i64,
        update: &InitiativeUpdate,
    ) -> Result<Initiative, CombatError> {
        let now = timestamp();
        let not_found = CombatError::InitiativeNotFound {
            combat_id,
            initiative_id: id,
        };

        let mut tx = self.pool.begin().await?;

        // One current turn per combat
        if update.is_active == Some(true) {
            sqlx::query(
                r#"
                UPDATE initiatives SET is_active = 0, updated_at = ?
                WHERE combat_id = ? AND id != ? AND is_active = 1
                "#,
            )
            .bind(&now)
            .bind(combat_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        let result = sqlx::query(
            r#"
            UPDATE initiatives
            SET damage_taken = COALESCE(?, damage_taken),
                conditions = CASE WHEN ? THEN ? ELSE conditions END,
                notes = CASE WHEN ? THEN ? ELSE notes END,
                is_active = COALESCE(?, is_active),
                initiative_roll = COALESCE(?, initiative_roll),
                sort_order = COALESCE(?, sort_order),
                updated_at = ?
            WHERE id = ? AND combat_id = ?
            "#,
        )
        .bind(update.damage_taken)
        .bind(update.conditions.is_some())
        .bind(update.conditions.clone().flatten())
        .bind(update.notes.is_some())
        .bind(update.notes.clone().flatten())
        .bind(update.is_active)
        .bind(update.initiative_roll)
        .bind(update.initiative_roll)
        .bind(&now)
        .bind(id)
        .bind(combat_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found);
        }

        let entry = fetch_initiative(&mut tx, combat_id, id)
            .await?
            .ok_or(not_found)?;

        tx.commit().await?;

        debug!("Initiative {} in combat {} updated: {:?}", id, combat_id, update);
        Ok(entry)
    }

    /// Remove one participant from a combat
    pub async fn delete_initiative(&self, combat_id: i64, id: i64) -> Result<(), CombatError> {
        let result = sqlx::query("DELETE FROM initiatives WHERE id = ? AND combat_id = ?")
            .bind(id)
            .bind(combat_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CombatError::InitiativeNotFound {
                combat_id,
                initiative_id: id,
            });
        }

        info!("Combat {}: initiative {} removed", combat_id, id);
        Ok(())
    }
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Clear the active flag on every live combat except `keep`
async fn deactivate_other_combats(
    conn: &mut SqliteConnection,
    keep: Option<i64>,
    now: &str,
) -> Result<u64, CombatError> {
    let result = sqlx::query(
        r#"
        UPDATE combats SET is_active = 0, phase = 'setup', updated_at = ?
        WHERE is_active = 1 AND id IS NOT ?
        "#,
    )
    .bind(now)
    .bind(keep)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

async fn fetch_combat(conn: &mut SqliteConnection, id: i64) -> Result<Option<Combat>, CombatError> {
    let row: Option<CombatRow> = sqlx::query_as(&format!(
        "SELECT {} FROM combats WHERE id = ?",
        COMBAT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let entries: Vec<InitiativeRow> = sqlx::query_as(&format!(
        "SELECT {} FROM initiatives WHERE combat_id = ?",
        INITIATIVE_COLUMNS
    ))
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let mut roster: Vec<Initiative> = entries.into_iter().map(Initiative::from).collect();
    sort_roster(&mut roster);

    Ok(Some(row.into_combat(roster)))
}

async fn fetch_initiative(
    conn: &mut SqliteConnection,
    combat_id: i64,
    id: i64,
) -> Result<Option<Initiative>, CombatError> {
    let row: Option<InitiativeRow> = sqlx::query_as(&format!(
        "SELECT {} FROM initiatives WHERE id = ? AND combat_id = ?",
        INITIATIVE_COLUMNS
    ))
    .bind(id)
    .bind(combat_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Initiative::from))
}

/// Row type for combat queries
#[derive(sqlx::FromRow)]
struct CombatRow {
    id: i64,
    name: String,
    session_id: Option<String>,
    phase: Phase,
    round: i32,
    is_active: bool,
    outcome: Option<String>,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

impl CombatRow {
    fn into_combat(self, initiatives: Vec<Initiative>) -> Combat {
        Combat {
            id: self.id,
            name: self.name,
            session_id: self.session_id,
            phase: self.phase,
            round: self.round,
            is_active: self.is_active,
            outcome: self.outcome,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
            initiatives,
        }
    }
}

/// Row type for initiative queries
#[derive(sqlx::FromRow)]
struct InitiativeRow {
    id: i64,
    combat_id: i64,
    name: String,
    initiative_roll: i32,
    armor_class: i32,
    damage_taken: i32,
    max_hp: i32,
    is_player: bool,
    conditions: Option<String>,
    notes: Option<String>,
    is_active: bool,
    sort_order: i32,
    created_at: String,
    updated_at: String,
}

impl From<InitiativeRow> for Initiative {
    fn from(row: InitiativeRow) -> Self {
        Initiative {
            id: row.id,
            combat_id: row.combat_id,
            name: row.name,
            initiative_roll: row.initiative_roll,
            armor_class: row.armor_class,
            damage_taken: row.damage_taken,
            max_hp: row.max_hp,
            current_hp: i64::from(row.max_hp) - i64::from(row.damage_taken),
            is_player: row.is_player,
            conditions: row.conditions,
            notes: row.notes,
            is_active: row.is_active,
            order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
