//! Database models for price matrix storage.
//!
//! These models use sqlx's FromRow derive for direct database deserialization.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Saved form values from price_matrix_state
#[derive(Debug, Clone, FromRow)]
pub struct SavedStateRow {
    pub state_key: String,
    pub payload: serde_json::Value,
    pub last_updated: DateTime<Utc>,
}

/// Named preset from price_matrix_preset
#[derive(Debug, Clone, FromRow)]
pub struct PresetRow {
    pub name: String,
    pub payload: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// Calculation history entry from price_matrix_history.
///
/// Amounts are the formatted strings shown at the time, not raw numbers.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct HistoryRow {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub total_cost: String,
    pub gross_profit: String,
    pub break_even_point: String,
}
