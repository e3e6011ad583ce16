//! Database queries for price matrix storage.

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};

use crate::error::AppError;

use super::models::{HistoryRow, PresetRow, SavedStateRow};

/// Get saved form values by key
pub async fn get_saved_state(
    pool: &PgPool,
    state_key: &str,
) -> Result<Option<SavedStateRow>, AppError> {
    let row = sqlx::query_as::<_, SavedStateRow>(
        r#"
        SELECT state_key, payload, last_updated
        FROM price_matrix_state
        WHERE state_key = $1
        "#,
    )
    .bind(state_key)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Insert or replace saved form values
pub async fn upsert_saved_state<'e, E>(
    executor: E,
    state_key: &str,
    payload: &serde_json::Value,
    last_updated: DateTime<Utc>,
) -> Result<(), AppError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO price_matrix_state (state_key, payload, last_updated)
        VALUES ($1, $2, $3)
        ON CONFLICT (state_key)
        DO UPDATE SET payload = EXCLUDED.payload, last_updated = EXCLUDED.last_updated
        "#,
    )
    .bind(state_key)
    .bind(payload)
    .bind(last_updated)
    .execute(executor)
    .await?;

    Ok(())
}

/// Delete saved form values, returning the number of rows removed
pub async fn delete_saved_state(pool: &PgPool, state_key: &str) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM price_matrix_state WHERE state_key = $1")
        .bind(state_key)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// List all presets ordered by name
pub async fn list_presets(pool: &PgPool) -> Result<Vec<PresetRow>, AppError> {
    let rows = sqlx::query_as::<_, PresetRow>(
        r#"
        SELECT name, payload, updated_at
        FROM price_matrix_preset
        ORDER BY name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Get a preset by name
pub async fn get_preset(pool: &PgPool, name: &str) -> Result<Option<PresetRow>, AppError> {
    let row = sqlx::query_as::<_, PresetRow>(
        r#"
        SELECT name, payload, updated_at
        FROM price_matrix_preset
        WHERE name = $1
        "#,
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Insert or replace a named preset
pub async fn upsert_preset(
    pool: &PgPool,
    name: &str,
    payload: &serde_json::Value,
    updated_at: DateTime<Utc>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO price_matrix_preset (name, payload, updated_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (name)
        DO UPDATE SET payload = EXCLUDED.payload, updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(name)
    .bind(payload)
    .bind(updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a preset, returning the number of rows removed
pub async fn delete_preset(pool: &PgPool, name: &str) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM price_matrix_preset WHERE name = $1")
        .bind(name)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Append a history entry
pub async fn insert_history<'e, E>(executor: E, entry: &HistoryRow) -> Result<(), AppError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO price_matrix_history
            (id, recorded_at, total_cost, gross_profit, break_even_point)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(entry.id)
    .bind(entry.recorded_at)
    .bind(&entry.total_cost)
    .bind(&entry.gross_profit)
    .bind(&entry.break_even_point)
    .execute(executor)
    .await?;

    Ok(())
}

/// Drop everything but the `keep` most recent history entries
pub async fn trim_history<'e, E>(executor: E, keep: i64) -> Result<u64, AppError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        DELETE FROM price_matrix_history
        WHERE id NOT IN (
            SELECT id
            FROM price_matrix_history
            ORDER BY recorded_at DESC, id DESC
            LIMIT $1
        )
        "#,
    )
    .bind(keep)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Most recent history entries, newest first
pub async fn list_history(pool: &PgPool, limit: i64) -> Result<Vec<HistoryRow>, AppError> {
    let rows = sqlx::query_as::<_, HistoryRow>(
        r#"
        SELECT id, recorded_at, total_cost, gross_profit, break_even_point
        FROM price_matrix_history
        ORDER BY recorded_at DESC, id DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
