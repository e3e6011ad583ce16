//! Price matrix service functions.
//!
//! [`calculate`] is pure. The rest persist form state, presets and the
//! calculation history through the database and cache.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::AppCache;
use crate::error::{AppError, Result};

use super::calculators::{
    check_mix_percentages, compute_costs, mix_percentage_total, ProfitSnapshot,
};
use super::format::DisplayFormat;
use super::matrix::MatrixLayout;
use super::models::HistoryRow;
use super::queries;
use super::requests::FormValues;

/// Key of the single saved form record
pub const STATE_KEY: &str = "priceMatrixData";

/// History keeps this many of the most recent calculations
pub const MAX_HISTORY_ITEMS: i64 = 10;

const MAX_PRESET_NAME_LEN: usize = 100;

/// Canonical result record of one calculation pass.
///
/// Responses, exports and reports are all rendered from this.
#[derive(Debug, Clone)]
pub struct Calculation {
    pub layout: MatrixLayout,
    pub form: FormValues,
    pub snapshot: ProfitSnapshot,
    pub mix_total: Decimal,
    pub mix_valid: bool,
}

/// Price matrix error types
#[derive(Debug, Clone)]
pub enum PricingError {
    NoSavedState,
    PresetNotFound { name: String },
    InvalidPresetName { name: String, reason: String },
    CorruptRecord { context: String, message: String },
}

impl std::fmt::Display for PricingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PricingError::NoSavedState => write!(f, "No saved price matrix state"),
            PricingError::PresetNotFound { name } => write!(f, "No preset named '{}'", name),
            PricingError::InvalidPresetName { name, reason } => {
                write!(f, "Invalid preset name '{}': {}", name, reason)
            }
            PricingError::CorruptRecord { context, message } => {
                write!(f, "Stored {} could not be read: {}", context, message)
            }
        }
    }
}

impl std::error::Error for PricingError {}

/// Run the engine over raw form values.
///
/// A mix that does not add up to 100 is logged and flagged, never rejected.
pub fn calculate(layout: &MatrixLayout, form: FormValues) -> Calculation {
    let input = form.to_input(layout);
    let snapshot = compute_costs(layout, &input);
    let mix_total = mix_percentage_total(layout, &input);
    let mix_valid = check_mix_percentages(layout, &input);

    if !mix_valid {
        warn!(
            "Material percentages sum to {}%, should be 100%",
            mix_total.normalize()
        );
    }

    Calculation {
        layout: layout.clone(),
        form,
        snapshot,
        mix_total,
        mix_valid,
    }
}

/// Build the history entry for a calculation, using display strings.
pub fn history_entry(
    calculation: &Calculation,
    format: &DisplayFormat,
    recorded_at: DateTime<Utc>,
) -> HistoryRow {
    let snapshot = &calculation.snapshot;
    HistoryRow {
        id: Uuid::new_v4(),
        recorded_at,
        total_cost: format.money(snapshot.total_cost),
        gross_profit: format.money(snapshot.gross_profit),
        break_even_point: format.break_even(snapshot.break_even),
    }
}

/// Trim and validate a preset name
pub fn normalize_preset_name(name: &str) -> std::result::Result<String, PricingError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(PricingError::InvalidPresetName {
            name: name.to_string(),
            reason: "name is empty".to_string(),
        });
    }
    if trimmed.chars().count() > MAX_PRESET_NAME_LEN {
        return Err(PricingError::InvalidPresetName {
            name: trimmed.to_string(),
            reason: format!("name is longer than {} characters", MAX_PRESET_NAME_LEN),
        });
    }
    Ok(trimmed.to_string())
}

/// Save form values as the current state, stamping `lastUpdated`.
pub async fn save_state(pool: &PgPool, form: FormValues, now: DateTime<Utc>) -> Result<FormValues> {
    let form = form.stamped(now);
    let payload = to_payload(&form)?;
    queries::upsert_saved_state(pool, STATE_KEY, &payload, now).await?;
    debug!("Saved price matrix state at {}", now);
    Ok(form)
}

/// Load the saved form values
pub async fn load_state(pool: &PgPool) -> Result<FormValues> {
    let row = queries::get_saved_state(pool, STATE_KEY)
        .await?
        .ok_or(PricingError::NoSavedState)?;

    let form: FormValues = from_payload(row.payload, "price matrix state")?;
    Ok(form.stamped(row.last_updated))
}

/// Forget the saved form values
pub async fn reset_state(pool: &PgPool) -> Result<()> {
    let removed = queries::delete_saved_state(pool, STATE_KEY).await?;
    info!("Price matrix state reset ({} record(s) removed)", removed);
    Ok(())
}

/// Save (or overwrite) a named preset
pub async fn save_preset(
    pool: &PgPool,
    cache: &AppCache,
    name: &str,
    form: FormValues,
    now: DateTime<Utc>,
) -> Result<String> {
    let name = normalize_preset_name(name)?;
    let form = form.without_timestamp();
    let payload = to_payload(&form)?;

    queries::upsert_preset(pool, &name, &payload, now).await?;
    cache.invalidate_preset(&name).await;
    info!("Saved preset '{}'", name);
    Ok(name)
}

/// Load a preset by name, from cache when possible
pub async fn load_preset(pool: &PgPool, cache: &AppCache, name: &str) -> Result<FormValues> {
    let name = normalize_preset_name(name)?;

    if let Some(cached) = cache.presets.get(&name).await {
        debug!("Cache HIT for preset: {}", name);
        return Ok((*cached).clone());
    }
    debug!("Cache MISS for preset: {}", name);

    let row = queries::get_preset(pool, &name)
        .await?
        .ok_or_else(|| PricingError::PresetNotFound { name: name.clone() })?;
    let form: FormValues = from_payload(row.payload, "preset")?;

    cache.presets.insert(name, Arc::new(form.clone())).await;
    Ok(form)
}

/// Names of all presets, sorted
pub async fn list_presets(pool: &PgPool, cache: &AppCache) -> Result<Vec<String>> {
    if let Some(cached) = cache.cached_preset_names().await {
        debug!("Cache HIT for preset list");
        return Ok((*cached).clone());
    }

    let generation = cache.preset_generation();
    let names: Vec<String> = queries::list_presets(pool)
        .await?
        .into_iter()
        .map(|row| row.name)
        .collect();
    cache.store_preset_names(names.clone(), generation).await;
    Ok(names)
}

pub async fn delete_preset(pool: &PgPool, cache: &AppCache, name: &str) -> Result<()> {
    let name = normalize_preset_name(name)?;
    let removed = queries::delete_preset(pool, &name).await?;
    cache.invalidate_preset(&name).await;

    if removed == 0 {
        return Err(PricingError::PresetNotFound { name }.into());
    }
    info!("Deleted preset '{}'", name);
    Ok(())
}

/// Save the calculated form as current state and add it to history.
///
/// Both writes commit together or not at all.
pub async fn record_calculation(
    pool: &PgPool,
    entry: &HistoryRow,
    form: FormValues,
    now: DateTime<Utc>,
) -> Result<FormValues> {
    let form = form.stamped(now);
    let payload = to_payload(&form)?;

    let mut tx = pool.begin().await?;
    queries::upsert_saved_state(&mut *tx, STATE_KEY, &payload, now).await?;
    append_history(&mut tx, entry).await?;
    tx.commit().await?;

    debug!("Recorded calculation {} and saved state", entry.id);
    Ok(form)
}

async fn append_history(tx: &mut Transaction<'_, Postgres>, entry: &HistoryRow) -> Result<()> {
    queries::insert_history(&mut **tx, entry).await?;
    let trimmed = queries::trim_history(&mut **tx, MAX_HISTORY_ITEMS).await?;
    if trimmed > 0 {
        debug!("Trimmed {} old history entr(ies)", trimmed);
    }
    Ok(())
}

/// Recent calculations, newest first
pub async fn list_history(pool: &PgPool) -> Result<Vec<HistoryRow>> {
    queries::list_history(pool, MAX_HISTORY_ITEMS).await
}

fn to_payload(form: &FormValues) -> Result<serde_json::Value> {
    serde_json::to_value(form).map_err(|e| AppError::Internal(e.to_string()))
}

fn from_payload(payload: serde_json::Value, context: &str) -> Result<FormValues> {
    serde_json::from_value(payload).map_err(|e| {
        PricingError::CorruptRecord {
            context: context.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::calculators::BreakEven;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn plant_form(selling_price: &str) -> FormValues {
        serde_json::from_value(json!({
            "prices": { "bitumen": "95", "dust": "928", "agg1014": "1044", "agg610": "812", "ido": "90" },
            "percentages": { "dust": "40", "agg1014": "30", "agg610": "30" },
            "multipliers": { "bitumen": "1", "ido": "1" },
            "fixedCosts": { "moneyInvested": "100000", "labour": "500", "rent": "300", "sellingPrice": selling_price }
        }))
        .unwrap()
    }

    #[test]
    fn test_pricing_error_display() {
        assert!(PricingError::NoSavedState.to_string().contains("saved"));

        let err = PricingError::PresetNotFound {
            name: "quarry a".to_string(),
        };
        assert!(err.to_string().contains("quarry a"));

        let err = PricingError::InvalidPresetName {
            name: " ".to_string(),
            reason: "name is empty".to_string(),
        };
        assert!(err.to_string().contains("name is empty"));
    }

    #[test]
    fn test_calculate_plant_form() {
        let calculation = calculate(&MatrixLayout::standard(), plant_form("2000"));

        assert!(calculation.mix_valid);
        assert_eq!(calculation.mix_total, dec!(100));
        assert_eq!(calculation.snapshot.total_cost, dec!(1913));
        assert_eq!(calculation.snapshot.gross_profit, dec!(87));
        assert_eq!(calculation.form.fixed_costs.selling_price, "2000");
    }

    #[test]
    fn test_calculate_empty_form() {
        let calculation = calculate(&MatrixLayout::coarse(), FormValues::default());

        assert!(!calculation.mix_valid);
        assert_eq!(calculation.mix_total, dec!(0));
        assert_eq!(calculation.snapshot.total_cost, dec!(0));
        assert_eq!(calculation.snapshot.profit_percentage, dec!(0));
        assert_eq!(calculation.snapshot.break_even, BreakEven::NotApplicable);
    }

    #[test]
    fn test_history_entry_uses_display_strings() {
        let now = Utc::now();
        let format = DisplayFormat::default();

        let calculation = calculate(&MatrixLayout::standard(), plant_form("2000"));
        let entry = history_entry(&calculation, &format, now);
        assert_eq!(entry.recorded_at, now);
        assert_eq!(entry.total_cost, "1,913.00 KES");
        assert_eq!(entry.gross_profit, "87.00 KES");
        assert_eq!(entry.break_even_point, "1,149.43 Tons/month");

        let calculation = calculate(&MatrixLayout::standard(), plant_form("0"));
        let entry = history_entry(&calculation, &format, now);
        assert_eq!(entry.gross_profit, "-1,913.00 KES");
        assert_eq!(entry.break_even_point, "N/A (No Profit)");
    }

    #[test]
    fn test_normalize_preset_name() {
        assert_eq!(normalize_preset_name("  Quarry A ").unwrap(), "Quarry A");
        assert!(matches!(
            normalize_preset_name("   "),
            Err(PricingError::InvalidPresetName { .. })
        ));
        assert!(normalize_preset_name(&"x".repeat(101)).is_err());
        assert!(normalize_preset_name(&"x".repeat(100)).is_ok());
    }

    // ==================== Database-backed tests ====================

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_history_keeps_ten_newest(pool: PgPool) {
        let format = DisplayFormat::default();
        let calculation = calculate(&MatrixLayout::standard(), plant_form("2000"));

        for minute in 0..12 {
            let at = base_time() + Duration::minutes(minute);
            let entry = history_entry(&calculation, &format, at);
            record_calculation(&pool, &entry, calculation.form.clone(), at)
                .await
                .unwrap();
        }

        let history = list_history(&pool).await.unwrap();
        let recorded: Vec<_> = history.iter().map(|entry| entry.recorded_at).collect();
        let expected: Vec<_> = (2..12)
            .rev()
            .map(|minute| base_time() + Duration::minutes(minute))
            .collect();
        assert_eq!(recorded, expected);
        assert_eq!(history[0].total_cost, "1,913.00 KES");

        let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM price_matrix_history")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stored, MAX_HISTORY_ITEMS);

        let state = load_state(&pool).await.unwrap();
        assert_eq!(state.last_updated, Some(base_time() + Duration::minutes(11)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_state_save_load_reset(pool: PgPool) {
        assert!(matches!(
            load_state(&pool).await,
            Err(AppError::Pricing(PricingError::NoSavedState))
        ));

        let saved = save_state(&pool, plant_form("2000"), base_time()).await.unwrap();
        assert_eq!(saved.last_updated, Some(base_time()));

        let loaded = load_state(&pool).await.unwrap();
        assert_eq!(loaded, saved);

        let later = base_time() + Duration::minutes(5);
        save_state(&pool, plant_form("2100"), later).await.unwrap();
        let loaded = load_state(&pool).await.unwrap();
        assert_eq!(loaded.fixed_costs.selling_price, "2100");
        assert_eq!(loaded.last_updated, Some(later));

        reset_state(&pool).await.unwrap();
        assert!(matches!(
            load_state(&pool).await,
            Err(AppError::Pricing(PricingError::NoSavedState))
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_preset_save_load_delete(pool: PgPool) {
        let cache = AppCache::new();
        let form = plant_form("2000").stamped(base_time());

        let name = save_preset(&pool, &cache, " Quarry A ", form.clone(), base_time())
            .await
            .unwrap();
        assert_eq!(name, "Quarry A");

        let loaded = load_preset(&pool, &cache, "Quarry A").await.unwrap();
        assert_eq!(loaded.last_updated, None);
        assert_eq!(loaded, form.clone().without_timestamp());
        assert_eq!(list_presets(&pool, &cache).await.unwrap(), ["Quarry A"]);

        // Saving again refreshes both the cached preset and the listing
        save_preset(&pool, &cache, "Quarry A", plant_form("2500"), base_time())
            .await
            .unwrap();
        save_preset(&pool, &cache, "Quarry B", plant_form("1800"), base_time())
            .await
            .unwrap();
        let loaded = load_preset(&pool, &cache, "Quarry A").await.unwrap();
        assert_eq!(loaded.fixed_costs.selling_price, "2500");
        assert_eq!(
            list_presets(&pool, &cache).await.unwrap(),
            ["Quarry A", "Quarry B"]
        );

        delete_preset(&pool, &cache, "Quarry A").await.unwrap();
        assert!(matches!(
            load_preset(&pool, &cache, "Quarry A").await,
            Err(AppError::Pricing(PricingError::PresetNotFound { .. }))
        ));
        assert!(matches!(
            delete_preset(&pool, &cache, "Quarry Z").await,
            Err(AppError::Pricing(PricingError::PresetNotFound { .. }))
        ));
        assert_eq!(list_presets(&pool, &cache).await.unwrap(), ["Quarry B"]);
    }
}
