//! Response DTOs for price matrix endpoints.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::calculators::{BreakEven, MaterialCost};
use super::format::{mix_warning, DisplayFormat};
use super::matrix::{BreakEvenBasis, CostingMode, Material};
use super::models::HistoryRow;
use super::services::Calculation;

/// Raw amount plus its display string
#[derive(Debug, Clone, Serialize)]
pub struct AmountResponse {
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub display: String,
}

/// One material line of a calculation
#[derive(Debug, Clone, Serialize)]
pub struct MaterialCostResponse {
    pub material: Material,
    pub label: String,
    pub mode: CostingMode,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub factor: Decimal,
    pub cost: AmountResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakEvenResponse {
    pub applicable: bool,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub tons: Option<Decimal>,
    pub display: String,
}

/// Result of the mix percentage check
#[derive(Debug, Clone, Serialize)]
pub struct MixCheckResponse {
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Response for a calculation
#[derive(Debug, Clone, Serialize)]
pub struct CalculationResponse {
    pub layout: String,
    pub materials: Vec<MaterialCostResponse>,
    pub labour: AmountResponse,
    pub rent: AmountResponse,
    pub total_material_cost: AmountResponse,
    pub total_fixed_cost: AmountResponse,
    pub total_cost: AmountResponse,
    pub selling_price: AmountResponse,
    pub gross_profit: AmountResponse,
    pub profit_percentage: AmountResponse,
    pub break_even_basis: BreakEvenBasis,
    pub capital: AmountResponse,
    pub break_even: BreakEvenResponse,
    pub mix: MixCheckResponse,
}

impl CalculationResponse {
    pub fn new(calculation: &Calculation, format: &DisplayFormat) -> Self {
        let snapshot = &calculation.snapshot;
        let money = |amount: Decimal| AmountResponse {
            amount,
            display: format.money(amount),
        };

        Self {
            layout: calculation.layout.name.clone(),
            materials: snapshot
                .material_costs
                .iter()
                .map(|line| material_response(line, format))
                .collect(),
            labour: money(snapshot.labour),
            rent: money(snapshot.rent),
            total_material_cost: money(snapshot.total_material_cost),
            total_fixed_cost: money(snapshot.total_fixed_cost),
            total_cost: money(snapshot.total_cost),
            selling_price: money(snapshot.selling_price),
            gross_profit: money(snapshot.gross_profit),
            profit_percentage: AmountResponse {
                amount: snapshot.profit_percentage,
                display: format.percentage(snapshot.profit_percentage),
            },
            break_even_basis: snapshot.break_even_basis,
            capital: money(snapshot.capital),
            break_even: BreakEvenResponse {
                applicable: matches!(snapshot.break_even, BreakEven::Tons(_)),
                tons: snapshot.break_even.tons(),
                display: format.break_even(snapshot.break_even),
            },
            mix: MixCheckResponse {
                total: calculation.mix_total,
                valid: calculation.mix_valid,
                warning: (!calculation.mix_valid).then(|| mix_warning(calculation.mix_total)),
            },
        }
    }
}

fn material_response(line: &MaterialCost, format: &DisplayFormat) -> MaterialCostResponse {
    MaterialCostResponse {
        material: line.material,
        label: line.material.label().to_string(),
        mode: line.mode,
        price: line.price,
        factor: line.factor,
        cost: AmountResponse {
            amount: line.cost,
            display: format.money(line.cost),
        },
    }
}

/// A calculation that was saved and added to history
#[derive(Debug, Serialize)]
pub struct RecordedCalculationResponse {
    pub calculation: CalculationResponse,
    pub last_updated: DateTime<Utc>,
    pub history: Vec<HistoryEntryResponse>,
}

/// History entry, holding display strings as they were shown
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryResponse {
    pub timestamp: DateTime<Utc>,
    pub total_cost: String,
    pub gross_profit: String,
    pub break_even_point: String,
}

impl From<HistoryRow> for HistoryEntryResponse {
    fn from(row: HistoryRow) -> Self {
        Self {
            timestamp: row.recorded_at,
            total_cost: row.total_cost,
            gross_profit: row.gross_profit,
            break_even_point: row.break_even_point,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PresetListResponse {
    pub names: Vec<String>,
}

/// Generic pricing error response
#[derive(Debug, Serialize)]
pub struct PricingErrorResponse {
    pub error_type: String,
    pub message: String,
}
