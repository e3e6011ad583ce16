//! Core pricing calculation functions.
//!
//! Pure functions for price matrix math - no database access, no formatting.
//! Every call recomputes the full snapshot from its inputs.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::matrix::{BreakEvenBasis, CostingMode, Material, MatrixLayout};

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Round to specified decimal places using banker's rounding (ROUND_HALF_EVEN).
///
/// Banker's rounding rounds to the nearest even number when the value is exactly
/// halfway between two possibilities.
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use asphalt_price_matrix::pricing::round_money;
///
/// assert_eq!(round_money(dec!(2.5), 0), dec!(2));   // rounds to even
/// assert_eq!(round_money(dec!(3.5), 0), dec!(4));   // rounds to even
/// assert_eq!(round_money(dec!(1.234), 2), dec!(1.23));
/// ```
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven)
}

/// Landed price of a material and the factor applied to it.
///
/// `factor` is a mix percentage (0-100) or a volumetric multiplier depending
/// on the layout's costing mode for the material.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterialInput {
    pub price: Decimal,
    pub factor: Decimal,
}

impl MaterialInput {
    pub fn new(price: Decimal, factor: Decimal) -> Self {
        Self { price, factor }
    }
}

/// Sanitized inputs for one calculation pass.
///
/// Materials missing from the map count as zero price and zero factor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceMatrixInput {
    pub materials: BTreeMap<Material, MaterialInput>,
    pub labour: Decimal,
    pub rent: Decimal,
    /// Money invested or fixed costs, whichever the layout breaks even on
    pub capital: Decimal,
    pub selling_price: Decimal,
}

impl PriceMatrixInput {
    pub fn material(&self, material: Material) -> MaterialInput {
        self.materials.get(&material).copied().unwrap_or_default()
    }
}

/// Cost of one material line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialCost {
    pub material: Material,
    pub mode: CostingMode,
    pub price: Decimal,
    pub factor: Decimal,
    pub cost: Decimal,
}

/// Break-even tonnage, or the sentinel when there is no profit to recover with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakEven {
    Tons(Decimal),
    NotApplicable,
}

impl BreakEven {
    pub fn tons(self) -> Option<Decimal> {
        match self {
            BreakEven::Tons(tons) => Some(tons),
            BreakEven::NotApplicable => None,
        }
    }
}

/// Derived costs and profit metrics for one calculation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfitSnapshot {
    pub material_costs: Vec<MaterialCost>,
    pub total_material_cost: Decimal,
    pub labour: Decimal,
    pub rent: Decimal,
    pub total_fixed_cost: Decimal,
    pub total_cost: Decimal,
    pub selling_price: Decimal,
    pub gross_profit: Decimal,
    pub profit_percentage: Decimal,
    pub capital: Decimal,
    pub break_even_basis: BreakEvenBasis,
    pub break_even: BreakEven,
}

impl ProfitSnapshot {
    pub fn cost_of(&self, material: Material) -> Option<Decimal> {
        self.material_costs
            .iter()
            .find(|line| line.material == material)
            .map(|line| line.cost)
    }
}

/// Cost of a single material under the given costing mode.
pub fn material_cost(mode: CostingMode, input: MaterialInput) -> Decimal {
    match mode {
        CostingMode::Percentage => divide(input.price.saturating_mul(input.factor), ONE_HUNDRED),
        CostingMode::Volumetric => input.price.saturating_mul(input.factor),
    }
}

/// Profit as a percentage of selling price.
///
/// A zero selling price yields 0 rather than a division error.
pub fn profit_percentage(gross_profit: Decimal, selling_price: Decimal) -> Decimal {
    if selling_price.is_zero() {
        return Decimal::ZERO;
    }
    divide(gross_profit, selling_price).saturating_mul(ONE_HUNDRED)
}

/// Tonnage needed for gross profit to recover `capital`.
///
/// Only defined for a strictly positive gross profit; zero or negative
/// profit never recovers anything, whatever the capital figure.
pub fn break_even_point(capital: Decimal, gross_profit: Decimal) -> BreakEven {
    if gross_profit <= Decimal::ZERO {
        return BreakEven::NotApplicable;
    }
    BreakEven::Tons(divide(capital, gross_profit))
}

/// Compute every cost and profit metric for the layout's materials.
///
/// Materials present in `input` but not in the layout are ignored. The mix
/// check is separate ([`check_mix_percentages`]) and never blocks this.
pub fn compute_costs(layout: &MatrixLayout, input: &PriceMatrixInput) -> ProfitSnapshot {
    let material_costs: Vec<MaterialCost> = layout
        .materials
        .iter()
        .map(|line| {
            let material_input = input.material(line.material);
            MaterialCost {
                material: line.material,
                mode: line.mode,
                price: material_input.price,
                factor: material_input.factor,
                cost: material_cost(line.mode, material_input),
            }
        })
        .collect();

    let total_material_cost = material_costs
        .iter()
        .fold(Decimal::ZERO, |sum, line| sum.saturating_add(line.cost));

    let total_fixed_cost = input.labour.saturating_add(input.rent);
    let total_cost = total_material_cost.saturating_add(total_fixed_cost);
    let gross_profit = input.selling_price.saturating_sub(total_cost);

    ProfitSnapshot {
        material_costs,
        total_material_cost,
        labour: input.labour,
        rent: input.rent,
        total_fixed_cost,
        total_cost,
        selling_price: input.selling_price,
        gross_profit,
        profit_percentage: profit_percentage(gross_profit, input.selling_price),
        capital: input.capital,
        break_even_basis: layout.break_even_basis,
        break_even: break_even_point(input.capital, gross_profit),
    }
}

/// Sum of the percentage-costed materials' mix shares.
pub fn mix_percentage_total(layout: &MatrixLayout, input: &PriceMatrixInput) -> Decimal {
    layout
        .percentage_materials()
        .map(|material| input.material(material).factor)
        .fold(Decimal::ZERO, |sum, percent| sum.saturating_add(percent))
}

/// Whether the mix shares add up to exactly 100.
///
/// Exact equality, no tolerance band.
pub fn check_mix_percentages(layout: &MatrixLayout, input: &PriceMatrixInput) -> bool {
    mix_percentage_total(layout, input) == ONE_HUNDRED
}

// Division that saturates instead of panicking when the quotient overflows.
fn divide(numerator: Decimal, denominator: Decimal) -> Decimal {
    numerator.checked_div(denominator).unwrap_or_else(|| {
        if numerator.is_sign_negative() == denominator.is_sign_negative() {
            Decimal::MAX
        } else {
            Decimal::MIN
        }
    })
}
