//! Request DTOs for price matrix endpoints.
//!
//! Form values travel as raw text exactly as typed. They are turned into
//! decimals in one place, [`FormValues::to_input`], where anything missing or
//! unreadable becomes zero.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use super::calculators::{MaterialInput, PriceMatrixInput};
use super::matrix::{BreakEvenBasis, CostingMode, Material, MatrixLayout};

/// Raw form values, grouped the way they are persisted.
///
/// ```json
/// { "prices": { "dust": "928" }, "percentages": { "dust": "40" },
///   "multipliers": { "bitumen": "1" },
///   "fixedCosts": { "moneyInvested": "100000", "labour": "500",
///                   "rent": "300", "sellingPrice": "2000" },
///   "lastUpdated": "2026-10-19T08:00:00Z" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormValues {
    #[serde(default, deserialize_with = "text_map")]
    pub prices: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "text_map")]
    pub percentages: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "text_map")]
    pub multipliers: BTreeMap<String, String>,
    #[serde(default)]
    pub fixed_costs: FixedCostValues,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Fixed costs, capital figures and the selling price
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedCostValues {
    #[serde(default, deserialize_with = "text_value", skip_serializing_if = "String::is_empty")]
    pub money_invested: String,
    #[serde(default, deserialize_with = "text_value", skip_serializing_if = "String::is_empty")]
    pub fixed_costs: String,
    #[serde(default, deserialize_with = "text_value")]
    pub labour: String,
    #[serde(default, deserialize_with = "text_value")]
    pub rent: String,
    #[serde(default, deserialize_with = "text_value")]
    pub selling_price: String,
}

impl FixedCostValues {
    pub fn capital(&self, basis: BreakEvenBasis) -> &str {
        match basis {
            BreakEvenBasis::MoneyInvested => &self.money_invested,
            BreakEvenBasis::FixedCosts => &self.fixed_costs,
        }
    }
}

impl FormValues {
    /// Build grouped form values from canonical flat field identifiers
    /// (`dustPrice`, `agg1014Percent`, `bitumenFactor`, `labourCost`,
    /// `rentCost`, `capitalFigure`, `sellingPrice`).
    ///
    /// `capitalFigure` lands in whichever slot the layout breaks even on;
    /// `moneyInvested` and `fixedCosts` are also accepted by name.
    /// Unrecognised identifiers are ignored.
    pub fn from_fields(fields: &BTreeMap<String, String>, layout: &MatrixLayout) -> Self {
        let mut form = FormValues::default();

        for material in Material::all() {
            let key = material.key();
            if let Some(value) = fields.get(&format!("{key}Price")) {
                form.prices.insert(key.to_string(), value.clone());
            }
            if let Some(value) = fields.get(&format!("{key}Percent")) {
                form.percentages.insert(key.to_string(), value.clone());
            }
            if let Some(value) = fields.get(&format!("{key}Factor")) {
                form.multipliers.insert(key.to_string(), value.clone());
            }
        }

        let fixed = &mut form.fixed_costs;
        let field = |name: &str| fields.get(name).cloned();
        if let Some(value) = field("labourCost") {
            fixed.labour = value;
        }
        if let Some(value) = field("rentCost") {
            fixed.rent = value;
        }
        if let Some(value) = field("sellingPrice") {
            fixed.selling_price = value;
        }
        if let Some(value) = field("moneyInvested") {
            fixed.money_invested = value;
        }
        if let Some(value) = field("fixedCosts") {
            fixed.fixed_costs = value;
        }
        if let Some(value) = field("capitalFigure") {
            match layout.break_even_basis {
                BreakEvenBasis::MoneyInvested => fixed.money_invested = value,
                BreakEvenBasis::FixedCosts => fixed.fixed_costs = value,
            }
        }

        form
    }

    /// Parse the raw values the layout needs into engine input.
    pub fn to_input(&self, layout: &MatrixLayout) -> PriceMatrixInput {
        let materials = layout
            .materials
            .iter()
            .map(|line| {
                let key = line.material.key();
                let factors = match line.mode {
                    CostingMode::Percentage => &self.percentages,
                    CostingMode::Volumetric => &self.multipliers,
                };
                let input = MaterialInput::new(
                    parse_field(self.prices.get(key)),
                    parse_field(factors.get(key)),
                );
                (line.material, input)
            })
            .collect();

        let fixed = &self.fixed_costs;
        PriceMatrixInput {
            materials,
            labour: parse_decimal_or_zero(&fixed.labour),
            rent: parse_decimal_or_zero(&fixed.rent),
            capital: parse_decimal_or_zero(fixed.capital(layout.break_even_basis)),
            selling_price: parse_decimal_or_zero(&fixed.selling_price),
        }
    }

    /// Raw text of a material's factor under the layout's costing mode
    pub fn factor_text(&self, layout: &MatrixLayout, material: Material) -> &str {
        let factors = match layout.mode_of(material) {
            Some(CostingMode::Volumetric) => &self.multipliers,
            _ => &self.percentages,
        };
        factors.get(material.key()).map(String::as_str).unwrap_or_default()
    }

    pub fn price_text(&self, material: Material) -> &str {
        self.prices.get(material.key()).map(String::as_str).unwrap_or_default()
    }

    /// Copy with `lastUpdated` set to `now`
    pub fn stamped(mut self, now: DateTime<Utc>) -> Self {
        self.last_updated = Some(now);
        self
    }

    /// Copy without the timestamp, as stored in presets
    pub fn without_timestamp(mut self) -> Self {
        self.last_updated = None;
        self
    }
}

/// Body of a calculation request.
///
/// Either grouped `form` values or a flat `fields` map; when `fields` is
/// non-empty it takes precedence.
#[derive(Debug, Default, Deserialize)]
pub struct CalculateRequest {
    #[serde(default)]
    pub form: Option<FormValues>,
    #[serde(default, deserialize_with = "text_map")]
    pub fields: BTreeMap<String, String>,
}

impl CalculateRequest {
    pub fn into_form(self, layout: &MatrixLayout) -> FormValues {
        if !self.fields.is_empty() {
            return FormValues::from_fields(&self.fields, layout);
        }
        self.form.unwrap_or_default()
    }
}

/// Parse user-typed numeric text, treating anything unreadable as zero.
///
/// Reads the longest numeric prefix after leading whitespace, so `"12.5 t"`
/// is 12.5 and `"abc"` is 0. Exponents (`1e3`) are accepted. Numbers too
/// large for a decimal saturate to its bounds; ones too small to represent
/// are zero.
pub fn parse_decimal_or_zero(raw: &str) -> Decimal {
    let Some((text, scientific)) = numeric_prefix(raw.trim_start()) else {
        return Decimal::ZERO;
    };

    let parsed = if scientific {
        Decimal::from_scientific(&text).ok()
    } else {
        Decimal::from_str(&text).ok()
    };

    parsed.unwrap_or_else(|| out_of_range(&text))
}

// A well-formed number the decimal type cannot hold.
fn out_of_range(text: &str) -> Decimal {
    match text.parse::<f64>() {
        Ok(value) if value.abs() >= 1.0 => {
            if value.is_sign_negative() {
                Decimal::MIN
            } else {
                Decimal::MAX
            }
        }
        _ => Decimal::ZERO,
    }
}

fn parse_field(raw: Option<&String>) -> Decimal {
    raw.map(|text| parse_decimal_or_zero(text))
        .unwrap_or(Decimal::ZERO)
}

// Returns the normalized numeric prefix and whether it carries an exponent.
fn numeric_prefix(text: &str) -> Option<(String, bool)> {
    let bytes = text.as_bytes();
    let mut pos = 0;
    let mut normalized = String::new();

    match bytes.first() {
        Some(b'-') => {
            normalized.push('-');
            pos += 1;
        }
        Some(b'+') => pos += 1,
        _ => {}
    }

    let int_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    let int_digits = &text[int_start..pos];

    let mut frac_digits = "";
    if pos < bytes.len() && bytes[pos] == b'.' {
        let frac_start = pos + 1;
        let mut end = frac_start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        frac_digits = &text[frac_start..end];
        pos = end;
    }

    if int_digits.is_empty() && frac_digits.is_empty() {
        return None;
    }

    normalized.push_str(if int_digits.is_empty() { "0" } else { int_digits });
    if !frac_digits.is_empty() {
        normalized.push('.');
        normalized.push_str(frac_digits);
    }

    let mut scientific = false;
    if pos < bytes.len() && matches!(bytes[pos], b'e' | b'E') {
        let mut end = pos + 1;
        if end < bytes.len() && matches!(bytes[end], b'+' | b'-') {
            end += 1;
        }
        let digits_start = end;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end > digits_start {
            normalized.push('e');
            normalized.push_str(&text[pos + 1..end]);
            scientific = true;
        }
    }

    Some((normalized, scientific))
}

// Form values may arrive as strings, numbers or null; keep them as text.
fn text_of(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Number(number) => number.to_string(),
        _ => String::new(),
    }
}

fn text_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(text_of)
}

fn text_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, text_of(value)))
        .collect())
}
