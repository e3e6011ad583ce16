//! Display formatting for calculation results.
//!
//! Everything shown to a user goes through [`DisplayFormat`]: two fraction
//! digits, comma thousands separators, and a unit suffix.

use rust_decimal::Decimal;

use super::calculators::{round_money, BreakEven};

/// Shown in place of a break-even tonnage when there is no profit
pub const NOT_APPLICABLE: &str = "N/A (No Profit)";

/// Units appended to formatted values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFormat {
    pub currency: String,
    pub tonnage_unit: String,
}

impl Default for DisplayFormat {
    fn default() -> Self {
        Self {
            currency: "KES".to_string(),
            tonnage_unit: "Tons/month".to_string(),
        }
    }
}

impl DisplayFormat {
    pub fn new(currency: impl Into<String>, tonnage_unit: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            tonnage_unit: tonnage_unit.into(),
        }
    }

    /// `1234.5` -> `"1,234.50 KES"`
    pub fn money(&self, amount: Decimal) -> String {
        format!("{} {}", group_thousands(amount), self.currency)
    }

    /// `4.35` -> `"4.35%"`
    pub fn percentage(&self, percent: Decimal) -> String {
        format!("{}%", group_thousands(percent))
    }

    pub fn break_even(&self, break_even: BreakEven) -> String {
        match break_even {
            BreakEven::Tons(tons) => format!("{} {}", group_thousands(tons), self.tonnage_unit),
            BreakEven::NotApplicable => NOT_APPLICABLE.to_string(),
        }
    }
}

/// Round to two places and insert comma thousands separators.
pub fn group_thousands(value: Decimal) -> String {
    let fixed = format!("{:.2}", round_money(value, 2));
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    // -0.001 rounds to zero; never show "-0.00"
    let sign = if grouped.chars().all(|c| c == '0' || c == ',') && frac_part == "00" {
        ""
    } else {
        sign
    };

    format!("{sign}{grouped}.{frac_part}")
}

/// Mix total as typed, without trailing zeros (`90`, `100.5`)
pub fn mix_total(total: Decimal) -> String {
    total.normalize().to_string()
}

pub fn mix_warning(total: Decimal) -> String {
    format!(
        "Material percentages sum to {}% (should be 100%)",
        mix_total(total)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(dec!(0)), "0.00");
        assert_eq!(group_thousands(dec!(87)), "87.00");
        assert_eq!(group_thousands(dec!(371.2)), "371.20");
        assert_eq!(group_thousands(dec!(1913)), "1,913.00");
        assert_eq!(group_thousands(dec!(100000)), "100,000.00");
        assert_eq!(group_thousands(dec!(1234567.891)), "1,234,567.89");
    }

    #[test]
    fn test_group_thousands_negative() {
        assert_eq!(group_thousands(dec!(-1913)), "-1,913.00");
        assert_eq!(group_thousands(dec!(-87.456)), "-87.46");
        assert_eq!(group_thousands(dec!(-0.001)), "0.00");
    }

    #[test]
    fn test_money_and_percentage() {
        let format = DisplayFormat::default();
        assert_eq!(format.money(dec!(1913.0)), "1,913.00 KES");
        assert_eq!(format.percentage(dec!(4.35)), "4.35%");
        assert_eq!(format.percentage(dec!(-95.65)), "-95.65%");

        let format = DisplayFormat::new("USD", "t/week");
        assert_eq!(format.money(dec!(12)), "12.00 USD");
    }

    #[test]
    fn test_break_even_display() {
        let format = DisplayFormat::default();
        assert_eq!(
            format.break_even(BreakEven::Tons(dec!(100000) / dec!(87))),
            "1,149.43 Tons/month"
        );
        assert_eq!(format.break_even(BreakEven::NotApplicable), "N/A (No Profit)");
    }

    #[test]
    fn test_mix_warning() {
        assert_eq!(
            mix_warning(dec!(90.00)),
            "Material percentages sum to 90% (should be 100%)"
        );
        assert_eq!(mix_total(dec!(100.50)), "100.5");
    }
}
