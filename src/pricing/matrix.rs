//! Engine layout: which materials take part in a mix and how each is costed.
//!
//! Plants price their mix slightly differently (some run a 14-20 aggregate
//! tier, some recover "fixed costs" instead of "money invested"). Rather than
//! separate code paths, a single [`MatrixLayout`] describes the variant and
//! the calculators read it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A raw material line in the price matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Material {
    Dust,
    Agg1014,
    Agg610,
    Agg1420,
    Bitumen,
    Ido,
}

impl Material {
    /// Key used in persisted records (`prices.agg1014`, `percentages.dust`, ...)
    pub fn key(self) -> &'static str {
        match self {
            Material::Dust => "dust",
            Material::Agg1014 => "agg1014",
            Material::Agg610 => "agg610",
            Material::Agg1420 => "agg1420",
            Material::Bitumen => "bitumen",
            Material::Ido => "ido",
        }
    }

    /// Human readable name for reports and exports
    pub fn label(self) -> &'static str {
        match self {
            Material::Dust => "Dust",
            Material::Agg1014 => "Aggregate 10-14",
            Material::Agg610 => "Aggregate 6-10",
            Material::Agg1420 => "Aggregate 14-20",
            Material::Bitumen => "Bitumen",
            Material::Ido => "IDO",
        }
    }

    /// Costing mode the material uses unless a layout overrides it.
    ///
    /// Bitumen and IDO are bought by volume; everything else is a share of
    /// the mix by weight.
    pub fn default_mode(self) -> CostingMode {
        match self {
            Material::Bitumen | Material::Ido => CostingMode::Volumetric,
            _ => CostingMode::Percentage,
        }
    }

    pub fn all() -> [Material; 6] {
        [
            Material::Dust,
            Material::Agg1014,
            Material::Agg610,
            Material::Agg1420,
            Material::Bitumen,
            Material::Ido,
        ]
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a material's factor turns its landed price into a cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostingMode {
    /// cost = price * percent / 100
    Percentage,
    /// cost = price * factor (liters or a plain multiplier)
    Volumetric,
}

/// Which capital figure is divided by gross profit for break-even.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakEvenBasis {
    MoneyInvested,
    FixedCosts,
}

impl BreakEvenBasis {
    pub fn label(self) -> &'static str {
        match self {
            BreakEvenBasis::MoneyInvested => "Money Invested",
            BreakEvenBasis::FixedCosts => "Fixed Costs",
        }
    }
}

/// One material line of a layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MaterialLine {
    pub material: Material,
    pub mode: CostingMode,
}

impl MaterialLine {
    pub fn new(material: Material) -> Self {
        Self {
            material,
            mode: material.default_mode(),
        }
    }
}

/// Full description of a price matrix variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixLayout {
    pub name: String,
    pub materials: Vec<MaterialLine>,
    pub break_even_basis: BreakEvenBasis,
}

impl MatrixLayout {
    /// Five-material mix, break-even on money invested.
    pub fn standard() -> Self {
        Self {
            name: "standard".to_string(),
            materials: [
                Material::Bitumen,
                Material::Dust,
                Material::Agg1014,
                Material::Agg610,
                Material::Ido,
            ]
            .into_iter()
            .map(MaterialLine::new)
            .collect(),
            break_even_basis: BreakEvenBasis::MoneyInvested,
        }
    }

    /// Standard mix plus the 14-20 aggregate tier, break-even on fixed costs.
    pub fn coarse() -> Self {
        Self {
            name: "coarse".to_string(),
            materials: [
                Material::Bitumen,
                Material::Dust,
                Material::Agg1014,
                Material::Agg610,
                Material::Agg1420,
                Material::Ido,
            ]
            .into_iter()
            .map(MaterialLine::new)
            .collect(),
            break_even_basis: BreakEvenBasis::FixedCosts,
        }
    }

    pub fn mode_of(&self, material: Material) -> Option<CostingMode> {
        self.materials
            .iter()
            .find(|line| line.material == material)
            .map(|line| line.mode)
    }

    /// Materials costed by share of the mix, in layout order
    pub fn percentage_materials(&self) -> impl Iterator<Item = Material> + '_ {
        self.materials
            .iter()
            .filter(|line| line.mode == CostingMode::Percentage)
            .map(|line| line.material)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown price matrix layout '{0}' (expected 'standard' or 'coarse')")]
pub struct UnknownLayout(pub String);

impl FromStr for MatrixLayout {
    type Err = UnknownLayout;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(Self::standard()),
            "coarse" => Ok(Self::coarse()),
            other => Err(UnknownLayout(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_modes() {
        assert_eq!(Material::Bitumen.default_mode(), CostingMode::Volumetric);
        assert_eq!(Material::Ido.default_mode(), CostingMode::Volumetric);
        assert_eq!(Material::Dust.default_mode(), CostingMode::Percentage);
        assert_eq!(Material::Agg1420.default_mode(), CostingMode::Percentage);
    }

    #[test]
    fn test_standard_layout() {
        let layout = MatrixLayout::standard();
        assert_eq!(layout.materials.len(), 5);
        assert!(layout.mode_of(Material::Agg1420).is_none());
        assert_eq!(layout.break_even_basis, BreakEvenBasis::MoneyInvested);

        let percent: Vec<_> = layout.percentage_materials().collect();
        assert_eq!(
            percent,
            vec![Material::Dust, Material::Agg1014, Material::Agg610]
        );
    }

    #[test]
    fn test_coarse_layout() {
        let layout = MatrixLayout::coarse();
        assert!(layout.mode_of(Material::Agg1420).is_some());
        assert_eq!(layout.mode_of(Material::Agg1420), Some(CostingMode::Percentage));
        assert_eq!(layout.break_even_basis, BreakEvenBasis::FixedCosts);
        assert_eq!(layout.percentage_materials().count(), 4);
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!("standard".parse::<MatrixLayout>().unwrap(), MatrixLayout::standard());
        assert_eq!(" Coarse ".parse::<MatrixLayout>().unwrap(), MatrixLayout::coarse());
        let err = "premium".parse::<MatrixLayout>().unwrap_err();
        assert!(err.to_string().contains("premium"));
    }
}
