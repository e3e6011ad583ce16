//! Price matrix engine for asphalt-concrete production.
//!
//! Turns landed material prices, mix shares, fixed costs and a selling price
//! into production cost, gross profit, profit percentage and break-even
//! tonnage. The engine itself (`calculators`) is pure; the remaining modules
//! parse form input, format results, persist state and expose it over HTTP.

pub mod calculators;
pub mod export;
pub mod format;
pub mod matrix;
pub mod models;
pub mod queries;
pub mod requests;
pub mod responses;
pub mod routes;
pub mod services;

// Re-export commonly used items
pub use calculators::{
    check_mix_percentages, compute_costs, round_money, BreakEven, MaterialInput, PriceMatrixInput,
    ProfitSnapshot,
};
pub use format::DisplayFormat;
pub use matrix::{BreakEvenBasis, CostingMode, Material, MatrixLayout};
pub use requests::{parse_decimal_or_zero, FormValues};
pub use routes::router;
pub use services::{Calculation, PricingError};
