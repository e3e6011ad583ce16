//! Export artifacts: a flat-row spreadsheet (CSV) and a printable report.
//!
//! Both are rendered from a [`Calculation`] and hold no pricing logic of
//! their own.

use askama::Template;
use chrono::{DateTime, Utc};

use super::format::{mix_warning, DisplayFormat};
use super::matrix::{CostingMode, Material};
use super::services::Calculation;

pub const REPORT_TITLE: &str = "Asphalt Concrete Price Matrix Breakdown";
pub const SPREADSHEET_TITLE: &str = "Asphalt Concrete Price Matrix Report";
pub const SPREADSHEET_FILENAME: &str = "price-matrix-report.csv";

const GENERATED_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// Row order of the spreadsheet's material section: aggregates, then binders
const SPREADSHEET_MATERIAL_ORDER: [Material; 6] = [
    Material::Dust,
    Material::Agg1014,
    Material::Agg610,
    Material::Agg1420,
    Material::Bitumen,
    Material::Ido,
];

/// Spreadsheet rows: title, material costs, fixed costs and summary.
pub fn spreadsheet_rows(
    calculation: &Calculation,
    format: &DisplayFormat,
    generated_at: DateTime<Utc>,
) -> Vec<Vec<String>> {
    let snapshot = &calculation.snapshot;
    let row = |cells: &[&str]| cells.iter().map(|c| c.to_string()).collect::<Vec<_>>();

    let mut rows = vec![
        row(&[SPREADSHEET_TITLE]),
        row(&["Generated on:", &generated_at.format(GENERATED_FORMAT).to_string()]),
        row(&[""]),
        row(&["Material Costs"]),
        row(&["Component", "Cost"]),
    ];

    let mut lines: Vec<_> = snapshot.material_costs.iter().collect();
    lines.sort_by_key(|line| {
        SPREADSHEET_MATERIAL_ORDER
            .iter()
            .position(|material| *material == line.material)
    });
    for line in lines {
        rows.push(row(&[line.material.label(), &format.money(line.cost)]));
    }

    rows.extend([
        row(&[""]),
        row(&["Fixed Costs"]),
        row(&["Labour", &format.money(snapshot.labour)]),
        row(&["Rent", &format.money(snapshot.rent)]),
        row(&[""]),
        row(&["Summary"]),
        row(&["Total Cost", &format.money(snapshot.total_cost)]),
        row(&["Gross Profit", &format.money(snapshot.gross_profit)]),
        row(&["Profit Percentage", &format.percentage(snapshot.profit_percentage)]),
        row(&["Break-Even Point", &format.break_even(snapshot.break_even)]),
    ]);

    rows
}

/// Encode rows as CSV. Rows may differ in length.
pub fn write_csv(rows: &[Vec<String>]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    for row in rows {
        writer.write_record(row)?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// Label/value row of a report table
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub label: String,
    pub value: String,
}

impl ReportRow {
    fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Cost breakdown row of the report
#[derive(Debug, Clone, PartialEq)]
pub struct CostRow {
    pub component: String,
    pub base_price: String,
    pub factor: String,
    pub cost: String,
}

/// Printable breakdown report
#[derive(Template)]
#[template(path = "price_matrix/report.html")]
pub struct ReportTemplate {
    pub title: String,
    pub generated_on: String,
    pub parameters: Vec<ReportRow>,
    pub costs: Vec<CostRow>,
    pub profit: Vec<ReportRow>,
    pub break_even: Vec<ReportRow>,
    pub mix_warning: Option<String>,
    pub note: String,
}

impl ReportTemplate {
    pub fn new(
        calculation: &Calculation,
        format: &DisplayFormat,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let snapshot = &calculation.snapshot;
        let form = &calculation.form;
        let fixed = &form.fixed_costs;
        let capital_label = snapshot.break_even_basis.label();
        let currency = &format.currency;

        // Inputs are echoed as typed, as on the calculator form
        let typed = |raw: &str| format!("{} {}", raw, currency);

        let selling_price = typed(&fixed.selling_price);
        let capital = typed(fixed.capital(snapshot.break_even_basis));
        let total_cost = format.money(snapshot.total_cost);
        let gross_profit = format.money(snapshot.gross_profit);
        let break_even = format.break_even(snapshot.break_even);

        let mut costs: Vec<CostRow> = snapshot
            .material_costs
            .iter()
            .map(|line| {
                let factor = form.factor_text(&calculation.layout, line.material);
                CostRow {
                    component: line.material.label().to_string(),
                    base_price: typed(form.price_text(line.material)),
                    factor: match line.mode {
                        CostingMode::Percentage => format!("{}%", factor),
                        CostingMode::Volumetric => format!("{} times", factor),
                    },
                    cost: format.money(line.cost),
                }
            })
            .collect();

        costs.push(CostRow {
            component: "Labour/Diesel Allowance".to_string(),
            base_price: typed(&fixed.labour),
            factor: "Fixed Cost".to_string(),
            cost: format.money(snapshot.labour),
        });
        costs.push(CostRow {
            component: "Rent per 1,000 Tons".to_string(),
            base_price: typed(&fixed.rent),
            factor: "Fixed Cost".to_string(),
            cost: format.money(snapshot.rent),
        });

        let note = format!(
            "Note: This breakdown shows how the profit of {gross_profit} per unit is calculated \
             by subtracting the total production cost ({total_cost}) from the assumed selling \
             price of {selling_price}. The break-even point indicates the number of tons needed \
             to recover the {} of {capital}.",
            capital_label.to_lowercase()
        );

        Self {
            title: REPORT_TITLE.to_string(),
            generated_on: generated_at.format(GENERATED_FORMAT).to_string(),
            parameters: vec![
                ReportRow::new("Assumed Selling Price", selling_price.clone()),
                ReportRow::new(capital_label, capital.clone()),
            ],
            costs,
            profit: vec![
                ReportRow::new("Total Production Cost", total_cost.clone()),
                ReportRow::new("Assumed Selling Price", selling_price.clone()),
                ReportRow::new("Gross Profit per Unit", gross_profit.clone()),
                ReportRow::new(
                    "Profit Percentage",
                    format.percentage(snapshot.profit_percentage),
                ),
            ],
            break_even: vec![
                ReportRow::new(capital_label, capital.clone()),
                ReportRow::new("Gross Profit per Unit", gross_profit.clone()),
                ReportRow::new("Break-even Point", break_even.clone()),
                ReportRow::new(
                    "Break-even Calculation",
                    format!("{capital} ÷ {gross_profit} = {break_even}"),
                ),
            ],
            mix_warning: (!calculation.mix_valid).then(|| mix_warning(calculation.mix_total)),
            note,
        }
    }
}

/// Render the printable report as HTML
pub fn render_report(
    calculation: &Calculation,
    format: &DisplayFormat,
    generated_at: DateTime<Utc>,
) -> Result<String, askama::Error> {
    ReportTemplate::new(calculation, format, generated_at).render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::matrix::MatrixLayout;
    use crate::pricing::requests::FormValues;
    use crate::pricing::services::calculate;
    use chrono::TimeZone;
    use serde_json::json;

    fn calculation(selling_price: &str) -> Calculation {
        let form: FormValues = serde_json::from_value(json!({
            "prices": { "bitumen": "95", "dust": "928", "agg1014": "1044", "agg610": "812", "ido": "90" },
            "percentages": { "dust": "40", "agg1014": "30", "agg610": "30" },
            "multipliers": { "bitumen": "1", "ido": "1" },
            "fixedCosts": { "moneyInvested": "100000", "labour": "500", "rent": "300", "sellingPrice": selling_price }
        }))
        .unwrap();
        calculate(&MatrixLayout::standard(), form)
    }

    fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap()
    }

    #[test]
    fn test_spreadsheet_rows() {
        let rows = spreadsheet_rows(&calculation("2000"), &DisplayFormat::default(), generated_at());

        assert_eq!(rows[0], vec![SPREADSHEET_TITLE]);
        assert_eq!(rows[1], vec!["Generated on:", "2026-10-19 08:30 UTC"]);
        let materials: Vec<&str> = rows[5..10].iter().map(|r| r[0].as_str()).collect();
        assert_eq!(
            materials,
            ["Dust", "Aggregate 10-14", "Aggregate 6-10", "Bitumen", "IDO"]
        );
        assert_eq!(rows[5], vec!["Dust", "371.20 KES"]);
        assert_eq!(rows[8], vec!["Bitumen", "95.00 KES"]);
        assert!(rows.contains(&vec!["Labour".to_string(), "500.00 KES".to_string()]));

        let last = rows.last().unwrap();
        assert_eq!(last, &vec!["Break-Even Point", "1,149.43 Tons/month"]);
        assert_eq!(rows.len(), 5 + 5 + 10);
    }

    #[test]
    fn test_spreadsheet_rows_coarse_layout_order() {
        let form = calculation("2000").form;
        let coarse = calculate(&MatrixLayout::coarse(), form);
        let rows = spreadsheet_rows(&coarse, &DisplayFormat::default(), generated_at());

        let materials: Vec<&str> = rows[5..11].iter().map(|r| r[0].as_str()).collect();
        assert_eq!(
            materials,
            ["Dust", "Aggregate 10-14", "Aggregate 6-10", "Aggregate 14-20", "Bitumen", "IDO"]
        );
    }

    #[test]
    fn test_write_csv_quotes_grouped_amounts() {
        let rows = vec![
            vec!["Total Cost".to_string(), "1,913.00 KES".to_string()],
            vec!["Summary".to_string()],
        ];
        let bytes = write_csv(&rows).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "Total Cost,\"1,913.00 KES\"\nSummary\n");
    }

    #[test]
    fn test_report_template_rows() {
        let report = ReportTemplate::new(&calculation("2000"), &DisplayFormat::default(), generated_at());

        assert_eq!(report.parameters[0], ReportRow::new("Assumed Selling Price", "2000 KES"));
        assert_eq!(report.parameters[1], ReportRow::new("Money Invested", "100000 KES"));

        assert_eq!(report.costs.len(), 7);
        assert_eq!(report.costs[0].factor, "1 times");
        assert_eq!(report.costs[1].factor, "40%");
        assert_eq!(report.costs[1].base_price, "928 KES");
        assert_eq!(report.costs[5].factor, "Fixed Cost");
        assert_eq!(report.costs[6].cost, "300.00 KES");

        assert_eq!(
            report.break_even[3].value,
            "100000 KES ÷ 87.00 KES = 1,149.43 Tons/month"
        );
        assert!(report.mix_warning.is_none());
        assert!(report.note.contains("money invested of 100000 KES"));
    }

    #[test]
    fn test_render_report_html() {
        let html = render_report(&calculation("0"), &DisplayFormat::default(), generated_at()).unwrap();

        assert!(html.contains(REPORT_TITLE));
        assert!(html.contains("Generated on: 2026-10-19 08:30 UTC"));
        assert!(html.contains("No Profit"));
        assert!(html.contains("Rent per 1,000 Tons"));
        assert!(html.contains("Trapoz System"));
    }
}
