//! Latest prices and costs table.
//!
//! The table interleaves sector header rows with fund class rows; every class
//! row belongs to the nearest sector header above it. Class rows have 11 cells:
//!
//! | # | content                          | # | content                   |
//! |---|----------------------------------|---|---------------------------|
//! | 0 | fund name [+ " Class X"]         | 6 | TER                       |
//! | 1 | additional fee (yes/no)          | 7 | transaction costs         |
//! | 2 | target market                    | 8 | total investment charge   |
//! | 3 | max initial fee                  | 9 | price date                |
//! | 4 | cost effective date              | 10| NAV                       |
//! | 5 | TER incl. performance component  |   |                           |

use super::html::{ScrapeError, parse_document, selector, text_of};
use crate::core::models::{ScrapedClass, ScrapedCost, ScrapedPrice, ScrapedPricingRow};
use crate::core::parse::{parse_date, parse_decimal, parse_percentage};
use scraper::ElementRef;
use tracing::debug;

const ROW_SELECTOR: &str = "#dataTable tr";
const FUND_NAME_SELECTOR: &str = "div.fundname";
const SECTOR_ROW_CLASS: &str = "sectorrow";
const FUND_ROW_CLASS: &str = "fundrow";
const MIN_CELLS: usize = 11;
const CLASS_DELIMITER: &str = " class ";

/// A fund row of the table, either parsed or rejected as malformed.
#[derive(Debug, Clone, PartialEq)]
pub enum ScannedRow {
    Pricing(ScrapedPricingRow),
    Malformed { reason: String },
}

/// Parsed fund rows in document order; malformed rows are dropped.
pub fn extract_pricing_rows(html: &[u8]) -> Result<Vec<ScrapedPricingRow>, ScrapeError> {
    Ok(scan_pricing_rows(html)?
        .into_iter()
        .filter_map(|row| match row {
            ScannedRow::Pricing(row) => Some(row),
            ScannedRow::Malformed { .. } => None,
        })
        .collect())
}

/// Every fund row in document order, keeping malformed rows for reporting.
pub fn scan_pricing_rows(html: &[u8]) -> Result<Vec<ScannedRow>, ScrapeError> {
    let doc = parse_document(html)?;
    let row_sel = selector(ROW_SELECTOR)?;
    let fund_name_sel = selector(FUND_NAME_SELECTOR)?;

    let mut rows = Vec::new();
    let mut category = String::new();

    for row in doc.select(&row_sel) {
        let cells: Vec<ElementRef<'_>> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|cell| matches!(cell.value().name(), "td" | "th"))
            .collect();

        if has_class(row, SECTOR_ROW_CLASS) {
            category = cells.first().map(|cell| text_of(*cell)).unwrap_or_default();
            debug!("Entering category {:?}", category);
            continue;
        }

        if !has_class(row, FUND_ROW_CLASS) {
            continue;
        }

        if cells.len() < MIN_CELLS {
            debug!("Skipping fund row with {} cells", cells.len());
            rows.push(ScannedRow::Malformed {
                reason: format!("expected {MIN_CELLS} cells, found {}", cells.len()),
            });
            continue;
        }

        let name_cell = cells[0];
        let full_name = name_cell
            .select(&fund_name_sel)
            .next()
            .map(text_of)
            .unwrap_or_else(|| text_of(name_cell));

        let (fund_name, class_name) = split_fund_and_class(&full_name);
        if fund_name.is_empty() {
            debug!("Skipping fund row without a fund name");
            rows.push(ScannedRow::Malformed {
                reason: "missing fund name".to_string(),
            });
            continue;
        }

        let cell = |idx: usize| text_of(cells[idx]);

        rows.push(ScannedRow::Pricing(ScrapedPricingRow {
            fund_name,
            class: ScrapedClass {
                class_name,
                has_additional_fee: cell(1).eq_ignore_ascii_case("yes"),
                target_market: cell(2),
                max_initial_fee: parse_percentage(&cell(3)),
                category: category.clone(),
            },
            cost: ScrapedCost {
                effective_date: parse_date(&cell(4)),
                ter_perf_component: parse_percentage(&cell(5)),
                ter: parse_percentage(&cell(6)),
                transaction_costs: parse_percentage(&cell(7)),
                total_investment_charge: parse_percentage(&cell(8)),
            },
            price: ScrapedPrice {
                price_date: parse_date(&cell(9)),
                nav: parse_decimal(&cell(10)),
            },
        }));
    }

    debug!("Scanned {} fund rows", rows.len());
    Ok(rows)
}

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

/// Splits `"ABC Growth Fund Class A"` into `("ABC Growth Fund", "Class A")`.
/// Without a class designator the class name is empty.
pub fn split_fund_and_class(full_name: &str) -> (String, String) {
    let full_name = full_name.trim();
    // ASCII lowercasing keeps byte offsets valid for `full_name`
    match full_name.to_ascii_lowercase().find(CLASS_DELIMITER) {
        Some(idx) => {
            let fund = full_name[..idx].trim();
            let class = full_name[idx + CLASS_DELIMITER.len()..].trim();
            (fund.to_string(), format!("Class {class}"))
        }
        None => (full_name.to_string(), String::new()),
    }
}
