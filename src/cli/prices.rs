use super::ui::{self, StyleType};
use crate::core::config::SiteConfig;
use crate::core::models::ScrapedPricingRow;
use crate::core::resolve::{CanonicalNames, FundCatalog, Resolution, resolve};
use crate::core::store::FundStore;
use crate::providers::RetryClient;
use crate::providers::pricing::{ScannedRow, scan_pricing_rows};
use anyhow::{Context, Result};
use comfy_table::Cell;
use tracing::{debug, info, warn};

/// What became of a single table row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Matched {
        row: ScrapedPricingRow,
        resolution: Resolution,
    },
    Unresolved {
        row: ScrapedPricingRow,
    },
    Malformed {
        reason: String,
    },
}

impl RowOutcome {
    pub fn classify<N: CanonicalNames>(names: &N, scanned: ScannedRow) -> Self {
        match scanned {
            ScannedRow::Malformed { reason } => RowOutcome::Malformed { reason },
            ScannedRow::Pricing(row) => match resolve(names, &row.fund_name) {
                Some(resolution) => RowOutcome::Matched { row, resolution },
                None => RowOutcome::Unresolved { row },
            },
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PricesReport {
    pub scraped: usize,
    pub malformed: usize,
    pub matched: usize,
    pub fuzzy_matched: usize,
    pub classes_saved: usize,
    pub costs_saved: usize,
    pub prices_saved: usize,
    pub persist_failures: usize,
    pub unmatched: Vec<String>,
}

impl PricesReport {
    pub fn display_as_table(&self) -> String {
        let mut output = ui::counts_table(&[
            ("Rows scraped", self.scraped, false),
            ("Malformed rows", self.malformed, true),
            ("Matched", self.matched, false),
            ("  of which fuzzy", self.fuzzy_matched, false),
            ("Unmatched", self.unmatched.len(), true),
            ("Classes saved", self.classes_saved, false),
            ("Costs saved", self.costs_saved, false),
            ("Prices saved", self.prices_saved, false),
            ("Persistence failures", self.persist_failures, true),
        ])
        .to_string();

        if !self.unmatched.is_empty() {
            let mut table = ui::new_styled_table();
            table.set_header(vec![ui::header_cell("Unmatched fund")]);
            for label in &self.unmatched {
                table.add_row(vec![Cell::new(ui::style_text(label, StyleType::Subtle))]);
            }
            output.push('\n');
            output.push_str(&table.to_string());
        }
        output
    }
}

/// Scrapes the latest prices table and stores classes, costs and prices of
/// every row that resolves to a stored fund.
///
/// A failed fetch or an unreadable page aborts the pass. Rows that cannot be
/// resolved or saved are reported and skipped.
pub async fn run(
    client: &RetryClient,
    store: &dyn FundStore,
    site: &SiteConfig,
) -> Result<PricesReport> {
    info!("Fetching latest prices...");

    let url = site.prices_url()?;
    let page = client
        .get(&url)
        .await
        .context("Failed to fetch latest prices page")?;
    let scanned = scan_pricing_rows(&page).context("Failed to scrape latest prices")?;

    let catalog = FundCatalog::load(store).await?;
    if catalog.is_empty() {
        warn!("No funds stored; run the funds pass first");
    }
    info!(
        "Resolving {} rows against {} funds",
        scanned.len(),
        catalog.len()
    );

    let mut report = PricesReport::default();
    for scanned_row in scanned {
        match RowOutcome::classify(&catalog, scanned_row) {
            RowOutcome::Malformed { reason } => {
                debug!("Skipping malformed row: {}", reason);
                report.malformed += 1;
            }
            RowOutcome::Unresolved { row } => {
                report.scraped += 1;
                debug!("No fund found for {}", row.fund_name);
                report.unmatched.push(row.label());
            }
            RowOutcome::Matched { row, resolution } => {
                report.scraped += 1;
                report.matched += 1;
                if resolution.is_fuzzy() {
                    report.fuzzy_matched += 1;
                    info!(
                        "Fuzzy match ({}): {} -> {}",
                        resolution.rule, row.fund_name, resolution.name
                    );
                }
                save_row(store, &row, &resolution, &mut report).await;
            }
        }
    }

    info!(
        "Completed prices pass: {} matched, {} unmatched",
        report.matched,
        report.unmatched.len()
    );
    Ok(report)
}

async fn save_row(
    store: &dyn FundStore,
    row: &ScrapedPricingRow,
    resolution: &Resolution,
    report: &mut PricesReport,
) {
    let class = row.fund_class(resolution.fund_id);
    let class_id = match store.upsert_fund_class(&class).await {
        Ok(id) => id,
        Err(e) => {
            warn!("Failed to save class {}: {:#}", row.label(), e);
            report.persist_failures += 1;
            return;
        }
    };
    report.classes_saved += 1;

    if let Some(cost) = row.fund_class_cost(class_id) {
        match store.upsert_fund_class_cost(&cost).await {
            Ok(()) => report.costs_saved += 1,
            Err(e) => {
                warn!("Failed to save costs of {}: {:#}", row.label(), e);
                report.persist_failures += 1;
            }
        }
    }

    if let Some(price) = row.fund_class_price(class_id) {
        match store.upsert_fund_class_price(&price).await {
            Ok(()) => report.prices_saved += 1,
            Err(e) => {
                warn!("Failed to save price of {}: {:#}", row.label(), e);
                report.persist_failures += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::Fund;
    use crate::core::models::fixtures::pricing_row;
    use crate::core::resolve::MatchRule;
    use crate::store::tests::BrokenStore;

    fn catalog() -> FundCatalog {
        FundCatalog::new([Fund {
            trust_no: 1234,
            name: "XYZ Income Fund".to_string(),
            secondary_name: String::new(),
            manager_id: 37,
        }])
    }

    #[test]
    fn test_classify_matched_row() {
        let outcome = RowOutcome::classify(
            &catalog(),
            ScannedRow::Pricing(pricing_row("XYZ Income", "Class A")),
        );
        match outcome {
            RowOutcome::Matched { row, resolution } => {
                assert_eq!(row.class.class_name, "Class A");
                assert_eq!(resolution.fund_id, 1234);
                assert_eq!(resolution.rule, MatchRule::AppendFund);
            }
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_unresolved_and_malformed() {
        let unresolved = RowOutcome::classify(
            &catalog(),
            ScannedRow::Pricing(pricing_row("Totally Unrelated", "Class B")),
        );
        assert!(matches!(unresolved, RowOutcome::Unresolved { .. }));

        let malformed = RowOutcome::classify(
            &catalog(),
            ScannedRow::Malformed {
                reason: "expected 11 cells, found 3".to_string(),
            },
        );
        assert_eq!(
            malformed,
            RowOutcome::Malformed {
                reason: "expected 11 cells, found 3".to_string()
            }
        );
    }

    #[test]
    fn test_report_lists_unmatched_names() {
        let report = PricesReport {
            scraped: 2,
            matched: 1,
            unmatched: vec!["Mystery Fund Class C".to_string()],
            ..PricesReport::default()
        };
        let rendered = report.display_as_table();
        assert!(rendered.contains("Mystery Fund Class C"));
        assert!(rendered.contains("Rows scraped"));
    }

    #[tokio::test]
    async fn test_save_failure_skips_row_and_keeps_going() {
        let store = BrokenStore::new(1234);
        let good = pricing_row("ABC Growth Fund", "Class A");
        let bad = pricing_row("XYZ Income Fund", "Class A");
        let mut report = PricesReport::default();

        for (row, fund_id) in [(bad, 1234), (good, 5678)] {
            let resolution = Resolution {
                fund_id,
                name: row.fund_name.clone(),
                rule: MatchRule::Exact,
            };
            save_row(&store, &row, &resolution, &mut report).await;
        }

        assert_eq!(report.persist_failures, 1);
        assert_eq!(report.classes_saved, 1);
        assert_eq!(report.costs_saved, 1);
        assert_eq!(report.prices_saved, 1);

        let classes = store.list_fund_classes().await.unwrap();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].fund_id, 5678);
        assert_eq!(store.list_fund_class_prices().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_prices_pass_continues_after_failed_save() {
        use crate::core::config::HttpConfig;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let row = |name: &str| {
            format!(
                r#"<tr class="fundrow"><td><div class="fundname">{name}</div></td>
                   <td>no</td><td>Retail</td><td>0.00%</td><td>31/12/20</td><td>1.2%</td>
                   <td>1.1%</td><td>0.1%</td><td>1.3%</td><td>05/03/21</td><td>10.5</td></tr>"#
            )
        };
        let page = format!(
            r#"<table id="dataTable"><tr class="sectorrow"><td>Bonds</td></tr>{}{}</table>"#,
            row("XYZ Income Fund Class A"),
            row("ABC Growth Fund Class A")
        );

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/prices.aspx"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .mount(&server)
            .await;

        let store = BrokenStore::new(1234);
        store
            .upsert_funds(&[
                Fund {
                    trust_no: 1234,
                    name: "XYZ Income Fund".to_string(),
                    secondary_name: String::new(),
                    manager_id: 37,
                },
                Fund {
                    trust_no: 5678,
                    name: "ABC Growth Fund".to_string(),
                    secondary_name: String::new(),
                    manager_id: 37,
                },
            ])
            .await
            .unwrap();

        let site = SiteConfig {
            base_url: server.uri(),
            prices_path: "/prices.aspx".to_string(),
            ..SiteConfig::default()
        };
        let client = RetryClient::new(&HttpConfig::default()).unwrap();
        let report = run(&client, &store, &site).await.unwrap();

        assert_eq!(report.matched, 2);
        assert_eq!(report.persist_failures, 1);
        assert_eq!(report.classes_saved, 1);
        assert_eq!(report.prices_saved, 1);

        let classes = store.list_fund_classes().await.unwrap();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].fund_id, 5678);
        assert_eq!(classes[0].category, "Bonds");
    }
}
