use super::ui::{self, StyleType};
use crate::core::config::SiteConfig;
use crate::core::models::Fund;
use crate::core::store::FundStore;
use crate::providers::RetryClient;
use crate::providers::listing::scrape_funds;
use crate::providers::viewstate::{ViewState, build_form};
use anyhow::{Context, Result};
use comfy_table::Cell;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerFailure {
    pub manager_id: i32,
    pub error: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FundsReport {
    pub managers_processed: usize,
    pub funds_scraped: usize,
    pub funds_persisted: usize,
    /// Funds scraped but not saved
    pub persist_failures: usize,
    pub failed_managers: Vec<ManagerFailure>,
}

impl FundsReport {
    pub fn display_as_table(&self) -> String {
        let mut output = ui::counts_table(&[
            ("Managers processed", self.managers_processed, false),
            ("Funds scraped", self.funds_scraped, false),
            ("Funds persisted", self.funds_persisted, false),
            ("Funds not saved", self.persist_failures, true),
            ("Failed managers", self.failed_managers.len(), true),
        ])
        .to_string();

        if !self.failed_managers.is_empty() {
            let mut table = ui::new_styled_table();
            table.set_header(vec![ui::header_cell("Manager"), ui::header_cell("Error")]);
            for failure in &self.failed_managers {
                table.add_row(vec![
                    Cell::new(format!("{:04}", failure.manager_id)),
                    Cell::new(ui::style_text(&failure.error, StyleType::Error)),
                ]);
            }
            output.push('\n');
            output.push_str(&table.to_string());
        }
        output
    }
}

/// Refreshes the funds of each manager in `manager_ids`, or of every stored
/// manager when the list is empty.
///
/// Managers are processed one at a time with `delay` between them. A manager
/// whose pages cannot be fetched or parsed is recorded and skipped.
pub async fn run(
    client: &RetryClient,
    store: &dyn FundStore,
    site: &SiteConfig,
    delay: Duration,
    manager_ids: &[i32],
) -> Result<FundsReport> {
    info!("Fetching funds for managers...");

    let manager_ids: Vec<i32> = if manager_ids.is_empty() {
        let managers = store
            .list_managers()
            .await
            .context("Failed to load stored managers")?;
        info!("Processing funds for all {} managers", managers.len());
        managers.into_iter().map(|m| m.id).collect()
    } else {
        info!("Processing funds for {} specific managers", manager_ids.len());
        manager_ids.to_vec()
    };

    let lookup_url = site.lookup_url()?;
    let mut report = FundsReport::default();
    let pb = ui::new_progress_bar(manager_ids.len() as u64, true);

    for (idx, &manager_id) in manager_ids.iter().enumerate() {
        pb.set_message(format!("Manager {manager_id:04}"));
        report.managers_processed += 1;

        match fetch_manager_funds(client, &lookup_url, manager_id).await {
            Ok(funds) if funds.is_empty() => {
                info!("No funds found for manager {}", manager_id);
            }
            Ok(funds) => {
                report.funds_scraped += funds.len();
                match store.upsert_funds(&funds).await {
                    Ok(()) => report.funds_persisted += funds.len(),
                    Err(e) => {
                        warn!("Failed to save funds of manager {}: {:#}", manager_id, e);
                        report.persist_failures += funds.len();
                    }
                }
            }
            Err(e) => {
                warn!("Skipping manager {}: {:#}", manager_id, e);
                report.failed_managers.push(ManagerFailure {
                    manager_id,
                    error: format!("{e:#}"),
                });
            }
        }

        pb.inc(1);
        if idx + 1 < manager_ids.len() && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
    pb.finish_and_clear();

    info!(
        "Completed funds pass: {} funds from {} managers",
        report.funds_persisted, report.managers_processed
    );
    Ok(report)
}

/// Fetches a fresh lookup page, replays its state with the manager selected
/// and scrapes the fund list from the response.
#[instrument(skip(client, lookup_url))]
async fn fetch_manager_funds(
    client: &RetryClient,
    lookup_url: &str,
    manager_id: i32,
) -> Result<Vec<Fund>> {
    let initial = client
        .get(lookup_url)
        .await
        .context("Failed to fetch lookup page")?;
    let state = ViewState::extract(&initial).context("Failed to extract view state")?;

    let form = build_form(&state, manager_id);
    let page = client
        .post_form(lookup_url, &form)
        .await
        .context("Failed to post manager selection")?;

    let funds = scrape_funds(&page, manager_id).context("Failed to scrape funds")?;
    debug!("Scraped {} funds", funds.len());
    Ok(funds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::HttpConfig;
    use crate::core::models::Manager;
    use crate::store::MemoryStore;
    use crate::store::tests::BrokenStore;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LOOKUP_PAGE: &str = r#"
        <form>
          <input type="hidden" name="__VIEWSTATE" value="state123" />
          <input type="hidden" name="__VIEWSTATEGENERATOR" value="GEN" />
          <input type="hidden" name="__EVENTVALIDATION" value="EV" />
          <select name="MANCO_ID"><option value="0037">Allan Gray</option></select>
        </form>
    "#;

    fn test_http() -> HttpConfig {
        HttpConfig {
            max_attempts: 2,
            backoff_ms: 1,
            ..HttpConfig::default()
        }
    }

    async fn mock_lookup(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/lookup.aspx"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LOOKUP_PAGE))
            .mount(server)
            .await;
    }

    async fn mock_manager_funds(server: &MockServer, manager: &str, options: &str) {
        Mock::given(method("POST"))
            .and(path("/lookup.aspx"))
            .and(body_string_contains(format!("MANCO_ID={manager}")))
            .and(body_string_contains("__VIEWSTATE=state123"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!(r#"<select name="TrustNo">{options}</select>"#)),
            )
            .mount(server)
            .await;
    }

    fn site(server: &MockServer) -> SiteConfig {
        SiteConfig {
            base_url: server.uri(),
            lookup_path: "/lookup.aspx".to_string(),
            ..SiteConfig::default()
        }
    }

    #[tokio::test]
    async fn test_funds_pass_for_explicit_managers() {
        let server = MockServer::start().await;
        mock_lookup(&server).await;
        mock_manager_funds(
            &server,
            "0037",
            r#"<option value="">Select</option><option value="1001">AG Balanced Fund</option>"#,
        )
        .await;
        mock_manager_funds(&server, "0112", r#"<option value="2002">Coro Top 20</option>"#)
            .await;

        let client = RetryClient::new(&test_http()).unwrap();
        let store = MemoryStore::new();
        let report = run(&client, &store, &site(&server), Duration::ZERO, &[37, 112])
            .await
            .unwrap();

        assert_eq!(report.managers_processed, 2);
        assert_eq!(report.funds_scraped, 2);
        assert_eq!(report.funds_persisted, 2);
        assert!(report.failed_managers.is_empty());

        let funds = store.list_funds().await.unwrap();
        assert_eq!(funds.len(), 2);
        assert_eq!(funds[0].trust_no, 1001);
        assert_eq!(funds[0].manager_id, 37);
        assert_eq!(funds[1].manager_id, 112);
    }

    #[tokio::test]
    async fn test_funds_pass_uses_stored_managers_and_skips_failures() {
        let server = MockServer::start().await;
        mock_lookup(&server).await;
        mock_manager_funds(&server, "0037", r#"<option value="1001">AG Balanced Fund</option>"#)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("MANCO_ID=0099"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let store = MemoryStore::new();
        store
            .upsert_managers(&[
                Manager {
                    id: 37,
                    name: "Allan Gray".to_string(),
                },
                Manager {
                    id: 99,
                    name: "Broken".to_string(),
                },
            ])
            .await
            .unwrap();

        let client = RetryClient::new(&test_http()).unwrap();
        let report = run(&client, &store, &site(&server), Duration::ZERO, &[])
            .await
            .unwrap();

        assert_eq!(report.managers_processed, 2);
        assert_eq!(report.funds_persisted, 1);
        assert_eq!(report.failed_managers.len(), 1);
        assert_eq!(report.failed_managers[0].manager_id, 99);
        assert!(report.failed_managers[0].error.contains("final status 500"));
        assert!(report.display_as_table().contains("0099"));
    }

    #[tokio::test]
    async fn test_manager_without_funds_is_not_a_failure() {
        let server = MockServer::start().await;
        mock_lookup(&server).await;
        mock_manager_funds(&server, "0037", "").await;

        let client = RetryClient::new(&test_http()).unwrap();
        let store = MemoryStore::new();
        let report = run(&client, &store, &site(&server), Duration::ZERO, &[37])
            .await
            .unwrap();

        assert_eq!(report.funds_scraped, 0);
        assert!(report.failed_managers.is_empty());
        assert!(store.list_funds().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_is_counted_per_fund_and_pass_continues() {
        let server = MockServer::start().await;
        mock_lookup(&server).await;
        mock_manager_funds(
            &server,
            "0037",
            r#"<option value="1001">AG Balanced Fund</option><option value="1002">AG Equity Fund</option>"#,
        )
        .await;
        mock_manager_funds(&server, "0112", r#"<option value="2002">Coro Top 20</option>"#)
            .await;

        let client = RetryClient::new(&test_http()).unwrap();
        let store = BrokenStore::new(37);
        let report = run(&client, &store, &site(&server), Duration::ZERO, &[37, 112])
            .await
            .unwrap();

        assert_eq!(report.funds_scraped, 3);
        assert_eq!(report.funds_persisted, 1);
        assert_eq!(report.persist_failures, 2);
        assert!(report.failed_managers.is_empty());

        let funds = store.list_funds().await.unwrap();
        assert_eq!(funds.len(), 1);
        assert_eq!(funds[0].manager_id, 112);
    }
}
