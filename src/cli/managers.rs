use super::ui;
use crate::core::config::SiteConfig;
use crate::core::store::FundStore;
use crate::providers::RetryClient;
use crate::providers::listing::scrape_managers;
use anyhow::{Context, Result};
use tracing::info;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ManagersReport {
    pub scraped: usize,
    pub persisted: usize,
}

impl ManagersReport {
    pub fn display_as_table(&self) -> String {
        ui::counts_table(&[
            ("Managers scraped", self.scraped, false),
            ("Managers persisted", self.persisted, false),
        ])
        .to_string()
    }
}

/// Refreshes the manager list from the lookup page.
pub async fn run(
    client: &RetryClient,
    store: &dyn FundStore,
    site: &SiteConfig,
) -> Result<ManagersReport> {
    info!("Fetching fund managers...");

    let url = site.lookup_url()?;
    let page = client
        .get(&url)
        .await
        .context("Failed to fetch manager lookup page")?;
    let managers = scrape_managers(&page).context("Failed to scrape managers")?;

    store
        .upsert_managers(&managers)
        .await
        .context("Failed to save managers")?;

    info!("Saved {} fund managers", managers.len());
    Ok(ManagersReport {
        scraped: managers.len(),
        persisted: managers.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::HttpConfig;
    use crate::store::MemoryStore;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_managers_pass_saves_scraped_managers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lookup.aspx"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<select name="MANCO_ID">
                     <option value="">Select</option>
                     <option value="0037">Allan Gray</option>
                     <option value="0112">Coronation</option>
                   </select>"#,
            ))
            .mount(&server)
            .await;

        let site = SiteConfig {
            base_url: server.uri(),
            lookup_path: "/lookup.aspx".to_string(),
            ..SiteConfig::default()
        };
        let client = RetryClient::new(&HttpConfig::default()).unwrap();
        let store = MemoryStore::new();

        let report = run(&client, &store, &site).await.unwrap();

        assert_eq!(report.scraped, 2);
        assert_eq!(report.persisted, 2);
        let managers = store.list_managers().await.unwrap();
        assert_eq!(managers[0].id, 37);
        assert_eq!(managers[1].name, "Coronation");
    }
}
