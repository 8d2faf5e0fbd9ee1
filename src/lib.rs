pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::cli::{funds, managers, prices};
use crate::core::config::AppConfig;
use crate::core::store::FundStore;
use crate::providers::RetryClient;
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Managers,
    Funds { manager_ids: Vec<i32> },
    Prices,
}

/// Outcome of one ingestion pass.
#[derive(Debug, Clone, PartialEq)]
pub enum PassReport {
    Managers(managers::ManagersReport),
    Funds(funds::FundsReport),
    Prices(prices::PricesReport),
}

impl PassReport {
    pub fn display_as_table(&self) -> String {
        match self {
            PassReport::Managers(report) => report.display_as_table(),
            PassReport::Funds(report) => report.display_as_table(),
            PassReport::Prices(report) => report.display_as_table(),
        }
    }

    fn title(&self) -> &'static str {
        match self {
            PassReport::Managers(_) => "Managers",
            PassReport::Funds(_) => "Funds",
            PassReport::Prices(_) => "Prices",
        }
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Fund finder starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let store = store::open_store(&config)?;
    let report = run_with(command, &config, &store).await;
    store.persist()?;
    let report = report?;

    println!(
        "\n{}",
        cli::ui::style_text(report.title(), cli::ui::StyleType::Title)
    );
    println!("{}", report.display_as_table());
    Ok(())
}

/// Runs a single pass against the given store.
pub async fn run_with(
    command: AppCommand,
    config: &AppConfig,
    store: &dyn FundStore,
) -> Result<PassReport> {
    let client = RetryClient::new(&config.http)?;

    let report = match command {
        AppCommand::Managers => {
            PassReport::Managers(managers::run(&client, store, &config.site).await?)
        }
        AppCommand::Funds { manager_ids } => PassReport::Funds(
            funds::run(
                &client,
                store,
                &config.site,
                config.politeness_delay(),
                &manager_ids,
            )
            .await?,
        ),
        AppCommand::Prices => {
            PassReport::Prices(prices::run(&client, store, &config.site).await?)
        }
    };
    Ok(report)
}
