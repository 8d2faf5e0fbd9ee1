use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SiteConfig {
    #[serde(default = "SiteConfig::default_base_url")]
    pub base_url: String,
    /// Page with the manager and fund selection lists
    #[serde(default = "SiteConfig::default_lookup_path")]
    pub lookup_path: String,
    /// Page with the latest prices and costs table
    #[serde(default = "SiteConfig::default_prices_path")]
    pub prices_path: String,
}

impl SiteConfig {
    fn default_base_url() -> String {
        "https://funds.profiledata.co.za".to_string()
    }

    fn default_lookup_path() -> String {
        "/aci/ASISA/HistPriceLookUp.aspx".to_string()
    }

    fn default_prices_path() -> String {
        "/aci/ASISA/LatestPrices.aspx".to_string()
    }

    pub fn lookup_url(&self) -> Result<String> {
        self.join(&self.lookup_path)
    }

    pub fn prices_url(&self) -> Result<String> {
        self.join(&self.prices_path)
    }

    fn join(&self, path: &str) -> Result<String> {
        let base = url::Url::parse(&self.base_url)
            .with_context(|| format!("Invalid site base_url: {}", self.base_url))?;
        let joined = base
            .join(path)
            .with_context(|| format!("Invalid site path: {path}"))?;
        Ok(joined.to_string())
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            base_url: Self::default_base_url(),
            lookup_path: Self::default_lookup_path(),
            prices_path: Self::default_prices_path(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HttpConfig {
    #[serde(default = "HttpConfig::default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "HttpConfig::default_user_agent")]
    pub user_agent: String,
    #[serde(default = "HttpConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    /// Backoff unit; attempt `n` waits `n * backoff_ms` before the next try
    #[serde(default = "HttpConfig::default_backoff_ms")]
    pub backoff_ms: u64,
}

impl HttpConfig {
    fn default_max_attempts() -> u32 {
        3
    }

    fn default_user_agent() -> String {
        concat!("fundfinder/", env!("CARGO_PKG_VERSION")).to_string()
    }

    fn default_timeout_secs() -> u64 {
        30
    }

    fn default_backoff_ms() -> u64 {
        1000
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            max_attempts: Self::default_max_attempts(),
            user_agent: Self::default_user_agent(),
            timeout_secs: Self::default_timeout_secs(),
            backoff_ms: Self::default_backoff_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub http: HttpConfig,
    /// Pause between managers during the funds pass
    #[serde(default = "AppConfig::default_politeness_delay_ms")]
    pub politeness_delay_ms: u64,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            site: SiteConfig::default(),
            http: HttpConfig::default(),
            politeness_delay_ms: Self::default_politeness_delay_ms(),
            data_path: None,
        }
    }
}

impl AppConfig {
    fn default_politeness_delay_ms() -> u64 {
        1000
    }

    /// Loads the config from the default location, falling back to built-in
    /// defaults when no file has been created yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("za", "fundfinder", "fundfinder")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("za", "fundfinder", "fundfinder")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
site:
  base_url: "http://localhost:8080"
  prices_path: "/prices.aspx"
http:
  max_attempts: 5
  user_agent: "test-agent/1.0"
politeness_delay_ms: 0
data_path: "/tmp/fundfinder"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.site.base_url, "http://localhost:8080");
        assert_eq!(config.site.lookup_path, "/aci/ASISA/HistPriceLookUp.aspx");
        assert_eq!(config.site.prices_path, "/prices.aspx");
        assert_eq!(config.http.max_attempts, 5);
        assert_eq!(config.http.user_agent, "test-agent/1.0");
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.http.backoff_unit(), Duration::from_secs(1));
        assert_eq!(config.politeness_delay(), Duration::ZERO);
        assert_eq!(
            config.data_path().unwrap(),
            PathBuf::from("/tmp/fundfinder")
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.http.max_attempts, 3);
        assert_eq!(config.politeness_delay_ms, 1000);
    }

    #[test]
    fn test_site_urls() {
        let config = AppConfig::default();
        assert_eq!(
            config.site.lookup_url().unwrap(),
            "https://funds.profiledata.co.za/aci/ASISA/HistPriceLookUp.aspx"
        );
        assert_eq!(
            config.site.prices_url().unwrap(),
            "https://funds.profiledata.co.za/aci/ASISA/LatestPrices.aspx"
        );

        let bad = SiteConfig {
            base_url: "not a url".to_string(),
            ..SiteConfig::default()
        };
        assert!(bad.lookup_url().is_err());
    }

    #[test]
    fn test_load_from_path_reports_missing_file() {
        let err = AppConfig::load_from_path("/definitely/not/here.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
