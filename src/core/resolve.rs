//! Maps fund names scraped from the price listing onto stored funds.
//!
//! The price listing spells fund names differently from the fund lookup page,
//! so a fixed cascade of rules is tried in order and the first hit wins.

use crate::core::models::Fund;
use crate::core::store::FundStore;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fmt::Display;
use tracing::debug;

const FUND_SUFFIX: &str = " Fund";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalFund {
    pub id: i32,
    pub name: String,
}

/// Read access to the canonical fund names.
pub trait CanonicalNames {
    fn exact(&self, name: &str) -> Option<&CanonicalFund>;

    fn all(&self) -> &[CanonicalFund];
}

/// Snapshot of the stored funds, taken once at the start of a prices pass.
#[derive(Debug, Default)]
pub struct FundCatalog {
    funds: Vec<CanonicalFund>,
    by_name: HashMap<String, usize>,
}

impl FundCatalog {
    pub fn new(funds: impl IntoIterator<Item = Fund>) -> Self {
        let mut catalog = Self::default();
        for fund in funds {
            // First stored fund wins for duplicate names
            if !catalog.by_name.contains_key(&fund.name) {
                catalog
                    .by_name
                    .insert(fund.name.clone(), catalog.funds.len());
            }
            catalog.funds.push(CanonicalFund {
                id: fund.trust_no,
                name: fund.name,
            });
        }
        catalog
    }

    pub async fn load(store: &dyn FundStore) -> Result<Self> {
        let funds = store
            .list_funds()
            .await
            .context("Failed to load fund catalog")?;
        debug!("Loaded {} funds into catalog", funds.len());
        Ok(Self::new(funds))
    }

    pub fn len(&self) -> usize {
        self.funds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funds.is_empty()
    }
}

impl CanonicalNames for FundCatalog {
    fn exact(&self, name: &str) -> Option<&CanonicalFund> {
        self.by_name.get(name).map(|&idx| &self.funds[idx])
    }

    fn all(&self) -> &[CanonicalFund] {
        &self.funds
    }
}

/// The rules of the matching cascade, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    Exact,
    AppendFund,
    StripFund,
    CaseInsensitive,
    Substring,
}

impl MatchRule {
    pub const CASCADE: [MatchRule; 5] = [
        MatchRule::Exact,
        MatchRule::AppendFund,
        MatchRule::StripFund,
        MatchRule::CaseInsensitive,
        MatchRule::Substring,
    ];

    fn apply<'a, N: CanonicalNames>(&self, name: &str, names: &'a N) -> Option<&'a CanonicalFund> {
        match self {
            MatchRule::Exact => names.exact(name),
            MatchRule::AppendFund => {
                if name.ends_with(FUND_SUFFIX.trim_start()) {
                    return None;
                }
                names.exact(&format!("{name}{FUND_SUFFIX}"))
            }
            MatchRule::StripFund => names.exact(name.strip_suffix(FUND_SUFFIX)?),
            MatchRule::CaseInsensitive => {
                let lowered = name.to_lowercase();
                names
                    .all()
                    .iter()
                    .find(|fund| fund.name.to_lowercase() == lowered)
            }
            // Shortest containing name wins, then lowest id. This mirrors the
            // ordering of the legacy catalog query and is a heuristic, not a guarantee.
            MatchRule::Substring => {
                let lowered = name.to_lowercase();
                names
                    .all()
                    .iter()
                    .filter(|fund| fund.name.to_lowercase().contains(&lowered))
                    .min_by_key(|fund| (fund.name.len(), fund.id))
            }
        }
    }
}

impl Display for MatchRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                MatchRule::Exact => "exact",
                MatchRule::AppendFund => "append-fund",
                MatchRule::StripFund => "strip-fund",
                MatchRule::CaseInsensitive => "case-insensitive",
                MatchRule::Substring => "substring",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub fund_id: i32,
    pub name: String,
    pub rule: MatchRule,
}

impl Resolution {
    pub fn is_fuzzy(&self) -> bool {
        self.rule != MatchRule::Exact
    }
}

/// Resolves `scraped_name` against the catalog. `None` means no rule matched.
pub fn resolve<N: CanonicalNames>(names: &N, scraped_name: &str) -> Option<Resolution> {
    if scraped_name.is_empty() {
        return None;
    }

    MatchRule::CASCADE.iter().find_map(|rule| {
        rule.apply(scraped_name, names).map(|fund| Resolution {
            fund_id: fund.id,
            name: fund.name.clone(),
            rule: *rule,
        })
    })
}
