//! Domain records ingested from the fund listings

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A collective investment scheme manager. The id is assigned by the listing site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manager {
    pub id: i32,
    pub name: String,
}

/// A fund, keyed by its trust number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fund {
    pub trust_no: i32,
    pub name: String,
    pub secondary_name: String,
    pub manager_id: i32,
}

/// A share class of a fund. Unique on `(fund_id, class_name)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundClass {
    pub id: u64,
    pub fund_id: i32,
    pub class_name: String,
    pub target_market: String,
    pub has_additional_fee: bool,
    pub max_initial_fee: Option<f64>,
    pub category: String,
}

/// Cost disclosure for a fund class. Unique on `(fund_class_id, effective_date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundClassCost {
    pub fund_class_id: u64,
    pub effective_date: Option<NaiveDate>,
    /// Total expense ratio including the performance fee component
    pub ter_perf_component: Option<f64>,
    pub ter: Option<f64>,
    pub transaction_costs: Option<f64>,
    pub total_investment_charge: Option<f64>,
}

/// Net asset value of a fund class. Unique on `(fund_class_id, price_date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundClassPrice {
    pub fund_class_id: u64,
    pub price_date: Option<NaiveDate>,
    pub nav: Option<f64>,
}

/// Class attributes read from a price table row, before the owning fund is known.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedClass {
    pub class_name: String,
    pub target_market: String,
    pub has_additional_fee: bool,
    pub max_initial_fee: Option<f64>,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedCost {
    pub effective_date: Option<NaiveDate>,
    pub ter_perf_component: Option<f64>,
    pub ter: Option<f64>,
    pub transaction_costs: Option<f64>,
    pub total_investment_charge: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedPrice {
    pub price_date: Option<NaiveDate>,
    pub nav: Option<f64>,
}

/// One data row of the latest prices table. Lives only for a single prices pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedPricingRow {
    pub fund_name: String,
    pub class: ScrapedClass,
    pub cost: ScrapedCost,
    pub price: ScrapedPrice,
}

impl ScrapedPricingRow {
    /// Display label used when reporting the row, e.g. `"ABC Growth Fund Class A"`.
    pub fn label(&self) -> String {
        if self.class.class_name.is_empty() {
            self.fund_name.clone()
        } else {
            format!("{} {}", self.fund_name, self.class.class_name)
        }
    }

    pub fn fund_class(&self, fund_id: i32) -> FundClass {
        FundClass {
            id: 0,
            fund_id,
            class_name: self.class.class_name.clone(),
            target_market: self.class.target_market.clone(),
            has_additional_fee: self.class.has_additional_fee,
            max_initial_fee: self.class.max_initial_fee,
            category: self.class.category.clone(),
        }
    }

    /// Cost record for the stored class, if the row carries a cost-effective date.
    pub fn fund_class_cost(&self, fund_class_id: u64) -> Option<FundClassCost> {
        self.cost.effective_date?;
        Some(FundClassCost {
            fund_class_id,
            effective_date: self.cost.effective_date,
            ter_perf_component: self.cost.ter_perf_component,
            ter: self.cost.ter,
            transaction_costs: self.cost.transaction_costs,
            total_investment_charge: self.cost.total_investment_charge,
        })
    }

    /// Price record for the stored class, if the row carries both a date and a NAV.
    pub fn fund_class_price(&self, fund_class_id: u64) -> Option<FundClassPrice> {
        match (self.price.price_date, self.price.nav) {
            (Some(date), Some(nav)) => Some(FundClassPrice {
                fund_class_id,
                price_date: Some(date),
                nav: Some(nav),
            }),
            _ => None,
        }
    }
}
