//! Access to the ASISA fund listings: HTTP transport and page scrapers.

pub mod client;
pub mod html;
pub mod listing;
pub mod pricing;
pub mod viewstate;

pub use client::{FetchError, RetryClient};
pub use html::ScrapeError;
