//! Replay of the lookup page's postback.
//!
//! The lookup page only answers a manager selection when the POST echoes the
//! hidden state fields from a freshly fetched copy of the page. The state is a
//! plain value handed from [`ViewState::extract`] to [`build_form`]; no cookies
//! or session affinity are involved.

use super::html::{ScrapeError, parse_document, selector};
use scraper::Html;

pub const VIEW_STATE_FIELD: &str = "__VIEWSTATE";
pub const VIEW_STATE_GENERATOR_FIELD: &str = "__VIEWSTATEGENERATOR";
pub const EVENT_VALIDATION_FIELD: &str = "__EVENTVALIDATION";
pub const MANAGER_FIELD: &str = "MANCO_ID";

pub type FormData = Vec<(String, String)>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub state: String,
    pub generator: String,
    pub event_validation: String,
}

impl ViewState {
    /// Reads the hidden state inputs. Missing inputs yield empty strings; the
    /// origin rejects a bad replay on its own.
    pub fn extract(html: &[u8]) -> Result<Self, ScrapeError> {
        let doc = parse_document(html)?;
        Ok(Self {
            state: hidden_value(&doc, VIEW_STATE_FIELD)?,
            generator: hidden_value(&doc, VIEW_STATE_GENERATOR_FIELD)?,
            event_validation: hidden_value(&doc, EVENT_VALIDATION_FIELD)?,
        })
    }
}

fn hidden_value(doc: &Html, name: &str) -> Result<String, ScrapeError> {
    let sel = selector(&format!("input[name='{name}']"))?;
    Ok(doc
        .select(&sel)
        .next()
        .and_then(|input| input.value().attr("value"))
        .unwrap_or_default()
        .to_string())
}

/// Form payload selecting `target_id`, formatted as a zero-padded 4 digit value.
pub fn build_form(state: &ViewState, target_id: i32) -> FormData {
    vec![
        (VIEW_STATE_FIELD.to_string(), state.state.clone()),
        (VIEW_STATE_GENERATOR_FIELD.to_string(), state.generator.clone()),
        (
            EVENT_VALIDATION_FIELD.to_string(),
            state.event_validation.clone(),
        ),
        (MANAGER_FIELD.to_string(), format!("{target_id:04}")),
    ]
}
