//! Managers and funds listed in the lookup page's selection controls.

use super::html::{ScrapeError, parse_document, selector, text_of};
use crate::core::models::{Fund, Manager};
use tracing::debug;

pub const MANAGER_SELECT: &str = "MANCO_ID";
pub const FUND_SELECT: &str = "TrustNo";

/// `(id, label)` pairs of the options under `<select name="{select_name}">`, in
/// document order. Options whose value is not an integer, or that have no text,
/// are skipped.
pub fn extract_options(
    html: &[u8],
    select_name: &str,
) -> Result<Vec<(i32, String)>, ScrapeError> {
    let doc = parse_document(html)?;
    let option_sel = selector(&format!("select[name='{select_name}'] option"))?;

    let options = doc
        .select(&option_sel)
        .filter_map(|option| {
            let value = option.value().attr("value")?;
            let label = text_of(option);
            match value.trim().parse::<i32>() {
                Ok(id) if !label.is_empty() => Some((id, label)),
                _ => {
                    debug!("Skipping option value={:?} label={:?}", value, label);
                    None
                }
            }
        })
        .collect();
    Ok(options)
}

pub fn scrape_managers(html: &[u8]) -> Result<Vec<Manager>, ScrapeError> {
    Ok(extract_options(html, MANAGER_SELECT)?
        .into_iter()
        .map(|(id, name)| Manager { id, name })
        .collect())
}

/// Funds offered by `manager_id`, as listed after the manager postback.
pub fn scrape_funds(html: &[u8], manager_id: i32) -> Result<Vec<Fund>, ScrapeError> {
    Ok(extract_options(html, FUND_SELECT)?
        .into_iter()
        .map(|(trust_no, name)| Fund {
            trust_no,
            name,
            secondary_name: String::new(),
            manager_id,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANAGERS_PAGE: &str = r#"
        <select name="MANCO_ID">
          <option value="">-- Select a manager --</option>
          <option value="0037">Allan Gray Unit Trust Management</option>
          <option value="abc">Not a manager</option>
          <option value="0303"></option>
          <option>No value</option>
          <option value="0112"> Coronation Management Company </option>
        </select>
        <select name="Other"><option value="1">Elsewhere</option></select>
    "#;

    #[test]
    fn test_extract_options_skips_placeholders() {
        let options = extract_options(MANAGERS_PAGE.as_bytes(), "MANCO_ID").unwrap();
        assert_eq!(
            options,
            vec![
                (37, "Allan Gray Unit Trust Management".to_string()),
                (112, "Coronation Management Company".to_string()),
            ]
        );
    }

    #[test]
    fn test_extract_options_keeps_negative_values() {
        let html = r#"
            <select name="MANCO_ID">
              <option value="-1">Placeholder</option>
              <option value="0037">Allan Gray</option>
            </select>
        "#;
        let options = extract_options(html.as_bytes(), "MANCO_ID").unwrap();
        assert_eq!(
            options,
            vec![(-1, "Placeholder".to_string()), (37, "Allan Gray".to_string())]
        );
    }

    #[test]
    fn test_extract_options_missing_control() {
        let options = extract_options(MANAGERS_PAGE.as_bytes(), "TrustNo").unwrap();
        assert!(options.is_empty());
    }

    #[test]
    fn test_scrape_managers() {
        let managers = scrape_managers(MANAGERS_PAGE.as_bytes()).unwrap();
        assert_eq!(managers.len(), 2);
        assert_eq!(managers[0].id, 37);
        assert_eq!(managers[1].name, "Coronation Management Company");
    }

    #[test]
    fn test_scrape_funds_tags_manager() {
        let html = r#"
            <select name="TrustNo">
              <option value="0">All</option>
              <option value="1234">Allan Gray Balanced Fund</option>
              <option value="1235">Allan Gray Equity Fund</option>
            </select>
        "#;
        let funds = scrape_funds(html.as_bytes(), 37).unwrap();

        // "All" has id 0 and a label, so it is kept like any other option
        assert_eq!(funds.len(), 3);
        assert_eq!(funds[1].trust_no, 1234);
        assert_eq!(funds[1].name, "Allan Gray Balanced Fund");
        assert!(funds.iter().all(|f| f.manager_id == 37));
        assert!(funds.iter().all(|f| f.secondary_name.is_empty()));
    }
}
