//! Village enumeration and selection through the header menu

use crate::browser::{BrowserPage, BrowserResult, Navigator};
use std::time::Duration;

const VILLAGE_BUTTON: &str =
    "#__next > div > header > div.with-shadow > div.header__user > div:nth-child(1) > div > div > button";
const VILLAGE_SELECT: &str = "#select-village";
const VILLAGE_OPTION: &str = r#"li[role="option"]"#;
const CONFIRM_BUTTON: &str = "div.MuiDialog-root button.MuiButton-containedSecondary";

/// Let the menu and dialog animations finish
const MENU_SETTLE: Duration = Duration::from_millis(500);

fn option_selector(index: usize) -> String {
    format!("{}:nth-child({})", VILLAGE_OPTION, index)
}

/// Counts the villages offered by the village picker
///
/// Any failure is logged and counts as zero villages.
pub async fn count_units<P: BrowserPage + ?Sized>(navigator: &Navigator<'_, P>, base_url: &str) -> usize {
    match try_count_units(navigator, base_url).await {
        Ok(count) => {
            tracing::info!("Found {} villages", count);
            count
        }
        Err(e) => {
            tracing::warn!("Failed to count villages: {}", e);
            0
        }
    }
}

async fn try_count_units<P: BrowserPage + ?Sized>(
    navigator: &Navigator<'_, P>,
    base_url: &str,
) -> BrowserResult<usize> {
    let page = navigator.page();
    let timeout = navigator.policy().selector_timeout;

    navigator.goto(base_url).await?;
    tokio::time::sleep(MENU_SETTLE).await;
    page.click(VILLAGE_BUTTON).await?;
    page.wait_for_selector(VILLAGE_SELECT, timeout).await?;
    page.click(VILLAGE_SELECT).await?;
    page.wait_for_selector(VILLAGE_OPTION, timeout).await?;

    let count = page
        .evaluate(&format!(
            "document.querySelectorAll({}).length",
            serde_json::Value::String(VILLAGE_OPTION.to_string())
        ))
        .await?;

    Ok(count.as_u64().unwrap_or(0) as usize)
}

/// Switches the session to village `index` (1-based)
///
/// # Returns
///
/// * `Some(name)` - The village is selected; its display name
/// * `None` - Selection failed; the village should be skipped
pub async fn select_unit<P: BrowserPage + ?Sized>(
    navigator: &Navigator<'_, P>,
    base_url: &str,
    index: usize,
) -> Option<String> {
    match try_select_unit(navigator, base_url, index).await {
        Ok(Some(name)) => {
            tracing::info!("Selected village {}: {}", index, name);
            Some(name)
        }
        Ok(None) => {
            tracing::error!("Village {} not found in the picker", index);
            None
        }
        Err(e) => {
            tracing::error!("Failed to select village {}: {}", index, e);
            None
        }
    }
}

async fn try_select_unit<P: BrowserPage + ?Sized>(
    navigator: &Navigator<'_, P>,
    base_url: &str,
    index: usize,
) -> BrowserResult<Option<String>> {
    let page = navigator.page();
    let timeout = navigator.policy().selector_timeout;
    let option = option_selector(index);

    navigator.goto(base_url).await?;
    page.wait_for_selector(VILLAGE_BUTTON, timeout).await?;
    page.click(VILLAGE_BUTTON).await?;
    navigator.wait_for_selector(VILLAGE_SELECT).await?;
    page.click(VILLAGE_SELECT).await?;
    page.wait_for_selector(&option, timeout).await?;

    let name = page
        .evaluate(&format!(
            "(() => {{ const el = document.querySelector({}); return el ? el.innerText : null; }})()",
            serde_json::Value::String(option.clone())
        ))
        .await?;

    let Some(name) = name.as_str().map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    let name = name.to_string();

    page.click(&option).await?;
    tokio::time::sleep(MENU_SETTLE).await;
    page.click(CONFIRM_BUTTON).await?;
    tokio::time::sleep(MENU_SETTLE).await;

    Ok(Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::ScriptedPage;
    use crate::browser::RetryPolicy;
    use serde_json::json;

    const BASE: &str = "https://1v.example.org";

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 1,
            delay: Duration::from_millis(1),
            navigation_timeout: Duration::from_millis(10),
            selector_timeout: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn test_count_units() {
        let page = ScriptedPage::new().on_evaluate("querySelectorAll", json!(4));
        let navigator = Navigator::new(&page, policy());

        assert_eq!(count_units(&navigator, BASE).await, 4);
        assert_eq!(page.visits(), vec![BASE.to_string()]);
    }

    #[tokio::test]
    async fn test_count_units_failure_is_zero() {
        let page = ScriptedPage::new().fail_selector(VILLAGE_SELECT);
        let navigator = Navigator::new(&page, policy());

        assert_eq!(count_units(&navigator, BASE).await, 0);
    }

    #[tokio::test]
    async fn test_select_unit_confirms_choice() {
        let page = ScriptedPage::new().on_evaluate("innerText", json!("  France – Canada \n"));
        let navigator = Navigator::new(&page, policy());

        let name = select_unit(&navigator, BASE, 2).await;
        assert_eq!(name.as_deref(), Some("France – Canada"));

        let calls = page.calls();
        assert!(calls.contains(&format!("click {}", option_selector(2))));
        assert_eq!(calls.last(), Some(&format!("click {}", CONFIRM_BUTTON)));
    }

    #[tokio::test]
    async fn test_select_missing_unit_is_skipped() {
        let page = ScriptedPage::new();
        let navigator = Navigator::new(&page, policy());

        assert_eq!(select_unit(&navigator, BASE, 9).await, None);
        assert!(!page.calls().contains(&format!("click {}", CONFIRM_BUTTON)));
    }
}
