//! In-page preparation before a document is serialized
//!
//! All steps run inside the live page and are best-effort: a failing step is
//! logged and the page is archived as it is.

use crate::browser::BrowserPage;
use crate::crawler::Pacing;
use crate::state::{unit_slug, CrawlUnit, PHASES};

/// Container holding the interactive world map
pub const WORLD_MAP: &str = "#__next > div > div:nth-child(3) > div:nth-child(2) > div.app-content__card.with-shadow > div:nth-child(1)";

/// Duplicate navigation rendered for small screens
pub const MOBILE_VIEW: &str = "#__next > div > div:nth-child(2)";

/// Selector of phase button `phase` (1-based) on an entry page
pub fn phase_button_selector(phase: u8) -> String {
    format!(
        "#__next > div > div:nth-child(3) > div:nth-child(2) > div:nth-child(1) > div > div:nth-child({})",
        phase
    )
}

/// Scrolls to the bottom in fixed steps so lazy content renders
///
/// Resolves once the scrolled distance reaches the document height.
pub async fn auto_scroll<P: BrowserPage + ?Sized>(page: &P, pacing: &Pacing) {
    let script = format!(
        r#"new Promise((resolve) => {{
  let total = 0;
  const timer = setInterval(() => {{
    const height = document.body ? document.body.scrollHeight : 0;
    window.scrollBy(0, {step});
    total += {step};
    if (total >= height) {{
      clearInterval(timer);
      resolve(total);
    }}
  }}, {interval});
}})"#,
        step = pacing.scroll_step_px,
        interval = pacing.scroll_interval.as_millis()
    );

    if let Err(e) = page.evaluate(&script).await {
        tracing::warn!("Auto-scroll failed: {}", e);
    }
}

/// Copies every CSSOM rule into a `<style>` element
///
/// Rules injected at runtime exist in no stylesheet file and would otherwise
/// be lost in the archive.
const INLINE_CSSOM: &str = r#"(() => {
  const css = [...document.styleSheets].map((sheet) => {
    try {
      return [...sheet.cssRules].map((rule) => rule.cssText).join('');
    } catch (e) {
      return '';
    }
  }).join('');
  const style = document.createElement('style');
  style.innerText = css;
  document.head.appendChild(style);
  return css.length;
})()"#;

fn remove_element_script(selector: &str) -> String {
    format!(
        r#"(() => {{
  const el = document.querySelector({selector});
  if (!el) return false;
  el.remove();
  return true;
}})()"#,
        selector = js_string(selector)
    )
}

fn replace_phase_buttons_script(village: &str) -> String {
    let buttons: Vec<serde_json::Value> = PHASES
        .iter()
        .map(|&phase| {
            serde_json::json!({
                "selector": phase_button_selector(phase),
                "href": format!("/{}", unit_slug(village, phase)),
            })
        })
        .collect();

    format!(
        r#"(() => {{
  let replaced = 0;
  for (const {{ selector, href }} of {buttons}) {{
    const button = document.querySelector(selector);
    if (!button) continue;
    const link = document.createElement('a');
    link.setAttribute('style', button.getAttribute('style') || '');
    link.setAttribute('href', href);
    link.innerHTML = button.innerHTML;
    button.replaceWith(link);
    replaced += 1;
  }}
  return replaced;
}})()"#,
        buttons = serde_json::Value::Array(buttons)
    )
}

/// JSON string literal, valid as a JavaScript string
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Makes the rendered page self-contained before it is read
///
/// Inlines the CSSOM, removes the world map, turns the phase buttons into
/// links between the unit's entry pages and removes the mobile view.
pub async fn prepare_page<P: BrowserPage + ?Sized>(page: &P, unit: &CrawlUnit) {
    match page.evaluate(INLINE_CSSOM).await {
        Ok(length) => tracing::trace!("Inlined {} bytes of CSS rules", length),
        Err(e) => tracing::warn!("Failed to inline CSS rules: {}", e),
    }

    if let Err(e) = page.evaluate(&remove_element_script(WORLD_MAP)).await {
        tracing::warn!("Failed to remove world map: {}", e);
    }

    match page
        .evaluate(&replace_phase_buttons_script(unit.village()))
        .await
    {
        Ok(replaced) => tracing::trace!("Replaced {} phase buttons", replaced),
        Err(e) => tracing::warn!("Failed to update phase buttons: {}", e),
    }

    if let Err(e) = page.evaluate(&remove_element_script(MOBILE_VIEW)).await {
        tracing::warn!("Failed to remove mobile view: {}", e);
    }
}
