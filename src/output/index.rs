//! Top-level index page listing the archived villages

use crate::output::ArchiveLayout;
use crate::state::unit_slug;
use crate::{ArchiveError, Result};
use lol_html::html_content::ContentType;
use lol_html::{element, HtmlRewriter, Settings};
use std::path::Path;

/// Template used when no `index-template` is configured
pub const DEFAULT_TEMPLATE: &str = include_str!("../../templates/index.html");

const YEAR_PLACEHOLDER: &str = "{{archiveYear}}";
const GENERATED_AT_PLACEHOLDER: &str = "{{generatedAt}}";

/// Renders the index page
///
/// Placeholders are substituted first, then one list item per village is
/// appended to `#villages-list`, linking to the village's phase 1 entry page.
/// A template without `#villages-list` is rendered without links.
///
/// # Arguments
///
/// * `template` - HTML template with `{{archiveYear}}` / `{{generatedAt}}` placeholders
/// * `year` - Archive year as configured (`2022/2023`)
/// * `public_base` - Root-relative archive base (`/api/archives/2022-2023`)
/// * `villages` - Archived village names, in display order
/// * `generated_at` - Human-readable generation timestamp
pub fn render_index(
    template: &str,
    year: &str,
    public_base: &str,
    villages: &[String],
    generated_at: &str,
) -> Result<String> {
    let html = template
        .replace(YEAR_PLACEHOLDER, year)
        .replace(GENERATED_AT_PLACEHOLDER, generated_at);

    let items: String = villages
        .iter()
        .map(|village| {
            format!(
                r#"<li><a class="text" href="{}/{}" rel="noreferrer">{}</a></li>"#,
                public_base,
                unit_slug(village, 1),
                escape_html(village)
            )
        })
        .collect();

    let mut output = Vec::with_capacity(html.len() + items.len());
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![element!("#villages-list", |el| {
                el.append(&items, ContentType::Html);
                Ok(())
            })],
            ..Settings::default()
        },
        |c: &[u8]| output.extend_from_slice(c),
    );

    rewriter
        .write(html.as_bytes())
        .map_err(|e| ArchiveError::Rewrite(e.to_string()))?;
    rewriter
        .end()
        .map_err(|e| ArchiveError::Rewrite(e.to_string()))?;

    String::from_utf8(output).map_err(|e| ArchiveError::Rewrite(format!("Invalid UTF-8 in index: {}", e)))
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Writes `{archiveDir}/index.html`
///
/// # Arguments
///
/// * `layout` - Archive layout the index is written into
/// * `template_path` - Configured template file, or `None` for the built-in one
/// * `year` - Archive year as configured
/// * `villages` - Archived village names
pub async fn write_index(
    layout: &ArchiveLayout,
    template_path: Option<&Path>,
    year: &str,
    villages: &[String],
) -> Result<()> {
    let template = match template_path {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => DEFAULT_TEMPLATE.to_string(),
    };

    let generated_at = chrono::Local::now().format("%d/%m/%Y %H:%M").to_string();
    let html = render_index(&template, year, layout.public_base(), villages, &generated_at)?;

    let file = layout.index_file();
    if let Some(parent) = file.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&file, html).await?;

    tracing::info!("Wrote index of {} villages to {}", villages.len(), file.display());
    Ok(())
}
