//! Rewriting of captured pages and stylesheets
//!
//! Both rewriters point references at archived copies through the shared
//! resource cache and strip what only makes sense with a live backend.

mod css;
mod html;

pub use css::{strip_pagination_rules, StylesheetReport, StylesheetRewriter};
pub use html::{ArchivedPage, MarkupRewriter, RewrittenPage};
