use crate::{UrlError, UrlResult};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Width/quality parameters appended by the image optimizer (`&w=640&q=75`)
static RESPONSIVE_PARAMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&w=\d+&q=\d+$").expect("static regex"));

/// Query parameter asking the application to render lists unpaginated
const NO_PAGINATION_PARAM: &str = "nopagination";

/// Computes the resource cache key of a URL
///
/// # Normalization Steps
///
/// 1. Decode `&amp;` left over from serialized HTML attributes
/// 2. Strip the site origin so absolute and root-relative forms collide
/// 3. Strip trailing `&w=N&q=N` responsive image parameters
///
/// # Arguments
///
/// * `raw` - The URL as seen on the network or in markup
/// * `origin` - The site origin (e.g., "https://1v.example.org")
///
/// # Examples
///
/// ```
/// use village_archiver::url::canonicalize;
///
/// let origin = "https://1v.example.org";
/// assert_eq!(
///     canonicalize("https://1v.example.org/_next/image?url=%2Fa.png&w=640&q=75", origin),
///     "/_next/image?url=%2Fa.png"
/// );
/// ```
pub fn canonicalize(raw: &str, origin: &str) -> String {
    let decoded = raw.trim().replace("&amp;", "&");
    let origin = origin.trim_end_matches('/');

    let without_origin = match decoded.strip_prefix(origin) {
        // Only strip when the origin is followed by a path (or nothing), so
        // "https://site.org" does not eat into "https://site.organic.com".
        Some(rest) if origin.is_empty() => rest.to_string(),
        Some(rest) if rest.is_empty() => "/".to_string(),
        Some(rest) if rest.starts_with('/') || rest.starts_with('?') => rest.to_string(),
        _ => decoded.clone(),
    };

    RESPONSIVE_PARAMS
        .replace(&without_origin, "")
        .into_owned()
}

/// Returns true if a canonical URL belongs to the archived site
///
/// Only root-relative URLs (i.e. same-origin after [`canonicalize`]) and
/// inline `data:image` URLs are captured; third-party assets are left alone.
pub fn is_capturable(canonical: &str) -> bool {
    canonical.starts_with('/') || canonical.starts_with("data:image")
}

/// Builds the live URL of an archived page
///
/// `path` is unit-relative without a leading slash (`""` for the entry page,
/// `"activite/42"` for a detail page). The `nopagination=true` parameter is
/// always appended.
///
/// # Errors
///
/// Returns `UrlError::Parse` if `base_url` and `path` do not form a valid URL,
/// and `UrlError::InvalidScheme` for non-HTTP(S) bases.
pub fn archive_url(base_url: &str, path: &str) -> UrlResult<Url> {
    let joined = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let mut url = Url::parse(&joined).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    url.query_pairs_mut()
        .append_pair(NO_PAGINATION_PARAM, "true");

    Ok(url)
}
