//! File extension resolution for captured assets
//!
//! The extension is taken from the HTTP content type first, then from the URL
//! path, then from the file named by a nested `image=` or `url=` query
//! parameter (image optimizer endpoints such as `/_next/image?url=/a.png`).

use url::Url;

/// MIME type → extension for every asset type the archive keeps
const MIME_EXTENSIONS: &[(&str, &str)] = &[
    ("text/css", "css"),
    ("image/png", "png"),
    ("image/jpeg", "jpeg"),
    ("image/jpg", "jpeg"),
    ("image/pjpeg", "jpeg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/avif", "avif"),
    ("image/svg+xml", "svg"),
    ("image/bmp", "bmp"),
    ("image/x-icon", "ico"),
    ("image/vnd.microsoft.icon", "ico"),
    ("font/woff", "woff"),
    ("font/woff2", "woff2"),
    ("font/ttf", "ttf"),
    ("font/otf", "otf"),
    ("application/font-woff", "woff"),
    ("application/font-woff2", "woff2"),
    ("application/x-font-ttf", "ttf"),
    ("application/x-font-otf", "otf"),
    ("application/vnd.ms-fontobject", "eot"),
    ("video/mp4", "mp4"),
    ("video/webm", "webm"),
    ("video/ogg", "ogv"),
    ("video/quicktime", "mov"),
    ("audio/mpeg", "mp3"),
    ("audio/mp4", "m4a"),
    ("audio/ogg", "oga"),
    ("audio/wav", "wav"),
    ("audio/webm", "weba"),
    ("application/pdf", "pdf"),
];

/// Path extensions accepted as-is, with their canonical spelling
const PATH_EXTENSIONS: &[(&str, &str)] = &[
    ("css", "css"),
    ("png", "png"),
    ("jpg", "jpeg"),
    ("jpeg", "jpeg"),
    ("jpe", "jpeg"),
    ("gif", "gif"),
    ("webp", "webp"),
    ("avif", "avif"),
    ("svg", "svg"),
    ("bmp", "bmp"),
    ("ico", "ico"),
    ("woff", "woff"),
    ("woff2", "woff2"),
    ("ttf", "ttf"),
    ("otf", "otf"),
    ("eot", "eot"),
    ("mp4", "mp4"),
    ("m4v", "mp4"),
    ("webm", "webm"),
    ("ogv", "ogv"),
    ("mov", "mov"),
    ("mp3", "mp3"),
    ("m4a", "m4a"),
    ("oga", "oga"),
    ("ogg", "oga"),
    ("wav", "wav"),
    ("pdf", "pdf"),
];

/// Used to resolve root-relative URLs before inspecting them
const PLACEHOLDER_BASE: &str = "http://localhost/";

/// Resolves the extension of an asset
///
/// # Arguments
///
/// * `url` - Absolute or root-relative URL of the asset
/// * `content_type` - `Content-Type` header (parameters allowed)
///
/// # Returns
///
/// `None` if neither the content type nor the URL names a known asset type.
///
/// # Examples
///
/// ```
/// use village_archiver::cache::resolve_extension;
///
/// assert_eq!(resolve_extension("/a", Some("text/css; charset=utf-8")).as_deref(), Some("css"));
/// assert_eq!(resolve_extension("/_next/image?url=%2Fimg%2Fa.png&w=64&q=75", None).as_deref(), Some("png"));
/// ```
pub fn resolve_extension(url: &str, content_type: Option<&str>) -> Option<String> {
    if let Some(ext) = content_type.and_then(extension_for_mime) {
        return Some(ext.to_string());
    }

    if url.starts_with("data:") {
        return extension_for_data_url(url).map(str::to_string);
    }

    let parsed = Url::parse(PLACEHOLDER_BASE)
        .and_then(|base| base.join(url))
        .ok()?;

    if let Some(ext) = extension_for_path(parsed.path()) {
        return Some(ext.to_string());
    }

    for key in ["image", "url"] {
        let nested = parsed
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned());

        if let Some(nested) = nested {
            let nested_path = nested.split(['?', '#']).next().unwrap_or_default();
            if let Some(ext) = extension_for_path(nested_path) {
                return Some(ext.to_string());
            }
        }
    }

    None
}

/// Looks up the extension of a MIME type, ignoring parameters and case
pub fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    MIME_EXTENSIONS
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
}

/// Extension of the last path segment, if it is a known asset type
fn extension_for_path(path: &str) -> Option<&'static str> {
    let file_name = path.rsplit('/').next()?;
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();

    PATH_EXTENSIONS
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, canonical)| *canonical)
}

/// Extension of the MIME type embedded in a `data:` URL
fn extension_for_data_url(url: &str) -> Option<&'static str> {
    let header = url.strip_prefix("data:")?.split(',').next()?;
    extension_for_mime(header)
}
