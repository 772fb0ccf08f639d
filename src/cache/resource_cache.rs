//! Resource cache: canonical URL → archived file
//!
//! Capture is two-phase. [`ResourceCache::record_if_absent`] reserves the
//! local path synchronously, under the map lock, the moment a response is
//! seen; the bytes are written later and best-effort by whoever received the
//! [`Reservation::Reserved`]. A rewriter may therefore observe a path whose
//! file does not exist yet. The first reservation of a key wins for the rest
//! of the run.

use crate::cache::extension::resolve_extension;
use crate::output::ArchiveLayout;
use crate::url::{canonicalize, is_capturable};
use crate::Result;
use reqwest::Client;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// Resource type reported by the browser's network layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Document,
    Stylesheet,
    Image,
    Media,
    Font,
    Script,
    Other,
}

impl ResourceKind {
    /// Returns true for the resource types mirrored into the archive
    pub fn is_archivable(&self) -> bool {
        matches!(
            self,
            Self::Stylesheet | Self::Image | Self::Media | Self::Font
        )
    }
}

/// A response observed by the browser
#[derive(Debug, Clone)]
pub struct NetworkResponse {
    /// Absolute URL of the response
    pub url: String,

    pub kind: ResourceKind,

    /// MIME type / `Content-Type` reported for the response
    pub content_type: Option<String>,

    pub status: u16,
}

/// Outcome of a reservation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reservation {
    /// New entry; the caller owns writing the bytes to `disk_path`
    Reserved {
        public_path: String,
        disk_path: PathBuf,
    },

    /// The key was already mapped; nothing to write
    Existing(String),
}

impl Reservation {
    pub fn public_path(&self) -> &str {
        match self {
            Self::Reserved { public_path, .. } => public_path,
            Self::Existing(path) => path,
        }
    }
}

/// Counters reported at the end of a run
#[derive(Debug, Default)]
pub struct CacheCounters {
    pub reserved: AtomicU64,
    pub fetched: AtomicU64,
    pub fetch_failures: AtomicU64,
    pub unresolved: AtomicU64,
}

/// Process-wide resource map shared by the capture listener and the rewriters
#[derive(Debug)]
pub struct ResourceCache {
    entries: Mutex<HashMap<String, String>>,
    layout: ArchiveLayout,
    origin: String,
    client: Client,
    counters: CacheCounters,
}

impl ResourceCache {
    /// Creates an empty cache
    ///
    /// # Arguments
    ///
    /// * `layout` - Where captured files go and how their public paths look
    /// * `origin` - Site origin stripped from URLs to build cache keys
    /// * `client` - HTTP client for on-demand fetches
    pub fn new(layout: ArchiveLayout, origin: &str, client: Client) -> Self {
        Self::with_entries(layout, origin, client, HashMap::new())
    }

    /// Creates a cache pre-filled with `entries`
    pub fn with_entries(
        layout: ArchiveLayout,
        origin: &str,
        client: Client,
        entries: HashMap<String, String>,
    ) -> Self {
        Self {
            entries: Mutex::new(entries),
            layout,
            origin: origin.trim_end_matches('/').to_string(),
            client,
            counters: CacheCounters::default(),
        }
    }

    /// Loads the snapshot written by a previous run
    ///
    /// A missing or unreadable snapshot yields an empty cache; the run then
    /// re-captures everything.
    pub async fn load(path: &Path, layout: ArchiveLayout, origin: &str, client: Client) -> Self {
        let entries = match tokio::fs::read_to_string(path).await {
            Ok(content) if content.trim().is_empty() => HashMap::new(),
            Ok(content) => match serde_json::from_str::<HashMap<String, String>>(&content) {
                Ok(entries) => {
                    tracing::info!(
                        "Loaded {} resources from {}",
                        entries.len(),
                        path.display()
                    );
                    entries
                }
                Err(e) => {
                    tracing::warn!(
                        "Ignoring corrupt resource map {}: {}",
                        path.display(),
                        e
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No resource map at {}, starting empty", path.display());
                HashMap::new()
            }
            Err(e) => {
                tracing::warn!("Failed to read resource map {}: {}", path.display(), e);
                HashMap::new()
            }
        };

        Self::with_entries(layout, origin, client, entries)
    }

    /// Writes the whole map to `path` as a JSON object
    pub async fn save(&self, path: &Path) -> Result<()> {
        let snapshot: BTreeMap<String, String> = self.lock().clone().into_iter().collect();
        let json = serde_json::to_string(&snapshot)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, json).await?;

        tracing::info!("Saved {} resources to {}", snapshot.len(), path.display());
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn layout(&self) -> &ArchiveLayout {
        &self.layout
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn counters(&self) -> &CacheCounters {
        &self.counters
    }

    /// Cache key of a raw URL
    pub fn canonical(&self, raw_url: &str) -> String {
        canonicalize(raw_url, &self.origin)
    }

    /// Local path of a canonical URL, if captured or reserved
    pub fn get(&self, canonical: &str) -> Option<String> {
        self.lock().get(canonical).cloned()
    }

    /// Canonicalizes `raw_url` and looks it up
    pub fn lookup(&self, raw_url: &str) -> Option<String> {
        self.get(&self.canonical(raw_url))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Reserves a local path for `canonical` unless one exists
    ///
    /// The check and the insert happen under one lock, so concurrent
    /// reservations of the same key yield exactly one `Reserved`.
    pub fn record_if_absent(&self, canonical: &str, extension: &str) -> Reservation {
        let mut entries = self.lock();

        if let Some(existing) = entries.get(canonical) {
            return Reservation::Existing(existing.clone());
        }

        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        let public_path = self.layout.resource_public_path(&file_name);
        let disk_path = self.layout.disk_path(&public_path);

        entries.insert(canonical.to_string(), public_path.clone());
        self.counters.reserved.fetch_add(1, Ordering::Relaxed);

        Reservation::Reserved {
            public_path,
            disk_path,
        }
    }

    /// Handles a response seen by the browser
    ///
    /// # Returns
    ///
    /// * `Some(Reservation::Reserved)` - New asset; the caller writes its bytes
    /// * `Some(Reservation::Existing)` - Already captured
    /// * `None` - Not archivable, foreign, or of unknown type
    pub fn capture(&self, response: &NetworkResponse) -> Option<Reservation> {
        if !response.kind.is_archivable() {
            return None;
        }

        let canonical = self.canonical(&response.url);
        if !is_capturable(&canonical) {
            return None;
        }

        if let Some(existing) = self.get(&canonical) {
            return Some(Reservation::Existing(existing));
        }

        let Some(extension) = resolve_extension(&response.url, response.content_type.as_deref())
        else {
            tracing::warn!("File extension not found for url: {}", response.url);
            self.counters.unresolved.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        let reservation = self.record_if_absent(&canonical, &extension);
        if let Reservation::Reserved { public_path, .. } = &reservation {
            tracing::debug!("Reserved {} -> {}", canonical, public_path);
        }
        Some(reservation)
    }

    /// Drops the reservation of `raw_url` if it still points at `public_path`
    ///
    /// Used when a reserved body never arrives, so a later run captures the
    /// asset again instead of mapping it to a missing file.
    pub fn release(&self, raw_url: &str, public_path: &str) -> bool {
        let canonical = self.canonical(raw_url);
        let mut entries = self.lock();
        if entries.get(&canonical).map(String::as_str) == Some(public_path) {
            entries.remove(&canonical);
            tracing::debug!("Released {} -> {}", canonical, public_path);
            true
        } else {
            false
        }
    }

    /// Fetches an asset the browser never requested and records it
    ///
    /// Used for URLs only referenced from stylesheets. The mapping is added
    /// only after the file is written; any failure leaves the key unmapped.
    pub async fn fetch_and_record(&self, canonical: &str) -> Option<String> {
        if let Some(existing) = self.get(canonical) {
            return Some(existing);
        }

        let url = if canonical.starts_with("//") {
            format!("https:{}", canonical)
        } else if canonical.starts_with('/') {
            format!("{}{}", self.origin, canonical)
        } else {
            return None;
        };

        match self.download(&url, canonical).await {
            Some(path) => {
                self.counters.fetched.fetch_add(1, Ordering::Relaxed);
                Some(path)
            }
            None => {
                self.counters.fetch_failures.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    async fn download(&self, url: &str, canonical: &str) -> Option<String> {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!("Failed to fetch {}: HTTP {}", url, response.status());
            return None;
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let Some(extension) = resolve_extension(canonical, content_type.as_deref()) else {
            tracing::warn!("File extension not found for url: {}", url);
            self.counters.unresolved.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!("Failed to read body of {}: {}", url, e);
                return None;
            }
        };

        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        let public_path = self.layout.resource_public_path(&file_name);
        let disk_path = self.layout.disk_path(&public_path);

        if let Err(e) = write_file(&disk_path, &bytes).await {
            tracing::warn!("Failed to write {}: {}", disk_path.display(), e);
            return None;
        }

        let winner = {
            let mut entries = self.lock();
            entries
                .entry(canonical.to_string())
                .or_insert_with(|| public_path.clone())
                .clone()
        };

        if winner != public_path {
            // Lost the race to a capture of the same key; keep one file.
            let _ = tokio::fs::remove_file(&disk_path).await;
        } else {
            tracing::debug!("Fetched {} -> {}", canonical, public_path);
        }

        Some(winner)
    }

    /// Distinct archived stylesheet paths
    pub fn stylesheet_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .lock()
            .values()
            .filter(|path| path.ends_with(".css"))
            .cloned()
            .collect();
        paths.sort();
        paths.dedup();
        paths
    }
}

/// Writes a captured asset, creating its directory if needed
async fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await
}

/// Second phase of a capture: best-effort write of the asset bytes
///
/// Failures are logged and otherwise ignored; the reservation stands.
pub async fn persist_bytes(disk_path: &Path, bytes: &[u8]) {
    if let Err(e) = write_file(disk_path, bytes).await {
        tracing::debug!("Lost capture write {}: {}", disk_path.display(), e);
    }
}
