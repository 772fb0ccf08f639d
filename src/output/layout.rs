//! On-disk and served layout of one archive
//!
//! Everything for a year lives under `{output_root}/api/archives/{year}`,
//! served from the public base `/api/archives/{year}`. Resource map values are
//! public paths, so the file behind a value is `{output_root}{value}`.

use crate::config::Config;
use std::path::{Path, PathBuf};

/// Sub-directory holding captured assets
pub const RESOURCES_DIR: &str = "ressources";

/// Sub-directory holding content detail pages
pub const ACTIVITY_DIR: &str = "activite";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLayout {
    output_root: PathBuf,
    public_base: String,
}

impl ArchiveLayout {
    /// Creates the layout of `year` under `output_root`
    ///
    /// Slashes in the year (`2022/2023`) become dashes.
    pub fn new(output_root: impl Into<PathBuf>, year: &str) -> Self {
        Self {
            output_root: output_root.into(),
            public_base: format!("/api/archives/{}", year.replace('/', "-")),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.archive.output_root, &config.site.year)
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Root-relative prefix of every archived link (`/api/archives/{year}`)
    pub fn public_base(&self) -> &str {
        &self.public_base
    }

    /// Directory the pages of this year are written to
    pub fn archive_dir(&self) -> PathBuf {
        self.disk_path(&self.public_base)
    }

    pub fn resources_dir(&self) -> PathBuf {
        self.archive_dir().join(RESOURCES_DIR)
    }

    pub fn activity_dir(&self) -> PathBuf {
        self.archive_dir().join(ACTIVITY_DIR)
    }

    /// Public path of a captured asset file
    pub fn resource_public_path(&self, file_name: &str) -> String {
        format!("{}/{}/{}", self.public_base, RESOURCES_DIR, file_name)
    }

    /// File behind a public path
    pub fn disk_path(&self, public_path: &str) -> PathBuf {
        self.output_root.join(public_path.trim_start_matches('/'))
    }

    /// File an archived page is written to
    ///
    /// `stem` is the unit-relative page path (`activite/42`) or, for an entry
    /// page, the unit slug.
    pub fn page_file(&self, stem: &str) -> PathBuf {
        self.archive_dir().join(format!("{}.html", stem))
    }

    pub fn index_file(&self) -> PathBuf {
        self.archive_dir().join("index.html")
    }

    /// Creates the archive, resources and activity directories
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(self.resources_dir()).await?;
        tokio::fs::create_dir_all(self.activity_dir()).await?;
        Ok(())
    }
}
