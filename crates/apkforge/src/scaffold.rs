//! Native project scaffold
//!
//! Creates the directory layout aapt2 and the Android toolchain expect:
//!
//! ```text
//! <output>/build/
//!   AndroidManifest.xml
//!   src/main/java/<package/path>/
//!   src/main/assets/
//!   src/main/res/values/
//!   src/main/res/layout/
//!   src/main/res/drawable-{mdpi,hdpi,xhdpi,xxhdpi,xxxhdpi}/
//!   libs/
//!   bin/
//! <output>/apks/
//! ```
//!
//! There is no incremental mode: any previous build and apks directory is
//! removed before the layout is created.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::BuildConfig;
use crate::error::{IoResultExt, Result};
use crate::icons::DensityBucket;

/// Paths of one build's project tree
#[derive(Debug, Clone)]
pub struct ProjectScaffold {
    root: PathBuf,
    apk_dir: PathBuf,
    package_path: PathBuf,
}

impl ProjectScaffold {
    /// Compute the layout for a configuration without touching the disk
    pub fn layout(config: &BuildConfig) -> Self {
        Self {
            root: config.output_dir.join("build"),
            apk_dir: config.output_dir.join("apks"),
            package_path: config.package_path(),
        }
    }

    /// Remove any previous workspace and create a fresh layout
    pub fn create(config: &BuildConfig) -> Result<Self> {
        let scaffold = Self::layout(config);

        for stale in [&scaffold.root, &scaffold.apk_dir] {
            if stale.exists() {
                debug!("Removing previous {}", stale.display());
                fs::remove_dir_all(stale).with_path("remove", stale)?;
            }
        }

        for dir in scaffold.directories() {
            fs::create_dir_all(&dir).with_path("create", &dir)?;
        }

        info!("Project structure created at {}", scaffold.root.display());
        Ok(scaffold)
    }

    /// Every directory the scaffold consists of, in creation order
    pub fn directories(&self) -> Vec<PathBuf> {
        let mut dirs = vec![
            self.source_dir(),
            self.assets_dir(),
            self.values_dir(),
            self.layout_dir(),
        ];
        dirs.extend(DensityBucket::ALL.iter().map(|b| self.drawable_dir(*b)));
        dirs.push(self.libs_dir());
        dirs.push(self.bin_dir());
        dirs.push(self.apk_dir.clone());
        dirs
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the final archive
    pub fn apk_dir(&self) -> &Path {
        &self.apk_dir
    }

    /// Java source directory for the package
    pub fn source_dir(&self) -> PathBuf {
        self.root.join("src/main/java").join(&self.package_path)
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("src/main/assets")
    }

    pub fn res_dir(&self) -> PathBuf {
        self.root.join("src/main/res")
    }

    pub fn values_dir(&self) -> PathBuf {
        self.res_dir().join("values")
    }

    pub fn layout_dir(&self) -> PathBuf {
        self.res_dir().join("layout")
    }

    pub fn drawable_dir(&self, bucket: DensityBucket) -> PathBuf {
        self.res_dir().join(bucket.dir_name())
    }

    pub fn libs_dir(&self) -> PathBuf {
        self.root.join("libs")
    }

    /// Intermediate toolchain outputs (compiled resources, unsigned package)
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("AndroidManifest.xml")
    }
}
