//! Optional project file (`apkforge.toml`)
//!
//! ```toml
//! [app]
//! html = "web/index.html"
//! name = "Demo App"
//! package = "com.demo.app"
//! version_code = 3
//! version_name = "1.2"
//! icon = "web/icon.png"
//! ```
//!
//! Relative paths are resolved against the file's directory. Command-line
//! flags take precedence over every value here.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProjectFile {
    #[serde(default)]
    pub app: AppSection,
}

/// `[app]` table
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct AppSection {
    pub html: Option<PathBuf>,
    pub name: Option<String>,
    pub package: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub version_code: Option<u32>,
    pub version_name: Option<String>,
    pub min_sdk: Option<u32>,
    pub target_sdk: Option<u32>,
    pub icon: Option<PathBuf>,
}

impl ProjectFile {
    /// Load and parse a project file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let mut project: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;

        if let Some(base) = path.parent() {
            project.app.resolve_paths(base);
        }
        Ok(project)
    }
}

impl AppSection {
    fn resolve_paths(&mut self, base: &Path) {
        for path in [&mut self.html, &mut self.output_dir, &mut self.icon]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}
