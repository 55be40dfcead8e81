//! Web asset import
//!
//! The entry document always lands at `assets/index.html`. Its siblings are
//! copied next to it when their extension is a recognised static asset.
//! Only the entry's own directory is scanned; nested folders are skipped.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::config::BuildConfig;
use crate::error::{IoResultExt, Result};
use crate::scaffold::ProjectScaffold;

/// Name the entry document is stored under inside the asset root
pub const ENTRY_DOCUMENT: &str = "index.html";

/// Extensions copied alongside the entry document
pub const STATIC_ASSET_EXTENSIONS: [&str; 10] = [
    "css", "js", "png", "jpg", "jpeg", "gif", "ico", "ttf", "woff", "woff2",
];

/// Whether a file name carries a recognised static asset extension
pub fn is_static_asset(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            STATIC_ASSET_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Copy the entry document and its sibling assets into the scaffold
///
/// Returns the names written to the asset root, sorted.
pub fn import_assets(scaffold: &ProjectScaffold, config: &BuildConfig) -> Result<Vec<String>> {
    let assets_dir = scaffold.assets_dir();
    let html = &config.html_file;

    let entry_dest = assets_dir.join(ENTRY_DOCUMENT);
    fs::copy(html, &entry_dest).with_path("copy entry document", html)?;
    info!(
        "HTML copied: {}",
        html.file_name().unwrap_or_default().to_string_lossy()
    );

    let mut imported = vec![ENTRY_DOCUMENT.to_string()];
    let entry_name = html.file_name();
    let source_dir = config.html_dir();

    for entry in fs::read_dir(source_dir).with_path("read", source_dir)? {
        let entry = entry.with_path("read", source_dir)?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        if Some(entry.file_name().as_os_str()) == entry_name {
            continue;
        }
        if !is_static_asset(&path) {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        fs::copy(&path, assets_dir.join(&name)).with_path("copy asset", &path)?;
        debug!("Asset copied: {}", name);
        imported.push(name);
    }

    imported.sort();
    info!("Imported {} asset(s)", imported.len());
    Ok(imported)
}
