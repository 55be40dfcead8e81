//! Build configuration record
//!
//! A [`BuildConfig`] is produced once by the caller (the CLI, or a test) and
//! passed by reference to every pipeline component. Nothing in the pipeline
//! mutates it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{BuildError, Result};

pub const DEFAULT_OUTPUT_DIR: &str = "dist";
pub const DEFAULT_VERSION_CODE: u32 = 1;
pub const DEFAULT_VERSION_NAME: &str = "1.0";
pub const DEFAULT_MIN_SDK: u32 = 21;
pub const DEFAULT_TARGET_SDK: u32 = 33;
/// Upper bound for any single external tool invocation
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// Which packaging path the orchestrator takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Archive assets directly, never touching a native toolchain
    #[default]
    Placeholder,
    /// Compile and link resources with aapt2
    Real,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Placeholder => "placeholder",
            Strategy::Real => "real",
        }
    }
}

/// Whether raster icon processing may be used on this host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImagingCapability {
    #[default]
    Available,
    Unavailable,
}

impl ImagingCapability {
    pub fn is_available(self) -> bool {
        self == ImagingCapability::Available
    }
}

#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Entry HTML document
    pub html_file: PathBuf,
    /// Display name shown by the launcher
    pub app_name: String,
    /// Reverse-domain package identifier (e.g. "com.demo.app")
    pub package_name: String,
    pub output_dir: PathBuf,
    pub version_code: u32,
    pub version_name: String,
    pub min_sdk: u32,
    pub target_sdk: u32,
    /// Optional icon source image
    pub icon: Option<PathBuf>,
    pub imaging: ImagingCapability,
    pub strategy: Strategy,
    pub tool_timeout: Duration,
}

impl BuildConfig {
    /// Create a configuration with defaults and a package name derived from the app name
    pub fn new(html_file: impl Into<PathBuf>, app_name: impl Into<String>) -> Self {
        let app_name = app_name.into();
        Self {
            html_file: html_file.into(),
            package_name: derive_package_name(&app_name),
            app_name,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            version_code: DEFAULT_VERSION_CODE,
            version_name: DEFAULT_VERSION_NAME.to_string(),
            min_sdk: DEFAULT_MIN_SDK,
            target_sdk: DEFAULT_TARGET_SDK,
            icon: None,
            imaging: ImagingCapability::Available,
            strategy: Strategy::Placeholder,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_package_name(mut self, package_name: impl Into<String>) -> Self {
        self.package_name = package_name.into();
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_version(mut self, code: u32, name: impl Into<String>) -> Self {
        self.version_code = code;
        self.version_name = name.into();
        self
    }

    pub fn with_sdk_levels(mut self, min_sdk: u32, target_sdk: u32) -> Self {
        self.min_sdk = min_sdk;
        self.target_sdk = target_sdk;
        self
    }

    pub fn with_icon(mut self, icon: Option<PathBuf>) -> Self {
        self.icon = icon;
        self
    }

    pub fn with_imaging(mut self, imaging: ImagingCapability) -> Self {
        self.imaging = imaging;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    /// Check every invariant the pipeline relies on
    ///
    /// Runs before anything is written to disk. A missing icon is not an
    /// error; the icon generator falls back to a default.
    pub fn validate(&self) -> Result<()> {
        if !self.html_file.is_file() {
            return Err(BuildError::config(format!(
                "HTML file not found: {}",
                self.html_file.display()
            )));
        }
        if self.app_name.trim().is_empty() {
            return Err(BuildError::config("App name must not be empty"));
        }
        validate_package_name(&self.package_name)?;
        if self.version_code == 0 {
            return Err(BuildError::config("Version code must be a positive integer"));
        }
        if self.version_name.trim().is_empty() {
            return Err(BuildError::config("Version name must not be empty"));
        }
        if self.min_sdk > self.target_sdk {
            return Err(BuildError::config(format!(
                "Min SDK {} is higher than target SDK {}",
                self.min_sdk, self.target_sdk
            )));
        }
        Ok(())
    }

    /// Package identifier as a relative source path ("com/demo/app")
    pub fn package_path(&self) -> PathBuf {
        self.package_name.split('.').collect()
    }

    /// File name of the final archive, e.g. "Demo_App.apk"
    pub fn apk_file_name(&self) -> String {
        format!("{}.apk", self.app_name.replace([' ', '/', '\\'], "_"))
    }

    /// Path the final archive is written to
    pub fn apk_path(&self) -> PathBuf {
        self.output_dir.join("apks").join(self.apk_file_name())
    }

    /// Directory the entry document's sibling assets are read from
    pub fn html_dir(&self) -> &Path {
        self.html_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }
}

/// Derive a package identifier from an app name
///
/// "My Cool App" becomes "com.myapp.mycoolapp".
pub fn derive_package_name(app_name: &str) -> String {
    let safe: String = app_name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    match safe.chars().next() {
        None => "com.myapp.app".to_string(),
        Some(c) if c.is_ascii_digit() => format!("com.myapp.app{}", safe),
        Some(_) => format!("com.myapp.{}", safe),
    }
}

/// Validate a reverse-domain package identifier
///
/// At least two segments, each starting with a letter or underscore and
/// containing only ASCII alphanumerics and underscores.
pub fn validate_package_name(package_name: &str) -> Result<()> {
    let segments: Vec<&str> = package_name.split('.').collect();
    if segments.len() < 2 {
        return Err(BuildError::config(format!(
            "Package name '{}' needs at least two segments (e.g. com.example.app)",
            package_name
        )));
    }

    for segment in segments {
        let mut chars = segment.chars();
        let valid_start = chars
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false);
        let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_start || !valid_rest {
            return Err(BuildError::config(format!(
                "Invalid segment '{}' in package name '{}'",
                segment, package_name
            )));
        }
    }
    Ok(())
}
