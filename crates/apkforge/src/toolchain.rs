//! Android toolchain discovery and acquisition
//!
//! Looks for `aapt2` and a platform `android.jar` in the usual SDK
//! locations. When nothing is installed, the command-line tools are
//! downloaded into a temporary directory and `sdkmanager` installs the
//! build tools and platform there. The temporary SDK lives as long as the
//! locator.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::config::BuildConfig;
use crate::error::{BuildError, IoResultExt, Result};
use crate::process::{is_executable, run_checked, CommandRunner, ToolCommand};

/// Command-line tools archive installed when no SDK is found
pub const COMMAND_LINE_TOOLS_URL: &str =
    "https://dl.google.com/android/repository/commandlinetools-linux-9477386_latest.zip";

/// Build tools version requested from sdkmanager
pub const BUILD_TOOLS_VERSION: &str = "33.0.2";

/// Platform API level requested from sdkmanager
pub const PLATFORM_API: u32 = 33;

/// Conventional SDK install locations, searched after the environment
pub const CONVENTIONAL_SDK_ROOTS: [&str; 3] = [
    "/usr/lib/android-sdk",
    "/opt/android-sdk",
    "/home/runner/android-sdk",
];

/// Number of "y" answers fed to sdkmanager's licence prompts
const LICENSE_ANSWERS: usize = 20;

/// A usable toolchain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainHandle {
    pub aapt2: PathBuf,
    /// Platform archive to link against, if the SDK has one
    pub platform_jar: Option<PathBuf>,
    /// SDK root the tools came from, when it could be determined
    pub sdk_root: Option<PathBuf>,
    /// Whether the SDK was downloaded by this build
    pub acquired: bool,
}

/// Finds or acquires the toolchain once per build
pub struct ToolchainLocator<'a> {
    runner: &'a dyn CommandRunner,
    search_roots: Vec<PathBuf>,
    path_lookup: bool,
    target_sdk: u32,
    timeout: Duration,
    resolved: Option<ToolchainHandle>,
    download_dir: Option<TempDir>,
}

impl<'a> ToolchainLocator<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &BuildConfig) -> Self {
        Self {
            runner,
            search_roots: default_search_roots(),
            path_lookup: true,
            target_sdk: config.target_sdk,
            timeout: config.tool_timeout,
            resolved: None,
            download_dir: None,
        }
    }

    /// Replace the SDK roots searched before falling back to PATH
    pub fn with_search_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.search_roots = roots;
        self
    }

    /// Enable or disable the PATH lookup for `aapt2`
    pub fn with_path_lookup(mut self, enabled: bool) -> Self {
        self.path_lookup = enabled;
        self
    }

    /// Resolved handle, if [`resolve`](Self::resolve) already succeeded
    pub fn handle(&self) -> Option<&ToolchainHandle> {
        self.resolved.as_ref()
    }

    /// Find an installed toolchain or acquire one
    ///
    /// The result is cached; later calls return the same handle.
    pub fn resolve(&mut self) -> Result<&ToolchainHandle> {
        if self.resolved.is_none() {
            let handle = match self.discover() {
                Some(handle) => handle,
                None => {
                    warn!("Android SDK not found, downloading command-line tools");
                    self.acquire()?
                }
            };
            info!(
                "Toolchain: aapt2 at {}, platform {}",
                handle.aapt2.display(),
                handle
                    .platform_jar
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "not found".to_string())
            );
            self.resolved = Some(handle);
        }

        self.resolved
            .as_ref()
            .ok_or_else(|| BuildError::toolchain("toolchain resolution produced no handle"))
    }

    /// Search installed SDKs, then PATH
    pub fn discover(&self) -> Option<ToolchainHandle> {
        for root in &self.search_roots {
            debug!("Searching for aapt2 in {}", root.display());
            if let Some(aapt2) = find_aapt2(root) {
                return Some(ToolchainHandle {
                    aapt2,
                    platform_jar: find_platform_jar(root, self.target_sdk),
                    sdk_root: Some(root.clone()),
                    acquired: false,
                });
            }
        }

        if self.path_lookup {
            if let Ok(aapt2) = which::which("aapt2") {
                let sdk_root = sdk_root_of(&aapt2);
                return Some(ToolchainHandle {
                    platform_jar: sdk_root
                        .as_deref()
                        .and_then(|root| find_platform_jar(root, self.target_sdk)),
                    sdk_root,
                    aapt2,
                    acquired: false,
                });
            }
        }

        None
    }

    /// Download the command-line tools and install build tools and a platform
    pub fn acquire(&mut self) -> Result<ToolchainHandle> {
        let download_dir = tempfile::Builder::new()
            .prefix("apkforge-sdk-")
            .tempdir()
            .map_err(|e| BuildError::io("Failed to create SDK download directory", e))?;
        let sdk_root = download_dir.path().join("sdk");
        fs::create_dir_all(&sdk_root).with_path("create", &sdk_root)?;
        let archive = download_dir.path().join("commandlinetools.zip");

        // 1. Download
        info!("Downloading {}", COMMAND_LINE_TOOLS_URL);
        let curl = ToolCommand::new("curl")
            .args(["-fsSL", "-o"])
            .arg(&archive)
            .arg(COMMAND_LINE_TOOLS_URL);
        run_checked(self.runner, &curl, self.timeout)?;

        // 2. Extract
        let unzip = ToolCommand::new("unzip")
            .args(["-q", "-o"])
            .arg(&archive)
            .arg("-d")
            .arg(&sdk_root);
        run_checked(self.runner, &unzip, self.timeout)?;

        // 3. Install build tools and platform, accepting licences
        let sdkmanager = sdk_root.join("cmdline-tools").join("bin").join("sdkmanager");
        let mut sdk_root_arg = std::ffi::OsString::from("--sdk_root=");
        sdk_root_arg.push(&sdk_root);
        let install = ToolCommand::new(&sdkmanager)
            .arg(sdk_root_arg)
            .arg("platform-tools")
            .arg(format!("build-tools;{}", BUILD_TOOLS_VERSION))
            .arg(format!("platforms;android-{}", PLATFORM_API))
            .stdin("y\n".repeat(LICENSE_ANSWERS));
        info!("Installing build-tools {} and android-{}", BUILD_TOOLS_VERSION, PLATFORM_API);
        run_checked(self.runner, &install, self.timeout)?;

        let aapt2 = find_aapt2(&sdk_root).ok_or_else(|| {
            BuildError::toolchain(format!(
                "sdkmanager finished but no aapt2 was installed under {}",
                sdk_root.display()
            ))
        })?;
        let handle = ToolchainHandle {
            aapt2,
            platform_jar: find_platform_jar(&sdk_root, self.target_sdk),
            sdk_root: Some(sdk_root),
            acquired: true,
        };

        self.download_dir = Some(download_dir);
        Ok(handle)
    }
}

/// SDK roots from the environment, the conventional locations and the home directory
pub fn default_search_roots() -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = ["ANDROID_HOME", "ANDROID_SDK_ROOT"]
        .iter()
        .filter_map(|var| std::env::var_os(var))
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .collect();

    roots.extend(CONVENTIONAL_SDK_ROOTS.iter().map(PathBuf::from));

    if let Some(home) = dirs::home_dir() {
        roots.push(home.join("Android").join("Sdk"));
    }

    roots.dedup();
    roots
}

/// Newest `build-tools/<version>/aapt2` under an SDK root
pub fn find_aapt2(sdk_root: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(sdk_root.join("build-tools")).ok()?;
    let mut versions: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();

    // Newest first
    versions.sort_by_key(|p| version_key(p));
    versions.reverse();

    versions
        .into_iter()
        .map(|dir| dir.join("aapt2"))
        .find(|candidate| is_executable(candidate))
}

/// `platforms/android-<target>/android.jar`, else the newest installed platform
pub fn find_platform_jar(sdk_root: &Path, target_sdk: u32) -> Option<PathBuf> {
    let platforms = sdk_root.join("platforms");
    let exact = platforms
        .join(format!("android-{}", target_sdk))
        .join("android.jar");
    if exact.is_file() {
        return Some(exact);
    }

    let entries = fs::read_dir(&platforms).ok()?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.join("android.jar").is_file())
        .collect();
    candidates.sort_by_key(|p| version_key(p));

    let newest = candidates.pop()?.join("android.jar");
    warn!(
        "Platform android-{} not installed, linking against {}",
        target_sdk,
        newest.display()
    );
    Some(newest)
}

/// SDK root of an `aapt2` found as `<root>/build-tools/<version>/aapt2`
fn sdk_root_of(aapt2: &Path) -> Option<PathBuf> {
    let version_dir = aapt2.parent()?;
    let build_tools = version_dir.parent()?;
    if build_tools.file_name()? != "build-tools" {
        return None;
    }
    build_tools.parent().map(Path::to_path_buf)
}

/// Numeric ordering key for directory names like "33.0.2" or "android-34"
fn version_key(path: &Path) -> Vec<u64> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    name.split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse().ok())
        .collect()
}
