//! Build summary written next to the archive

use anyhow::{Context, Result};
use apkforge::{BuildArtifact, BuildConfig};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const BUILD_INFO_FILE: &str = "build-info.json";

#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub app_name: String,
    pub package_name: String,
    pub apk_path: PathBuf,
    pub status: String,
    pub linked: bool,
    /// RFC 3339, UTC
    pub build_time: String,
}

impl BuildInfo {
    pub fn new(config: &BuildConfig, artifact: &BuildArtifact) -> Self {
        Self {
            app_name: config.app_name.clone(),
            package_name: config.package_name.clone(),
            apk_path: artifact.path.clone(),
            status: artifact.status.as_str().to_string(),
            linked: artifact.linked,
            build_time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Write `build-info.json` into `output_dir`
    pub fn write(&self, output_dir: &Path) -> Result<PathBuf> {
        let path = output_dir.join(BUILD_INFO_FILE);
        let json = serde_json::to_string_pretty(self).context("Failed to encode build info")?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apkforge::PackageStatus;

    #[test]
    fn test_write_build_info() {
        let dir = tempfile::tempdir().unwrap();
        let config = BuildConfig::new("app.html", "Demo App").with_package_name("com.demo.app");
        let artifact = BuildArtifact {
            path: dir.path().join("apks/Demo_App.apk"),
            linked: false,
            status: PackageStatus::Placeholder,
        };

        let path = BuildInfo::new(&config, &artifact).write(dir.path()).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();

        assert_eq!(value["app_name"], "Demo App");
        assert_eq!(value["package_name"], "com.demo.app");
        assert_eq!(value["status"], "placeholder");
        assert!(chrono::DateTime::parse_from_rfc3339(value["build_time"].as_str().unwrap()).is_ok());
    }
}
