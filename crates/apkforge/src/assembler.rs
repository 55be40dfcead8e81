//! Final archive assembly
//!
//! The archive is staged in a temporary file next to its destination and
//! only renamed into place once complete, so a failed build never leaves a
//! partial `.apk` at the final path.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::BuildConfig;
use crate::error::{BuildError, IoResultExt, Result};
use crate::scaffold::ProjectScaffold;

/// Compiled bytecode entry; the real variant writes it empty
pub const BYTECODE_ENTRY: &str = "classes.dex";

/// What the produced archive contains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageStatus {
    /// Assets and a minimal manifest, not installable
    Placeholder,
    /// Linked resources with an empty bytecode stub; the app cannot start
    MissingBytecode,
}

impl PackageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PackageStatus::Placeholder => "placeholder",
            PackageStatus::MissingBytecode => "missing-bytecode",
        }
    }
}

/// Result of a successful build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    /// Absolute path of the archive
    pub path: PathBuf,
    /// Whether resources went through the native linker
    pub linked: bool,
    pub status: PackageStatus,
}

/// Archive variant, chosen by the orchestrator
#[derive(Debug, Clone)]
pub enum PackageAssembler {
    /// Zip the asset root with a minimal manifest
    Placeholder,
    /// Extend a linked package with an empty bytecode entry
    Real { linked_package: PathBuf },
}

impl PackageAssembler {
    pub fn assemble(&self, scaffold: &ProjectScaffold, config: &BuildConfig) -> Result<BuildArtifact> {
        let apk_path = scaffold.apk_dir().join(config.apk_file_name());
        let mut staging = tempfile::Builder::new()
            .prefix(".apkforge-")
            .suffix(".apk.part")
            .tempfile_in(scaffold.apk_dir())
            .with_path("create staging file in", scaffold.apk_dir())?;

        let (linked, status) = match self {
            PackageAssembler::Placeholder => {
                write_placeholder(&mut staging, scaffold, config, &apk_path)?;
                (false, PackageStatus::Placeholder)
            }
            PackageAssembler::Real { linked_package } => {
                write_real(&mut staging, linked_package, &apk_path)?;
                (true, PackageStatus::MissingBytecode)
            }
        };

        staging
            .persist(&apk_path)
            .map_err(|e| BuildError::io(format!("Failed to move archive to {}", apk_path.display()), e.error))?;
        let path = fs::canonicalize(&apk_path).with_path("resolve", &apk_path)?;

        if status == PackageStatus::MissingBytecode {
            warn!("{} contains no compiled code and will not start on a device", path.display());
        }
        info!("APK created: {}", path.display());

        Ok(BuildArtifact {
            path,
            linked,
            status,
        })
    }
}

/// Minimal manifest used by the placeholder archive
pub fn placeholder_manifest(package_name: &str) -> String {
    format!(r#"<?xml version="1.0"?><manifest package="{}"/>"#, package_name)
}

fn write_placeholder(
    staging: &mut NamedTempFile,
    scaffold: &ProjectScaffold,
    config: &BuildConfig,
    apk_path: &Path,
) -> Result<()> {
    let zip_err = |e| BuildError::archive(apk_path, e);
    let io_err = |e| BuildError::io(format!("Failed to write {}", apk_path.display()), e);

    let mut zip = ZipWriter::new(staging.as_file_mut());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("AndroidManifest.xml", options).map_err(zip_err)?;
    zip.write_all(placeholder_manifest(&config.package_name).as_bytes())
        .map_err(io_err)?;

    let assets_dir = scaffold.assets_dir();
    for entry in WalkDir::new(&assets_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            BuildError::io(format!("Failed to walk {}", assets_dir.display()), io::Error::from(e))
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let relative = path
            .strip_prefix(&assets_dir)
            .map_err(|_| BuildError::config(format!("{} is outside the asset root", path.display())))?;
        let name = format!("assets/{}", relative.to_string_lossy().replace('\\', "/"));

        let content = fs::read(path).with_path("read", path)?;
        zip.start_file(name.as_str(), options).map_err(zip_err)?;
        zip.write_all(&content).map_err(io_err)?;
        debug!("Archived {}", name);
    }

    zip.finish().map_err(zip_err)?;
    Ok(())
}

fn write_real(staging: &mut NamedTempFile, linked_package: &Path, apk_path: &Path) -> Result<()> {
    let mut source = File::open(linked_package).with_path("open linked package", linked_package)?;
    io::copy(&mut source, staging.as_file_mut()).with_path("copy", linked_package)?;

    let mut zip = ZipWriter::new_append(staging.as_file_mut())
        .map_err(|e| BuildError::archive(apk_path, e))?;
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    zip.start_file(BYTECODE_ENTRY, options)
        .map_err(|e| BuildError::archive(apk_path, e))?;
    zip.finish().map_err(|e| BuildError::archive(apk_path, e))?;

    debug!("Appended empty {} to {}", BYTECODE_ENTRY, linked_package.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn setup(assets: &[&str]) -> (tempfile::TempDir, BuildConfig, ProjectScaffold) {
        let dir = tempfile::tempdir().unwrap();
        let config = BuildConfig::new(dir.path().join("app.html"), "Demo App")
            .with_package_name("com.demo.app")
            .with_output_dir(dir.path().join("dist"));
        let scaffold = ProjectScaffold::create(&config).unwrap();
        for name in assets {
            let path = scaffold.assets_dir().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, format!("asset {}", name)).unwrap();
        }
        (dir, config, scaffold)
    }

    fn entry_names(path: &Path) -> Vec<String> {
        let archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        archive.file_names().map(String::from).collect()
    }

    fn apk_dir_entries(scaffold: &ProjectScaffold) -> Vec<PathBuf> {
        fs::read_dir(scaffold.apk_dir())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    #[test]
    fn test_placeholder_archive() {
        let (_dir, config, scaffold) = setup(&["index.html", "style.css", "app.js"]);
        let artifact = PackageAssembler::Placeholder.assemble(&scaffold, &config).unwrap();

        assert!(artifact.path.is_absolute());
        assert!(artifact.path.ends_with("dist/apks/Demo_App.apk"));
        assert!(!artifact.linked);
        assert_eq!(artifact.status, PackageStatus::Placeholder);

        let mut names = entry_names(&artifact.path);
        names.sort();
        assert_eq!(
            names,
            vec!["AndroidManifest.xml", "assets/app.js", "assets/index.html", "assets/style.css"]
        );

        let mut archive = ZipArchive::new(File::open(&artifact.path).unwrap()).unwrap();
        let mut manifest = String::new();
        archive
            .by_name("AndroidManifest.xml")
            .unwrap()
            .read_to_string(&mut manifest)
            .unwrap();
        assert_eq!(manifest, r#"<?xml version="1.0"?><manifest package="com.demo.app"/>"#);

        let entry = archive.by_name("assets/style.css").unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
    }

    #[test]
    fn test_placeholder_keeps_relative_paths() {
        let (_dir, config, scaffold) = setup(&["index.html", "img/logo.png"]);
        let artifact = PackageAssembler::Placeholder.assemble(&scaffold, &config).unwrap();
        assert!(entry_names(&artifact.path).contains(&"assets/img/logo.png".to_string()));
    }

    #[test]
    fn test_no_staging_file_left_behind() {
        let (_dir, config, scaffold) = setup(&["index.html"]);
        let artifact = PackageAssembler::Placeholder.assemble(&scaffold, &config).unwrap();
        let entries = apk_dir_entries(&scaffold);
        assert_eq!(entries.len(), 1);
        assert_eq!(fs::canonicalize(&entries[0]).unwrap(), artifact.path);
    }

    #[test]
    fn test_real_appends_empty_bytecode() {
        let (dir, config, scaffold) = setup(&[]);
        let linked = dir.path().join("unsigned.apk");
        {
            let mut zip = ZipWriter::new(File::create(&linked).unwrap());
            zip.start_file("AndroidManifest.xml", SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"binary manifest").unwrap();
            zip.start_file("resources.arsc", SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"table").unwrap();
            zip.finish().unwrap();
        }

        let assembler = PackageAssembler::Real {
            linked_package: linked.clone(),
        };
        let artifact = assembler.assemble(&scaffold, &config).unwrap();
        assert!(artifact.linked);
        assert_eq!(artifact.status, PackageStatus::MissingBytecode);

        let mut archive = ZipArchive::new(File::open(&artifact.path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(String::from).collect();
        names.sort();
        assert_eq!(names, vec!["AndroidManifest.xml", "classes.dex", "resources.arsc"]);
        assert_eq!(archive.by_name(BYTECODE_ENTRY).unwrap().size(), 0);

        // The linked package itself is untouched
        assert_eq!(entry_names(&linked).len(), 2);
    }

    #[test]
    fn test_failed_assembly_leaves_no_archive() {
        let (dir, config, scaffold) = setup(&[]);
        let assembler = PackageAssembler::Real {
            linked_package: dir.path().join("missing.apk"),
        };

        assert!(assembler.assemble(&scaffold, &config).is_err());
        assert!(!config.apk_path().exists());
        assert!(apk_dir_entries(&scaffold).is_empty());
    }

    #[test]
    fn test_corrupt_linked_package_leaves_no_archive() {
        let (dir, config, scaffold) = setup(&[]);
        let linked = dir.path().join("corrupt.apk");
        fs::write(&linked, b"this is not a zip").unwrap();
        let assembler = PackageAssembler::Real {
            linked_package: linked,
        };

        let err = assembler.assemble(&scaffold, &config).unwrap_err();
        assert!(matches!(err, BuildError::Archive { .. }));
        assert!(apk_dir_entries(&scaffold).is_empty());
    }
}
