//! Build orchestration
//!
//! Runs the pipeline in order and tags any failure with its stage:
//!
//! 1. Validate configuration (before anything touches the disk)
//! 2. Lock the output directory
//! 3. Scaffold, import assets, icons, templates
//! 4. Placeholder: assemble directly
//!    Real: resolve toolchain, compile, link, then assemble
//!
//! Only this module knows which strategy is active.

use std::path::PathBuf;

use tracing::{error, info};

use crate::assembler::{BuildArtifact, PackageAssembler};
use crate::assets::import_assets;
use crate::config::{BuildConfig, Strategy};
use crate::error::{Result, Stage, StageResultExt};
use crate::icons::generate_icons;
use crate::linker::ResourceLinker;
use crate::lock::WorkspaceLock;
use crate::process::{CommandRunner, SystemRunner};
use crate::scaffold::ProjectScaffold;
use crate::templates::write_templates;
use crate::toolchain::ToolchainLocator;

/// Build with real external processes and default toolchain search
pub fn build(config: &BuildConfig) -> Result<BuildArtifact> {
    Orchestrator::new(config, &SystemRunner).run()
}

/// Sequences one build
pub struct Orchestrator<'a> {
    config: &'a BuildConfig,
    runner: &'a dyn CommandRunner,
    search_roots: Option<Vec<PathBuf>>,
    path_lookup: bool,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a BuildConfig, runner: &'a dyn CommandRunner) -> Self {
        Self {
            config,
            runner,
            search_roots: None,
            path_lookup: true,
        }
    }

    /// Override the SDK roots the toolchain locator searches
    pub fn with_search_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.search_roots = Some(roots);
        self
    }

    pub fn with_path_lookup(mut self, enabled: bool) -> Self {
        self.path_lookup = enabled;
        self
    }

    pub fn run(&self) -> Result<BuildArtifact> {
        let config = self.config;
        info!(
            "Building {} ({}) with {} strategy",
            config.app_name,
            config.package_name,
            config.strategy.as_str()
        );

        let result = self.run_stages();
        match &result {
            Ok(artifact) => info!(
                "Build complete: {} ({})",
                artifact.path.display(),
                artifact.status.as_str()
            ),
            Err(e) => error!("{}", e),
        }
        result
    }

    fn run_stages(&self) -> Result<BuildArtifact> {
        let config = self.config;

        config.validate().at_stage(Stage::Configuration)?;
        let _lock = WorkspaceLock::acquire(&config.output_dir).at_stage(Stage::Scaffold)?;

        let scaffold = ProjectScaffold::create(config).at_stage(Stage::Scaffold)?;
        import_assets(&scaffold, config).at_stage(Stage::AssetImport)?;
        let icons = generate_icons(&scaffold, config).at_stage(Stage::Icons)?;
        write_templates(&scaffold, config, icons).at_stage(Stage::Templates)?;

        let assembler = match config.strategy {
            Strategy::Placeholder => PackageAssembler::Placeholder,
            Strategy::Real => {
                let mut locator = self.locator();
                let linked_package =
                    ResourceLinker::new(&mut locator, self.runner).run(&scaffold, config)?;
                PackageAssembler::Real { linked_package }
            }
        };

        assembler.assemble(&scaffold, config).at_stage(Stage::Assembly)
    }

    fn locator(&self) -> ToolchainLocator<'a> {
        let mut locator =
            ToolchainLocator::new(self.runner, self.config).with_path_lookup(self.path_lookup);
        if let Some(roots) = &self.search_roots {
            locator = locator.with_search_roots(roots.clone());
        }
        locator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::PackageStatus;
    use crate::config::ImagingCapability;
    use crate::error::BuildError;
    use crate::icons::{DensityBucket, ICON_FILE_NAME};
    use crate::lock::LOCK_FILE_NAME;
    use crate::process::testing::{touch_executable, FakeRunner};
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::Path;
    use zip::ZipArchive;

    struct Project {
        dir: tempfile::TempDir,
    }

    impl Project {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let web = dir.path().join("web");
            fs::create_dir_all(&web).unwrap();
            fs::write(web.join("app.html"), "<h1>Hi</h1>").unwrap();
            fs::write(web.join("style.css"), "h1 { color: red; }").unwrap();
            Self { dir }
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.dir.path().join(rel)
        }

        fn config(&self) -> BuildConfig {
            BuildConfig::new(self.path("web/app.html"), "Demo App")
                .with_package_name("com.demo.app")
                .with_output_dir(self.path("dist"))
        }
    }

    fn entry_names(path: &Path) -> Vec<String> {
        let archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(String::from).collect();
        names.sort();
        names
    }

    #[test]
    fn test_placeholder_build() {
        let project = Project::new();
        let config = project.config();
        let runner = FakeRunner::new();

        let artifact = Orchestrator::new(&config, &runner).run().unwrap();
        assert!(artifact.path.ends_with("dist/apks/Demo_App.apk"));
        assert_eq!(artifact.status, PackageStatus::Placeholder);
        assert_eq!(
            entry_names(&artifact.path),
            vec!["AndroidManifest.xml", "assets/index.html", "assets/style.css"]
        );

        let scaffold = ProjectScaffold::layout(&config);
        for bucket in DensityBucket::ALL {
            assert!(scaffold.drawable_dir(bucket).join(ICON_FILE_NAME).is_file());
        }
        assert!(scaffold.manifest_path().is_file());
        // Placeholder builds never run external tools
        assert!(runner.calls().is_empty());
        // Lock released
        assert!(WorkspaceLock::acquire(&config.output_dir).is_ok());
    }

    #[test]
    fn test_missing_html_creates_nothing() {
        let project = Project::new();
        let config = BuildConfig::new(project.path("web/missing.html"), "Demo App")
            .with_output_dir(project.path("dist"));

        let err = Orchestrator::new(&config, &FakeRunner::new()).run().unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Configuration));
        assert!(!project.path("dist").exists());
    }

    #[test]
    fn test_icon_copied_without_imaging() {
        let project = Project::new();
        let icon = project.path("icon.png");
        fs::write(&icon, b"\x89PNG not really decoded").unwrap();
        let config = project
            .config()
            .with_icon(Some(icon.clone()))
            .with_imaging(ImagingCapability::Unavailable);

        Orchestrator::new(&config, &FakeRunner::new()).run().unwrap();

        let original = fs::read(&icon).unwrap();
        let scaffold = ProjectScaffold::layout(&config);
        for bucket in DensityBucket::ALL {
            let copied = fs::read(scaffold.drawable_dir(bucket).join(ICON_FILE_NAME)).unwrap();
            assert_eq!(copied, original);
        }
    }

    #[test]
    fn test_real_build_fails_when_toolchain_unavailable() {
        let project = Project::new();
        let config = project.config().with_strategy(Strategy::Real);
        let runner = FakeRunner::new().fail("curl", 6, "Could not resolve host: dl.google.com");

        let err = Orchestrator::new(&config, &runner)
            .with_search_roots(Vec::new())
            .with_path_lookup(false)
            .run()
            .unwrap_err();

        assert_eq!(err.stage(), Some(Stage::ToolchainResolved));
        assert!(err.to_string().contains("toolchain-resolved"));
        assert!(!config.apk_path().exists());
        assert_eq!(runner.programs(), vec!["curl"]);
    }

    fn installed_sdk(project: &Project) -> PathBuf {
        let sdk = project.path("sdk");
        touch_executable(&sdk.join("build-tools/33.0.2/aapt2"));
        let jar = sdk.join("platforms/android-33/android.jar");
        fs::create_dir_all(jar.parent().unwrap()).unwrap();
        fs::write(&jar, "").unwrap();
        sdk
    }

    /// aapt2 whose link step writes a package to its -o argument
    fn linking_runner() -> FakeRunner {
        FakeRunner::new().on_run("aapt2", |cmd| {
            if cmd.arg_str(0) == Some("link") {
                let out = Path::new(cmd.arg_str(2).unwrap());
                let mut zip = zip::ZipWriter::new(File::create(out).unwrap());
                zip.start_file("AndroidManifest.xml", zip::write::SimpleFileOptions::default())
                    .unwrap();
                zip.write_all(b"binary manifest").unwrap();
                zip.finish().unwrap();
            }
        })
    }

    #[test]
    fn test_real_build_with_installed_sdk() {
        let project = Project::new();
        let sdk = installed_sdk(&project);
        let runner = linking_runner();
        let config = project.config().with_strategy(Strategy::Real);

        let artifact = Orchestrator::new(&config, &runner)
            .with_search_roots(vec![sdk])
            .with_path_lookup(false)
            .run()
            .unwrap();

        assert!(artifact.linked);
        assert_eq!(artifact.status, PackageStatus::MissingBytecode);
        assert_eq!(
            entry_names(&artifact.path),
            vec!["AndroidManifest.xml", "classes.dex"]
        );
        assert_eq!(runner.programs(), vec!["aapt2", "aapt2"]);

        let manifest = fs::read_to_string(ProjectScaffold::layout(&config).manifest_path()).unwrap();
        assert!(manifest.contains(r#"android:icon="@drawable/ic_launcher""#));
    }

    #[test]
    fn test_real_build_without_icons_links() {
        let project = Project::new();
        let sdk = installed_sdk(&project);
        let runner = linking_runner();
        let config = project
            .config()
            .with_strategy(Strategy::Real)
            .with_imaging(ImagingCapability::Unavailable);

        let artifact = Orchestrator::new(&config, &runner)
            .with_search_roots(vec![sdk])
            .with_path_lookup(false)
            .run()
            .unwrap();
        assert!(artifact.linked);

        let scaffold = ProjectScaffold::layout(&config);
        for bucket in DensityBucket::ALL {
            assert!(!scaffold.drawable_dir(bucket).join(ICON_FILE_NAME).exists());
        }
        // Nothing for aapt2 to resolve @drawable/ic_launcher against
        let manifest = fs::read_to_string(scaffold.manifest_path()).unwrap();
        assert!(!manifest.contains("android:icon"));
        assert!(manifest.contains(r#"android:label="@string/app_name""#));
    }

    #[test]
    fn test_concurrent_build_fails_fast() {
        let project = Project::new();
        let config = project.config();
        let _held = WorkspaceLock::acquire(&config.output_dir).unwrap();

        let err = Orchestrator::new(&config, &FakeRunner::new()).run().unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Scaffold));
        match err {
            BuildError::Stage { source, .. } => {
                assert!(matches!(*source, BuildError::Locked { .. }))
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The held build's workspace was not touched
        assert!(!project.path("dist/build").exists());
    }

    #[test]
    fn test_build_after_killed_build() {
        let project = Project::new();
        let config = project.config();
        // A killed build leaves its lock file behind but holds nothing
        fs::create_dir_all(&config.output_dir).unwrap();
        fs::write(config.output_dir.join(LOCK_FILE_NAME), "4242\n").unwrap();

        let artifact = Orchestrator::new(&config, &FakeRunner::new()).run().unwrap();
        assert!(artifact.path.is_file());
    }
}
