use anyhow::{anyhow, Context, Result};
use apkforge::config::{DEFAULT_MIN_SDK, DEFAULT_OUTPUT_DIR, DEFAULT_TARGET_SDK};
use apkforge::{BuildConfig, ImagingCapability, Strategy};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod project;
mod summary;

use project::{AppSection, ProjectFile};
use summary::BuildInfo;

/// Package an HTML app and its assets into an Android APK
#[derive(Parser, Debug)]
#[command(name = "apkforge", version, about)]
#[command(after_help = "EXAMPLES:\n  \
                   apkforge --html web/index.html --app-name \"Demo App\"\n  \
                   apkforge --config apkforge.toml --strategy real\n\n\
                   Set APKFORGE_LOG (e.g. APKFORGE_LOG=debug) to control log output.")]
struct Cli {
    /// Entry HTML document
    #[arg(long, value_name = "FILE")]
    html: Option<PathBuf>,

    /// Display name of the app
    #[arg(long)]
    app_name: Option<String>,

    /// Reverse-domain package identifier (derived from the app name if omitted)
    #[arg(long)]
    package_name: Option<String>,

    /// Launcher icon source image
    #[arg(long, value_name = "FILE")]
    icon: Option<PathBuf>,

    /// Output directory [default: dist]
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Version code (positive integer) [default: 1]
    #[arg(long)]
    version_code: Option<u32>,

    /// Version name [default: 1.0]
    #[arg(long)]
    version_name: Option<String>,

    /// Minimum Android API level [default: 21]
    #[arg(long)]
    min_sdk: Option<u32>,

    /// Target Android API level [default: 33]
    #[arg(long)]
    target_sdk: Option<u32>,

    /// Packaging strategy
    #[arg(long, value_enum, default_value_t = StrategyArg::Placeholder)]
    strategy: StrategyArg,

    /// Copy the icon verbatim instead of resizing it
    #[arg(long)]
    no_image_processing: bool,

    /// Timeout for each external tool, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 1200)]
    tool_timeout: u64,

    /// Project file with an [app] table
    #[arg(long, value_name = "FILE", env = "APKFORGE_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging (unless APKFORGE_LOG is set)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum StrategyArg {
    /// Zip the assets with a minimal manifest
    Placeholder,
    /// Compile and link resources with aapt2
    Real,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Placeholder => Strategy::Placeholder,
            StrategyArg::Real => Strategy::Real,
        }
    }
}

impl Cli {
    /// Merge flags over the project file into a build configuration
    fn into_config(self, file: AppSection) -> Result<BuildConfig> {
        let html = self
            .html
            .or(file.html)
            .ok_or_else(|| anyhow!("--html is required (or set html in the [app] table)"))?;
        let app_name = self
            .app_name
            .or(file.name)
            .ok_or_else(|| anyhow!("--app-name is required (or set name in the [app] table)"))?;

        let mut config = BuildConfig::new(html, app_name)
            .with_output_dir(
                self.output_dir
                    .or(file.output_dir)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            )
            .with_sdk_levels(
                self.min_sdk.or(file.min_sdk).unwrap_or(DEFAULT_MIN_SDK),
                self.target_sdk.or(file.target_sdk).unwrap_or(DEFAULT_TARGET_SDK),
            )
            .with_icon(self.icon.or(file.icon))
            .with_strategy(self.strategy.into())
            .with_tool_timeout(Duration::from_secs(self.tool_timeout));

        if let Some(package) = self.package_name.or(file.package) {
            config = config.with_package_name(package);
        }
        if self.no_image_processing {
            config = config.with_imaging(ImagingCapability::Unavailable);
        }

        let version_code = self.version_code.or(file.version_code).unwrap_or(config.version_code);
        let version_name = self
            .version_name
            .or(file.version_name)
            .unwrap_or_else(|| config.version_name.clone());
        Ok(config.with_version(version_code, version_name))
    }
}

fn init_tracing(verbose: bool) {
    // APKFORGE_LOG wins over --verbose
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("APKFORGE_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let file = match &cli.config {
        Some(path) => ProjectFile::load(path)?.app,
        None => AppSection::default(),
    };
    let config = cli.into_config(file)?;

    let artifact = apkforge::build(&config).context("APK build failed")?;

    let info_path = BuildInfo::new(&config, &artifact)
        .write(&config.output_dir)?;

    println!("Build complete");
    println!("  App:     {}", config.app_name);
    println!("  Package: {}", config.package_name);
    println!("  APK:     {}", artifact.path.display());
    println!("  Info:    {}", info_path.display());
    Ok(())
}
