//! apkforge - package web assets into an Android application archive
//!
//! The pipeline turns an entry HTML document and its sibling assets into
//! `<output>/apks/<App_Name>.apk`:
//! - Scaffold: fresh native project layout under `<output>/build`
//! - Assets: entry document as `index.html` plus flat static siblings
//! - Icons: one launcher icon per density bucket
//! - Templates: manifest, WebView activity, layout, strings
//! - Link (real strategy only): aapt2 compile and link
//! - Assemble: placeholder or real archive
//!
//! ```no_run
//! use apkforge::{build, BuildConfig};
//!
//! let config = BuildConfig::new("web/index.html", "Demo App");
//! let artifact = build(&config)?;
//! println!("{}", artifact.path.display());
//! # Ok::<(), apkforge::BuildError>(())
//! ```

pub mod assembler;
pub mod assets;
pub mod config;
pub mod error;
pub mod icons;
pub mod linker;
pub mod lock;
pub mod orchestrator;
pub mod process;
pub mod scaffold;
pub mod templates;
pub mod toolchain;

pub use assembler::{BuildArtifact, PackageAssembler, PackageStatus};
pub use config::{BuildConfig, ImagingCapability, Strategy};
pub use error::{BuildError, Result, Stage};
pub use icons::{DensityBucket, IconOutcome};
pub use orchestrator::{build, Orchestrator};
pub use process::{CommandRunner, SystemRunner, ToolCommand, ToolOutput};
pub use toolchain::{ToolchainHandle, ToolchainLocator};
