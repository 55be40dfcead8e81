//! Error types for the packaging pipeline
//!
//! Every fallible operation returns [`BuildError`]. Errors raised inside a
//! pipeline stage are wrapped with [`BuildError::Stage`] so the caller can
//! report which stage failed.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, BuildError>;

/// Pipeline stage, used to report where a build stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Configuration,
    Scaffold,
    AssetImport,
    Icons,
    Templates,
    ToolchainResolved,
    ResourcesCompiled,
    ResourcesLinked,
    Assembly,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Configuration => "configuration",
            Stage::Scaffold => "scaffold",
            Stage::AssetImport => "asset-import",
            Stage::Icons => "icons",
            Stage::Templates => "templates",
            Stage::ToolchainResolved => "toolchain-resolved",
            Stage::ResourcesCompiled => "resources-compiled",
            Stage::ResourcesLinked => "resources-linked",
            Stage::Assembly => "assembly",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to process image {}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write archive {}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("{program} exited with {status}: {stderr}")]
    ToolFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{program} did not finish within {}s and was killed", timeout.as_secs())]
    ToolTimeout { program: String, timeout: Duration },

    #[error("Android toolchain not available: {0}")]
    Toolchain(String),

    #[error("Build already in progress: lock held at {}", path.display())]
    Locked { path: PathBuf },

    #[error("Build failed at stage '{stage}'")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<BuildError>,
    },
}

impl BuildError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn toolchain(message: impl Into<String>) -> Self {
        Self::Toolchain(message.into())
    }

    pub fn image(path: &Path, source: image::ImageError) -> Self {
        Self::Image {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn archive(path: &Path, source: zip::result::ZipError) -> Self {
        Self::Archive {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Attach a stage, keeping the innermost stage if one is already set
    pub fn at_stage(self, stage: Stage) -> Self {
        match self {
            Self::Stage { .. } => self,
            other => Self::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stage the error was raised in, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Attach path context to raw I/O results
pub(crate) trait IoResultExt<T> {
    fn with_path(self, action: &str, path: &Path) -> Result<T>;
}

impl<T> IoResultExt<T> for std::result::Result<T, io::Error> {
    fn with_path(self, action: &str, path: &Path) -> Result<T> {
        self.map_err(|e| BuildError::io(format!("Failed to {} {}", action, path.display()), e))
    }
}

/// Tag any error in a result with the stage it happened in
pub(crate) trait StageResultExt<T> {
    fn at_stage(self, stage: Stage) -> Result<T>;
}

impl<T> StageResultExt<T> for Result<T> {
    fn at_stage(self, stage: Stage) -> Result<T> {
        self.map_err(|e| e.at_stage(stage))
    }
}
