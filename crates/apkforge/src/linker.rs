//! Resource compilation and linking with aapt2
//!
//! Drives `unresolved -> toolchain-resolved -> resources-compiled ->
//! resources-linked`. Each step only runs after the previous one succeeded,
//! and every failure carries the stage it happened in.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::BuildConfig;
use crate::error::{BuildError, Result, Stage, StageResultExt};
use crate::process::{run_checked, CommandRunner, ToolCommand};
use crate::scaffold::ProjectScaffold;
use crate::toolchain::{ToolchainHandle, ToolchainLocator};

/// Compiled resource archive inside the scaffold's `bin` directory
pub const COMPILED_RESOURCES: &str = "compiled_resources.zip";

/// Linked but unsigned package inside the scaffold's `bin` directory
pub const UNSIGNED_PACKAGE: &str = "unsigned.apk";

/// Progress of a linker run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    Unresolved,
    ToolchainResolved(ToolchainHandle),
    ResourcesCompiled {
        toolchain: ToolchainHandle,
        compiled: PathBuf,
    },
    ResourcesLinked(PathBuf),
}

impl LinkState {
    /// Stage the next transition out of this state belongs to
    fn next_stage(&self) -> Stage {
        match self {
            LinkState::Unresolved => Stage::ToolchainResolved,
            LinkState::ToolchainResolved(_) => Stage::ResourcesCompiled,
            LinkState::ResourcesCompiled { .. } | LinkState::ResourcesLinked(_) => {
                Stage::ResourcesLinked
            }
        }
    }
}

pub struct ResourceLinker<'l, 'r> {
    locator: &'l mut ToolchainLocator<'r>,
    runner: &'r dyn CommandRunner,
    state: LinkState,
}

impl<'l, 'r> ResourceLinker<'l, 'r> {
    pub fn new(locator: &'l mut ToolchainLocator<'r>, runner: &'r dyn CommandRunner) -> Self {
        Self {
            locator,
            runner,
            state: LinkState::Unresolved,
        }
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    /// Run every remaining step and return the unsigned package path
    pub fn run(&mut self, scaffold: &ProjectScaffold, config: &BuildConfig) -> Result<PathBuf> {
        loop {
            let stage = self.state.next_stage();
            let next = self.advance(scaffold, config).at_stage(stage)?;
            if let LinkState::ResourcesLinked(package) = &next {
                info!("Resources linked: {}", package.display());
                let package = package.clone();
                self.state = next;
                return Ok(package);
            }
            self.state = next;
        }
    }

    fn advance(&mut self, scaffold: &ProjectScaffold, config: &BuildConfig) -> Result<LinkState> {
        match &self.state {
            LinkState::Unresolved => {
                let handle = self.locator.resolve()?.clone();
                Ok(LinkState::ToolchainResolved(handle))
            }
            LinkState::ToolchainResolved(toolchain) => {
                let compiled = self.compile(toolchain, scaffold, config)?;
                Ok(LinkState::ResourcesCompiled {
                    toolchain: toolchain.clone(),
                    compiled,
                })
            }
            LinkState::ResourcesCompiled { toolchain, compiled } => {
                let linked = self.link(toolchain, compiled, scaffold, config)?;
                Ok(LinkState::ResourcesLinked(linked))
            }
            LinkState::ResourcesLinked(package) => Ok(LinkState::ResourcesLinked(package.clone())),
        }
    }

    fn compile(
        &self,
        toolchain: &ToolchainHandle,
        scaffold: &ProjectScaffold,
        config: &BuildConfig,
    ) -> Result<PathBuf> {
        let compiled = scaffold.bin_dir().join(COMPILED_RESOURCES);
        let cmd = ToolCommand::new(&toolchain.aapt2)
            .arg("compile")
            .arg("--dir")
            .arg(scaffold.res_dir())
            .arg("-o")
            .arg(&compiled);

        info!("Compiling resources");
        run_checked(self.runner, &cmd, config.tool_timeout)?;
        Ok(compiled)
    }

    fn link(
        &self,
        toolchain: &ToolchainHandle,
        compiled: &Path,
        scaffold: &ProjectScaffold,
        config: &BuildConfig,
    ) -> Result<PathBuf> {
        let platform_jar = toolchain.platform_jar.as_ref().ok_or_else(|| {
            BuildError::toolchain(format!(
                "no platform android.jar found for API {}",
                config.target_sdk
            ))
        })?;

        let unsigned = scaffold.bin_dir().join(UNSIGNED_PACKAGE);
        let cmd = ToolCommand::new(&toolchain.aapt2)
            .arg("link")
            .arg("-o")
            .arg(&unsigned)
            .arg("-I")
            .arg(platform_jar)
            .arg("--manifest")
            .arg(scaffold.manifest_path())
            .arg("-A")
            .arg(scaffold.assets_dir())
            .arg("--min-sdk-version")
            .arg(config.min_sdk.to_string())
            .arg("--target-sdk-version")
            .arg(config.target_sdk.to_string())
            .arg("--version-code")
            .arg(config.version_code.to_string())
            .arg("--version-name")
            .arg(&config.version_name)
            .arg(compiled);

        info!("Linking resources against {}", platform_jar.display());
        run_checked(self.runner, &cmd, config.tool_timeout)?;
        Ok(unsigned)
    }
}
