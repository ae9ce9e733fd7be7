//! Command-line interface for kb-update.
//!
//! The binary exposes one command today, `update`, which runs the three-way
//! scaffold update in the current repository:
//!
//! ```bash
//! # Update from the PROJECT cliVersion to the latest release
//! kb-update update
//!
//! # Pin both ends and squash onto a reviewable branch
//! kb-update update --from-version v4.5.2 --to-version v4.6.0 --squash
//!
//! # Keep CI files untouched and open a pull request
//! kb-update update --squash --preserve-path .github/workflows --open-pr
//! ```
//!
//! # Global Options
//!
//! - `--verbose` / `--quiet` - log level (`debug` / errors only)
//! - `--config` - settings file instead of `~/.kb-update/config.toml`
//! - `--no-progress` - disable download progress bars

mod update;


use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::utils::init_logging;

pub use update::UpdateCommand;

/// Runtime configuration shared by all commands.
///
/// Built once from the global flags and passed down, so commands never read
/// or mutate process-wide state for these settings.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Default log level when `RUST_LOG` is unset; `None` means errors only.
    pub log_level: Option<String>,
    pub no_progress: bool,
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether progress bars may be drawn.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        !self.no_progress && self.log_level.is_some()
    }
}

#[derive(Parser)]
#[command(
    name = "kb-update",
    about = "Carry hand-written code forward across kubebuilder scaffold versions",
    version,
    long_about = "kb-update regenerates clean kubebuilder scaffolding at the project's \
                  current and target versions and three-way merges your changes into \
                  the new scaffold."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the settings file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Update the project scaffold to a newer kubebuilder release.
    ///
    /// See [`UpdateCommand`] for options.
    Update(UpdateCommand),
}

impl Cli {
    /// Initializes logging and runs the selected command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        init_logging(config.log_level.as_deref().unwrap_or("error"));
        self.execute_with_config(config).await
    }

    /// Translates the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("info".to_string())
        };

        CliConfig {
            log_level,
            no_progress: self.no_progress,
            config_path: self.config.clone(),
        }
    }

    /// Runs the command with an explicit configuration.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Update(cmd) => cmd.execute(&config).await,
        }
    }
}
