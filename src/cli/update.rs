//! The `update` command.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::cli::CliConfig;
use crate::config::UpdateSettings;
use crate::generator::GeneratorBinary;
use crate::git::{GitCli, VcsDriver, ensure_git_available};
use crate::github::{GhCli, PublishOutcome};
use crate::release::{DownloadedBinary, ReleaseClient};
use crate::update::{
    BranchPlan, UpdateOptions, UpdateReport, UpdateRequest, Updater, prepare, run_stamp,
};
use crate::version::ReleaseVersion;

/// Update the project scaffold with a three-way merge.
///
/// Creates four temporary branches (ancestor, original, upgrade, merge) and
/// leaves the merged result on the merge branch. With `--squash` the result
/// is collapsed into one commit on `kubebuilder-alpha-update-to-<version>`.
///
/// ```bash
/// kb-update update
/// kb-update update --from-version v4.5.2 --to-version v4.6.0 --force
/// kb-update update --squash --preserve-path .github/workflows --open-pr --push
/// ```
#[derive(Args, Debug, Default)]
pub struct UpdateCommand {
    /// Version the project was scaffolded with (default: PROJECT cliVersion)
    #[arg(long, value_name = "VERSION")]
    pub from_version: Option<String>,

    /// Version to update to (default: latest release)
    #[arg(long, value_name = "VERSION")]
    pub to_version: Option<String>,

    /// Branch holding your code (default: current branch)
    #[arg(long, value_name = "BRANCH")]
    pub from_branch: Option<String>,

    /// Commit the merge even if it has conflicts
    #[arg(long)]
    pub force: bool,

    /// Squash the result into one commit on a stable output branch
    #[arg(long)]
    pub squash: bool,

    /// Path to keep as on the base branch after squashing (repeatable)
    #[arg(long = "preserve-path", value_name = "PATH", requires = "squash")]
    pub preserve_paths: Vec<String>,

    /// Name of the squashed branch
    #[arg(long, value_name = "BRANCH", requires = "squash")]
    pub output_branch: Option<String>,

    /// Message for the squashed commit
    #[arg(long, value_name = "MESSAGE", requires = "squash")]
    pub commit_message: Option<String>,

    /// Open a pull request for the pushed squashed branch with gh
    #[arg(long, requires = "squash", requires = "push")]
    pub open_pr: bool,

    /// Open an issue (alone, or as fallback when the pull request fails)
    #[arg(long, requires = "squash")]
    pub open_issue: bool,

    /// Push the squashed branch to origin
    #[arg(long, requires = "squash")]
    pub push: bool,

    /// Remove downloaded release binaries when done
    #[arg(long)]
    pub cleanup: bool,

    /// Repository to update (default: current directory)
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

impl UpdateCommand {
    pub(crate) fn options(&self) -> UpdateOptions {
        UpdateOptions {
            from_version: self.from_version.clone(),
            to_version: self.to_version.clone(),
            from_branch: self.from_branch.clone(),
            force: self.force,
            squash: self.squash,
            preserve_paths: self.preserve_paths.clone(),
            output_branch: self.output_branch.clone(),
            commit_message: self.commit_message.clone(),
            open_pr: self.open_pr,
            open_issue: self.open_issue,
            push: self.push,
        }
    }

    pub(crate) fn explicit_target(&self) -> bool {
        self.to_version.as_deref().is_some_and(|v| !v.trim().is_empty())
    }

    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let settings = UpdateSettings::load(config.config_path.as_deref()).await?;
        ensure_git_available().await?;

        let root = match &self.directory {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("failed to determine current directory")?,
        };
        let vcs = GitCli::new(&root);
        let releases = ReleaseClient::new(settings.release.clone())?;

        let request = prepare(self.options(), &vcs, &releases).await?;
        let plan = BranchPlan::new(
            &request.source_version,
            &request.target_version,
            request.output_branch_override.as_deref(),
            &run_stamp(&Local::now()),
        );

        let mut downloads = Vec::new();
        let result = self
            .run(config, &settings, &releases, vcs, request, plan, &mut downloads)
            .await;

        if self.cleanup {
            for download in &downloads {
                download.cleanup().await;
            }
        } else {
            for download in &downloads {
                println!(
                    "Downloaded {} kept at {}",
                    download.version,
                    download.dir.display().to_string().dimmed()
                );
            }
        }

        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn run(
        &self,
        config: &CliConfig,
        settings: &UpdateSettings,
        releases: &ReleaseClient,
        vcs: GitCli,
        request: UpdateRequest,
        plan: BranchPlan,
        downloads: &mut Vec<DownloadedBinary>,
    ) -> Result<()> {
        let show_progress = config.show_progress();

        let source_binary = releases
            .download(&request.source_version, show_progress)
            .await
            .with_context(|| format!("failed to download kubebuilder {}", request.source_version))?;
        let source = GeneratorBinary::from_download(&source_binary).configured(&settings.generator);
        downloads.push(source_binary);

        let target = match self.local_target(settings, &request.target_version).await? {
            Some(local) => local,
            None => {
                let binary = releases
                    .download(&request.target_version, show_progress)
                    .await
                    .with_context(|| {
                        format!("failed to download kubebuilder {}", request.target_version)
                    })?;
                let generator = GeneratorBinary::from_download(&binary);
                downloads.push(binary);
                generator
            }
        }
        .configured(&settings.generator);

        let gh = GhCli::new(settings.github.command.clone(), vcs.root());
        let mut updater = Updater::new(vcs, request, plan);
        let report = updater.run(&source, &target).await?;
        let published = updater.publish(&gh, &settings.templates).await?;

        print_summary(updater.request(), &report, published.as_ref());
        Ok(())
    }

    /// The target generator when a local one should be used.
    ///
    /// A generator on `PATH` is only considered when the target was not
    /// pinned with `--to-version`; a configured `generator.path` always is.
    /// Either way the local binary must report exactly `target` through
    /// `version`, otherwise the target release is downloaded so the upgrade
    /// branch is generated by the release it is labeled with.
    pub(crate) async fn local_target(
        &self,
        settings: &UpdateSettings,
        target: &ReleaseVersion,
    ) -> Result<Option<GeneratorBinary>> {
        if settings.generator.path.is_none() && self.explicit_target() {
            debug!("Target version pinned; downloading its generator");
            return Ok(None);
        }

        let Some(local) = GeneratorBinary::locate_local(&settings.generator)? else {
            warn!("No local kubebuilder found; downloading the target release");
            return Ok(None);
        };

        match local.reported_version().await {
            Ok(Some(version)) if version == *target => {
                info!("Using local generator {} ({})", local.path().display(), version);
                Ok(Some(local))
            }
            Ok(Some(version)) => {
                warn!(
                    "Local generator {} is {}, not {}; downloading the target release",
                    local.path().display(),
                    version,
                    target
                );
                Ok(None)
            }
            Ok(None) => {
                warn!(
                    "Could not determine the version of {}; downloading the target release",
                    local.path().display()
                );
                Ok(None)
            }
            Err(e) => {
                warn!("Could not run {}: {:#}; downloading the target release", local.path().display(), e);
                Ok(None)
            }
        }
    }
}

fn print_summary(request: &UpdateRequest, report: &UpdateReport, published: Option<&PublishOutcome>) {
    let plan = &report.plan;
    println!();
    println!(
        "{} {} -> {}",
        "Scaffold update".bold(),
        request.source_version.to_string().cyan(),
        request.target_version.to_string().cyan()
    );
    println!("  ancestor: {}", plan.ancestor);
    println!("  original: {}", plan.original);
    println!("  upgrade:  {}", plan.upgrade);
    println!("  merge:    {}", plan.merge);

    if report.merge.clean {
        println!("{}", "Merge completed without conflicts".green());
    } else {
        println!(
            "{}",
            format!("Merge has conflicts in {} file(s):", report.merge.conflicted_paths.len())
                .yellow()
        );
        for path in &report.merge.conflicted_paths {
            println!("  {}", path.yellow());
        }
    }

    if report.needs_manual_resolution() {
        println!(
            "Resolve the conflicts on {} and commit, or re-run with {}",
            plan.merge.bold(),
            "--force".bold()
        );
        return;
    }

    if let Some(squash) = &report.squash {
        println!("Squashed result on {}", squash.branch.green().bold());
        for path in &squash.restored_paths {
            println!("  kept {} from {}", path, request.base_branch);
        }
        if report.pushed {
            println!("Pushed {} to origin", squash.branch);
        }
    } else {
        println!("Result on {}", report.result_branch().green().bold());
    }

    match published {
        Some(PublishOutcome::PullRequest {
            url,
        }) => println!("Opened pull request {}", url.green()),
        Some(PublishOutcome::Issue {
            url,
        }) => println!("Opened issue {}", url.green()),
        Some(PublishOutcome::IssueFallback {
            url,
            pr_error,
        }) => {
            println!("{}", format!("Pull request failed: {pr_error}").yellow());
            println!("Opened issue {} instead", url.green());
        }
        None => {}
    }
}
