//! kb-update - three-way scaffold updates for kubebuilder projects
//!
//! Projects generated by a scaffolding tool drift from newer releases of that
//! tool once users start editing. kb-update carries those edits forward by
//! regenerating clean scaffolding at both ends and letting git do a real
//! three-way merge:
//!
//! 1. **ancestor** - the project's `PROJECT` file scaffolded by the release it
//!    was created with
//! 2. **original** - ancestor plus every file of the user's branch
//! 3. **upgrade** - ancestor re-scaffolded by the target release
//! 4. **merge** - upgrade merged into original
//!
//! Optionally the merge result is squashed onto a stable
//! `kubebuilder-alpha-update-to-<version>` branch, pushed, and turned into a
//! pull request or issue through the `gh` CLI.
//!
//! # Modules
//!
//! ## Engine
//! - [`update`] - request validation, branch plan, stage machine, builders,
//!   merge and squash
//! - [`git`] - the [`git::VcsDriver`] seam and its system-git implementation
//! - [`generator`] - running `kubebuilder alpha generate`
//!
//! ## Inputs
//! - [`project`] - the `PROJECT` descriptor
//! - [`version`] - release version parsing and ordering
//! - [`release`] - release download, latest lookup and checksum verification
//! - [`config`] - settings file and environment overrides
//!
//! ## Outputs
//! - [`templating`] - commit, pull request and issue text
//! - [`github`] - pull request and issue creation
//!
//! ## Supporting
//! - [`cli`] - command-line interface
//! - [`core`] - error types and user-facing error reporting
//! - [`constants`] - names, URLs and defaults
//! - [`utils`] - platform detection, filesystem helpers, logging
//!
//! # Example
//!
//! ```rust,ignore
//! use kb_update::git::GitCli;
//! use kb_update::release::ReleaseClient;
//! use kb_update::update::{BranchPlan, UpdateOptions, Updater, prepare, run_stamp};
//!
//! let vcs = GitCli::new(".");
//! let releases = ReleaseClient::new(Default::default())?;
//! let request = prepare(UpdateOptions::default(), &vcs, &releases).await?;
//! let plan = BranchPlan::new(
//!     &request.source_version,
//!     &request.target_version,
//!     None,
//!     &run_stamp(&chrono::Local::now()),
//! );
//! let report = Updater::new(vcs, request, plan).run(&source, &target).await?;
//! println!("result on {}", report.result_branch());
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod generator;
pub mod git;
pub mod github;
pub mod project;
pub mod release;
pub mod templating;
pub mod update;
pub mod utils;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
