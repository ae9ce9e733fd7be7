//! Recording doubles for the update engine's seams.
//!
//! [`MockVcs`] logs every mutating operation in git-command syntax
//! (`checkout -b <name> <base>`, `commit --no-verify -m <msg>`, ...) so tests
//! can assert on the exact sequence. [`MockGenerator`] shares the same log,
//! which keeps generator runs ordered relative to git operations.

use anyhow::Result;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::UpdateError;
use crate::generator::ScaffoldGenerator;
use crate::git::{CommitOutcome, HookPolicy, MergeStatus, VcsDriver};

type CallLog = Arc<Mutex<Vec<String>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[derive(Debug)]
struct MockState {
    is_repository: bool,
    clean: bool,
    current_branch: String,
    branches: HashSet<String>,
    merge_status: MergeStatus,
    conflicted: Vec<String>,
    markers: bool,
    commit_outcomes: VecDeque<CommitOutcome>,
    fail_on: Vec<String>,
    last_message: String,
}

/// In-memory [`VcsDriver`] that records instead of executing.
#[derive(Debug)]
pub struct MockVcs {
    root: PathBuf,
    log: CallLog,
    state: Mutex<MockState>,
}

impl MockVcs {
    /// A clean repository on `main`, where only `main` exists.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            log: Arc::default(),
            state: Mutex::new(MockState {
                is_repository: true,
                clean: true,
                current_branch: "main".to_string(),
                branches: HashSet::from(["main".to_string()]),
                merge_status: MergeStatus::Clean,
                conflicted: Vec::new(),
                markers: false,
                commit_outcomes: VecDeque::new(),
                fail_on: Vec::new(),
                last_message: String::new(),
            }),
        }
    }

    #[must_use]
    pub fn not_a_repository(self) -> Self {
        lock(&self.state).is_repository = false;
        self
    }

    #[must_use]
    pub fn dirty(self) -> Self {
        lock(&self.state).clean = false;
        self
    }

    #[must_use]
    pub fn on_branch(self, branch: &str) -> Self {
        {
            let mut state = lock(&self.state);
            state.current_branch = branch.to_string();
            state.branches.insert(branch.to_string());
        }
        self
    }

    #[must_use]
    pub fn with_branch(self, branch: &str) -> Self {
        lock(&self.state).branches.insert(branch.to_string());
        self
    }

    /// Makes the merge report conflicts in `paths`.
    #[must_use]
    pub fn with_conflicts(self, paths: &[&str]) -> Self {
        {
            let mut state = lock(&self.state);
            state.merge_status = MergeStatus::Conflicted;
            state.conflicted = paths.iter().map(ToString::to_string).collect();
            state.markers = true;
        }
        self
    }

    /// Outcomes returned by successive commits; `Committed` once exhausted.
    #[must_use]
    pub fn with_commit_outcomes(self, outcomes: &[CommitOutcome]) -> Self {
        lock(&self.state).commit_outcomes = outcomes.iter().copied().collect();
        self
    }

    /// Fails every recorded operation whose command starts with `prefix`.
    #[must_use]
    pub fn fail_on(self, prefix: &str) -> Self {
        lock(&self.state).fail_on.push(prefix.to_string());
        self
    }

    /// Shared handle to the call log, for [`MockGenerator`].
    pub fn log_handle(&self) -> CallLog {
        Arc::clone(&self.log)
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.log).clone()
    }

    /// Index of the first call starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.calls().iter().position(|c| c.starts_with(prefix))
    }

    pub fn current(&self) -> String {
        lock(&self.state).current_branch.clone()
    }

    pub fn has_branch(&self, name: &str) -> bool {
        lock(&self.state).branches.contains(name)
    }

    fn record(&self, command: String) -> Result<()> {
        let failing = lock(&self.state).fail_on.iter().any(|p| command.starts_with(p.as_str()));
        lock(&self.log).push(command.clone());

        if failing {
            return Err(UpdateError::GitCommandError {
                operation: command,
                exit_code: Some(128),
                stdout: String::new(),
                stderr: "fatal: mock failure".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn add_branch(&self, name: &str, checkout: bool) {
        let mut state = lock(&self.state);
        state.branches.insert(name.to_string());
        if checkout {
            state.current_branch = name.to_string();
        }
    }
}

impl VcsDriver for MockVcs {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn is_repository(&self) -> Result<bool> {
        Ok(lock(&self.state).is_repository)
    }

    async fn create_and_checkout_branch(&self, name: &str) -> Result<()> {
        self.record(format!("checkout -b {name}"))?;
        self.add_branch(name, true);
        Ok(())
    }

    async fn create_branch_from(&self, name: &str, base: &str) -> Result<()> {
        self.record(format!("checkout -b {name} {base}"))?;
        self.add_branch(name, true);
        Ok(())
    }

    async fn force_branch_from(&self, name: &str, base: &str) -> Result<()> {
        self.record(format!("checkout -B {name} {base}"))?;
        self.add_branch(name, true);
        Ok(())
    }

    async fn checkout(&self, branch: &str) -> Result<()> {
        self.record(format!("checkout {branch}"))?;
        lock(&self.state).current_branch = branch.to_string();
        Ok(())
    }

    async fn checkout_path_from(&self, branch: &str, path: &str) -> Result<()> {
        self.record(format!("checkout {branch} -- {path}"))
    }

    async fn clear_worktree(&self, keep: &[&str]) -> Result<()> {
        self.record(format!("clear worktree keeping {}", keep.join(",")))
    }

    async fn stage_all(&self) -> Result<()> {
        self.record("add --all".to_string())
    }

    async fn commit(&self, message: &str, hooks: HookPolicy) -> Result<CommitOutcome> {
        let flag = if hooks == HookPolicy::Skip { " --no-verify" } else { "" };
        self.record(format!("commit{flag} -m {message}"))?;

        let mut state = lock(&self.state);
        let outcome = state.commit_outcomes.pop_front().unwrap_or(CommitOutcome::Committed);
        if outcome == CommitOutcome::Committed {
            state.last_message = message.to_string();
        }
        Ok(outcome)
    }

    async fn merge_no_commit(&self, branch: &str) -> Result<MergeStatus> {
        self.record(format!("merge --no-edit --no-commit --no-ff {branch}"))?;
        Ok(lock(&self.state).merge_status)
    }

    async fn restore_path(&self, from_branch: &str, path: &str) -> Result<()> {
        self.record(format!("restore --source {from_branch} --staged --worktree -- {path}"))
    }

    async fn current_branch(&self) -> Result<String> {
        Ok(self.current())
    }

    async fn branch_exists(&self, name: &str) -> Result<bool> {
        Ok(self.has_branch(name))
    }

    async fn working_tree_is_clean(&self) -> Result<bool> {
        Ok(lock(&self.state).clean)
    }

    async fn conflicted_paths(&self) -> Result<Vec<String>> {
        Ok(lock(&self.state).conflicted.clone())
    }

    async fn has_conflict_markers(&self) -> Result<bool> {
        Ok(lock(&self.state).markers)
    }

    async fn last_commit_message(&self) -> Result<String> {
        Ok(lock(&self.state).last_message.clone())
    }

    async fn push_branch(&self, remote: &str, branch: &str) -> Result<()> {
        self.record(format!("push --force-with-lease -u {remote} {branch}"))
    }
}

/// [`ScaffoldGenerator`] that only records `generate <label>`.
#[derive(Debug, Clone)]
pub struct MockGenerator {
    label: String,
    log: CallLog,
    fail: bool,
}

impl MockGenerator {
    /// Records into `log`, usually [`MockVcs::log_handle`].
    pub fn new(label: impl Into<String>, log: CallLog) -> Self {
        Self {
            label: label.into(),
            log,
            fail: false,
        }
    }

    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl ScaffoldGenerator for MockGenerator {
    fn describe(&self) -> String {
        self.label.clone()
    }

    async fn generate(&self, _repo_root: &Path) -> Result<()> {
        lock(&self.log).push(format!("generate {}", self.label));
        if self.fail {
            return Err(UpdateError::GeneratorFailed {
                binary: self.label.clone(),
                exit_code: Some(1),
                stderr: "mock generator failure".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
