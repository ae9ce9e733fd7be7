use kb_update::git::CommitOutcome;
use kb_update::update::squash::squash;
use kb_update::update::{UpdateOptions, UpdateStage};

use crate::support::{Fixture, options};

fn squash_options(from: &str, to: &str) -> UpdateOptions {
    UpdateOptions {
        squash: true,
        from_branch: Some("main".to_string()),
        ..options(from, to)
    }
}

#[tokio::test]
async fn test_squash_to_default_output_branch() {
    let fx = Fixture::new("v4.5.2");
    fx.add_user_markers();

    let report = fx.update(squash_options("v4.5.2", "v4.6.0"), "1").await.unwrap();

    assert_eq!(report.stage, UpdateStage::Squashed);
    let squashed = report.squash.as_ref().unwrap();
    let out = "kubebuilder-alpha-update-to-v4.6.0";
    assert_eq!(squashed.branch, out);
    assert_eq!(squashed.commit, CommitOutcome::Committed);
    assert_eq!(fx.git.current_branch().unwrap(), out);

    assert_eq!(fx.git.count_commits("main", out).unwrap(), 1);
    assert_eq!(fx.git.count_commits(out, "main").unwrap(), 0);
    assert_eq!(
        fx.git.log_messages(out).unwrap()[0],
        "[kubebuilder-automated-update]: update scaffold from v4.5.2 to v4.6.0; (squashed 3-way merge)"
    );
    assert_eq!(fx.git.tree_id(out).unwrap(), fx.git.tree_id(&report.plan.merge).unwrap());
    assert!(
        fx.git
            .show_file(out, "api/v1alpha1/memcached_types.go")
            .unwrap()
            .contains("user-marker: size-field")
    );
    assert_eq!(fx.git.status_porcelain().unwrap(), "");
}

#[tokio::test]
async fn test_squash_preserves_paths_from_base() {
    let fx = Fixture::new("v4.5.2");
    fx.edit_dockerfile_base_image();
    let mut opts = squash_options("v4.5.2", "v4.6.0");
    opts.force = true;
    opts.preserve_paths = vec![" Dockerfile ".to_string(), "  ".to_string()];

    let report = fx.update(opts, "1").await.unwrap();

    let squashed = report.squash.unwrap();
    assert_eq!(squashed.restored_paths, vec!["Dockerfile".to_string()]);
    let out = &squashed.branch;
    assert_eq!(
        fx.git.show_file(out, "Dockerfile").unwrap(),
        fx.git.show_file("main", "Dockerfile").unwrap()
    );
    // the conflicted merge branch still carries markers; the output does not
    assert!(fx.git.show_file(&report.plan.merge, "Dockerfile").unwrap().contains("<<<<<<< "));
    assert!(fx.git.show_file(out, "cmd/main.go").unwrap().contains("kubebuilder v4.6.0"));
}

#[tokio::test]
async fn test_squash_missing_preserve_path_is_skipped() {
    let fx = Fixture::new("v4.5.2");
    let mut opts = squash_options("v4.5.2", "v4.6.0");
    opts.preserve_paths = vec!["does/not/exist".to_string()];

    let report = fx.update(opts, "1").await.unwrap();

    let squashed = report.squash.unwrap();
    assert!(squashed.restored_paths.is_empty());
    assert_eq!(fx.git.count_commits("main", &squashed.branch).unwrap(), 1);
}

#[tokio::test]
async fn test_squash_rerun_resets_output_branch() {
    let fx = Fixture::new("v4.5.2");
    fx.add_user_markers();
    fx.update(squash_options("v4.5.2", "v4.6.0"), "1").await.unwrap();

    let request = fx.request(squash_options("v4.5.2", "v4.6.0")).await.unwrap();
    let plan = Fixture::plan(&request, "1");
    let again = squash(&fx.vcs(), &request, &plan).await.unwrap();

    assert_eq!(again.commit, CommitOutcome::Committed);
    assert_eq!(fx.git.count_commits("main", &plan.output).unwrap(), 1);
    assert_eq!(fx.git.tree_id(&plan.output).unwrap(), fx.git.tree_id(&plan.merge).unwrap());
}

#[tokio::test]
async fn test_squash_with_no_changes() {
    let fx = Fixture::new("v4.5.2");

    let report = fx.update(squash_options("v4.5.2", "v4.5.2"), "1").await.unwrap();

    let squashed = report.squash.unwrap();
    assert_eq!(squashed.commit, CommitOutcome::NothingToCommit);
    assert_eq!(fx.git.count_commits("main", &squashed.branch).unwrap(), 0);
    assert_eq!(report.stage, UpdateStage::Squashed);
}

#[tokio::test]
async fn test_squash_output_and_message_overrides() {
    let fx = Fixture::new("v4.5.2");
    let mut opts = squash_options("v4.5.2", "v4.6.0");
    opts.output_branch = Some("chore/scaffold-4.6".to_string());
    opts.commit_message = Some("chore: bump scaffold to v4.6.0".to_string());

    let report = fx.update(opts, "1").await.unwrap();

    assert_eq!(report.result_branch(), "chore/scaffold-4.6");
    assert!(fx.git.branch_exists("chore/scaffold-4.6"));
    assert!(!fx.git.branch_exists("kubebuilder-alpha-update-to-v4.6.0"));
    assert_eq!(fx.git.log_messages("chore/scaffold-4.6").unwrap()[0], "chore: bump scaffold to v4.6.0");
}

#[tokio::test]
async fn test_unresolved_conflict_is_not_squashed() {
    let fx = Fixture::new("v4.5.2");
    fx.edit_dockerfile_base_image();

    let report = fx.update(squash_options("v4.5.2", "v4.6.0"), "1").await.unwrap();

    assert_eq!(report.stage, UpdateStage::Conflicted);
    assert!(report.squash.is_none());
    assert!(!fx.git.branch_exists("kubebuilder-alpha-update-to-v4.6.0"));
    assert_eq!(fx.git.current_branch().unwrap(), report.plan.merge);
}

#[tokio::test]
async fn test_output_branch_equal_to_base_is_rejected() {
    let fx = Fixture::new("v4.5.2");
    let branches = fx.git.branches().unwrap();
    let main_tree = fx.git.tree_id("main").unwrap();
    let main_log = fx.git.log_messages("main").unwrap();
    let mut opts = squash_options("v4.5.2", "v4.6.0");
    opts.output_branch = Some("main".to_string());

    let err = fx.update(opts, "1").await.unwrap_err();

    assert!(err.to_string().contains("is the base branch"));
    assert_eq!(fx.git.branches().unwrap(), branches);
    assert_eq!(fx.git.tree_id("main").unwrap(), main_tree);
    assert_eq!(fx.git.log_messages("main").unwrap(), main_log);
    assert_eq!(fx.git.current_branch().unwrap(), "main");
}
