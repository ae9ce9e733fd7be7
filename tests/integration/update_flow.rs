use kb_update::core::UpdateError;
use kb_update::git::CommitOutcome;
use kb_update::update::{UpdateOptions, UpdateStage};

use crate::support::{Fixture, options};

#[tokio::test]
async fn test_user_markers_survive_update() {
    let fx = Fixture::new("v4.5.2");
    fx.add_user_markers();

    let report = fx.update(options("v4.5.2", "v4.6.0"), "1").await.unwrap();

    assert_eq!(report.stage, UpdateStage::Merged);
    assert!(report.merge.clean);
    assert_eq!(fx.git.current_branch().unwrap(), report.plan.merge);

    let merge = &report.plan.merge;
    let types = fx.git.show_file(merge, "api/v1alpha1/memcached_types.go").unwrap();
    assert!(types.contains("user-marker: size-field"));
    assert!(types.contains("// Scaffolded by kubebuilder v4.6.0"));

    let controller = fx.git.show_file(merge, "internal/controller/memcached_controller.go").unwrap();
    assert!(controller.contains("user-marker: log-line"));
    assert!(controller.contains("// Scaffolded by kubebuilder v4.6.0"));

    assert!(fx.git.show_file(merge, "cmd/main.go").unwrap().starts_with("// Code generated by kubebuilder v4.6.0."));
    assert!(fx.git.show_file(merge, "Dockerfile").unwrap().contains("FROM golang:1.24 AS builder"));
    assert!(fx.git.show_file(merge, "PROJECT").unwrap().contains("cliVersion: 4.6.0"));

    assert_eq!(fx.git.log_messages(merge).unwrap()[0], "Merge from v4.5.2 to v4.6.0.");
    assert_eq!(fx.git.status_porcelain().unwrap(), "");
}

#[tokio::test]
async fn test_branch_contents() {
    let fx = Fixture::new("v4.5.2");
    fx.add_user_markers();

    let report = fx.update(options("v4.5.2", "v4.6.0"), "1").await.unwrap();
    let plan = &report.plan;

    for branch in plan.ephemeral() {
        assert!(fx.git.branch_exists(branch), "{branch} should exist");
    }

    // ancestor: clean source scaffold, no user edits
    let ancestor_types = fx.git.show_file(&plan.ancestor, "api/v1alpha1/memcached_types.go").unwrap();
    assert!(!ancestor_types.contains("user-marker"));
    assert!(ancestor_types.contains("v4.5.2"));
    assert!(fx.git.file_exists_at(&plan.ancestor, "PROJECT"));
    assert_eq!(
        fx.git.log_messages(&plan.ancestor).unwrap()[1],
        "Clean scaffolding from release version: v4.5.2"
    );

    // original: user code
    assert!(
        fx.git
            .show_file(&plan.original, "api/v1alpha1/memcached_types.go")
            .unwrap()
            .contains("user-marker: size-field")
    );
    assert_eq!(fx.git.tree_id(&plan.original).unwrap(), fx.git.tree_id("main").unwrap());

    // upgrade: clean target scaffold
    let upgrade_types = fx.git.show_file(&plan.upgrade, "api/v1alpha1/memcached_types.go").unwrap();
    assert!(!upgrade_types.contains("user-marker"));
    assert!(upgrade_types.contains("v4.6.0"));
}

#[tokio::test]
async fn test_unmodified_project_merges_cleanly() {
    let fx = Fixture::new("v4.5.2");

    let report = fx.update(options("v4.5.2", "v4.6.0"), "1").await.unwrap();

    assert!(report.merge.clean);
    assert!(report.merge.conflicted_paths.is_empty());
    assert_eq!(fx.git.log_messages(&report.plan.merge).unwrap()[0], "Merge from v4.5.2 to v4.6.0.");
    assert_eq!(
        fx.git.tree_id(&report.plan.merge).unwrap(),
        fx.git.tree_id(&report.plan.upgrade).unwrap()
    );
}

#[tokio::test]
async fn test_same_version_scaffolds_are_identical() {
    let fx = Fixture::new("v4.5.2");
    fx.add_user_markers();

    let report = fx.update(options("v4.5.2", "v4.5.2"), "1").await.unwrap();
    let plan = &report.plan;

    assert_eq!(fx.git.tree_id(&plan.ancestor).unwrap(), fx.git.tree_id(&plan.upgrade).unwrap());
    assert_eq!(report.merge_commit, Some(CommitOutcome::NothingToCommit));
    assert_eq!(fx.git.tree_id(&plan.merge).unwrap(), fx.git.tree_id("main").unwrap());
}

#[tokio::test]
async fn test_conflict_stops_without_commit() {
    let fx = Fixture::new("v4.5.2");
    fx.edit_dockerfile_base_image();

    let report = fx.update(options("v4.5.2", "v4.6.0"), "1").await.unwrap();

    assert_eq!(report.stage, UpdateStage::Conflicted);
    assert_eq!(report.merge.conflicted_paths, vec!["Dockerfile".to_string()]);
    assert!(report.merge_commit.is_none());
    assert!(report.needs_manual_resolution());

    assert_eq!(fx.git.current_branch().unwrap(), report.plan.merge);
    let dockerfile = fx.git.read_file("Dockerfile").unwrap();
    assert!(dockerfile.contains("<<<<<<< "));
    assert!(dockerfile.contains("golang:1.23-alpine"));
    assert!(dockerfile.contains("golang:1.24"));
    assert!(!fx.git.status_porcelain().unwrap().is_empty());
    assert_eq!(fx.git.log_messages(&report.plan.merge).unwrap()[0], "Add code from main into ".to_string() + &report.plan.original);
}

#[tokio::test]
async fn test_forced_conflict_is_committed_with_markers() {
    let fx = Fixture::new("v4.5.2");
    fx.edit_dockerfile_base_image();
    let mut opts = options("v4.5.2", "v4.6.0");
    opts.force = true;

    let report = fx.update(opts, "1").await.unwrap();

    assert_eq!(report.stage, UpdateStage::Conflicted);
    assert_eq!(report.merge_commit, Some(CommitOutcome::Committed));
    assert_eq!(fx.git.status_porcelain().unwrap(), "");

    let message = &fx.git.log_messages(&report.plan.merge).unwrap()[0];
    assert!(message.contains("v4.5.2") && message.contains("v4.6.0"));
    assert!(fx.git.show_file(&report.plan.merge, "Dockerfile").unwrap().contains("<<<<<<< "));
}

#[tokio::test]
async fn test_source_version_defaults_to_project() {
    let fx = Fixture::new("v4.5.2");

    let request = fx.request(UpdateOptions::default()).await.unwrap();

    assert_eq!(request.source_version.to_string(), "v4.5.2");
    assert_eq!(request.target_version.to_string(), "v4.6.0");
    assert_eq!(request.base_branch, "main");
}

#[tokio::test]
async fn test_preflight_rejects_dirty_tree_without_creating_branches() {
    let fx = Fixture::new("v4.5.2");
    fx.git.write_file("scratch.txt", "wip").unwrap();

    let err = fx.update(options("v4.5.2", "v4.6.0"), "1").await.unwrap_err();

    assert!(matches!(err.downcast_ref::<UpdateError>(), Some(UpdateError::DirtyWorkingTree { .. })));
    assert_eq!(fx.git.branches().unwrap(), vec!["main".to_string()]);
}

#[tokio::test]
async fn test_preflight_rejects_unknown_base_branch() {
    let fx = Fixture::new("v4.5.2");
    let mut opts = options("v4.5.2", "v4.6.0");
    opts.from_branch = Some("does-not-exist".to_string());

    let err = fx.update(opts, "1").await.unwrap_err();

    assert!(matches!(err.downcast_ref::<UpdateError>(), Some(UpdateError::BranchNotFound { .. })));
    assert_eq!(fx.git.branches().unwrap(), vec!["main".to_string()]);
}

#[tokio::test]
async fn test_rerun_with_same_stamp_is_refused() {
    let fx = Fixture::new("v4.5.2");
    let report = fx.update(options("v4.5.2", "v4.6.0"), "1").await.unwrap();
    fx.git.checkout("main").unwrap();

    let err = fx.update(options("v4.5.2", "v4.6.0"), "1").await.unwrap_err();
    assert!(matches!(err.downcast_ref::<UpdateError>(), Some(UpdateError::BranchAlreadyExists { .. })));

    let second = fx.update(options("v4.5.2", "v4.6.0"), "2").await.unwrap();
    assert_ne!(second.plan.merge, report.plan.merge);
}

#[tokio::test]
async fn test_generator_failure_names_the_stage() {
    let fx = Fixture::new("v4.5.2");
    let request = fx.request(options("v4.5.2", "v4.6.0")).await.unwrap();
    let plan = Fixture::plan(&request, "1");
    let ancestor = plan.ancestor.clone();
    let broken = kb_update::generator::GeneratorBinary::new(fx.bin.path().join("missing"), "missing");
    let target = fx.generator("v4.6.0");

    let mut updater = kb_update::update::Updater::new(fx.vcs(), request, plan);
    let err = updater.run(&broken, &target).await.unwrap_err();

    assert!(format!("{err:#}").starts_with(&format!("failed to prepare ancestor branch {ancestor}")));
    assert_eq!(updater.stage(), UpdateStage::BinaryReady);
    assert!(fx.git.branch_exists(&ancestor));
}
