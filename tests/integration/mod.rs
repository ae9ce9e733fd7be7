//! Integration test suite for kb-update
//!
//! End-to-end tests against real git repositories. Scaffolding is produced by
//! a fake `kubebuilder` shell script (see `kb_update::test_utils::scaffold`)
//! and release downloads are served by a local mock server, so nothing here
//! touches the network.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! - **support**: shared fixture (scaffolded repo, fake generators, offline release index)
//! - **update_flow**: ancestor/original/upgrade/merge behavior and conflicts
//! - **squash**: output branch, preserve paths, re-runs
//! - **release**: download, latest lookup and checksum verification over HTTP
//! - **cli**: the `kb-update` binary

#[cfg(unix)]
mod support;

mod cli;
mod release;
#[cfg(unix)]
mod squash;
#[cfg(unix)]
mod update_flow;
