//! Run settings: release endpoints, generator lookup, platform CLI and
//! pull-request/issue text templates.
//!
//! Settings come from an optional TOML file (`--config`, `KB_UPDATE_CONFIG` or
//! `~/.kb-update/config.toml`) with environment variables layered on top.

mod settings;

pub use settings::{
    GeneratorSettings, GithubSettings, ReleaseSettings, TemplateSettings, UpdateSettings,
};
