//! Rendering of pull-request, issue and commit text.
//!
//! Templates see exactly three variables: `from_version`, `to_version` and
//! `branch_name`. Rendering goes through Tera and is strict: a reference to
//! any other variable, or malformed syntax, is a
//! [`UpdateError::TemplateError`] rather than silently empty output.
//!
//! Go-style placeholders (`{{.FromVersion}}`, `{{ .ToVersion }}`,
//! `{{.BranchName}}`) are accepted as aliases so existing
//! `KUBEBUILDER_UPDATE_*` values keep working.

use serde::Serialize;
use tera::{Context as TeraContext, Tera};

use crate::config::TemplateSettings;
use crate::core::UpdateError;

pub const DEFAULT_PR_TITLE: &str =
    "chore: update kubebuilder scaffold from {{ from_version }} to {{ to_version }}";

pub const DEFAULT_PR_BODY: &str = "\
This pull request updates the project scaffold from kubebuilder {{ from_version }} \
to {{ to_version }} using a three-way merge.

The changes were squashed onto `{{ branch_name }}`. Review any conflict markers \
before merging.";

pub const DEFAULT_ISSUE_TITLE: &str =
    "Scaffold update from {{ from_version }} to {{ to_version }}";

pub const DEFAULT_ISSUE_BODY: &str = "\
An automated scaffold update from kubebuilder {{ from_version }} to {{ to_version }} \
is available on branch `{{ branch_name }}`.

Manual PR needed: open a pull request from `{{ branch_name }}` and resolve any \
conflict markers.";

pub const DEFAULT_SQUASH_MESSAGE: &str = "[kubebuilder-automated-update]: update scaffold from \
{{ from_version }} to {{ to_version }}; (squashed 3-way merge)";

/// Values available to every template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateData {
    pub from_version: String,
    pub to_version: String,
    pub branch_name: String,
}

/// A rendered title/body pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedText {
    pub title: String,
    pub body: String,
}

/// Renders `template` against `data`.
///
/// `name` only appears in error messages.
pub fn render(name: &str, template: &str, data: &TemplateData) -> Result<String, UpdateError> {
    let context = TeraContext::from_serialize(data).map_err(|e| template_error(name, &e))?;
    let source = translate_go_placeholders(template);

    Tera::one_off(&source, &context, false).map_err(|e| template_error(name, &e))
}

/// Title and body for the pull request, honoring configured overrides.
pub fn render_pull_request(
    templates: &TemplateSettings,
    data: &TemplateData,
) -> Result<RenderedText, UpdateError> {
    Ok(RenderedText {
        title: render(
            "pull request title",
            templates.pr_title.as_deref().unwrap_or(DEFAULT_PR_TITLE),
            data,
        )?,
        body: render(
            "pull request body",
            templates.pr_body.as_deref().unwrap_or(DEFAULT_PR_BODY),
            data,
        )?,
    })
}

pub fn render_issue(
    templates: &TemplateSettings,
    data: &TemplateData,
) -> Result<RenderedText, UpdateError> {
    Ok(RenderedText {
        title: render(
            "issue title",
            templates.issue_title.as_deref().unwrap_or(DEFAULT_ISSUE_TITLE),
            data,
        )?,
        body: render(
            "issue body",
            templates.issue_body.as_deref().unwrap_or(DEFAULT_ISSUE_BODY),
            data,
        )?,
    })
}

/// Rewrites `{{.FromVersion}}`-style expressions into Tera variable names.
///
/// Only whole `{{ .Name }}` expressions naming one of the three known fields
/// are rewritten; everything else is passed through for Tera to judge.
fn translate_go_placeholders(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let expr = after_open[..end].trim();
        let replacement = match expr {
            ".FromVersion" => Some("from_version"),
            ".ToVersion" => Some("to_version"),
            ".BranchName" => Some("branch_name"),
            _ => None,
        };

        match replacement {
            Some(var) => {
                out.push_str("{{ ");
                out.push_str(var);
                out.push_str(" }}");
            }
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after_open[end + 2..];
    }

    out.push_str(rest);
    out
}

fn template_error(name: &str, error: &tera::Error) -> UpdateError {
    let mut reason = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        source = cause.source();
    }

    UpdateError::TemplateError {
        name: name.to_string(),
        reason,
    }
}
