//! A stand-in for `kubebuilder alpha generate`.
//!
//! The fake generator is a shell script that writes a small, deterministic
//! operator scaffold whose content depends on the release it pretends to be:
//!
//! - `cmd/main.go` names the release in its header
//! - `api/v1alpha1/memcached_types.go` and
//!   `internal/controller/memcached_controller.go` carry a release footer far
//!   from the places users usually edit
//! - `Dockerfile` pins a Go image that changes between 4.5 and 4.6
//! - `PROJECT` gets its `cliVersion` rewritten
//!
//! `version` prints the release the way the real tool does. Otherwise it
//! exits 3 unless invoked as `alpha generate` and 2 when `PROJECT` is
//! missing, like the real tool refusing to run outside a project.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{TestGit, write_script};

fn bare(version: &str) -> &str {
    version.trim().trim_start_matches('v')
}

fn go_image(version: &str) -> &'static str {
    if bare(version).starts_with("4.5") { "golang:1.23" } else { "golang:1.24" }
}

/// Files the fake generator writes for `version`, as (path, content).
pub fn scaffold_files(version: &str) -> Vec<(&'static str, String)> {
    let ver = bare(version);
    vec![
        (
            "cmd/main.go",
            format!(
                "// Code generated by kubebuilder v{ver}.\npackage main\n\n\
                 import \"os\"\n\n\
                 func main() {{\n\
                 \tif err := run(); err != nil {{\n\
                 \t\tos.Exit(1)\n\
                 \t}}\n\
                 }}\n"
            ),
        ),
        (
            "api/v1alpha1/memcached_types.go",
            format!(
                "package v1alpha1\n\n\
                 // MemcachedSpec defines the desired state of Memcached.\n\
                 type MemcachedSpec struct {{\n\
                 \t// INSERT ADDITIONAL SPEC FIELDS - desired state of cluster\n\
                 \t// Important: Run \"make\" to regenerate code after modifying this file\n\
                 \n\
                 \t// Foo is an example field of Memcached.\n\
                 \tFoo string `json:\"foo,omitempty\"`\n\
                 }}\n\n\
                 // MemcachedStatus defines the observed state of Memcached.\n\
                 type MemcachedStatus struct {{\n\
                 }}\n\n\
                 // Scaffolded by kubebuilder v{ver}\n"
            ),
        ),
        (
            "internal/controller/memcached_controller.go",
            format!(
                "package controller\n\n\
                 // Reconcile moves the cluster state towards the desired state.\n\
                 func (r *MemcachedReconciler) Reconcile(ctx context.Context, req ctrl.Request) (ctrl.Result, error) {{\n\
                 \t_ = logf.FromContext(ctx)\n\
                 \n\
                 \t// TODO(user): your logic here\n\
                 \n\
                 \treturn ctrl.Result{{}}, nil\n\
                 }}\n\n\
                 // SetupWithManager sets up the controller with the Manager.\n\
                 func (r *MemcachedReconciler) SetupWithManager(mgr ctrl.Manager) error {{\n\
                 \treturn nil\n\
                 }}\n\n\
                 // Scaffolded by kubebuilder v{ver}\n"
            ),
        ),
        (
            "Dockerfile",
            format!(
                "# Build the manager binary\n\
                 FROM {image} AS builder\n\
                 \n\
                 WORKDIR /workspace\n\
                 COPY . .\n\
                 RUN go build -o manager cmd/main.go\n",
                image = go_image(version)
            ),
        ),
    ]
}

/// `PROJECT` descriptor for a project scaffolded with `version`.
pub fn project_file_content(version: &str) -> String {
    format!(
        "cliVersion: {}\n\
         domain: example.com\n\
         layout:\n\
         - go.kubebuilder.io/v4\n\
         projectName: memcached-operator\n\
         repo: example.com/memcached-operator\n\
         version: \"3\"\n",
        bare(version)
    )
}

/// Shell body (without shebang) of the fake generator for `version`.
pub fn fake_generator_script(version: &str) -> String {
    let mut body = format!(
        "if [ \"$1\" = version ]; then\n\
         \techo 'Version: main.version{{KubeBuilderVersion:\"{}\", KubernetesVendor:\"1.33.0\"}}'\n\
         \texit 0\n\
         fi\n",
        bare(version)
    );
    body.push_str(
        "[ \"$1 $2\" = \"alpha generate\" ] || { echo \"unexpected arguments: $*\" >&2; exit 3; }\n\
         [ -f PROJECT ] || { echo \"PROJECT file not found\" >&2; exit 2; }\n",
    );

    for (path, content) in scaffold_files(version) {
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            body.push_str(&format!("mkdir -p {}\n", parent.display()));
        }
        body.push_str(&format!("cat > {path} <<'KB_EOF'\n{content}KB_EOF\n"));
    }

    body.push_str(&format!(
        "sed 's/^cliVersion:.*/cliVersion: {}/' PROJECT > PROJECT.tmp && mv PROJECT.tmp PROJECT\n",
        bare(version)
    ));
    body.push_str(&format!("echo \"scaffolded with v{}\"\n", bare(version)));
    body
}

/// Writes the fake generator for `version` into `dir`.
pub fn write_fake_generator(dir: &Path, version: &str) -> Result<PathBuf> {
    write_script(dir, &format!("kubebuilder-v{}", bare(version)), &fake_generator_script(version))
}

/// Creates a repository on `main` with one commit holding the `version`
/// scaffold, as if a user had just run `kubebuilder init`.
pub fn init_scaffolded_repo(dir: &Path, version: &str) -> Result<TestGit> {
    let git = TestGit::new(dir);
    git.init()?;
    git.config_user()?;
    git.write_file("PROJECT", &project_file_content(version))?;

    let bin = tempfile::TempDir::new()?;
    let generator = write_fake_generator(bin.path(), version)?;
    let status = Command::new(&generator).args(["alpha", "generate"]).current_dir(dir).output()?;
    anyhow::ensure!(
        status.status.success(),
        "fake generator failed: {}",
        String::from_utf8_lossy(&status.stderr)
    );

    git.commit_all("Initial scaffold")?;
    Ok(git)
}
