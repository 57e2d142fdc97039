//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new()
//!         .with_provider("base", manifests::BASE, &[("README.md", "# {{ name }}\n")])
//!         .with_config(configs::BASE_ONLY);
//!     fixture.command().arg("apply").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    #[allow(unused_imports)]
    pub use super::manifests;
    pub use super::TestFixture;
}

/// `repolish.yaml` project configurations.
#[allow(dead_code)]
pub mod configs {
    /// A single provider named `base`.
    pub const BASE_ONLY: &str = r#"
providers:
  base: providers/base
providers_order: [base]
"#;

    /// `base` followed by `python`.
    pub const BASE_AND_PYTHON: &str = r#"
providers:
  base: providers/base
  python: providers/python
providers_order: [base, python]
context:
  project_name: demo
"#;

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "providers: [unclosed";
}

/// Provider manifests (`<provider>/templates/repolish.yaml`).
#[allow(dead_code)]
pub mod manifests {
    pub const BASE: &str = r#"
provider_name: base
provider_migrated: true
context:
  name: demo
  license: MIT
anchors:
  readme-intro: "Managed by base."
delete_files:
  - setup.py
"#;

    pub const PYTHON: &str = r#"
provider_name: python
provider_migrated: true
context:
  python_version: "3.12"
file_mappings:
  .github/workflows/ci.yml: ci/python.yml
delete_files:
  - "!setup.py"
"#;
}

/// A temporary project directory with provider trees and a config.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write `repolish.yaml` with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.with_file("repolish.yaml", content)
    }

    /// Create `providers/<name>/templates` with a manifest and template files.
    pub fn with_provider(self, name: &str, manifest: &str, templates: &[(&str, &str)]) -> Self {
        let location = format!("providers/{}/templates", name);
        let mut fixture = self.with_file(&format!("{}/repolish.yaml", location), manifest);
        for (path, content) in templates {
            fixture = fixture.with_file(&format!("{}/repolish/{}", location, path), content);
        }
        fixture
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("repolish.yaml")
    }

    /// Location of a provider created with [`TestFixture::with_provider`].
    pub fn provider_location(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join("providers").join(name).join("templates")
    }

    /// Create a child path in the temp directory.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Read a project file as text.
    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.path().join(path)).expect("Failed to read file")
    }

    /// Create a command configured to run in this fixture's directory.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("repolish");
        cmd.current_dir(self.path()).env_remove("REPOLISH_CONFIG");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
