//! # Configuration Schema and Parsing
//!
//! This module defines the data structures that represent the `repolish.yaml`
//! configuration file, as well as the logic for parsing and resolving it.
//!
//! ## Key Components
//!
//! - **`ConfigFile`**: The raw YAML structure, exactly as written by the user.
//!
//! - **`ProviderConfig`**: One entry under `providers:`. A bare string is
//!   shorthand for `{directory: <string>}`. A provider with a `cli` instead
//!   is installed by `repolish link`, and its location comes from the
//!   provider info file that command saves.
//!
//! - **`RepolishConfig`**: The resolved runtime configuration: absolute,
//!   ordered provider locations plus the project-level context, overrides,
//!   anchors and deletions.
//!
//! ## Example
//!
//! ```yaml
//! context:
//!   project_name: demo
//! context_overrides:
//!   tools.ruff.line_length: 100
//! anchors:
//!   readme-intro: "Project-specific introduction."
//! delete_files:
//!   - "!setup.cfg"
//! post_process:
//!   - cargo fmt --all
//!   - [sh, -c, "sort -o words.txt words.txt"]
//! providers_order: [base, python]
//! providers:
//!   base: ../providers/base
//!   python:
//!     directory: ../providers/python
//!     templates_dir: resources
//!   guide:
//!     cli: codeguide-link
//!     symlinks:
//!       - source: configs/.editorconfig
//!         target: .editorconfig
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use log::warn;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::link;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "repolish.yaml";

fn default_templates_dir() -> String {
    "templates".to_string()
}

/// A link from a provider resource into the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSymlink {
    /// Path inside the provider's linked resources
    pub source: String,
    /// Path inside the project
    pub target: String,
}

/// Configuration for a single provider.
///
/// Exactly one of `directory` and `cli` must be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider directory, relative to the config file
    #[serde(default)]
    pub directory: Option<String>,
    /// Link command that installs the provider's resources
    #[serde(default)]
    pub cli: Option<String>,
    /// Subdirectory of the provider directory holding the provider location
    #[serde(default = "default_templates_dir")]
    pub templates_dir: String,
    /// Links created by `repolish link`; `None` uses the provider's defaults
    /// and an empty list creates none
    #[serde(default)]
    pub symlinks: Option<Vec<ProviderSymlink>>,
}

impl ProviderConfig {
    /// A directory provider with the default templates subdirectory.
    pub fn directory(directory: &str) -> Self {
        Self {
            directory: Some(directory.to_string()),
            cli: None,
            templates_dir: default_templates_dir(),
            symlinks: None,
        }
    }

    fn validate(&self, alias: &str) -> Result<()> {
        let message = match (&self.directory, &self.cli) {
            (Some(_), None) | (None, Some(_)) => return Ok(()),
            (None, None) => "needs either 'directory' or 'cli'",
            (Some(_), Some(_)) => "cannot set both 'directory' and 'cli'",
        };
        Err(Error::ConfigParse {
            message: format!("provider '{}' {}", alias, message),
            hint: Some("Use 'directory' for a local provider or 'cli' for a linked one".to_string()),
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProviderEntry {
    Shorthand(String),
    Full(ProviderConfig),
}

impl From<ProviderEntry> for ProviderConfig {
    fn from(entry: ProviderEntry) -> Self {
        match entry {
            ProviderEntry::Shorthand(directory) => ProviderConfig::directory(&directory),
            ProviderEntry::Full(config) => config,
        }
    }
}

/// One `post_process` entry: a shell-style command line or an argument list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostProcessCommand {
    Line(String),
    Argv(Vec<String>),
}

/// Deserialize `providers:` keeping the order entries were written in.
fn ordered_providers<'de, D>(deserializer: D) -> std::result::Result<Vec<(String, ProviderConfig)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ProvidersVisitor;

    impl<'de> Visitor<'de> for ProvidersVisitor {
        type Value = Vec<(String, ProviderConfig)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a mapping of provider aliases to directories")
        }

        fn visit_unit<E>(self) -> std::result::Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut providers = Vec::new();
            while let Some((alias, entry)) = map.next_entry::<String, ProviderEntry>()? {
                providers.push((alias, entry.into()));
            }
            Ok(providers)
        }
    }

    deserializer.deserialize_any(ProvidersVisitor)
}

/// The `repolish.yaml` file as written.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigFile {
    /// Deprecated list of provider locations; use `providers` instead
    #[serde(default)]
    pub directories: Vec<String>,
    #[serde(default)]
    pub context: Context,
    /// Dot-notation keys or nested mappings applied over provider context
    #[serde(default)]
    pub context_overrides: Context,
    #[serde(default)]
    pub anchors: BTreeMap<String, String>,
    /// Paths to delete; a leading `!` keeps a path a provider deleted
    #[serde(default)]
    pub delete_files: Vec<String>,
    #[serde(default)]
    pub providers_order: Vec<String>,
    #[serde(default, deserialize_with = "ordered_providers")]
    pub providers: Vec<(String, ProviderConfig)>,
    /// Commands run in the rendered output before it is checked or applied
    #[serde(default)]
    pub post_process: Vec<PostProcessCommand>,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RepolishConfig {
    /// Directory containing the config file; relative paths resolve here
    pub config_dir: PathBuf,
    /// Provider locations in evaluation order
    pub locations: Vec<PathBuf>,
    pub context: Context,
    pub context_overrides: Context,
    pub anchors: BTreeMap<String, String>,
    pub delete_files: Vec<String>,
    pub post_process: Vec<PostProcessCommand>,
}

/// Parse a YAML string into a [`ConfigFile`].
pub fn parse(yaml_content: &str) -> Result<ConfigFile> {
    if yaml_content.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml::from_str(yaml_content).map_err(|e| Error::ConfigParse {
        message: e.to_string(),
        hint: Some("Check the repolish.yaml keys: context, context_overrides, anchors, delete_files, post_process, providers_order, providers".to_string()),
    })
}

/// Resolve a parsed file against the directory that contains it.
pub fn resolve(file: ConfigFile, config_dir: &Path) -> Result<RepolishConfig> {
    let locations = if !file.directories.is_empty() {
        warn!("'directories' is deprecated; declare providers under 'providers' instead");
        file.directories
            .iter()
            .map(|dir| config_dir.join(dir))
            .collect()
    } else if !file.providers.is_empty() {
        provider_locations(&file, config_dir)?
    } else {
        return Err(Error::ConfigParse {
            message: "no providers configured".to_string(),
            hint: Some("Add a 'providers' mapping (alias: directory)".to_string()),
        });
    };

    Ok(RepolishConfig {
        config_dir: config_dir.to_path_buf(),
        locations,
        context: file.context,
        context_overrides: file.context_overrides,
        anchors: file.anchors,
        delete_files: file.delete_files,
        post_process: file.post_process,
    })
}

impl ConfigFile {
    /// Provider aliases in evaluation order: `providers_order` when given,
    /// else declaration order.
    pub fn provider_order(&self) -> Vec<&str> {
        if self.providers_order.is_empty() {
            self.providers.iter().map(|(alias, _)| alias.as_str()).collect()
        } else {
            self.providers_order.iter().map(String::as_str).collect()
        }
    }

    /// Look up a provider by alias.
    pub fn provider(&self, alias: &str) -> Option<&ProviderConfig> {
        self.providers
            .iter()
            .find(|(name, _)| name == alias)
            .map(|(_, config)| config)
    }
}

/// Provider locations in order. A `cli` provider that has not been linked
/// yet is skipped with a warning.
fn provider_locations(file: &ConfigFile, config_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut locations = Vec::new();
    for alias in file.provider_order() {
        let config = file.provider(alias).ok_or_else(|| Error::ConfigParse {
            message: format!("providers_order names undefined provider '{}'", alias),
            hint: Some(format!(
                "Defined providers: {}",
                file.providers
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        })?;
        config.validate(alias)?;

        if let Some(directory) = &config.directory {
            locations.push(config_dir.join(directory).join(&config.templates_dir));
        } else if let Some(info) = link::load_provider_info(alias, config_dir) {
            locations.push(info.location(config_dir, &config.templates_dir));
        } else {
            warn!("Provider '{}' is not linked yet; run `repolish link` first", alias);
        }
    }
    Ok(locations)
}

/// Load and resolve a configuration file.
pub fn load_config(path: &Path) -> Result<RepolishConfig> {
    let content = std::fs::read_to_string(path)?;
    let file = parse(&content)?;
    let config_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    resolve(file, config_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
context:
  project_name: demo
context_overrides:
  tools.ruff.line_length: 100
anchors:
  intro: hello
delete_files: ["!setup.cfg"]
providers_order: [python, base]
providers:
  base: ../providers/base
  python:
    directory: ../providers/python
    templates_dir: resources
"#;
        let file = parse(yaml).unwrap();
        assert_eq!(file.context["project_name"], json!("demo"));
        assert_eq!(file.context_overrides["tools.ruff.line_length"], json!(100));
        assert_eq!(file.anchors["intro"], "hello");
        assert_eq!(file.delete_files, vec!["!setup.cfg"]);
        assert_eq!(
            file.providers[0],
            ("base".to_string(), ProviderConfig::directory("../providers/base"))
        );
        assert_eq!(file.providers[1].1.templates_dir, "resources");
    }

    #[test]
    fn test_parse_cli_provider() {
        let yaml = "providers:\n  guide:\n    cli: guide-link --quiet\n    symlinks: []\n";
        let file = parse(yaml).unwrap();
        let config = file.provider("guide").unwrap();
        assert_eq!(config.cli.as_deref(), Some("guide-link --quiet"));
        assert_eq!(config.directory, None);
        assert_eq!(config.symlinks, Some(Vec::new()));
    }

    #[test]
    fn test_provider_needs_exactly_one_source() {
        for yaml in [
            "providers:\n  a:\n    templates_dir: t\n",
            "providers:\n  a:\n    directory: pa\n    cli: a-link\n",
        ] {
            let err = resolve(parse(yaml).unwrap(), Path::new("/work")).unwrap_err();
            assert!(matches!(err, Error::ConfigParse { .. }));
            assert!(err.to_string().contains("provider 'a'"));
        }
    }

    #[test]
    fn test_linked_cli_provider_location() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = parse("providers:\n  guide:\n    cli: guide-link\n  base: pb\n").unwrap();

        testing_logger::setup();
        let config = resolve(file.clone(), dir.path()).unwrap();
        assert_eq!(config.locations, vec![dir.path().join("pb/templates")]);
        testing_logger::validate(|logs| {
            assert!(logs.iter().any(|l| l.body.contains("'guide' is not linked")));
        });

        let info = link::ProviderInfo {
            target_dir: ".repolish/guide".to_string(),
            source_dir: "/site/guide".to_string(),
            templates_dir: Some("resources".to_string()),
            library_name: None,
            symlinks: Vec::new(),
        };
        link::save_provider_info("guide", &info, dir.path()).unwrap();
        let config = resolve(file, dir.path()).unwrap();
        assert_eq!(
            config.locations,
            vec![
                dir.path().join(".repolish/guide/resources"),
                dir.path().join("pb/templates")
            ]
        );
    }

    #[test]
    fn test_parse_post_process_forms() {
        let file = parse("post_process:\n  - cargo fmt --all\n  - [sh, -c, \"exit 0\"]\nproviders:\n  a: pa\n").unwrap();
        assert_eq!(
            file.post_process,
            vec![
                PostProcessCommand::Line("cargo fmt --all".to_string()),
                PostProcessCommand::Argv(vec!["sh".to_string(), "-c".to_string(), "exit 0".to_string()]),
            ]
        );
        let config = resolve(file, Path::new("/work")).unwrap();
        assert_eq!(config.post_process.len(), 2);
    }

    #[test]
    fn test_resolve_uses_providers_order() {
        let file = parse("providers_order: [b, a]\nproviders:\n  a: pa\n  b: pb\n").unwrap();
        let config = resolve(file, Path::new("/work")).unwrap();
        assert_eq!(
            config.locations,
            vec![
                PathBuf::from("/work/pb/templates"),
                PathBuf::from("/work/pa/templates")
            ]
        );
    }

    #[test]
    fn test_resolve_keeps_declaration_order() {
        let file = parse("providers:\n  zeta: z\n  alpha: a\n").unwrap();
        let config = resolve(file, Path::new("/work")).unwrap();
        assert_eq!(
            config.locations,
            vec![
                PathBuf::from("/work/z/templates"),
                PathBuf::from("/work/a/templates")
            ]
        );
    }

    #[test]
    fn test_undefined_provider_in_order() {
        let file = parse("providers_order: [missing]\nproviders:\n  a: pa\n").unwrap();
        let err = resolve(file, Path::new("/work")).unwrap_err();
        assert!(err.to_string().contains("undefined provider 'missing'"));
        assert!(err.to_string().contains("Defined providers: a"));
    }

    #[test]
    fn test_deprecated_directories() {
        testing_logger::setup();
        let file = parse("directories: [one, two]\n").unwrap();
        let config = resolve(file, Path::new("/work")).unwrap();
        assert_eq!(config.locations[1], PathBuf::from("/work/two"));
        testing_logger::validate(|logs| {
            assert!(logs.iter().any(|l| l.body.contains("deprecated")));
        });
    }

    #[test]
    fn test_empty_config_has_no_providers() {
        let err = resolve(parse("").unwrap(), Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let err = parse("providers: [unclosed").unwrap_err();
        assert!(err.to_string().contains("hint:"));
    }

    #[test]
    fn test_load_config_resolves_relative_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "providers:\n  base: providers/base\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.config_dir, dir.path());
        assert_eq!(
            config.locations,
            vec![dir.path().join("providers/base").join("templates")]
        );
    }
}
