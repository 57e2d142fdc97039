//! # Provider Linking
//!
//! Installs `cli` providers into the project. For each such provider the
//! link command is run twice: once with `--info` to describe where its
//! resources land, then plainly to put them there. The description is saved
//! under `.repolish/_/` so later runs can locate the provider's templates,
//! and any configured links from the provider's resources into the project
//! are created (as symlinks, or copies where symlinks are unavailable).
//!
//! Providers declared with a `directory` need no linking and are skipped.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::config::{ConfigFile, ProviderConfig, ProviderSymlink};
use crate::error::{Error, Result};
use crate::hydration::ensure_contained;

/// Directory, relative to the config file, holding link bookkeeping.
pub const INFO_DIR: &str = ".repolish/_";

/// What a provider's link command reports with `--info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Where the provider's resources are linked, relative to the config file
    /// unless absolute
    pub target_dir: String,
    /// Where the resources come from
    pub source_dir: String,
    #[serde(default)]
    pub templates_dir: Option<String>,
    #[serde(default)]
    pub library_name: Option<String>,
    /// Default links into the project
    #[serde(default)]
    pub symlinks: Vec<ProviderSymlink>,
}

impl ProviderInfo {
    /// Directory holding the linked resources.
    pub fn resources(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.target_dir)
    }

    /// Provider location: the resources plus the templates subdirectory,
    /// falling back to `default_templates_dir` when the provider names none.
    pub fn location(&self, config_dir: &Path, default_templates_dir: &str) -> PathBuf {
        let templates_dir = self.templates_dir.as_deref().unwrap_or(default_templates_dir);
        self.resources(config_dir).join(templates_dir)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AllProviders {
    #[serde(default)]
    aliases: BTreeMap<String, String>,
}

/// `.repolish/_/provider-info.<alias>.json`
pub fn provider_info_path(alias: &str, config_dir: &Path) -> PathBuf {
    config_dir
        .join(INFO_DIR)
        .join(format!("provider-info.{}.json", alias))
}

/// Load a saved provider info file. A missing or unreadable file is `None`.
pub fn load_provider_info(alias: &str, config_dir: &Path) -> Option<ProviderInfo> {
    let path = provider_info_path(alias, config_dir);
    let content = fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&content) {
        Ok(info) => Some(info),
        Err(e) => {
            warn!("Ignoring invalid provider info {}: {}", path.display(), e);
            None
        }
    }
}

/// Save `info` for `alias`, and record the alias in `.all-providers.json`
/// when the resources live under `.repolish/`.
pub fn save_provider_info(alias: &str, info: &ProviderInfo, config_dir: &Path) -> Result<()> {
    let info_dir = config_dir.join(INFO_DIR);
    fs::create_dir_all(&info_dir)?;
    fs::create_dir_all(info.resources(config_dir))?;
    fs::write(
        provider_info_path(alias, config_dir),
        serde_json::to_string_pretty(info)?,
    )?;

    let folder = info
        .resources(config_dir)
        .strip_prefix(config_dir.join(".repolish"))
        .ok()
        .and_then(|rest| rest.components().next())
        .map(|c| c.as_os_str().to_string_lossy().into_owned());
    let Some(folder) = folder else {
        debug!("Provider '{}' resources live outside .repolish; no alias saved", alias);
        return Ok(());
    };

    let aliases_path = info_dir.join(".all-providers.json");
    let mut all: AllProviders = match fs::read_to_string(&aliases_path) {
        Ok(content) => serde_json::from_str(&content)?,
        Err(_) => AllProviders::default(),
    };
    all.aliases.insert(alias.to_string(), folder);
    fs::write(&aliases_path, serde_json::to_string_pretty(&all)?)?;
    Ok(())
}

fn link_error(provider: &str, message: impl std::fmt::Display) -> Error {
    Error::Link {
        provider: provider.to_string(),
        message: message.to_string(),
    }
}

fn run(provider: &str, argv: &[String], cwd: &Path) -> Result<Vec<u8>> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| link_error(provider, "link command is empty"))?;
    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|e| link_error(provider, format!("cannot run '{}': {}", program, e)))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(link_error(
            provider,
            format!("'{}' exited with {}: {}", shell_words::join(argv), output.status, stderr.trim()),
        ));
    }
    Ok(output.stdout)
}

/// Run a provider's link command and return what it reported with `--info`.
pub fn run_provider_link(provider: &str, cli: &str, config_dir: &Path) -> Result<ProviderInfo> {
    info!("Linking provider '{}' with `{}`", provider, cli);
    let argv = shell_words::split(cli).map_err(|e| link_error(provider, e))?;

    let mut info_argv = argv.clone();
    info_argv.push("--info".to_string());
    let stdout = run(provider, &info_argv, config_dir)?;
    let info: ProviderInfo = serde_json::from_slice(&stdout)
        .map_err(|e| link_error(provider, format!("invalid --info output: {}", e)))?;

    run(provider, &argv, config_dir)?;
    info!("Provider '{}' linked into {}", provider, info.target_dir);
    Ok(info)
}

/// Link `source` (inside the provider's resources) to `target` (inside the
/// project). Returns `true` for a symlink, `false` for a copy.
///
/// An existing target is replaced when `force` is set and left alone
/// otherwise.
pub fn create_additional_link(
    provider: &str,
    info: &ProviderInfo,
    link: &ProviderSymlink,
    config_dir: &Path,
    force: bool,
) -> Result<bool> {
    ensure_contained(&link.target)?;
    let source = info.resources(config_dir).join(&link.source);
    let target = config_dir.join(&link.target);
    if !source.exists() {
        return Err(link_error(
            provider,
            format!("link source {} does not exist", source.display()),
        ));
    }

    // symlink targets resolve from the link's own directory
    let source = fs::canonicalize(&source)?;
    let present = target.symlink_metadata().is_ok();
    if present && !force {
        info!("Keeping existing {}", link.target);
        return Ok(target.is_symlink());
    }
    if present {
        remove(&target)?;
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    match symlink(&source, &target) {
        Ok(()) => Ok(true),
        Err(e) => {
            debug!("Symlink {} failed ({}); copying instead", link.target, e);
            copy(&source, &target)?;
            Ok(false)
        }
    }
}

fn remove(path: &Path) -> Result<()> {
    if path.is_symlink() || path.is_file() {
        fs::remove_file(path)?;
    } else if path.is_dir() {
        fs::remove_dir_all(path)?;
    }
    Ok(())
}

#[cfg(unix)]
fn symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
fn symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    if source.is_dir() {
        std::os::windows::fs::symlink_dir(source, target)
    } else {
        std::os::windows::fs::symlink_file(source, target)
    }
}

#[cfg(not(any(unix, windows)))]
fn symlink(_source: &Path, _target: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "symlinks are unsupported on this platform",
    ))
}

fn copy(source: &Path, target: &Path) -> Result<()> {
    if source.is_file() {
        fs::copy(source, target)?;
        return Ok(());
    }
    for entry in WalkDir::new(source) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(source).map_err(|e| Error::Path {
            message: e.to_string(),
        })?;
        let dest = target.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

/// Link one provider. Directory providers are skipped.
///
/// The configured `symlinks` decide which links are created: `None` takes
/// the provider's defaults and an empty list creates none.
pub fn process_provider(alias: &str, config: &ProviderConfig, config_dir: &Path) -> Result<()> {
    let Some(cli) = &config.cli else {
        info!("Skipping provider '{}': it uses a directory", alias);
        return Ok(());
    };
    let info = run_provider_link(alias, cli, config_dir)?;
    save_provider_info(alias, &info, config_dir)?;

    let links = config.symlinks.as_ref().unwrap_or(&info.symlinks);
    for link in links {
        debug!("Linking {} -> {}", link.source, link.target);
        create_additional_link(alias, &info, link, config_dir, true)?;
    }
    if !links.is_empty() {
        info!("Created {} link(s) for provider '{}'", links.len(), alias);
    }
    Ok(())
}

/// Link every provider in evaluation order, stopping at the first failure.
/// Returns the aliases that were processed.
pub fn link_all(file: &ConfigFile, config_dir: &Path) -> Result<Vec<String>> {
    let mut linked = Vec::new();
    for alias in file.provider_order() {
        let Some(config) = file.provider(alias) else {
            warn!("providers_order names undefined provider '{}'; skipping", alias);
            continue;
        };
        process_provider(alias, config, config_dir)?;
        linked.push(alias.to_string());
    }
    Ok(linked)
}
