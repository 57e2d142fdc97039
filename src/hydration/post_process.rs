//! Post-process: run configured commands over the rendered output
//!
//! The rendered tree (regular files and mapped destinations) is written to a
//! scratch directory, each command runs there in order, and the tree is read
//! back so formatters and fixers shape what check and apply see. Files the
//! commands create are kept; files they remove are dropped.

use std::fs;
use std::path::Path;
use std::process::Command;

use log::{debug, info};
use walkdir::WalkDir;

use super::{ensure_contained, Rendered};
use crate::config::PostProcessCommand;
use crate::error::{Error, Result};
use crate::filesystem::{File, MemoryFS};
use crate::path::normalize_posix;

impl PostProcessCommand {
    /// Split into program and arguments; empty for a blank command.
    pub fn argv(&self) -> Result<Vec<String>> {
        match self {
            PostProcessCommand::Line(line) => shell_words::split(line).map_err(|e| Error::PostProcess {
                command: line.clone(),
                message: e.to_string(),
            }),
            PostProcessCommand::Argv(args) => Ok(args.iter().filter(|a| !a.is_empty()).cloned().collect()),
        }
    }
}

/// Run `commands` over `rendered`, replacing it with the processed tree.
pub fn execute(commands: &[PostProcessCommand], rendered: &mut Rendered) -> Result<()> {
    let runnable: Vec<Vec<String>> = commands
        .iter()
        .map(PostProcessCommand::argv)
        .filter(|argv| argv.as_ref().map_or(true, |a| !a.is_empty()))
        .collect::<Result<_>>()?;
    if runnable.is_empty() {
        return Ok(());
    }

    let scratch = tempfile::TempDir::new()?;
    materialize(rendered, scratch.path())?;
    for argv in &runnable {
        run(argv, scratch.path())?;
    }
    *rendered = collect(rendered, scratch.path())?;
    info!("Ran {} post-process command(s)", runnable.len());
    Ok(())
}

fn materialize(rendered: &Rendered, root: &Path) -> Result<()> {
    let mapped = rendered
        .mapped
        .iter()
        .filter_map(|(dest, file)| file.as_ref().map(|f| (dest.as_str(), f)));
    for (path, file) in rendered.files.files().chain(mapped) {
        ensure_contained(path)?;
        let target = root.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(target, &file.content)?;
    }
    Ok(())
}

fn run(argv: &[String], cwd: &Path) -> Result<()> {
    let command = shell_words::join(argv);
    debug!("Running post-process command: {}", command);
    let output = Command::new(&argv[0])
        .args(&argv[1..])
        .current_dir(cwd)
        .output()
        .map_err(|e| Error::PostProcess {
            command: command.clone(),
            message: e.to_string(),
        })?;
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(Error::PostProcess {
        command,
        message: format!("exited with {}: {}", output.status, stderr.trim()),
    })
}

/// Read the processed tree back, keeping each file's provider.
fn collect(before: &Rendered, root: &Path) -> Result<Rendered> {
    let mut files = MemoryFS::new();
    let mut mapped = before.mapped.clone();
    let mut seen_mapped = Vec::new();

    for entry in WalkDir::new(root).into_iter() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root).map_err(|e| Error::Path {
            message: e.to_string(),
        })?;
        let path = normalize_posix(&relative.to_string_lossy());
        let content = fs::read(entry.path())?;

        if let Some(Some(previous)) = mapped.get(&path) {
            let file = File {
                content,
                provider: previous.provider.clone(),
            };
            mapped.insert(path.clone(), Some(file));
            seen_mapped.push(path);
            continue;
        }
        let provider = before.files.get_file(&path).and_then(|f| f.provider.clone());
        files.add_file(&path, File { content, provider });
    }

    mapped.retain(|dest, file| file.is_none() || seen_mapped.contains(dest));
    Ok(Rendered { files, mapped })
}
