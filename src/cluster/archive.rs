//! Copying run directories between scratch and permanent storage

use super::{ArchivalMover, ClusterResult};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

/// One copied directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transfer {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// What an archive or restore pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    pub copied: Vec<Transfer>,
    /// Destinations that already existed and were left alone
    pub skipped: Vec<PathBuf>,
}

/// Names of the directories in `root` starting with `prefix`, sorted
pub fn matching_dirs(root: &Path, prefix: &str) -> ClusterResult<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(prefix) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Replace the first `_`-separated segment of `name` with `new_prefix`
pub fn renamed(name: &str, new_prefix: &str) -> String {
    let old = name.split('_').next().unwrap_or_default();
    if old.is_empty() {
        return name.to_string();
    }
    name.replacen(old, new_prefix, 1)
}

/// Scratch (`hot`) and archive (`cold`) directories on one filesystem view
#[derive(Debug, Clone)]
pub struct FsArchive {
    hot: PathBuf,
    cold: PathBuf,
}

impl FsArchive {
    pub fn new(hot: impl Into<PathBuf>, cold: impl Into<PathBuf>) -> Self {
        Self {
            hot: hot.into(),
            cold: cold.into(),
        }
    }

    pub fn hot(&self) -> &Path {
        &self.hot
    }

    pub fn cold(&self) -> &Path {
        &self.cold
    }

    fn transfer(
        from: &Path,
        to: &Path,
        prefix: &str,
        rename: Option<&str>,
    ) -> ClusterResult<TransferReport> {
        let mut report = TransferReport::default();
        fs::create_dir_all(to)?;
        for name in matching_dirs(from, prefix)? {
            let target_name = match rename {
                Some(new_prefix) => renamed(&name, new_prefix),
                None => name.clone(),
            };
            let source = from.join(&name);
            let target = to.join(&target_name);
            if target.exists() {
                info!(dir = %name, target = %target.display(), "already present; not copied");
                report.skipped.push(target);
                continue;
            }
            copy_tree(&source, &target)?;
            info!(dir = %name, target = %target.display(), "copied");
            report.copied.push(Transfer {
                from: source,
                to: target,
            });
        }
        Ok(report)
    }
}

impl ArchivalMover for FsArchive {
    fn archive(&self, prefix: &str, rename: Option<&str>) -> ClusterResult<TransferReport> {
        Self::transfer(&self.hot, &self.cold, prefix, rename)
    }

    fn restore(&self, prefix: &str, rename: Option<&str>) -> ClusterResult<TransferReport> {
        Self::transfer(&self.cold, &self.hot, prefix, rename)
    }
}

/// Recursive copy that recreates symlinks instead of following them
fn copy_tree(source: &Path, target: &Path) -> ClusterResult<()> {
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        let dest = target.join(relative);
        let file_type = entry.file_type();
        if file_type.is_symlink() {
            copy_link(entry.path(), &dest)?;
        } else if file_type.is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_link(link: &Path, dest: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(link)?, dest)
}

#[cfg(not(unix))]
fn copy_link(link: &Path, dest: &Path) -> std::io::Result<()> {
    fs::copy(link, dest).map(|_| ())
}
