//! File system helpers for durable writes and plugin directory manipulation.
//!
//! The installer replaces the plugin's own files while the host may still
//! hold some of them open, so every helper here reports precisely which
//! path failed. All functions are synchronous; async callers run them on
//! the blocking pool.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Ensure a directory exists, creating it and its parents if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    } else if !path.is_dir() {
        anyhow::bail!("Path exists but is not a directory: {}", path.display());
    }
    Ok(())
}

/// Write `content` to `path` atomically and durably.
///
/// The data is written to a temporary sibling, flushed to disk with
/// `sync_all`, and renamed over the destination. A crash leaves either the
/// old file or the new one, never a truncated mix.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let temp_path = path.with_extension("tmp");

    {
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

        file.write_all(content)
            .with_context(|| format!("Failed to write to temp file: {}", temp_path.display()))?;

        file.sync_all().with_context(|| "Failed to sync file to disk")?;
    }

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

/// Remove a directory tree if it exists.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

fn is_preserved(name: &std::ffi::OsStr, preserve: &[String]) -> bool {
    preserve.iter().any(|p| name == p.as_str())
}

/// Delete every top-level entry of `dir` except those named in `preserve`.
///
/// A missing directory is treated as already clean. Returns the number of
/// entries removed.
pub fn clear_dir_except(dir: &Path, preserve: &[String]) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in
        fs::read_dir(dir).with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        if is_preserved(&entry.file_name(), preserve) {
            continue;
        }

        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            fs::remove_dir_all(&path)
                .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
        } else {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove file: {}", path.display()))?;
        }
        removed += 1;
    }

    Ok(removed)
}

/// Recursively copy the contents of `src` into `dst`, overwriting files.
///
/// Top-level entries named in `preserve` are skipped. Symbolic links are
/// followed and their targets copied; a dangling link is an error. Returns
/// the number of files copied.
pub fn copy_dir_except(src: &Path, dst: &Path, preserve: &[String]) -> Result<usize> {
    ensure_dir(dst)?;

    let mut copied = 0;
    for entry in
        fs::read_dir(src).with_context(|| format!("Failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        if is_preserved(&entry.file_name(), preserve) {
            continue;
        }
        copied += copy_entry(&entry.path(), &dst.join(entry.file_name()))?;
    }

    Ok(copied)
}

fn copy_entry(src: &Path, dst: &Path) -> Result<usize> {
    // Follows symlinks, so a link to a directory is copied as a directory.
    let metadata = fs::metadata(src)
        .with_context(|| format!("Failed to read metadata: {}", src.display()))?;

    if metadata.is_dir() {
        if dst.is_file() {
            fs::remove_file(dst)
                .with_context(|| format!("Failed to replace file: {}", dst.display()))?;
        }
        copy_dir_except(src, dst, &[])
    } else {
        if dst.is_dir() {
            fs::remove_dir_all(dst)
                .with_context(|| format!("Failed to replace directory: {}", dst.display()))?;
        }
        fs::copy(src, dst).with_context(|| {
            format!("Failed to copy file from {} to {}", src.display(), dst.display())
        })?;
        Ok(1)
    }
}

/// Make `dst` match `src`, carrying on past entries that cannot be changed.
///
/// Entries of `dst` absent from `src` are removed, then every file of `src`
/// is copied over unless `dst` already holds the same bytes. A file that
/// cannot be replaced but is unchanged is therefore not a problem. Top-level
/// entries named in `preserve` are left alone on both sides.
///
/// Returns the failures in the order they happened; [`tree_differences`]
/// tells whether any of them left `dst` different from `src`.
pub fn sync_dir_from(src: &Path, dst: &Path, preserve: &[String]) -> Vec<anyhow::Error> {
    let mut failures = Vec::new();
    if let Err(e) = ensure_dir(dst) {
        failures.push(e);
        return failures;
    }

    prune_missing(src, dst, preserve, &mut failures);

    for entry in walk_except(src, preserve) {
        let result = entry.map_err(anyhow::Error::from).and_then(|entry| {
            let target = dst.join(relative(src, entry.path()));
            sync_entry(entry.path(), entry.file_type().is_dir(), &target)
        });
        if let Err(e) = result {
            failures.push(e);
        }
    }

    failures
}

/// Relative paths at which `actual` differs from `expected`, ignoring
/// top-level entries named in `preserve`.
pub fn tree_differences(expected: &Path, actual: &Path, preserve: &[String]) -> Result<Vec<PathBuf>> {
    let mut differing = Vec::new();

    for entry in walk_except(expected, preserve) {
        let entry = entry?;
        let rel = relative(expected, entry.path());
        let target = actual.join(&rel);
        let matches = if entry.file_type().is_dir() {
            target.is_dir()
        } else {
            target.is_file() && same_contents(entry.path(), &target)
        };
        if !matches {
            differing.push(rel);
        }
    }

    for entry in WalkDir::new(actual).min_depth(1).into_iter().filter_entry(|e| !skipped(e, preserve)) {
        let entry = entry?;
        let rel = relative(actual, entry.path());
        if !expected.join(&rel).exists() {
            differing.push(rel);
        }
    }

    Ok(differing)
}

fn skipped(entry: &DirEntry, preserve: &[String]) -> bool {
    entry.depth() == 1 && is_preserved(entry.file_name(), preserve)
}

fn walk_except(root: &Path, preserve: &[String]) -> impl Iterator<Item = walkdir::Result<DirEntry>> {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| !skipped(entry, preserve))
}

fn relative(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

fn same_contents(a: &Path, b: &Path) -> bool {
    match (fs::read(a), fs::read(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Best-effort removal of everything below `dst` that `src` does not have.
fn prune_missing(src: &Path, dst: &Path, preserve: &[String], failures: &mut Vec<anyhow::Error>) {
    let mut entries = WalkDir::new(dst).min_depth(1).into_iter();
    while let Some(entry) = entries.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                failures.push(e.into());
                continue;
            }
        };
        let is_dir = entry.file_type().is_dir();
        if skipped(&entry, preserve) {
            if is_dir {
                entries.skip_current_dir();
            }
            continue;
        }
        if src.join(relative(dst, entry.path())).exists() {
            continue;
        }

        let path = entry.path();
        let removed = if is_dir {
            entries.skip_current_dir();
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        if let Err(e) = removed {
            failures.push(anyhow::Error::new(e).context(format!("Failed to remove: {}", path.display())));
        }
    }
}

fn sync_entry(src: &Path, is_dir: bool, dst: &Path) -> Result<()> {
    let existing = fs::symlink_metadata(dst).ok();

    if is_dir {
        match existing {
            Some(meta) if meta.is_dir() => return Ok(()),
            Some(_) => fs::remove_file(dst)
                .with_context(|| format!("Failed to replace file: {}", dst.display()))?,
            None => {}
        }
        return fs::create_dir(dst)
            .with_context(|| format!("Failed to create directory: {}", dst.display()));
    }

    match existing {
        Some(meta) if meta.is_dir() => fs::remove_dir_all(dst)
            .with_context(|| format!("Failed to replace directory: {}", dst.display()))?,
        Some(meta) if meta.is_file() && same_contents(src, dst) => return Ok(()),
        Some(meta) if meta.file_type().is_symlink() => fs::remove_file(dst)
            .with_context(|| format!("Failed to replace link: {}", dst.display()))?,
        _ => {}
    }

    fs::copy(src, dst)
        .with_context(|| format!("Failed to copy file from {} to {}", src.display(), dst.display()))?;
    Ok(())
}
