//! Small synchronous filesystem helpers shared by the layout manager and the
//! snapshot handles. Kept separate from [`crate::layout`] because both
//! [`crate::transient`] and [`crate::received`] need the recursive-purge and
//! fsync helpers without going through the layout manager's path allocation.

use std::fs;
use std::io;
use std::path::Path;

/// Creates `path` and all missing parent components, tolerating an
/// already-existing directory.
pub fn create_dir_all(path: impl AsRef<Path>) -> io::Result<()> {
    match fs::create_dir_all(&path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(err) => Err(err),
    }
}

/// fsync's a directory. Required after a rename so the new directory entry
/// survives a crash (renames are atomic but not necessarily durable until
/// the parent directory's data is flushed).
pub fn fsync_dir(path: impl AsRef<Path>) -> io::Result<()> {
    let dir = fs::File::open(path)?;
    dir.sync_all()
}

/// Recursively fsyncs every regular file under `path`, then the directories
/// themselves bottom-up. Used before renaming a snapshot directory into
/// place so its content is durable before the directory entry is.
pub fn fsync_tree(path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    for entry in walkdir::WalkDir::new(path).contents_first(true) {
        let entry = entry.map_err(io::Error::other)?;
        if entry.file_type().is_file() {
            fs::File::open(entry.path())?.sync_all()?;
        } else if entry.file_type().is_dir() {
            fsync_dir(entry.path())?;
        }
    }
    Ok(())
}

/// Recursive, best-effort delete. Logs and swallows the error rather than
/// bubbling it, per the layout manager's `purge` contract.
pub fn purge_best_effort(path: impl AsRef<Path>) {
    let path = path.as_ref();
    if !path.exists() {
        return;
    }
    if let Err(err) = fs::remove_dir_all(path) {
        log::warn!("failed to purge {:?}: {}", path, err);
    }
}

/// Lists the regular files directly inside `dir`, sorted in ascending
/// byte-lexicographic order by filename. Does not recurse, and skips the
/// `.checksum` sidecar so the aggregate checksum stays stable whether it is
/// computed before or after the sidecar is written alongside the payload.
pub fn sorted_file_names(dir: impl AsRef<Path>) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".checksum") {
                continue;
            }
            names.push(name);
        }
    }
    names.sort_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
    Ok(names)
}
