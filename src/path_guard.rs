//! Resolution and size checks for user-supplied file paths.
//!
//! Every file the CLI reads (policy, key, certificate, token) passes through
//! [`validate`] or [`validate_within`] before any parsing happens.

use crate::error::{PolicyError, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

/// A canonical, symlink-free path to a regular file no larger than its limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPath {
    path: PathBuf,
    size: u64,
    limit: u64,
}

impl ValidatedPath {
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read the file, refusing to return more than the validated limit even
    /// if the file grew after validation.
    pub fn read(&self) -> Result<Vec<u8>> {
        let io_err = |source| PolicyError::Io {
            path: self.path.clone(),
            source,
        };
        let file = File::open(&self.path).map_err(io_err)?;
        let mut bytes = Vec::with_capacity(self.size as usize);
        file.take(self.limit + 1)
            .read_to_end(&mut bytes)
            .map_err(io_err)?;
        if bytes.len() as u64 > self.limit {
            return Err(PolicyError::InvalidSize {
                path: self.path.clone(),
                size: bytes.len() as u64,
                limit: self.limit,
            });
        }
        Ok(bytes)
    }
}

/// Clean `path` lexically, resolve symlinks and check the file size.
pub fn validate(path: &Path, max_size: u64) -> Result<ValidatedPath> {
    let resolved = resolve(path)?;
    check_file(path, resolved, max_size)
}

/// Like [`validate`], but the resolved location must also lie under `root`.
pub fn validate_within(path: &Path, max_size: u64, root: &Path) -> Result<ValidatedPath> {
    let root = resolve(root)?;
    let resolved = resolve(path)?;
    if !resolved.starts_with(&root) {
        return Err(PolicyError::InvalidPath {
            path: path.to_path_buf(),
            reason: format!("resolves outside {}", root.display()),
        });
    }
    check_file(path, resolved, max_size)
}

fn resolve(path: &Path) -> Result<PathBuf> {
    let cleaned = clean(path);
    cleaned
        .canonicalize()
        .map_err(|e| PolicyError::InvalidPath {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn check_file(original: &Path, resolved: PathBuf, max_size: u64) -> Result<ValidatedPath> {
    let metadata = resolved
        .metadata()
        .map_err(|e| PolicyError::InvalidPath {
            path: original.to_path_buf(),
            reason: e.to_string(),
        })?;
    if !metadata.is_file() {
        return Err(PolicyError::InvalidPath {
            path: original.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }
    if metadata.len() > max_size {
        return Err(PolicyError::InvalidSize {
            path: resolved,
            size: metadata.len(),
            limit: max_size,
        });
    }
    Ok(ValidatedPath {
        path: resolved,
        size: metadata.len(),
        limit: max_size,
    })
}

/// Lexical normalization: drops `.` and folds `name/..` pairs.
fn clean(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}
