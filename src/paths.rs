//! Path helpers shared by writers

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{Result, WriterError};

/// Lexically normalize a path
///
/// Collapses `.` and `a/..` without touching the filesystem. Leading `..`
/// of a relative path is kept.
pub fn normalize(path: impl AsRef<Path>) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Create `dir` (and parents) if missing, returning its normalized form
pub fn makedir(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = normalize(dir);
    fs::create_dir_all(&dir)
        .map_err(|e| WriterError::io(format!("creating directory {}", dir.display()), e))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_dots() {
        assert_eq!(normalize("runs/./a/../b"), PathBuf::from("runs/b"));
        assert_eq!(normalize("/runs//x/"), PathBuf::from("/runs/x"));
    }

    #[test]
    fn test_normalize_keeps_leading_parent() {
        assert_eq!(normalize("../runs/a/.."), PathBuf::from("../runs"));
        assert_eq!(normalize("../../x"), PathBuf::from("../../x"));
    }

    #[test]
    fn test_normalize_root_parent_stays_root() {
        assert_eq!(normalize("/.."), PathBuf::from("/"));
    }

    #[test]
    fn test_normalize_empty_is_current_dir() {
        assert_eq!(normalize("a/.."), PathBuf::from("."));
        assert_eq!(normalize(""), PathBuf::from("."));
    }

    #[test]
    fn test_makedir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = makedir(tmp.path().join("a/b/../c")).unwrap();
        assert!(dir.is_dir());
        assert!(dir.ends_with("a/c"));
    }

    #[test]
    fn test_makedir_fails_under_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("blocker");
        fs::write(&file, b"x").unwrap();
        let err = makedir(file.join("sub")).unwrap_err();
        assert_eq!(err.code(), "W001");
    }
}
