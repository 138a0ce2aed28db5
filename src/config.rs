use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

pub const DATA_DIR: &str = ".civictrack";
pub const DB_FILE: &str = "issues.db";

/// Default filter when `CIVICTRACK_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Walks up from `start` looking for a `.civictrack` directory.
pub fn find_data_dir(start: &Path) -> Result<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let candidate = current.join(DATA_DIR);
        if candidate.is_dir() {
            return Ok(candidate);
        }

        if !current.pop() {
            bail!("Not a civictrack directory (or any parent). Run 'civictrack init' first.");
        }
    }
}

/// An explicit path wins; otherwise the database inside the nearest data
/// directory.
pub fn resolve_db_path(explicit: Option<&Path>, cwd: &Path) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(find_data_dir(cwd)?.join(DB_FILE)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_finds_dir_in_start() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(DATA_DIR)).unwrap();
        let found = find_data_dir(dir.path()).unwrap();
        assert_eq!(found, dir.path().join(DATA_DIR));
    }

    #[test]
    fn test_finds_dir_in_ancestor() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(DATA_DIR)).unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_data_dir(&nested).unwrap(), dir.path().join(DATA_DIR));
    }

    #[test]
    fn test_plain_file_is_not_a_data_dir() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("project");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join(DATA_DIR), "").unwrap();
        // Either an ancestor of the tempdir has one (unlikely) or it errors;
        // the file itself must never be returned.
        if let Ok(found) = find_data_dir(&nested) {
            assert_ne!(found, nested.join(DATA_DIR));
        }
    }

    #[test]
    fn test_explicit_path_wins() {
        let dir = tempdir().unwrap();
        let explicit = dir.path().join("custom.db");
        let resolved = resolve_db_path(Some(&explicit), dir.path()).unwrap();
        assert_eq!(resolved, explicit);
    }

    #[test]
    fn test_resolves_db_inside_data_dir() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(DATA_DIR)).unwrap();
        let resolved = resolve_db_path(None, dir.path()).unwrap();
        assert_eq!(resolved, dir.path().join(DATA_DIR).join(DB_FILE));
    }
}
