use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::config::{DATA_DIR, DB_FILE};
use crate::db::Database;

pub fn run(path: &Path) -> Result<()> {
    let data_dir = path.join(DATA_DIR);
    let db_path = data_dir.join(DB_FILE);

    if db_path.exists() {
        println!("Already initialized at {}", path.display());
        return Ok(());
    }

    fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;
    Database::open(&db_path).context("Failed to create issue database")?;
    tracing::info!(path = %db_path.display(), "initialized issue database");

    println!("Created {}", data_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IssueId;
    use crate::store::{contract, IssueStore};
    use tempfile::tempdir;

    #[test]
    fn test_init_creates_database() {
        let dir = tempdir().unwrap();
        run(dir.path()).unwrap();
        assert!(dir.path().join(DATA_DIR).join(DB_FILE).exists());
    }

    #[test]
    fn test_init_is_idempotent_and_keeps_data() {
        let dir = tempdir().unwrap();
        run(dir.path()).unwrap();

        let db_path = dir.path().join(DATA_DIR).join(DB_FILE);
        let id = {
            let db = Database::open(&db_path).unwrap();
            db.create(contract::draft("Keep me")).unwrap()
        };

        run(dir.path()).unwrap();
        let db = Database::open(&db_path).unwrap();
        assert_eq!(db.get(id).unwrap().title, "Keep me");
        assert_eq!(id, IssueId(1));
    }

    #[test]
    fn test_init_fails_on_unwritable_target() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();
        assert!(run(&blocker).is_err());
    }
}
