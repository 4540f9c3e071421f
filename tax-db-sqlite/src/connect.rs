use std::path::PathBuf;

use tax_core::RepositoryError;
use tracing::debug;

use crate::repository::SqliteRepository;

/// Resolve the seeds directory at runtime so it works in both development and
/// packaged distribution.
///
/// Resolution order:
/// 1. **`TAX_DB_SQLITE_SEEDS_DIR`** if set.
/// 2. **`./seeds`** if the directory exists in the current working directory.
/// 3. **`$CARGO_MANIFEST_DIR/seeds`** when run from the build tree.
pub fn seeds_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TAX_DB_SQLITE_SEEDS_DIR") {
        return PathBuf::from(dir);
    }
    let cwd_seeds = PathBuf::from("./seeds");
    if cwd_seeds.is_dir() {
        return cwd_seeds;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds")
}

/// Opens `connection_string` as a ready-to-read rule store: migrations are
/// applied and the shipped seed tables loaded from [`seeds_dir`].
///
/// Accepted connection strings:
/// * `sqlite://rules.db` or a bare path. The file is created if missing.
/// * `sqlite::memory:` for an ephemeral database.
///
/// # Errors
///
/// [`RepositoryError::Connection`] if the database cannot be opened,
/// [`RepositoryError::Database`] if migrating or seeding fails.
pub async fn open_seeded(connection_string: &str) -> Result<SqliteRepository, RepositoryError> {
    let repo = SqliteRepository::new(connection_string)
        .await
        .map_err(|e| RepositoryError::Connection(format!("{e:#}")))?;
    repo.run_migrations()
        .await
        .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;

    let seeds = seeds_dir();
    debug!(seeds_dir = %seeds.display(), "Loading seed files");
    repo.run_seeds(&seeds)
        .await
        .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;
    Ok(repo)
}
