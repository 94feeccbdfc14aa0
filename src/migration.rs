use std::{
    fs,
    path::{Path, PathBuf},
};

use sqlx::{Pool, Postgres};

use crate::error::MigrationError;

#[derive(Debug, Clone, PartialEq)]
pub struct Migration {
    pub number: usize,
    pub path: PathBuf,
    pub sql: String,
}

/// Ordered schema scripts applied by the store at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    migrations: Vec<Migration>,
}

impl Schema {
    /// Reads every `NNN_*.sql` file in `dir`, ordered by its numeric prefix.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, MigrationError> {
        let dir = dir.as_ref();
        let io_err = |source| MigrationError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut migrations = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let path = entry.path();

            if !entry.metadata().map_err(io_err)?.is_file() {
                continue;
            }
            if path.extension().map_or(true, |ext| ext != "sql") {
                continue;
            }

            let number = migration_number(&path)?;
            let sql = fs::read_to_string(&path).map_err(|source| MigrationError::Io {
                path: path.clone(),
                source,
            })?;
            migrations.push(Migration { number, path, sql });
        }

        migrations.sort_by_key(|m| m.number);
        Ok(Self { migrations })
    }

    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    pub async fn apply(&self, p: &Pool<Postgres>) -> Result<(), MigrationError> {
        log::info!("starting migration");
        for m in self.migrations() {
            log::info!("migrating {}", m.path.display());
            sqlx::raw_sql(&m.sql)
                .execute(p)
                .await
                .map_err(|source| MigrationError::Apply {
                    path: m.path.clone(),
                    source,
                })?;
        }
        log::info!("migration end");
        Ok(())
    }
}

fn migration_number(path: &Path) -> Result<usize, MigrationError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.get(..3))
        .and_then(|prefix| prefix.parse().ok())
        .ok_or_else(|| MigrationError::BadFileName(path.to_path_buf()))
}
