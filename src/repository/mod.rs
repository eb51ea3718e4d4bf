//! Macro repository boundary.
//!
//! The resolver and session only see [`MacroRepository`]; the backend behind it
//! (in-memory, JSON file, or something networked) is chosen at start-up by
//! [`open`]. Enumeration order is insertion order and doubles as the tie-break
//! order for placeholder matching.

pub mod error;
pub mod file;
pub mod memory;

pub use error::{StorageError, StorageResult};
pub use file::FileRepository;
pub use memory::MemoryRepository;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{Config, StoreBackend};
use crate::model::MacroDefinition;

/// Persistence of macro definitions, keyed by normalized name.
#[async_trait]
pub trait MacroRepository: Send + Sync {
    /// Look up a macro by name (case-insensitive, whitespace-normalized)
    async fn find_exact(&self, name: &str) -> StorageResult<Option<MacroDefinition>>;

    /// Every stored macro, in insertion order
    async fn find_all(&self) -> StorageResult<Vec<MacroDefinition>>;

    /// Macros whose name template declares placeholders, in insertion order
    async fn find_all_with_placeholders(&self) -> StorageResult<Vec<MacroDefinition>> {
        Ok(self
            .find_all()
            .await?
            .into_iter()
            .filter(MacroDefinition::has_placeholders)
            .collect())
    }

    /// Store a new macro; fails with `Duplicate` if the name is taken
    async fn insert(&self, definition: MacroDefinition) -> StorageResult<()>;

    /// Remove a macro; fails with `NotFound` if absent
    async fn delete(&self, name: &str) -> StorageResult<()>;

    /// Bump run statistics for a macro
    async fn record_run(&self, name: &str) -> StorageResult<()>;

    /// Add tags to a macro and return the updated definition
    async fn add_tags(&self, name: &str, tags: &[String]) -> StorageResult<MacroDefinition>;

    /// Case-insensitive substring search over name, description and tags
    async fn search(&self, query: &str) -> StorageResult<Vec<MacroDefinition>> {
        Ok(self
            .find_all()
            .await?
            .into_iter()
            .filter(|m| m.matches_query(query))
            .collect())
    }

    /// Number of stored macros
    async fn count(&self) -> StorageResult<usize> {
        Ok(self.find_all().await?.len())
    }
}

/// Open the repository backend selected by the configuration.
pub async fn open(config: &Config) -> StorageResult<Arc<dyn MacroRepository>> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::debug!("Using in-memory macro repository");
            Ok(Arc::new(MemoryRepository::new()))
        }
        StoreBackend::File => {
            tracing::debug!("Using file macro repository at {:?}", config.store_path);
            Ok(Arc::new(FileRepository::open(&config.store_path).await?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_memory_backend() {
        let config = Config {
            store_backend: StoreBackend::Memory,
            ..Config::default()
        };
        let repo = open(&config).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_open_file_backend_creates_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let store_path = temp_dir.path().join("nested").join("macros.json");
        let config = Config {
            store_backend: StoreBackend::File,
            store_path: store_path.clone(),
            ..Config::default()
        };
        let repo = open(&config).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
        assert!(store_path.parent().unwrap().exists());
    }
}
