//! JSON-file macro repository.
//!
//! The whole store is one JSON array, loaded at open and rewritten after every
//! mutation through a sibling temp file and a rename.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;

use super::error::{StorageError, StorageResult};
use super::memory::{insert_into, mark_run_in, position, remove_from, tag_in};
use super::MacroRepository;
use crate::model::MacroDefinition;

/// File-backed repository
pub struct FileRepository {
    path: PathBuf,
    macros: RwLock<Vec<MacroDefinition>>,
}

impl FileRepository {
    /// Open (or lazily create) the store at `path`
    pub async fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let macros = if fs::try_exists(&path).await? {
            Self::read_json(&path).await?
        } else {
            Vec::new()
        };
        tracing::debug!("Loaded {} macro(s) from {}", macros.len(), path.display());

        Ok(Self {
            path,
            macros: RwLock::new(macros),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_json(path: &Path) -> StorageResult<Vec<MacroDefinition>> {
        let content = fs::read_to_string(path).await?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            StorageError::serialization(format!("{}: {e}", path.display()))
        })
    }

    async fn write_json(&self, macros: &[MacroDefinition]) -> StorageResult<()> {
        let content = serde_json::to_string_pretty(macros)?;
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content).await?;
        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl MacroRepository for FileRepository {
    async fn find_exact(&self, name: &str) -> StorageResult<Option<MacroDefinition>> {
        let macros = self.macros.read().await;
        Ok(position(&macros, name).map(|i| macros[i].clone()))
    }

    async fn find_all(&self) -> StorageResult<Vec<MacroDefinition>> {
        Ok(self.macros.read().await.clone())
    }

    async fn insert(&self, definition: MacroDefinition) -> StorageResult<()> {
        let mut macros = self.macros.write().await;
        insert_into(&mut macros, definition)?;
        if let Err(e) = self.write_json(&macros).await {
            macros.pop();
            return Err(e);
        }
        Ok(())
    }

    async fn delete(&self, name: &str) -> StorageResult<()> {
        let mut macros = self.macros.write().await;
        let snapshot = macros.clone();
        remove_from(&mut macros, name)?;
        if let Err(e) = self.write_json(&macros).await {
            *macros = snapshot;
            return Err(e);
        }
        Ok(())
    }

    async fn record_run(&self, name: &str) -> StorageResult<()> {
        let mut macros = self.macros.write().await;
        let snapshot = macros.clone();
        mark_run_in(&mut macros, name)?;
        if let Err(e) = self.write_json(&macros).await {
            *macros = snapshot;
            return Err(e);
        }
        Ok(())
    }

    async fn add_tags(&self, name: &str, tags: &[String]) -> StorageResult<MacroDefinition> {
        let mut macros = self.macros.write().await;
        let snapshot = macros.clone();
        let updated = tag_in(&mut macros, name, tags)?;
        if let Err(e) = self.write_json(&macros).await {
            *macros = snapshot;
            return Err(e);
        }
        Ok(updated)
    }

    async fn count(&self) -> StorageResult<usize> {
        Ok(self.macros.read().await.len())
    }
}
