//! In-memory macro repository, used for tests and `store_backend = "memory"`

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::error::{StorageError, StorageResult};
use super::MacroRepository;
use crate::model::{normalize_name, MacroDefinition};

/// In-memory repository; contents vanish with the process
#[derive(Default)]
pub struct MemoryRepository {
    macros: RwLock<Vec<MacroDefinition>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository pre-populated with definitions (for testing)
    pub fn with_macros(macros: Vec<MacroDefinition>) -> Self {
        Self {
            macros: RwLock::new(macros),
        }
    }
}

/// Index of the macro whose normalized name equals `name`'s
pub(super) fn position(macros: &[MacroDefinition], name: &str) -> Option<usize> {
    let key = normalize_name(name);
    macros.iter().position(|m| m.key() == key)
}

pub(super) fn insert_into(
    macros: &mut Vec<MacroDefinition>,
    definition: MacroDefinition,
) -> StorageResult<()> {
    if position(macros, &definition.name).is_some() {
        return Err(StorageError::duplicate(&definition.name));
    }
    macros.push(definition);
    Ok(())
}

pub(super) fn remove_from(macros: &mut Vec<MacroDefinition>, name: &str) -> StorageResult<()> {
    let index = position(macros, name).ok_or_else(|| StorageError::not_found(name))?;
    macros.remove(index);
    Ok(())
}

pub(super) fn mark_run_in(macros: &mut [MacroDefinition], name: &str) -> StorageResult<()> {
    let index = position(macros, name).ok_or_else(|| StorageError::not_found(name))?;
    macros[index].mark_run();
    Ok(())
}

pub(super) fn tag_in(
    macros: &mut [MacroDefinition],
    name: &str,
    tags: &[String],
) -> StorageResult<MacroDefinition> {
    let index = position(macros, name).ok_or_else(|| StorageError::not_found(name))?;
    macros[index].add_tags(tags);
    Ok(macros[index].clone())
}

#[async_trait]
impl MacroRepository for MemoryRepository {
    async fn find_exact(&self, name: &str) -> StorageResult<Option<MacroDefinition>> {
        let macros = self.macros.read().await;
        Ok(position(&macros, name).map(|i| macros[i].clone()))
    }

    async fn find_all(&self) -> StorageResult<Vec<MacroDefinition>> {
        Ok(self.macros.read().await.clone())
    }

    async fn insert(&self, definition: MacroDefinition) -> StorageResult<()> {
        insert_into(&mut *self.macros.write().await, definition)
    }

    async fn delete(&self, name: &str) -> StorageResult<()> {
        remove_from(&mut *self.macros.write().await, name)
    }

    async fn record_run(&self, name: &str) -> StorageResult<()> {
        mark_run_in(&mut self.macros.write().await, name)
    }

    async fn add_tags(&self, name: &str, tags: &[String]) -> StorageResult<MacroDefinition> {
        tag_in(&mut self.macros.write().await, name, tags)
    }

    async fn count(&self) -> StorageResult<usize> {
        Ok(self.macros.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Step;

    fn definition(name: &str, steps: &[&str]) -> MacroDefinition {
        MacroDefinition::new(name, steps.iter().map(|s| Step::new(*s)).collect(), None)
    }

    #[tokio::test]
    async fn test_insert_then_find_exact_round_trip() {
        let repo = MemoryRepository::new();
        repo.insert(definition("build app", &["cargo build", "cargo test"]))
            .await
            .unwrap();

        let found = repo.find_exact("build app").await.unwrap().unwrap();
        assert_eq!(found.name, "build app");
        assert_eq!(found.step_texts(), vec!["cargo build", "cargo test"]);
    }

    #[tokio::test]
    async fn test_find_exact_is_case_and_whitespace_insensitive() {
        let repo = MemoryRepository::new();
        repo.insert(definition("Build App", &["make"])).await.unwrap();
        assert!(repo.find_exact("  build   APP ").await.unwrap().is_some());
        assert!(repo.find_exact("build apps").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_names_rejected() {
        let repo = MemoryRepository::new();
        repo.insert(definition("build", &["make"])).await.unwrap();
        let err = repo.insert(definition("BUILD", &["cargo build"])).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = MemoryRepository::new();
        repo.insert(definition("build", &["make"])).await.unwrap();
        repo.delete("Build").await.unwrap();
        assert!(repo.find_exact("build").await.unwrap().is_none());
        assert!(repo.delete("build").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_enumeration_keeps_insertion_order() {
        let repo = MemoryRepository::new();
        for name in ["zeta {x}", "alpha", "mid {y}"] {
            repo.insert(definition(name, &["true"])).await.unwrap();
        }
        let names: Vec<_> = repo
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["zeta {x}", "alpha", "mid {y}"]);

        let templated: Vec<_> = repo
            .find_all_with_placeholders()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(templated, vec!["zeta {x}", "mid {y}"]);
    }

    #[tokio::test]
    async fn test_record_run_and_search() {
        let repo = MemoryRepository::new();
        repo.insert(definition("deploy", &["make deploy"])).await.unwrap();
        repo.record_run("deploy").await.unwrap();
        let found = repo.find_exact("deploy").await.unwrap().unwrap();
        assert_eq!(found.run_count, 1);
        assert!(repo.record_run("missing").await.unwrap_err().is_not_found());

        assert_eq!(repo.search("DEPLOY").await.unwrap().len(), 1);
        assert!(repo.search("rollback").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tags_make_macros_searchable() {
        let repo = MemoryRepository::new();
        repo.insert(definition("deploy", &["make deploy"])).await.unwrap();
        assert!(repo.search("release").await.unwrap().is_empty());

        let tagged = repo
            .add_tags("DEPLOY", &["release".to_string()])
            .await
            .unwrap();
        assert_eq!(tagged.tags, vec!["release"]);
        assert_eq!(repo.search("RELEASE").await.unwrap().len(), 1);

        let err = repo
            .add_tags("missing", &["x".to_string()])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
