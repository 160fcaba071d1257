//! Ability catalog access.
//!
//! [`DataService`] is the contract the plugin consumes. [`InMemoryDataService`]
//! is the host-side implementation used by the bundled server: it loads
//! ability documents from a directory tree and keeps them in memory.

use crate::error::{DataError, Result};
use crate::types::Ability;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Component, Path};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Named collections the data service can locate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Abilities,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Abilities => "abilities",
        }
    }
}

/// Shared data service owned by the host.
#[async_trait]
pub trait DataService: Send + Sync {
    /// Returns every object in the collection.
    async fn locate(&self, collection: Collection) -> std::result::Result<Vec<Ability>, DataError>;
}

// ============================================================================
// In-memory catalog
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct InMemoryDataService {
    abilities: Arc<Vec<Ability>>,
}

impl InMemoryDataService {
    pub fn new(abilities: Vec<Ability>) -> Self {
        Self {
            abilities: Arc::new(abilities),
        }
    }

    /// Loads every `.yml`/`.yaml` ability document under `root`.
    ///
    /// Files that fail to parse are skipped with a warning. The owning plugin
    /// of each ability is taken from the directory after a `plugins`
    /// component of its path relative to `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not a readable directory.
    pub fn from_dir<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(DataError::load_failed(
                root.display().to_string(),
                "not a directory",
            )
            .into());
        }

        let mut abilities = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry
                .map_err(|e| DataError::load_failed(root.display().to_string(), e.to_string()))?;
            let path = entry.path();
            if !entry.file_type().is_file() || !is_yaml(path) {
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(path);
            let plugin = plugin_for_path(relative);
            match load_file(path, plugin.as_deref()) {
                Ok(mut loaded) => {
                    debug!(path = %path.display(), count = loaded.len(), "Loaded ability file");
                    abilities.append(&mut loaded);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping ability file"),
            }
        }

        info!(
            root = %root.display(),
            entries = abilities.len(),
            "Ability catalog loaded"
        );
        Ok(Self::new(abilities))
    }

    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }
}

#[async_trait]
impl DataService for InMemoryDataService {
    async fn locate(&self, collection: Collection) -> std::result::Result<Vec<Ability>, DataError> {
        match collection {
            Collection::Abilities => Ok(self.abilities.as_ref().clone()),
        }
    }
}

// ============================================================================
// Ability documents
// ============================================================================

#[derive(Debug, Deserialize)]
struct AbilityDocument {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tactic: String,
    #[serde(default)]
    technique: TechniqueRef,
    #[serde(default)]
    platforms: BTreeMap<String, BTreeMap<String, ExecutorDocument>>,
}

#[derive(Debug, Default, Deserialize)]
struct TechniqueRef {
    #[serde(default)]
    attack_id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ExecutorDocument {
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    payloads: Vec<String>,
}

impl AbilityDocument {
    /// One ability entry per platform/executor pair.
    fn into_variants(self, plugin: Option<&str>) -> Vec<Ability> {
        let mut variants = Vec::new();
        for (platform, executors) in &self.platforms {
            for (executor, spec) in executors {
                let mut builder = Ability::builder()
                    .id(&self.id)
                    .name(&self.name)
                    .description(&self.description)
                    .tactic(&self.tactic)
                    .technique(&self.technique.attack_id, &self.technique.name)
                    .executor(platform, executor)
                    .payloads(spec.payloads.clone());
                if let Some(command) = &spec.command {
                    builder = builder.command(command);
                }
                if let Some(plugin) = plugin {
                    builder = builder.plugin(plugin);
                }
                variants.push(builder.build());
            }
        }
        variants
    }
}

fn load_file(path: &Path, plugin: Option<&str>) -> std::result::Result<Vec<Ability>, DataError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| DataError::invalid_ability(path.display().to_string(), e.to_string()))?;
    parse_documents(&contents, plugin)
        .map_err(|e| DataError::invalid_ability(path.display().to_string(), e.to_string()))
}

/// Parses a YAML list of ability documents into executor variants.
pub fn parse_documents(
    yaml: &str,
    plugin: Option<&str>,
) -> std::result::Result<Vec<Ability>, serde_yaml::Error> {
    let documents: Vec<AbilityDocument> = serde_yaml::from_str(yaml)?;
    let mut abilities = Vec::new();
    for document in documents {
        if document.platforms.is_empty() {
            warn!(ability_id = %document.id, "Ability has no executors");
            continue;
        }
        abilities.extend(document.into_variants(plugin));
    }
    Ok(abilities)
}

/// Name of the plugin owning a catalog path, e.g. `plugins/dnp3/data/...`.
pub fn plugin_for_path(path: &Path) -> Option<String> {
    let mut components = path.components();
    while let Some(component) = components.next() {
        if component == Component::Normal("plugins".as_ref()) {
            return match components.next() {
                Some(Component::Normal(name)) => name.to_str().map(str::to_string),
                _ => None,
            };
        }
    }
    None
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const READ_ABILITY: &str = r#"
- id: 3f1c8a4e-dnp3-read
  name: DNP3 Read
  description: |
    Read points from an outstation.
    Uses a class 0 poll.
  tactic: collection
  technique:
    attack_id: T0801
    name: Monitor Process State
  platforms:
    linux:
      sh:
        command: ./dnp3_actions tcp 10.0.0.5 1 1024 read
        payloads: [dnp3_actions]
    windows:
      psh:
        command: .\dnp3_actions.exe tcp 10.0.0.5 1 1024 read
      cmd:
        command: dnp3_actions.exe tcp 10.0.0.5 1 1024 read
"#;

    #[test]
    fn test_parse_expands_executor_variants() {
        let abilities = parse_documents(READ_ABILITY, Some("dnp3")).unwrap();
        assert_eq!(abilities.len(), 3);
        assert!(abilities.iter().all(|a| a.ability_id == "3f1c8a4e-dnp3-read"));
        assert!(abilities.iter().all(|a| a.plugin.as_deref() == Some("dnp3")));

        let linux = abilities.iter().find(|a| a.platform == "linux").unwrap();
        assert_eq!(linux.executor, "sh");
        assert_eq!(linux.payloads, vec!["dnp3_actions".to_string()]);
        assert_eq!(linux.technique_id, "T0801");
        assert!(linux.description.contains('\n'));
    }

    #[test]
    fn test_parse_skips_ability_without_executors() {
        let yaml = "- id: empty\n  name: Nothing to run\n";
        assert!(parse_documents(yaml, None).unwrap().is_empty());
    }

    #[test]
    fn test_plugin_for_path() {
        assert_eq!(
            plugin_for_path(Path::new("plugins/dnp3/data/abilities/collection/a.yml")),
            Some("dnp3".to_string())
        );
        assert_eq!(
            plugin_for_path(Path::new("data/abilities/discovery/b.yml")),
            None
        );
        assert_eq!(plugin_for_path(Path::new("plugins")), None);
    }

    #[tokio::test]
    async fn test_from_dir() {
        let dir = TempDir::new().unwrap();
        let plugin_dir = dir.path().join("plugins/dnp3/data/abilities/collection");
        let core_dir = dir.path().join("data/abilities/discovery");
        fs::create_dir_all(&plugin_dir).unwrap();
        fs::create_dir_all(&core_dir).unwrap();

        fs::write(plugin_dir.join("read.yml"), READ_ABILITY).unwrap();
        fs::write(
            core_dir.join("whoami.yml"),
            r#"
- id: core-whoami
  name: Identify user
  tactic: discovery
  technique:
    attack_id: T1033
    name: System Owner/User Discovery
  platforms:
    linux:
      sh:
        command: whoami
"#,
        )
        .unwrap();
        fs::write(core_dir.join("broken.yml"), "- id: [unterminated").unwrap();
        fs::write(core_dir.join("notes.txt"), "ignored").unwrap();

        let service = InMemoryDataService::from_dir(dir.path()).unwrap();
        assert_eq!(service.len(), 4);

        let abilities = service.locate(Collection::Abilities).await.unwrap();
        let core = abilities
            .iter()
            .find(|a| a.ability_id == "core-whoami")
            .unwrap();
        assert_eq!(core.which_plugin().await, None);
        assert_eq!(
            abilities
                .iter()
                .filter(|a| a.plugin.as_deref() == Some("dnp3"))
                .count(),
            3
        );
    }

    #[test]
    fn test_from_missing_dir() {
        let result = InMemoryDataService::from_dir("/nonexistent/ability/catalog");
        assert!(result.is_err());
    }
}
