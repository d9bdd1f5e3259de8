//! Definition loader for reading command definitions from the filesystem.
//!
//! Definition files are YAML (`.yaml` or `.yml`). A file holds either a
//! single definition mapping or a sequence of them. Each entry is parsed and
//! validated on its own, so one bad definition never hides the others.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::definition::CommandDefinition;
use crate::registry::CommandRegistry;
use crate::wrapper::{CommandServices, DefinitionCommand};

/// Errors that can occur when loading definitions.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// IO error reading files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid YAML.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The document is valid YAML but not a mapping or sequence.
    #[error("Expected a definition mapping or a sequence of definitions")]
    UnexpectedDocument,
}

/// A definition together with the file it came from.
#[derive(Debug, Clone)]
pub struct SourcedDefinition {
    pub source: Option<PathBuf>,
    pub definition: CommandDefinition,
}

/// A definition or file that could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionIssue {
    pub source: Option<PathBuf>,
    pub action_name: Option<String>,
    pub errors: Vec<String>,
}

impl fmt::Display for DefinitionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.source, &self.action_name) {
            (Some(path), Some(name)) => write!(f, "{} ({name})", path.display())?,
            (Some(path), None) => write!(f, "{}", path.display())?,
            (None, Some(name)) => f.write_str(name)?,
            (None, None) => f.write_str("<unnamed>")?,
        }
        write!(f, ": {}", self.errors.join("; "))
    }
}

/// Definitions read from disk, plus the entries that failed to parse.
#[derive(Debug, Default)]
pub struct LoadedDefinitions {
    pub definitions: Vec<SourcedDefinition>,
    pub issues: Vec<DefinitionIssue>,
}

impl LoadedDefinitions {
    fn extend(&mut self, other: LoadedDefinitions) {
        self.definitions.extend(other.definitions);
        self.issues.extend(other.issues);
    }
}

/// What a load registered and what it rejected.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Action names registered, in load order.
    pub registered: Vec<String>,
    pub issues: Vec<DefinitionIssue>,
}

impl LoadReport {
    /// Check if nothing was rejected.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Parse a definition document.
///
/// Fails only when the document as a whole is unusable; entries that do
/// not deserialize are reported as issues.
pub fn parse_definitions(
    content: &str,
    source: Option<&Path>,
) -> Result<LoadedDefinitions, LoaderError> {
    let document: serde_yaml::Value = serde_yaml::from_str(content)?;
    let entries = match document {
        serde_yaml::Value::Null => Vec::new(),
        serde_yaml::Value::Sequence(items) => items,
        mapping @ serde_yaml::Value::Mapping(_) => vec![mapping],
        _ => return Err(LoaderError::UnexpectedDocument),
    };

    let mut loaded = LoadedDefinitions::default();
    for entry in entries {
        let action_name = entry
            .get("action_name")
            .and_then(serde_yaml::Value::as_str)
            .map(str::to_string);

        match serde_yaml::from_value::<CommandDefinition>(entry) {
            Ok(definition) => loaded.definitions.push(SourcedDefinition {
                source: source.map(Path::to_path_buf),
                definition,
            }),
            Err(e) => {
                warn!(source = ?source, action = ?action_name, error = %e, "Failed to parse definition");
                loaded.issues.push(DefinitionIssue {
                    source: source.map(Path::to_path_buf),
                    action_name,
                    errors: vec![e.to_string()],
                });
            }
        }
    }

    Ok(loaded)
}

/// Validate definitions and register the usable ones.
///
/// Definitions with configuration errors are logged, reported and left out
/// of the registry. When several valid definitions share an action name the
/// first one is registered and the rest are reported as duplicates.
pub fn register_definitions(
    registry: &CommandRegistry,
    definitions: impl IntoIterator<Item = SourcedDefinition>,
    services: &CommandServices,
) -> LoadReport {
    let mut report = LoadReport::default();
    let mut seen = HashSet::new();

    for SourcedDefinition { source, definition } in definitions {
        let name = definition.action_name.trim().to_string();
        match DefinitionCommand::new(definition, services.clone()) {
            Ok(_) if !seen.insert(name.to_lowercase()) => {
                warn!(action = %name, source = ?source, "Skipping duplicate command definition");
                report.issues.push(DefinitionIssue {
                    source,
                    action_name: Some(name),
                    errors: vec![
                        "Duplicate of an earlier definition with the same action name".to_string(),
                    ],
                });
            }
            Ok(command) => {
                debug!(action = %name, source = ?source, "Loaded command definition");
                registry.register(std::sync::Arc::new(command));
                report.registered.push(name);
            }
            Err(errors) => {
                for error in &errors {
                    warn!(action = %name, source = ?source, error = %error, "Invalid command definition");
                }
                report.issues.push(DefinitionIssue {
                    source,
                    action_name: (!name.is_empty()).then_some(name),
                    errors: errors.iter().map(ToString::to_string).collect(),
                });
            }
        }
    }

    info!(count = report.registered.len(), "Registered data-defined commands");
    report
}

fn is_definition_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml")
}

/// Loader for command definitions from the filesystem.
#[derive(Debug, Clone)]
pub struct DefinitionLoader {
    /// Search directories in order of priority.
    search_dirs: Vec<PathBuf>,
}

impl Default for DefinitionLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DefinitionLoader {
    /// Create a new loader with default search paths.
    ///
    /// Default paths:
    /// 1. `.warden/commands/` (project-local)
    /// 2. `~/.config/warden/commands/` (global)
    pub fn new() -> Self {
        Self {
            search_dirs: sync::default_search_dirs(),
        }
    }

    /// Create a loader with custom search directories.
    pub fn with_dirs(dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            search_dirs: dirs.into_iter().collect(),
        }
    }

    /// Add a search directory.
    pub fn add_dir(&mut self, dir: PathBuf) {
        if !self.search_dirs.contains(&dir) {
            self.search_dirs.push(dir);
        }
    }

    /// Insert a search directory at the beginning (highest priority).
    pub fn prepend_dir(&mut self, dir: PathBuf) {
        if !self.search_dirs.contains(&dir) {
            self.search_dirs.insert(0, dir);
        }
    }

    /// Get the search directories.
    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Load all definitions from all search directories.
    ///
    /// Definitions come back in precedence order: earlier directories first,
    /// files in name order. Missing directories are skipped.
    pub async fn load_all(&self) -> LoadedDefinitions {
        let mut loaded = LoadedDefinitions::default();

        for dir in &self.search_dirs {
            match self.load_from_directory(dir).await {
                Ok(from_dir) => loaded.extend(from_dir),
                Err(LoaderError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("Definition directory {:?} does not exist, skipping", dir);
                }
                Err(e) => {
                    warn!("Error loading definitions from {:?}: {}", dir, e);
                    loaded.issues.push(DefinitionIssue {
                        source: Some(dir.clone()),
                        action_name: None,
                        errors: vec![e.to_string()],
                    });
                }
            }
        }

        loaded
    }

    /// Load definitions from a specific directory, in file name order.
    pub async fn load_from_directory(&self, dir: &Path) -> Result<LoadedDefinitions, LoaderError> {
        let mut paths = Vec::new();
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_definition_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut loaded = LoadedDefinitions::default();
        for path in paths {
            match self.load_from_file(&path).await {
                Ok(from_file) => {
                    debug!(
                        "Loaded {} definitions from {:?}",
                        from_file.definitions.len(),
                        path
                    );
                    loaded.extend(from_file);
                }
                Err(e) => {
                    warn!("Failed to load definitions from {:?}: {}", path, e);
                    loaded.issues.push(DefinitionIssue {
                        source: Some(path),
                        action_name: None,
                        errors: vec![e.to_string()],
                    });
                }
            }
        }

        Ok(loaded)
    }

    /// Load the definitions in a single file.
    pub async fn load_from_file(&self, path: &Path) -> Result<LoadedDefinitions, LoaderError> {
        let content = fs::read_to_string(path).await?;
        parse_definitions(&content, Some(path))
    }

    /// Load every definition and register the valid ones.
    pub async fn load_into(
        &self,
        registry: &CommandRegistry,
        services: &CommandServices,
    ) -> LoadReport {
        let loaded = self.load_all().await;
        let mut issues = loaded.issues;
        let mut report = register_definitions(registry, loaded.definitions, services);
        issues.append(&mut report.issues);
        report.issues = issues;
        report
    }
}

/// Synchronous version of the loader for contexts where async is not available.
pub mod sync {
    use std::fs;
    use std::path::{Path, PathBuf};

    use super::{
        DefinitionIssue, LoadReport, LoadedDefinitions, LoaderError, is_definition_file,
        parse_definitions, register_definitions,
    };
    use crate::registry::CommandRegistry;
    use crate::wrapper::CommandServices;

    /// Load all definitions from a directory synchronously.
    pub fn load_from_directory(dir: &Path) -> Result<LoadedDefinitions, LoaderError> {
        let mut loaded = LoadedDefinitions::default();

        if !dir.exists() {
            return Ok(loaded);
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if is_definition_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            match load_from_file(&path) {
                Ok(from_file) => loaded.extend(from_file),
                Err(e) => {
                    tracing::warn!("Failed to load definitions from {:?}: {}", path, e);
                    loaded.issues.push(DefinitionIssue {
                        source: Some(path),
                        action_name: None,
                        errors: vec![e.to_string()],
                    });
                }
            }
        }

        Ok(loaded)
    }

    /// Load the definitions in a single file synchronously.
    pub fn load_from_file(path: &Path) -> Result<LoadedDefinitions, LoaderError> {
        let content = fs::read_to_string(path)?;
        parse_definitions(&content, Some(path))
    }

    /// Get default search directories.
    pub fn default_search_dirs() -> Vec<PathBuf> {
        let mut dirs = Vec::new();

        // Project-local
        dirs.push(PathBuf::from(".warden/commands"));

        // Global
        if let Some(config_dir) = dirs::config_dir() {
            dirs.push(config_dir.join("warden").join("commands"));
        }

        dirs
    }

    /// Load all definitions from `dirs`, earlier directories first.
    pub fn load_all(dirs: &[PathBuf]) -> LoadedDefinitions {
        let mut loaded = LoadedDefinitions::default();

        for dir in dirs {
            match load_from_directory(dir) {
                Ok(from_dir) => loaded.extend(from_dir),
                Err(e) => {
                    tracing::warn!("Error loading definitions from {:?}: {}", dir, e);
                    loaded.issues.push(DefinitionIssue {
                        source: Some(dir.clone()),
                        action_name: None,
                        errors: vec![e.to_string()],
                    });
                }
            }
        }

        loaded
    }

    /// Load every definition in `dirs` and register the valid ones.
    pub fn load_into(
        dirs: &[PathBuf],
        registry: &CommandRegistry,
        services: &CommandServices,
    ) -> LoadReport {
        let loaded = load_all(dirs);
        let mut issues = loaded.issues;
        let mut report = register_definitions(registry, loaded.definitions, services);
        issues.append(&mut report.issues);
        report.issues = issues;
        report
    }
}
