//! Definition file loading
//!
//! Definition files map table names to [`TableDefinition`]s. TOML, YAML and
//! JSON are accepted, chosen by file extension.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::schema::types::TableDefinition;

/// Table definitions in file order
pub type Definitions = IndexMap<String, TableDefinition>;

const EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

fn is_definition_file(path: &Path) -> bool {
    path.is_file() && extension(path).map_or(false, |e| EXTENSIONS.contains(&e.as_str()))
}

/// Load and validate one definition file
pub fn load_file(path: &Path) -> Result<Definitions> {
    let content = fs::read_to_string(path)?;

    let definitions: Definitions = match extension(path).as_deref() {
        Some("toml") => toml::from_str(&content)?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        Some("json") => serde_json::from_str(&content)?,
        _ => {
            return Err(Error::ConfigError(format!(
                "Unsupported definition file: {}",
                path.display()
            )))
        }
    };

    for (table, definition) in &definitions {
        definition.validate().map_err(|e| match e {
            Error::DefinitionInvariant(msg) => {
                Error::DefinitionInvariant(format!("{} ({}): {}", table, path.display(), msg))
            }
            other => other,
        })?;
    }

    tracing::debug!(path = %path.display(), tables = definitions.len(), "Loaded definitions");
    Ok(definitions)
}

/// Expand a path argument: directories are walked, patterns globbed, plain
/// paths taken as they are
fn expand(path: &str) -> Result<Vec<PathBuf>> {
    let base = Path::new(path);

    if base.is_dir() {
        let mut files: Vec<PathBuf> = WalkDir::new(base)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| is_definition_file(p))
            .collect();
        files.sort();
        return Ok(files);
    }

    if path.contains(['*', '?', '[']) {
        let entries = glob::glob(path)
            .map_err(|e| Error::ConfigError(format!("Invalid pattern '{}': {}", path, e)))?;
        let mut files = Vec::new();
        for entry in entries {
            let file = entry.map_err(|e| {
                Error::IoError(std::io::Error::new(e.error().kind(), e.to_string()))
            })?;
            if is_definition_file(&file) {
                files.push(file);
            }
        }
        return Ok(files);
    }

    if !base.exists() {
        return Err(Error::ConfigError(format!("Path does not exist: {}", path)));
    }
    Ok(vec![base.to_path_buf()])
}

/// Load every definition file named by `paths`.
///
/// A table defined in more than one file is an error.
pub fn load_paths<S: AsRef<str>>(paths: &[S]) -> Result<Definitions> {
    let mut definitions = Definitions::new();
    let mut sources: HashMap<String, PathBuf> = HashMap::new();

    for path in paths {
        for file in expand(path.as_ref())? {
            for (table, definition) in load_file(&file)? {
                if let Some(first) = sources.get(&table) {
                    return Err(Error::DefinitionInvariant(format!(
                        "table '{}' is defined in both {} and {}",
                        table,
                        first.display(),
                        file.display()
                    )));
                }
                sources.insert(table.clone(), file.clone());
                definitions.insert(table, definition);
            }
        }
    }

    Ok(definitions)
}
