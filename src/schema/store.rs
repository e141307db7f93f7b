//! Schema Store
//!
//! Explicit cache of loaded schema documents and of the schema-backed type
//! definitions built from them. Entries are immutable once inserted; the
//! store is meant to be created once per process (or per configuration load)
//! and only cleared on an explicit reload.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use super::Schema;
use crate::config::TypesConfig;
use crate::error::{Error, Result};
use crate::types::{JsonSchemaType, TypeDefinition};

/// File extensions picked up by [`SchemaStore::load_dir`]
const SCHEMA_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

#[derive(Debug, Clone)]
pub struct SchemaStore {
    schemas: Arc<RwLock<HashMap<PathBuf, Arc<Schema>>>>,
    types: Arc<RwLock<HashMap<(PathBuf, String), TypeDefinition>>>,
    cache_documents: bool,
}

impl Default for SchemaStore {
    fn default() -> Self {
        Self {
            schemas: Arc::default(),
            types: Arc::default(),
            cache_documents: true,
        }
    }
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &TypesConfig) -> Self {
        Self {
            cache_documents: config.schemas.cache_documents,
            ..Self::default()
        }
    }

    /// Load a schema file, reusing the cached copy when there is one
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Arc<Schema>> {
        let path = canonical(path.as_ref())?;
        if let Some(schema) = self.schemas.read().get(&path) {
            return Ok(Arc::clone(schema));
        }

        tracing::debug!(path = %path.display(), "schema cache miss");
        let schema = Arc::new(Schema::from_file(&path)?.with_document_cache(self.cache_documents));
        let mut schemas = self.schemas.write();
        // Another thread may have loaded it meanwhile; keep the first copy
        let cached = schemas.entry(path).or_insert(schema);
        Ok(Arc::clone(cached))
    }

    /// Load every schema file under `dir`. Returns the loaded paths, sorted.
    pub fn load_dir(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let mut loaded = Vec::new();
        for entry in WalkDir::new(dir.as_ref()).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            let path = entry.path();
            let is_schema = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| SCHEMA_EXTENSIONS.contains(&ext));
            if entry.file_type().is_file() && is_schema {
                self.load(path)?;
                loaded.push(canonical(path)?);
            }
        }
        tracing::info!(dir = %dir.as_ref().display(), count = loaded.len(), "loaded schema directory");
        Ok(loaded)
    }

    /// Schema-backed type for `definitions/<key>` of the schema at `path`
    pub fn definition_type(&self, path: impl AsRef<Path>, key: &str) -> Result<TypeDefinition> {
        let path = canonical(path.as_ref())?;
        let cache_key = (path, key.to_string());
        if let Some(definition) = self.types.read().get(&cache_key) {
            return Ok(definition.clone());
        }

        let schema = self.load(&cache_key.0)?;
        let definition = JsonSchemaType::definition(schema, key)?;
        let mut types = self.types.write();
        Ok(types.entry(cache_key).or_insert(definition).clone())
    }

    pub fn schema_count(&self) -> usize {
        self.schemas.read().len()
    }

    pub fn type_count(&self) -> usize {
        self.types.read().len()
    }

    /// Drop every cached schema and type
    pub fn clear(&self) {
        self.schemas.write().clear();
        self.types.write().clear();
    }
}

fn canonical(path: &Path) -> Result<PathBuf> {
    path.canonicalize().map_err(|e| Error::SchemaLoading {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}
