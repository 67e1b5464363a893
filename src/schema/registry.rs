//! Schema registry
//!
//! Arena of schema definitions keyed by fully qualified name. Class
//! references inside descriptors are resolved against it lazily, which is
//! what lets schemas reference themselves and each other.
//!
//! - Schemas are immutable once registered
//! - Schema files are `*.json`, one schema per file, loaded in name order
//! - Compiled schemas are cached append-only behind a `RwLock`; the cache
//!   never changes results, only how often parsing runs

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use super::errors::{SchemaError, SchemaResult};
use super::parser::compile_field;
use super::types::{CompiledSchema, FieldSpec, Schema, SchemaRef};
use crate::config::EngineConfig;

/// Registry of schema definitions with a per-schema compile cache.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    config: EngineConfig,
    /// Definitions by qualified name (no leading `\`)
    schemas: HashMap<String, Arc<Schema>>,
    /// Compiled schemas by qualified name
    compiled: RwLock<HashMap<String, Arc<CompiledSchema>>>,
}

impl SchemaRegistry {
    /// Creates an empty registry with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry with the given configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registers a schema definition.
    ///
    /// Parents named by `extends` do not need to exist yet; they are
    /// checked when the schema is first compiled.
    pub fn register(&mut self, schema: Schema) -> SchemaResult<()> {
        schema
            .validate_structure()
            .map_err(|e| SchemaError::malformed_schema(&schema.name, e))?;

        let key = qualified(&schema.name).to_string();
        if self.schemas.contains_key(&key) {
            return Err(SchemaError::schema_immutable(key));
        }

        info!(
            event = "SCHEMA_REGISTERED",
            schema = %key,
            fields = schema.fields.len(),
            "registered schema"
        );
        self.schemas.insert(key, Arc::new(schema));
        Ok(())
    }

    /// Loads every `*.json` schema file in `dir`, in file name order.
    ///
    /// A missing directory holds no schemas. Returns how many were loaded.
    pub fn load_dir(&mut self, dir: &Path) -> SchemaResult<usize> {
        if !dir.exists() {
            return Ok(0);
        }

        let entries = fs::read_dir(dir).map_err(|e| {
            SchemaError::malformed_schema(
                dir.display().to_string(),
                format!("Failed to read schema directory: {}", e),
            )
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                SchemaError::malformed_schema(
                    dir.display().to_string(),
                    format!("Failed to read directory entry: {}", e),
                )
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in &paths {
            self.load_file(path)?;
        }

        info!(
            event = "SCHEMA_DIR_LOADED",
            dir = %dir.display(),
            count = paths.len(),
            "loaded schema directory"
        );
        Ok(paths.len())
    }

    /// Loads and registers a single schema file.
    pub fn load_file(&mut self, path: &Path) -> SchemaResult<()> {
        let content = fs::read_to_string(path).map_err(|e| {
            SchemaError::malformed_schema(
                path.display().to_string(),
                format!("Failed to read file: {}", e),
            )
        })?;

        let schema: Schema = serde_json::from_str(&content).map_err(|e| {
            SchemaError::malformed_schema(path.display().to_string(), format!("Invalid JSON: {}", e))
        })?;

        self.register(schema)
    }

    /// Saves a schema definition into `dir`, returning the file path.
    ///
    /// Existing files are never overwritten.
    pub fn save_schema(dir: &Path, schema: &Schema) -> SchemaResult<PathBuf> {
        let filename = format!("schema_{}.json", qualified(&schema.name).replace('\\', "."));
        let path = dir.join(filename);

        if path.exists() {
            return Err(SchemaError::schema_immutable(qualified(&schema.name)));
        }

        fs::create_dir_all(dir).map_err(|e| {
            SchemaError::malformed_schema(
                dir.display().to_string(),
                format!("Failed to create schema directory: {}", e),
            )
        })?;

        let content = serde_json::to_string_pretty(schema).map_err(|e| {
            SchemaError::malformed_schema(
                path.display().to_string(),
                format!("Failed to serialize schema: {}", e),
            )
        })?;

        fs::write(&path, content).map_err(|e| {
            SchemaError::malformed_schema(
                path.display().to_string(),
                format!("Failed to write file: {}", e),
            )
        })?;

        Ok(path)
    }

    /// Gets a schema definition by name.
    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(qualified(name)).map(Arc::as_ref)
    }

    /// Checks if a schema is registered.
    pub fn exists(&self, name: &str) -> bool {
        self.schemas.contains_key(qualified(name))
    }

    /// Returns all registered schemas.
    pub fn all_schemas(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values().map(Arc::as_ref)
    }

    /// Returns the number of registered schemas.
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    /// Resolves a class reference to the qualified name of a registered
    /// schema, trying its candidates in order.
    pub fn resolve(&self, reference: &SchemaRef) -> Option<&str> {
        reference
            .candidates()
            .iter()
            .find_map(|name| self.schemas.get_key_value(name.as_str()))
            .map(|(key, _)| key.as_str())
    }

    /// Returns the compiled form of a schema, compiling it on first use.
    pub fn compiled(&self, name: &str) -> SchemaResult<Arc<CompiledSchema>> {
        let key = qualified(name);

        if self.config.cache_compiled {
            let cache = self.compiled.read().unwrap_or_else(|e| e.into_inner());
            if let Some(hit) = cache.get(key) {
                return Ok(Arc::clone(hit));
            }
        }

        let compiled = Arc::new(self.compile(key)?);

        if self.config.cache_compiled {
            let mut cache = self.compiled.write().unwrap_or_else(|e| e.into_inner());
            // A concurrent compile may have won the race; keep the first one
            let entry = cache
                .entry(key.to_string())
                .or_insert_with(|| Arc::clone(&compiled));
            debug!(event = "SCHEMA_COMPILED", schema = %key, fields = entry.fields.len());
            return Ok(Arc::clone(entry));
        }

        Ok(compiled)
    }

    /// Flattens the inheritance chain and parses every field.
    fn compile(&self, name: &str) -> SchemaResult<CompiledSchema> {
        let lineage = self.lineage(name)?;

        // Root ancestor first so children override in place
        let mut fields: Vec<FieldSpec> = Vec::new();
        for ancestor in lineage.iter().rev() {
            let schema = &self.schemas[ancestor.as_str()];
            for decl in schema.fields.iter().filter(|d| !d.is_static) {
                let spec = compile_field(decl, ancestor);
                match fields.iter_mut().find(|f| f.name == spec.name) {
                    Some(slot) => *slot = spec,
                    None => fields.push(spec),
                }
            }
        }

        let schema = &self.schemas[name];
        Ok(CompiledSchema {
            name: Arc::from(name),
            lineage,
            flexible: schema.flexible,
            fields,
        })
    }

    /// Returns `name` followed by its ancestors, nearest first.
    fn lineage(&self, name: &str) -> SchemaResult<Vec<String>> {
        let mut current = self
            .schemas
            .get(name)
            .ok_or_else(|| SchemaError::unknown_schema(name))?;
        let mut lineage = vec![name.to_string()];

        while let Some(parent) = &current.extends {
            let reference = SchemaRef::relative(parent.as_str(), current.namespace());
            let resolved = self
                .resolve(&reference)
                .ok_or_else(|| SchemaError::unknown_parent(&current.name, parent))?;

            if lineage.iter().any(|n| n == resolved) {
                let mut chain = lineage.clone();
                chain.push(resolved.to_string());
                return Err(SchemaError::inheritance_cycle(name, &chain));
            }

            lineage.push(resolved.to_string());
            current = &self.schemas[resolved];
        }

        Ok(lineage)
    }
}

/// Strips the leading `\` of an absolute name.
fn qualified(name: &str) -> &str {
    name.trim_start_matches('\\')
}
