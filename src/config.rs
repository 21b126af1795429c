//! Key/value configuration stores.
//! The same store type backs the global application configuration and the two
//! per-template stores (`.info` metadata and `.conf` user settings).

use crate::constants::{bool_to_str, FALSE_TOKEN, TRUE_TOKEN};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Separator used when flattening nested sections into keys.
pub const KEY_SEPARATOR: char = '/';

/// Flat string key/value store, optionally bound to a file.
#[derive(Debug, Default, Clone)]
pub struct Config {
    path: Option<PathBuf>,
    values: IndexMap<String, String>,
}

impl Config {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store bound to `path` without reading it.
    pub fn bound_to<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: Some(path.into()), values: IndexMap::new() }
    }

    /// Loads a store from `path`.
    ///
    /// # Arguments
    /// * `path` - File holding a JSON or YAML mapping
    ///
    /// # Returns
    /// * `Result<Config>` - The store, bound to `path`. A missing file gives an
    ///   empty store so that a later [`Config::save`] creates it.
    ///
    /// # Errors
    /// * `Error::IoError` if the file exists but cannot be read
    /// * `Error::ConfigError` if the content is neither JSON nor YAML mapping
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::bound_to(path);
        if !path.exists() {
            debug!("Config file '{}' does not exist, starting empty", path.display());
            return Ok(config);
        }
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path).map_err(Error::IoError)?;
        config.values = parse_config(&content)?;
        Ok(config)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Reads a boolean token; anything else yields `default`.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(TRUE_TOKEN) => true,
            Some(FALSE_TOKEN) => false,
            _ => default,
        }
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get(key)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(default)
    }

    pub fn set<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Writes the store to its bound file as YAML.
    ///
    /// # Errors
    /// * `Error::ConfigError` if the store is not bound to a file or cannot be
    ///   serialized
    /// * `Error::IoError` if the file or its parent directory cannot be written
    pub fn save(&self) -> Result<()> {
        let path = self.path.as_ref().ok_or_else(|| {
            Error::ConfigError("config store is not bound to a file".to_string())
        })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(Error::IoError)?;
        }
        let content = serde_yaml::to_string(&self.values)
            .map_err(|e| Error::ConfigError(e.to_string()))?;
        debug!("Saving configuration to {}", path.display());
        fs::write(path, content).map_err(Error::IoError)
    }
}

/// Parses configuration content into flat keys.
///
/// JSON is tried first, then YAML. Nested mappings flatten to
/// `section/key`; sequences become comma-separated lists.
///
/// # Errors
/// * `Error::ConfigError` if parsing fails or the document is not a mapping
pub fn parse_config(content: &str) -> Result<IndexMap<String, String>> {
    if content.trim().is_empty() {
        return Ok(IndexMap::new());
    }
    let document: serde_json::Value = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(_) => serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("Invalid configuration format: {e}")))?,
    };

    let mut values = IndexMap::new();
    match document {
        serde_json::Value::Null => {}
        serde_json::Value::Object(_) => flatten("", &document, &mut values),
        _ => {
            return Err(Error::ConfigError(
                "configuration root must be a mapping".to_string(),
            ))
        }
    }
    Ok(values)
}

fn flatten(prefix: &str, value: &serde_json::Value, out: &mut IndexMap<String, String>) {
    match value {
        serde_json::Value::Object(obj) => {
            for (k, v) in obj {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}{KEY_SEPARATOR}{k}")
                };
                flatten(&key, v, out);
            }
        }
        _ => {
            out.insert(prefix.to_string(), scalar_to_string(value));
        }
    }
}

fn scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::Bool(b) => bool_to_str(*b).to_string(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(scalar_to_string)
            .collect::<Vec<_>>()
            .join(","),
        // Objects are flattened before reaching here; nested ones inside
        // sequences are kept as JSON text.
        serde_json::Value::Object(_) => value.to_string(),
    }
}
