//! Template descriptors and template discovery.
//!
//! Each `*.template` file may have a sibling `.info` store describing how it
//! is offered to the user:
//!
//! ```yaml
//! templateInfo:
//!   menuCaption: Create table script
//!   menuPosition: 10
//!   matchesType: ^(table|view)$
//!   matchesWhen: "{%!:{%is_system%}%}"
//! ```

use crate::config::Config;
use crate::constants::{str_to_bool, INFO_EXTENSION, TEMPLATE_GLOB, TRUE_TOKEN};
use crate::error::{Error, Result};
use crate::metadata::ObjectRef;
use crate::processor::{Outcome, TemplateProcessor};
use globset::Glob;
use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const CAPTION_KEY: &str = "templateInfo/menuCaption";
pub const POSITION_KEY: &str = "templateInfo/menuPosition";
pub const MATCHES_TYPE_KEY: &str = "templateInfo/matchesType";
pub const MATCHES_WHEN_KEY: &str = "templateInfo/matchesWhen";

/// Presentation and matching rules of one template file.
#[derive(Debug, Clone)]
pub struct TemplateDescriptor {
    path: PathBuf,
    caption: String,
    position: i64,
    matches_type: Option<Regex>,
    matches_when: String,
}

impl TemplateDescriptor {
    /// Reads the descriptor of the template at `path` from its `.info` store.
    ///
    /// # Errors
    /// * `Error::ConfigError` if the `.info` store is malformed
    /// * `Error::InvalidPatternError` if `matchesType` is not a valid regex
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let info = Config::load(path.with_extension(INFO_EXTENSION))?;

        let default_caption = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let matches_type = match info.get(MATCHES_TYPE_KEY).map(str::trim) {
            Some(pattern) if !pattern.is_empty() => Some(
                Regex::new(pattern)
                    .map_err(|e| Error::InvalidPatternError(format!("{pattern}: {e}")))?,
            ),
            _ => None,
        };

        Ok(Self {
            path: path.to_path_buf(),
            caption: info.get_or(CAPTION_KEY, &default_caption).to_string(),
            position: info.get_int(POSITION_KEY, 0),
            matches_type,
            matches_when: info.get_or(MATCHES_WHEN_KEY, TRUE_TOKEN).to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    /// Whether the template should be offered for `object`.
    ///
    /// The object kind must match `matchesType` and `matchesWhen` must expand
    /// to the true token. A `matchesWhen` that aborts does not match.
    pub fn applies_to(&self, processor: &mut TemplateProcessor<'_>, object: ObjectRef<'_>) -> bool {
        if let Some(pattern) = &self.matches_type {
            if !pattern.is_match(object.kind().as_str()) {
                return false;
            }
        }
        let mut result = String::new();
        match processor.process_template_text(&mut result, &self.matches_when, Some(object), true) {
            Outcome::Completed => str_to_bool(result.trim()),
            Outcome::Aborted => false,
        }
    }
}

/// Finds every template below `dirs`.
///
/// A template in a later directory replaces one with the same file name from
/// an earlier directory, so user templates shadow installed ones. The result
/// is ordered by menu position, then caption.
///
/// # Errors
/// * `Error::IoError` if a directory cannot be walked
/// * any error of [`TemplateDescriptor::load`]
pub fn find_templates<P: AsRef<Path>>(dirs: &[P]) -> Result<Vec<TemplateDescriptor>> {
    let matcher = Glob::new(TEMPLATE_GLOB)
        .map_err(|e| Error::InvalidPatternError(e.to_string()))?
        .compile_matcher();

    let mut found: IndexMap<OsString, PathBuf> = IndexMap::new();
    for dir in dirs {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            debug!("Template directory '{}' does not exist", dir.display());
            continue;
        }
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::IoError(e.into()))?;
            if entry.file_type().is_file() && matcher.is_match(entry.file_name()) {
                debug!("Found template {}", entry.path().display());
                found.insert(entry.file_name().to_os_string(), entry.path().to_path_buf());
            }
        }
    }

    let mut descriptors = found
        .values()
        .map(TemplateDescriptor::load)
        .collect::<Result<Vec<_>>>()?;
    descriptors.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then_with(|| a.caption.cmp(&b.caption))
    });
    Ok(descriptors)
}
