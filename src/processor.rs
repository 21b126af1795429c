//! Template processing core.
//!
//! Templates are literal text with `{% ... %}` command blocks. Blocks may
//! nest; a block's parameters are expanded on demand by the command that
//! owns them, which is how conditionals and loops work. Commands that are not
//! built in are offered to the [`HandlerRegistry`].

use crate::config::Config;
use crate::constants::{
    keys, str_to_bool, BLOCK_END, BLOCK_START, CONF_EXTENSION, CURRENT_VALUE,
    DEFAULT_TAB_SIZE, DEFAULT_WRAP_INDENT, DEFAULT_WRAP_WIDTH, FALSE_TOKEN, INFO_EXTENSION,
    TRUE_TOKEN,
};
use crate::error::{Error, Result};
use crate::handler::HandlerRegistry;
use crate::metadata::{ObjectId, ObjectRef};
use crate::params::{split_command, CommandParams};
use crate::text;
use crate::vars::VariableStore;
use log::{debug, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

/// Signal raised by the `abort` command.
///
/// It travels back through every nested expansion as the error side of
/// [`Expansion`] and is never shown to the user as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aborted;

/// Result of one (possibly nested) expansion step.
pub type Expansion = std::result::Result<(), Aborted>;

/// How a top-level processing call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The template ran `abort`; output produced before it is kept.
    Aborted,
}

impl Outcome {
    pub fn is_aborted(&self) -> bool {
        matches!(self, Outcome::Aborted)
    }
}

impl From<Expansion> for Outcome {
    fn from(expansion: Expansion) -> Self {
        match expansion {
            Ok(()) => Outcome::Completed,
            Err(Aborted) => Outcome::Aborted,
        }
    }
}

/// Install and user home directories used to place per-template settings.
#[derive(Debug, Clone, Default)]
pub struct TemplatePaths {
    pub install_home: Option<PathBuf>,
    pub user_home: Option<PathBuf>,
}

impl TemplatePaths {
    pub fn new<I: Into<PathBuf>, U: Into<PathBuf>>(install_home: I, user_home: U) -> Self {
        Self { install_home: Some(install_home.into()), user_home: Some(user_home.into()) }
    }

    /// Moves a path below the install home to the same place below the user
    /// home. Paths outside the install home are returned unchanged.
    pub fn user_path(&self, path: &Path) -> PathBuf {
        if let (Some(install), Some(user)) = (&self.install_home, &self.user_home) {
            if let Ok(relative) = path.strip_prefix(install) {
                return user.join(relative);
            }
        }
        path.to_path_buf()
    }
}

/// Expands templates against metadata objects.
///
/// Variables and both per-template config stores live as long as the
/// processor and are shared by every call made on it.
pub struct TemplateProcessor<'r> {
    registry: &'r HandlerRegistry,
    global_config: &'r Config,
    parent_window: Option<String>,
    paths: TemplatePaths,
    vars: VariableStore,
    info_config: Config,
    local_config: Config,
    template_root: Option<PathBuf>,
    alternate: bool,
    allowed_objects: Option<HashSet<ObjectId>>,
    pending_first: Option<bool>,
    first: bool,
}

impl<'r> TemplateProcessor<'r> {
    pub fn new(registry: &'r HandlerRegistry, global_config: &'r Config) -> Self {
        Self {
            registry,
            global_config,
            parent_window: None,
            paths: TemplatePaths::default(),
            vars: VariableStore::new(),
            info_config: Config::new(),
            local_config: Config::new(),
            template_root: None,
            alternate: false,
            allowed_objects: None,
            pending_first: None,
            first: false,
        }
    }

    /// Sets the identifier emitted by `parent_window`.
    pub fn with_parent_window<S: Into<String>>(mut self, window: S) -> Self {
        self.parent_window = Some(window.into());
        self
    }

    pub fn with_paths(mut self, paths: TemplatePaths) -> Self {
        self.paths = paths;
        self
    }

    /// Restricts per-object expansion to the given objects; `None` allows all.
    pub fn set_allowed_objects(&mut self, allowed: Option<HashSet<ObjectId>>) {
        self.allowed_objects = allowed;
    }

    pub fn global_config(&self) -> &'r Config {
        self.global_config
    }

    pub fn info_config(&self) -> &Config {
        &self.info_config
    }

    pub fn local_config(&self) -> &Config {
        &self.local_config
    }

    pub fn local_config_mut(&mut self) -> &mut Config {
        &mut self.local_config
    }

    pub fn template_root(&self) -> Option<&Path> {
        self.template_root.as_deref()
    }

    pub fn parent_window(&self) -> Option<&str> {
        self.parent_window.as_deref()
    }

    /// Whether the innermost per-object expansion is the first of its loop.
    pub fn is_first(&self) -> bool {
        self.first
    }

    pub fn vars(&self) -> &VariableStore {
        &self.vars
    }

    pub fn set_var<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        self.vars.set(name, value);
    }

    pub fn get_var(&self, name: &str) -> &str {
        self.vars.get(name)
    }

    pub fn clear_var(&mut self, name: &str) {
        self.vars.clear(name);
    }

    pub fn clear_vars(&mut self) {
        self.vars.clear_all();
    }

    /// Expands `text` against `target`, appending to `out`.
    ///
    /// Malformed blocks never fail: an unterminated block is copied through
    /// literally. Output produced before an `abort` stays in `out`.
    pub fn process_template_text(
        &mut self,
        out: &mut String,
        text: &str,
        target: Option<ObjectRef<'_>>,
        is_first: bool,
    ) -> Outcome {
        self.template_root = None;
        self.run(out, text, target, is_first)
    }

    /// Loads and expands a template file.
    ///
    /// Besides the text itself this binds `{%template_root%}` to the file's
    /// directory, loads `<template>.info` and loads the user settings store
    /// `<template>.conf`, placed below the user home when the template lives
    /// below the install home.
    ///
    /// # Errors
    /// * `Error::TemplateDoesNotExistError` if `path` is not a file
    /// * `Error::IoError` if the template cannot be read
    /// * `Error::ConfigError` if one of the sibling stores is malformed; the
    ///   processor is then left with empty, unbound stores
    pub fn process_template_file<P: AsRef<Path>>(
        &mut self,
        out: &mut String,
        path: P,
        target: Option<ObjectRef<'_>>,
        is_first: bool,
    ) -> Result<Outcome> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::TemplateDoesNotExistError {
                template: path.display().to_string(),
            });
        }
        debug!("Loading template {}", path.display());
        let content = fs::read_to_string(path).map_err(Error::IoError)?;

        let info_path = path.with_extension(INFO_EXTENSION);
        let conf_path = self.paths.user_path(path).with_extension(CONF_EXTENSION);
        debug!("Template stores: '{}', '{}'", info_path.display(), conf_path.display());
        let stores = Config::load(&info_path)
            .and_then(|info| Config::load(&conf_path).map(|conf| (info, conf)));
        match stores {
            Ok((info_config, local_config)) => {
                self.info_config = info_config;
                self.local_config = local_config;
                self.template_root = path.parent().map(Path::to_path_buf);
            }
            Err(e) => {
                // Never leave one template's stores paired with another's.
                self.info_config = Config::new();
                self.local_config = Config::new();
                self.template_root = None;
                return Err(e);
            }
        }

        Ok(self.run(out, &content, target, is_first))
    }

    fn run(
        &mut self,
        out: &mut String,
        text: &str,
        target: Option<ObjectRef<'_>>,
        is_first: bool,
    ) -> Outcome {
        self.pending_first = None;
        let outcome = Outcome::from(self.process_object(out, text, target, is_first));
        if outcome.is_aborted() {
            debug!("Template processing aborted");
        }
        outcome
    }

    /// Expands `text` for one object of an enclosing loop.
    ///
    /// When an allowed-object set is active and `target` is not in it, the
    /// call produces nothing. If such a skipped call was the first of its
    /// loop, the first flag is handed to the next call that is not skipped.
    pub fn process_object(
        &mut self,
        out: &mut String,
        text: &str,
        target: Option<ObjectRef<'_>>,
        is_first: bool,
    ) -> Expansion {
        if let (Some(allowed), Some(object)) = (&self.allowed_objects, target) {
            if !allowed.contains(&object.id()) {
                debug!("Skipping {} '{}'", object.kind(), object.name());
                if is_first {
                    self.pending_first = Some(true);
                }
                return Ok(());
            }
        }

        let first = self.pending_first.take().unwrap_or(false) || is_first;
        let saved = std::mem::replace(&mut self.first, first);
        let result = self.expand(out, text, target);
        self.first = saved;
        result
    }

    /// Expands `text` in the current state, appending to `out`.
    pub fn expand(
        &mut self,
        out: &mut String,
        text: &str,
        target: Option<ObjectRef<'_>>,
    ) -> Expansion {
        let mut rest = text;
        while let Some(start) = rest.find(BLOCK_START) {
            out.push_str(&rest[..start]);
            let Some(end) = find_block_end(rest, start) else {
                debug!("Unterminated command block, copying remaining text");
                out.push_str(&rest[start..]);
                return Ok(());
            };
            let inner = &rest[start + BLOCK_START.len()..end];
            self.run_command(out, inner, target)?;
            rest = &rest[end + BLOCK_END.len()..];
        }
        out.push_str(rest);
        Ok(())
    }

    /// Expands `text` into a new string.
    pub fn expand_to_string(
        &mut self,
        text: &str,
        target: Option<ObjectRef<'_>>,
    ) -> std::result::Result<String, Aborted> {
        let mut out = String::new();
        self.expand(&mut out, text, target)?;
        Ok(out)
    }

    fn run_command(
        &mut self,
        out: &mut String,
        inner: &str,
        target: Option<ObjectRef<'_>>,
    ) -> Expansion {
        let (name, raw) = split_command(inner);
        let params = raw.map(CommandParams::parse).unwrap_or_default();

        match name {
            "template_root" => {
                if let Some(root) = &self.template_root {
                    let root = root.display().to_string();
                    out.push_str(&root);
                    if !root.ends_with(MAIN_SEPARATOR) {
                        out.push(MAIN_SEPARATOR);
                    }
                }
            }
            "getvar" => {
                let name = self.expand_to_string(params.get_or_empty(0), target)?;
                out.push_str(self.vars.get(&name));
            }
            "setvar" => {
                if params.is_empty() {
                    return Ok(());
                }
                let name = self.expand_to_string(params.get_or_empty(0), target)?;
                if params.len() == 1 {
                    self.vars.clear(&name);
                } else {
                    let value = self.expand_to_string(&params.all_from(1), target)?;
                    self.vars.set(name, value);
                }
            }
            "clearvar" => {
                let name = self.expand_to_string(params.get_or_empty(0), target)?;
                self.vars.clear(&name);
            }
            "clearvars" => self.vars.clear_all(),
            "getconf" => {
                let key = self.expand_to_string(params.get_or_empty(0), target)?;
                match self.local_config.get(&key).map(str::to_string) {
                    Some(value) => out.push_str(&value),
                    None => self.expand(out, &params.all_from(1), target)?,
                }
            }
            "setconf" => {
                if params.is_empty() {
                    return Ok(());
                }
                let key = self.expand_to_string(params.get_or_empty(0), target)?;
                let value = self.expand_to_string(&params.all_from(1), target)?;
                self.local_config.set(key, value);
                if self.local_config.path().is_some() {
                    if let Err(e) = self.local_config.save() {
                        warn!("Cannot save template settings: {e}");
                    }
                }
            }
            "getglobalconf" => {
                let key = self.expand_to_string(params.get_or_empty(0), target)?;
                out.push_str(self.global_config.get_or(&key, ""));
            }
            "abort" => return Err(Aborted),
            "parent_window" => {
                if let Some(window) = &self.parent_window {
                    out.push_str(window);
                }
            }
            "colon" => out.push(':'),
            "if" => {
                let condition = self.expand_to_string(params.get_or_empty(0), target)?;
                let branch = if str_to_bool(&condition) { 1 } else { 2 };
                self.expand_param(out, &params, branch, target)?;
            }
            "ifeq" => {
                let left = self.expand_to_string(params.get_or_empty(0), target)?;
                let right = self.expand_to_string(params.get_or_empty(1), target)?;
                let branch = if left == right { 2 } else { 3 };
                self.expand_param(out, &params, branch, target)?;
            }
            "!" | "not" => {
                let input = self.expand_to_string(&params.all_from(0), target)?;
                out.push_str(match input.as_str() {
                    TRUE_TOKEN => FALSE_TOKEN,
                    FALSE_TOKEN => TRUE_TOKEN,
                    other => other,
                });
            }
            "ifcontains" => {
                let list = self.expand_to_string(params.get_or_empty(0), target)?;
                let term = self.expand_to_string(params.get_or_empty(1), target)?;
                let found = text::split_list(&list).contains(&term.as_str());
                let branch = if found { 2 } else { 3 };
                self.expand_param(out, &params, branch, target)?;
            }
            "forall" => self.forall(out, &params, target)?,
            "countall" => {
                let list = self.expand_to_string(&params.all_from(0), target)?;
                out.push_str(&text::split_list(&list).len().to_string());
            }
            "alternate" => {
                self.alternate = !self.alternate;
                let branch = if self.alternate { 0 } else { 1 };
                self.expand_param(out, &params, branch, target)?;
            }
            "substr" => {
                let value = self.expand_to_string(params.get_or_empty(0), target)?;
                let from = self
                    .expand_to_string(params.get_or_empty(1), target)?
                    .trim()
                    .parse()
                    .unwrap_or(0);
                let count = self
                    .expand_to_string(params.get_or_empty(2), target)?
                    .trim()
                    .parse()
                    .unwrap_or_else(|_| value.chars().count().saturating_sub(1));
                out.push_str(&text::substring(&value, from, count));
            }
            "uppercase" => {
                let value = self.expand_to_string(&params.all_from(0), target)?;
                out.push_str(&value.to_uppercase());
            }
            "lowercase" => {
                let value = self.expand_to_string(&params.all_from(0), target)?;
                out.push_str(&value.to_lowercase());
            }
            "wrap" => {
                let value = self.expand_to_string(params.get_or_empty(0), target)?;
                let width =
                    self.numeric_param(&params, 1, keys::WRAP_WIDTH, DEFAULT_WRAP_WIDTH, target)?;
                let indent =
                    self.numeric_param(&params, 2, keys::WRAP_INDENT, DEFAULT_WRAP_INDENT, target)?;
                out.push_str(&text::wrap(&value, width, indent));
            }
            "kw" => {
                let value = self.expand_to_string(&params.all_from(0), target)?;
                if self.global_config.get_bool(keys::KEYWORDS_UPPER_CASE, true) {
                    out.push_str(&value.to_uppercase());
                } else {
                    out.push_str(&value.to_lowercase());
                }
            }
            "tab" => {
                let size = self.global_config.get_int(keys::TAB_SIZE, DEFAULT_TAB_SIZE);
                out.push_str(&" ".repeat(usize::try_from(size).unwrap_or(0)));
            }
            "--" => {}
            _ => {
                let registry = self.registry;
                registry.dispatch(self, name, &params, target, out)?;
            }
        }
        Ok(())
    }

    fn expand_param(
        &mut self,
        out: &mut String,
        params: &CommandParams,
        index: usize,
        target: Option<ObjectRef<'_>>,
    ) -> Expansion {
        match params.get(index) {
            Some(text) => self.expand(out, text, target),
            None => Ok(()),
        }
    }

    /// Reads a numeric parameter, falling back to a global config value and
    /// then to `default` when it is missing or not a number.
    fn numeric_param(
        &mut self,
        params: &CommandParams,
        index: usize,
        key: &str,
        default: i64,
        target: Option<ObjectRef<'_>>,
    ) -> std::result::Result<usize, Aborted> {
        let fallback = usize::try_from(self.global_config.get_int(key, default)).unwrap_or(0);
        let value = self.expand_to_string(params.get_or_empty(index), target)?;
        Ok(value.trim().parse().unwrap_or(fallback))
    }

    /// `forall:list:separator:text`
    fn forall(
        &mut self,
        out: &mut String,
        params: &CommandParams,
        target: Option<ObjectRef<'_>>,
    ) -> Expansion {
        let list = self.expand_to_string(params.get_or_empty(0), target)?;
        let separator = self.expand_to_string(params.get_or_empty(1), target)?;
        let body = params.all_from(2);

        let mut first = true;
        for value in text::split_list(&list) {
            let item = self.expand_to_string(&body.replace(CURRENT_VALUE, value), target)?;
            let item = item.replace(CURRENT_VALUE, value);
            if item.is_empty() {
                continue;
            }
            if !first {
                out.push_str(&separator);
            }
            first = false;
            out.push_str(&item);
        }
        Ok(())
    }
}

/// Finds the end marker matching the block opened at `start`.
///
/// Returns the byte offset of that end marker, or `None` when the block is
/// never closed.
fn find_block_end(text: &str, start: usize) -> Option<usize> {
    let mut pos = start + BLOCK_START.len();
    let mut depth = 1usize;
    loop {
        let end = pos + text[pos..].find(BLOCK_END)?;
        match text[pos..].find(BLOCK_START).map(|offset| pos + offset) {
            Some(nested) if nested < end => {
                depth += 1;
                pos = nested + BLOCK_START.len();
            }
            _ => {
                depth -= 1;
                if depth == 0 {
                    return Some(end);
                }
                pos = end + BLOCK_END.len();
            }
        }
    }
}
