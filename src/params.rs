//! Command parameter handling.
//! Splits the inner text of a command block into a command name and an
//! ordered list of colon-separated parameter fields.

use crate::constants::{BLOCK_END, BLOCK_START, PARAM_SEPARATOR};

/// Returns the byte offsets of every top-level separator in `text`.
///
/// A separator is top-level when it is outside any nested command block and
/// outside a quoted span. Quotes toggle a single flag regardless of which
/// quote character opened the span, and the flag is independent of nesting.
fn top_level_separators(text: &str) -> Vec<usize> {
    let bytes = text.as_bytes();
    let mut positions = Vec::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut i = 0;

    while i < bytes.len() {
        let rest = &bytes[i..];
        if rest.starts_with(BLOCK_START.as_bytes()) {
            depth += 1;
            i += BLOCK_START.len();
            continue;
        }
        if depth > 0 && rest.starts_with(BLOCK_END.as_bytes()) {
            depth -= 1;
            i += BLOCK_END.len();
            continue;
        }
        match bytes[i] {
            b'\'' | b'"' => quoted = !quoted,
            b if b == PARAM_SEPARATOR as u8 && depth == 0 && !quoted => positions.push(i),
            _ => {}
        }
        i += 1;
    }
    positions
}

/// Splits a block's inner text on its first top-level separator.
///
/// Returns the command name and the raw parameter string, or `None` for the
/// parameters when the block holds a bare command name.
pub fn split_command(inner: &str) -> (&str, Option<&str>) {
    match top_level_separators(inner).first() {
        Some(&pos) => (&inner[..pos], Some(&inner[pos + 1..])),
        None => (inner, None),
    }
}

/// Tokenized parameters of one command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandParams {
    fields: Vec<String>,
}

impl CommandParams {
    /// Tokenizes a raw parameter string on top-level separators.
    ///
    /// An empty raw string still yields one empty field, so `cmd:` and `cmd`
    /// are distinguishable; use [`CommandParams::default`] for the latter.
    pub fn parse(raw: &str) -> Self {
        let mut fields = Vec::new();
        let mut start = 0;
        for pos in top_level_separators(raw) {
            fields.push(raw[start..pos].to_string());
            start = pos + 1;
        }
        fields.push(raw[start..].to_string());
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the field at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// Returns the field at `index`, or an empty string.
    pub fn get_or_empty(&self, index: usize) -> &str {
        self.get(index).unwrap_or_default()
    }

    /// Rejoins every field from `index` onwards, restoring the separators.
    ///
    /// Used for trailing parameters that may legitimately contain colons.
    pub fn all_from(&self, index: usize) -> String {
        if index >= self.fields.len() {
            return String::new();
        }
        self.fields[index..].join(&PARAM_SEPARATOR.to_string())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }
}
