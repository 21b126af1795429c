//! Common constants used throughout tplcmd.

/// Opens a command block.
pub const BLOCK_START: &str = "{%";

/// Closes a command block.
pub const BLOCK_END: &str = "%}";

/// Separates the command name and its parameters.
pub const PARAM_SEPARATOR: char = ':';

/// Placeholder replaced by the current list entry inside `forall` bodies.
pub const CURRENT_VALUE: &str = "%%current_value%%";

pub const TRUE_TOKEN: &str = "true";
pub const FALSE_TOKEN: &str = "false";

/// Template file extension used by discovery.
pub const TEMPLATE_GLOB: &str = "*.template";

/// Extension of the per-template metadata store.
pub const INFO_EXTENSION: &str = "info";

/// Extension of the per-template user settings store.
pub const CONF_EXTENSION: &str = "conf";

/// Global configuration keys read by the built-in commands.
pub mod keys {
    pub const WRAP_WIDTH: &str = "templateWrapWidth";
    pub const WRAP_INDENT: &str = "templateWrapIndent";
    pub const KEYWORDS_UPPER_CASE: &str = "SQLKeywordsUpperCase";
    pub const TAB_SIZE: &str = "sqlEditorTabSize";
}

pub const DEFAULT_WRAP_WIDTH: i64 = 80;
pub const DEFAULT_WRAP_INDENT: i64 = 4;
pub const DEFAULT_TAB_SIZE: i64 = 4;

/// Renders a boolean as one of the boolean tokens.
pub fn bool_to_str(value: bool) -> &'static str {
    if value {
        TRUE_TOKEN
    } else {
        FALSE_TOKEN
    }
}

/// Only the exact true token reads as true.
pub fn str_to_bool(value: &str) -> bool {
    value == TRUE_TOKEN
}
