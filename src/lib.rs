//! tplcmd expands command-block templates (`{%command:param:...%}`) against
//! database metadata objects to produce SQL scripts, DDL and reports.
//! Templates nest freely, keep their own variables and per-template settings,
//! and can be extended with additional commands through a handler registry.

/// Command-line interface module for the tplcmd binary
pub mod cli;

/// Key/value configuration stores backed by JSON or YAML files
pub mod config;

/// Common constants: block markers, boolean tokens, config keys
pub mod constants;

/// Template descriptors (`.info` stores) and template discovery
pub mod descriptor;

/// Error types and handling
pub mod error;

/// Command handler trait and registry for commands that are not built in
pub mod handler;

/// Metadata catalog and the borrowed object handles templates run against
pub mod metadata;

/// Commands reading the target metadata object
pub mod metadata_commands;

/// Command name and parameter splitting
pub mod params;

/// Core template processing: block scanning and the built-in commands
pub mod processor;

/// Text helpers used by the built-in commands
pub mod text;

/// Per-processor template variables
pub mod vars;
