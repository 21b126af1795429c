//! Error handling for tplcmd.
//! Defines the error type and result alias used outside of template expansion.
//! Expansion itself never fails; see [`crate::processor::Outcome`].

use std::io;
use thiserror::Error;

/// Errors raised while loading templates, configuration stores and catalogs.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    /// Represents errors that occur while parsing or saving a config store
    #[error("Configuration error: {0}.")]
    ConfigError(String),

    /// Represents errors in the metadata catalog document
    #[error("Catalog error: {0}.")]
    CatalogError(String),

    /// Represents errors that occur while preparing a template
    #[error("Template error: {0}.")]
    TemplateError(String),

    #[error("Cannot find template: '{template}'.")]
    TemplateDoesNotExistError { template: String },

    #[error("Cannot find object '{path}' in the catalog.")]
    ObjectNotFoundError { path: String },

    /// Represents an invalid glob or regular expression
    #[error("Invalid pattern: {0}.")]
    InvalidPatternError(String),
}

/// Convenience type alias for Results with [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
///
/// # Arguments
/// * `err` - The Error to handle
///
/// # Behavior
/// Prints the error message to stderr and exits with status code 1
pub fn default_error_handler(err: Error) {
    eprintln!("{err}");
    std::process::exit(1);
}
