//! Command-line interface implementation for tplcmd.
//! Provides argument parsing and help text formatting using clap.

use clap::{error::ErrorKind, CommandFactory, Parser};
use std::path::PathBuf;

/// Command-line arguments structure for tplcmd.
#[derive(Parser, Debug)]
#[command(author, version, about = "tplcmd: expand command-block templates against database metadata", long_about = None)]
pub struct Args {
    /// Template file to expand (a template directory when --list is given)
    #[arg(value_name = "TEMPLATE")]
    pub template: PathBuf,

    /// Metadata catalog (JSON or YAML) holding the target object
    #[arg(short, long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Slash-separated path of the target object below the catalog root
    #[arg(long, value_name = "PATH", default_value = "")]
    pub object: String,

    /// Preset a template variable; may be repeated
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// Global configuration file (JSON or YAML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Read-only directory templates are installed in
    #[arg(long, value_name = "DIR")]
    pub install_home: Option<PathBuf>,

    /// Writable directory that receives per-template settings
    #[arg(long, value_name = "DIR")]
    pub user_home: Option<PathBuf>,

    /// Write the result to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// List the templates below TEMPLATE that apply to the target object
    #[arg(short, long)]
    pub list: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_var(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{s}'")),
    }
}

/// Parses command line arguments and returns the Args structure.
///
/// # Returns
/// * `Args` - Parsed command line arguments
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument {
                let _ = Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}
