//! tplcmd's main application entry point.
//! Handles command-line argument parsing and wires the processor together
//! with its configuration, catalog and command handlers.

use std::path::Path;

use tplcmd::{
    cli::{get_args, Args},
    config::Config,
    descriptor::find_templates,
    error::{default_error_handler, Error, Result},
    handler::HandlerRegistry,
    metadata::Catalog,
    metadata_commands::register_default_handlers,
    processor::{TemplatePaths, TemplateProcessor},
};

/// Main application entry point.
fn main() {
    let args = get_args();

    // Logger configuration
    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Off
        })
        .init();

    if let Err(err) = run(args) {
        default_error_handler(err);
    }
}

fn write_file<P: AsRef<Path>>(content: &str, dest_path: P) -> Result<()> {
    let dest_path = dest_path.as_ref();
    if let Some(parent) = dest_path.parent() {
        std::fs::create_dir_all(parent).map_err(Error::IoError)?;
    }
    std::fs::write(dest_path, content).map_err(Error::IoError)
}

/// Main application logic execution.
///
/// # Flow
/// 1. Loads the global configuration and the metadata catalog
/// 2. Registers the command handlers
/// 3. Either lists applicable templates or expands one template file
/// 4. Writes the result unless the template aborted
fn run(args: Args) -> Result<()> {
    let global_config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::new(),
    };
    let catalog = args.catalog.as_ref().map(Catalog::load).transpose()?;
    let target = match &catalog {
        Some(catalog) => Some(catalog.resolve(&args.object)?),
        None => None,
    };

    let mut registry = HandlerRegistry::new();
    register_default_handlers(&mut registry);

    let paths = TemplatePaths {
        install_home: args.install_home.clone(),
        user_home: args.user_home.clone(),
    };
    let mut processor = TemplateProcessor::new(&registry, &global_config).with_paths(paths);
    for (name, value) in &args.vars {
        processor.set_var(name, value);
    }

    if args.list {
        let object = target.ok_or_else(|| {
            Error::TemplateError("listing templates requires a catalog".to_string())
        })?;
        for descriptor in find_templates(&[&args.template])? {
            if descriptor.applies_to(&mut processor, object) {
                println!("{}\t{}", descriptor.caption(), descriptor.path().display());
            }
        }
        return Ok(());
    }

    let mut output = String::new();
    let outcome = processor.process_template_file(&mut output, &args.template, target, true)?;
    if outcome.is_aborted() {
        eprintln!("Template processing stopped early, no output written.");
        return Ok(());
    }

    match &args.output {
        Some(path) => write_file(&output, path)?,
        None => print!("{output}"),
    }
    Ok(())
}
