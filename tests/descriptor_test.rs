use std::fs;
use std::path::Path;

use tempfile::TempDir;
use tplcmd::config::Config;
use tplcmd::descriptor::{find_templates, TemplateDescriptor};
use tplcmd::error::Error;
use tplcmd::handler::HandlerRegistry;
use tplcmd::metadata::Catalog;
use tplcmd::metadata_commands::register_default_handlers;
use tplcmd::processor::TemplateProcessor;

fn write_template(dir: &Path, name: &str, info: Option<&str>) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(format!("{name}.template")), "{%object_name%}").unwrap();
    if let Some(info) = info {
        fs::write(dir.join(format!("{name}.info")), info).unwrap();
    }
}

fn catalog() -> Catalog {
    Catalog::load(Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/catalog.yaml"))
        .unwrap()
}

#[test]
fn test_defaults_without_info() {
    let temp_dir = TempDir::new().unwrap();
    write_template(temp_dir.path(), "select_all", None);

    let descriptor = TemplateDescriptor::load(temp_dir.path().join("select_all.template")).unwrap();
    assert_eq!(descriptor.caption(), "select_all");
    assert_eq!(descriptor.position(), 0);
}

#[test]
fn test_info_fields() {
    let temp_dir = TempDir::new().unwrap();
    write_template(
        temp_dir.path(),
        "ddl",
        Some("templateInfo:\n  menuCaption: Extract DDL\n  menuPosition: 7\n"),
    );

    let descriptor = TemplateDescriptor::load(temp_dir.path().join("ddl.template")).unwrap();
    assert_eq!(descriptor.caption(), "Extract DDL");
    assert_eq!(descriptor.position(), 7);
}

#[test]
fn test_invalid_matches_type() {
    let temp_dir = TempDir::new().unwrap();
    write_template(temp_dir.path(), "bad", Some("templateInfo:\n  matchesType: \"(table\"\n"));

    let result = TemplateDescriptor::load(temp_dir.path().join("bad.template"));
    assert!(matches!(result, Err(Error::InvalidPatternError(_))));
}

#[test]
fn test_applies_to() {
    let temp_dir = TempDir::new().unwrap();
    write_template(
        temp_dir.path(),
        "user_tables",
        Some(concat!(
            "templateInfo:\n",
            "  matchesType: ^(table|view)$\n",
            "  matchesWhen: \"{%!:{%is_system%}%}\"\n",
        )),
    );
    let descriptor =
        TemplateDescriptor::load(temp_dir.path().join("user_tables.template")).unwrap();

    let catalog = catalog();
    let mut registry = HandlerRegistry::new();
    register_default_handlers(&mut registry);
    let config = Config::new();
    let mut processor = TemplateProcessor::new(&registry, &config);

    let table = catalog.resolve("employee/EMPLOYEE").unwrap();
    let system_table = catalog.resolve("employee/RDB$FIELDS").unwrap();
    let database = catalog.resolve("employee").unwrap();
    assert!(descriptor.applies_to(&mut processor, table));
    assert!(!descriptor.applies_to(&mut processor, system_table));
    assert!(!descriptor.applies_to(&mut processor, database));
}

#[test]
fn test_aborting_condition_does_not_match() {
    let temp_dir = TempDir::new().unwrap();
    write_template(
        temp_dir.path(),
        "never",
        Some("templateInfo:\n  matchesWhen: \"true{%abort%}\"\n"),
    );
    let descriptor = TemplateDescriptor::load(temp_dir.path().join("never.template")).unwrap();

    let catalog = catalog();
    let registry = HandlerRegistry::new();
    let config = Config::new();
    let mut processor = TemplateProcessor::new(&registry, &config);
    assert!(!descriptor.applies_to(&mut processor, catalog.root()));
}

#[test_log::test]
fn test_find_templates_orders_and_overrides() {
    let temp_dir = TempDir::new().unwrap();
    let install = temp_dir.path().join("install");
    let user = temp_dir.path().join("user");

    write_template(&install, "b_second", Some("templateInfo:\n  menuPosition: 2\n"));
    write_template(&install, "a_third", Some("templateInfo:\n  menuPosition: 3\n"));
    write_template(&install.join("nested"), "c_first", Some("templateInfo:\n  menuPosition: 1\n"));
    write_template(
        &user,
        "a_third",
        Some("templateInfo:\n  menuPosition: 3\n  menuCaption: Mine\n"),
    );
    fs::write(install.join("notes.txt"), "not a template").unwrap();

    let missing = temp_dir.path().join("missing");
    let found = find_templates(&[&install, &user, &missing]).unwrap();
    let captions: Vec<_> = found.iter().map(|d| d.caption()).collect();
    assert_eq!(captions, vec!["c_first", "b_second", "Mine"]);
    assert!(found[2].path().starts_with(&user));
}
