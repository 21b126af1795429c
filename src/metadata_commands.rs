//! Template commands that read the target metadata object.
//!
//! Every command here is a no-op when there is no target object, and
//! `foreach` is a no-op for collections the object's kind does not own.

use crate::constants::bool_to_str;
use crate::handler::{CommandHandler, HandlerId, HandlerRegistry, DEFAULT_POSITION};
use crate::metadata::{ObjectKind, ObjectRef};
use crate::params::CommandParams;
use crate::processor::{Expansion, TemplateProcessor};
use crate::text::quote_identifier;

/// Handler for `object_*`, `property`, `parent`, `foreach` and `iffirst`.
#[derive(Debug, Default)]
pub struct MetadataCommands;

impl MetadataCommands {
    pub fn new() -> Self {
        Self
    }

    /// `foreach:collection:separator:text`
    fn foreach(
        processor: &mut TemplateProcessor<'_>,
        params: &CommandParams,
        object: ObjectRef<'_>,
        out: &mut String,
    ) -> Expansion {
        let collection = processor.expand_to_string(params.get_or_empty(0), Some(object))?;
        let Some(kind) = ObjectKind::from_collection(&collection) else {
            return Ok(());
        };
        let separator = processor.expand_to_string(params.get_or_empty(1), Some(object))?;
        let body = params.all_from(2);

        let mut first = true;
        for (i, child) in object.children_of(kind).into_iter().enumerate() {
            let mut item = String::new();
            processor.process_object(&mut item, &body, Some(child), i == 0)?;
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

impl CommandHandler for MetadataCommands {
    fn position(&self) -> i32 {
        DEFAULT_POSITION
    }

    fn handle_command(
        &self,
        processor: &mut TemplateProcessor<'_>,
        command: &str,
        params: &CommandParams,
        target: Option<ObjectRef<'_>>,
        out: &mut String,
    ) -> Expansion {
        let Some(object) = target else {
            return Ok(());
        };

        match command {
            "object_name" => out.push_str(object.name()),
            "object_quoted_name" => out.push_str(&quote_identifier(object.name())),
            "object_type" => out.push_str(object.kind().as_str()),
            "object_path" => out.push_str(&object.path()),
            "object_description" => out.push_str(object.description().unwrap_or_default()),
            "is_system" => out.push_str(bool_to_str(object.is_system())),
            "property" => {
                let key = processor.expand_to_string(params.get_or_empty(0), target)?;
                match object.property(&key) {
                    Some(value) => out.push_str(value),
                    None => processor.expand(out, &params.all_from(1), target)?,
                }
            }
            "parent" => {
                if let Some(parent) = object.parent() {
                    processor.expand(out, &params.all_from(0), Some(parent))?;
                }
            }
            "foreach" => Self::foreach(processor, params, object, out)?,
            "iffirst" => {
                let branch = if processor.is_first() { 0 } else { 1 };
                if let Some(text) = params.get(branch) {
                    processor.expand(out, text, target)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Registers the handlers shipped with this crate.
pub fn register_default_handlers(registry: &mut HandlerRegistry) -> Vec<HandlerId> {
    vec![registry.add_handler(MetadataCommands::new())]
}
