//! Pluggable command handlers.
//!
//! Commands that are not built into the processor are offered to every
//! registered handler in ascending position order. Handlers decide for
//! themselves whether a command name applies to them; the registry does not
//! filter. Registration is explicit: build the registry, add each handler,
//! then hand the registry to the processors that should see them.

use crate::metadata::ObjectRef;
use crate::params::CommandParams;
use crate::processor::{Expansion, TemplateProcessor};
use log::debug;
use std::cell::{Cell, RefCell};

/// Position used by handlers that do not care about ordering.
pub const DEFAULT_POSITION: i32 = 100;

/// A contributor of template commands.
pub trait CommandHandler {
    /// Handlers with lower positions run first.
    fn position(&self) -> i32 {
        DEFAULT_POSITION
    }

    /// Handles `command` if it applies to this handler, appending to `out`.
    ///
    /// Returning `Err(Aborted)` stops the whole expansion; handlers that
    /// expand parameters through the processor must propagate it with `?`.
    fn handle_command(
        &self,
        processor: &mut TemplateProcessor<'_>,
        command: &str,
        params: &CommandParams,
        target: Option<ObjectRef<'_>>,
        out: &mut String,
    ) -> Expansion;
}

/// Token returned on registration, used to remove the handler again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Entry {
    id: HandlerId,
    handler: Box<dyn CommandHandler>,
}

/// Ordered collection of command handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    entries: RefCell<Vec<Entry>>,
    sorted: Cell<bool>,
    next_id: u64,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler; ordering is restored lazily on the next dispatch.
    pub fn add_handler<H: CommandHandler + 'static>(&mut self, handler: H) -> HandlerId {
        self.add_boxed(Box::new(handler))
    }

    pub fn add_boxed(&mut self, handler: Box<dyn CommandHandler>) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.entries.get_mut().push(Entry { id, handler });
        self.sorted.set(false);
        id
    }

    /// Removes a handler, returning it. The id is not valid afterwards.
    pub fn remove_handler(&mut self, id: HandlerId) -> Option<Box<dyn CommandHandler>> {
        let entries = self.entries.get_mut();
        let index = entries.iter().position(|entry| entry.id == id)?;
        Some(entries.remove(index).handler)
    }

    pub fn contains(&self, id: HandlerId) -> bool {
        self.entries.borrow().iter().any(|entry| entry.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Offers a command to every handler, lowest position first.
    ///
    /// A command no handler recognizes produces no output.
    pub fn dispatch(
        &self,
        processor: &mut TemplateProcessor<'_>,
        command: &str,
        params: &CommandParams,
        target: Option<ObjectRef<'_>>,
        out: &mut String,
    ) -> Expansion {
        if !self.sorted.get() {
            // Stable sort: equal positions keep registration order.
            self.entries
                .borrow_mut()
                .sort_by_key(|entry| entry.handler.position());
            self.sorted.set(true);
        }

        let entries = self.entries.borrow();
        debug!("Dispatching '{}' to {} handler(s)", command, entries.len());
        for entry in entries.iter() {
            entry
                .handler
                .handle_command(processor, command, params, target, out)?;
        }
        Ok(())
    }
}
