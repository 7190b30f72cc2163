//! Lifecycle events
//!
//! The engine never prints. It reports progress through an [`EventEmitter`]
//! and front ends decide how to present it. Handlers run synchronously, in
//! registration order, and cannot influence the outcome of an operation.

use crate::migrations::MigrationDirection;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Unique identifier for event handlers
pub type HandlerId = usize;

/// Event handler function type
pub type EventHandlerFn = Arc<dyn Fn(&MigrationEvent) + Send + Sync>;

/// Everything the engine reports while it works
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationEvent {
    /// Migrations found on disk
    Discovered { count: usize },
    /// A batch is about to be applied
    ApplyBatch {
        direction: MigrationDirection,
        names: Vec<String>,
    },
    /// A migration is about to run in its own transaction
    ApplyMigration {
        name: String,
        direction: MigrationDirection,
    },
    /// A step was queued into the migration's transaction
    ApplyStep { path: String },
    MigrationDirectoryCreated { path: String },
    DirectionDirectoryCreated { path: String },
    StepFileCreated { path: String },
    /// `init` wrote a configuration file
    InitSuccess,
    /// `init` found an existing configuration file
    InitNoop,
}

/// Event emitter for lifecycle events
#[derive(Clone, Default)]
pub struct EventEmitter {
    handlers: BTreeMap<HandlerId, EventHandlerFn>,
    next_id: HandlerId,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for every event
    pub fn on<F>(&mut self, handler: F) -> HandlerId
    where
        F: Fn(&MigrationEvent) + Send + Sync + 'static,
    {
        self.next_id += 1;
        let id = self.next_id;
        self.handlers.insert(id, Arc::new(handler));
        id
    }

    /// Remove a handler. Returns `false` if the id is unknown.
    pub fn off(&mut self, id: HandlerId) -> bool {
        self.handlers.remove(&id).is_some()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn emit(&self, event: MigrationEvent) {
        log::trace!("Event: {:?}", event);
        for handler in self.handlers.values() {
            handler(&event);
        }
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
