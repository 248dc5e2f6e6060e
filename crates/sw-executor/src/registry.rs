//! # Command Registry
//!
//! Maps command names to factories. A factory turns the request's arguments
//! and buffers into a fresh [`CommandRoutine`]; it may reject them up front
//! with [`CommandError::InvalidArguments`].

use crate::error::CommandError;
use crate::routine::CommandRoutine;
use serde_json::Value;
use shared_types::TransferBuffer;
use std::collections::HashMap;
use std::sync::Arc;

/// Result of building a routine.
pub type RoutineResult = Result<Box<dyn CommandRoutine>, CommandError>;

/// Creates routines for one command name.
pub trait CommandFactory: Send + Sync {
    /// Build a routine for one request.
    fn create(&self, arguments: Vec<Value>, buffers: Vec<TransferBuffer>) -> RoutineResult;
}

impl<F> CommandFactory for F
where
    F: Fn(Vec<Value>, Vec<TransferBuffer>) -> RoutineResult + Send + Sync,
{
    fn create(&self, arguments: Vec<Value>, buffers: Vec<TransferBuffer>) -> RoutineResult {
        self(arguments, buffers)
    }
}

/// Name to factory lookup table.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    factories: HashMap<String, Arc<dyn CommandFactory>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`, replacing any previous registration.
    pub fn register(&mut self, name: impl Into<String>, factory: impl CommandFactory + 'static) {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, factory: impl CommandFactory + 'static) -> Self {
        self.register(name, factory);
        self
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn CommandFactory>> {
        self.factories.get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered command names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}
