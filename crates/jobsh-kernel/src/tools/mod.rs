//! Builtin commands for jobsh.
//!
//! Builtins run inside the shell process: they need the job table and the
//! terminal, which a forked child could not change for the shell.
//!
//! # Architecture
//!
//! ```text
//! BuiltinRegistry
//! ├── jobs   list unfinished jobs
//! ├── fg     continue a job in the foreground and wait for it
//! └── bg     continue a stopped job in the background
//! ```

mod builtin;
mod context;
mod traits;

use std::collections::HashMap;

pub use builtin::{register_builtins, resolve_job};
pub use context::ExecContext;
pub use traits::Builtin;

/// Name → builtin lookup.
#[derive(Default)]
pub struct BuiltinRegistry {
    builtins: HashMap<String, Box<dyn Builtin>>,
}

impl BuiltinRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every jobsh builtin.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        register_builtins(&mut registry);
        registry
    }

    pub fn register(&mut self, builtin: impl Builtin + 'static) {
        self.builtins.insert(builtin.name().to_string(), Box::new(builtin));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Builtin> {
        self.builtins.get(name).map(Box::as_ref)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.builtins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for BuiltinRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinRegistry")
            .field("builtins", &self.names())
            .finish()
    }
}
