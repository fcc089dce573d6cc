//! Namespace Builder — the two-tier binding environment scripts run in.
//!
//! Globals are built once per sandbox from the Capability Registry and
//! are read-only thereafter; locals are rebuilt from scratch for every
//! invocation with exactly one seed binding (the input frame under
//! [`INPUT_BINDING`]), so nothing leaks between unrelated scripts.

use std::collections::HashMap;

use crate::domain::Frame;

use super::builtins;
use super::registry::CapabilityRegistry;
use super::value::{Module, Value};

/// Name the input dataset is bound under. Script authors see this name in
/// the generator prompt.
pub const INPUT_BINDING: &str = "df";

/// A name → value binding map.
pub type Namespace = HashMap<String, Value>;

/// Build the shared global scope: allowed builtins bound to their native
/// implementations, and each allowed module under its short name.
pub fn build_globals(registry: &CapabilityRegistry) -> Namespace {
    let mut globals = Namespace::new();
    for name in registry.builtins() {
        if let Some(f) = builtins::lookup(name) {
            globals.insert(name.to_string(), Value::Func(f));
        }
    }
    for name in registry.modules() {
        if let Some(module) = Module::by_name(name) {
            globals.insert(name.to_string(), Value::Module(module));
        }
    }
    globals
}

/// Build a fresh per-call local scope seeded with a copy of the input
/// frame. The caller's frame is cloned, never aliased: scripts mutate
/// their copy only.
pub fn build_locals(frame: &Frame) -> Namespace {
    let mut locals = Namespace::new();
    locals.insert(INPUT_BINDING.to_string(), Value::Frame(frame.clone()));
    locals
}
