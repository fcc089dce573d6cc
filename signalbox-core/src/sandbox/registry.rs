//! Capability Registry — the fixed allow-list every sandbox component
//! enforces.
//!
//! Centralizing the allow-list means the validator, the namespace builder,
//! and the executor all enforce the same boundary, and the set can be
//! audited and tested independently of execution logic. The registry is
//! read-only after construction and must never contain a name granting
//! reflection, filesystem, network, or process access.

use std::collections::BTreeSet;

/// Modules a script may import.
pub const ALLOWED_MODULES: &[&str] = &["ta", "math"];

/// Built-in functions bound into the global namespace.
pub const ALLOWED_BUILTINS: &[&str] = &[
    "abs", "ceil", "floor", "len", "max", "min", "round", "series", "sum", "where",
];

/// Prefix of the reflection/internal-access naming convention. Any
/// attribute starting with this is rejected before execution.
pub const DUNDER_PREFIX: &str = "__";

#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    modules: BTreeSet<&'static str>,
    builtins: BTreeSet<&'static str>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            modules: ALLOWED_MODULES.iter().copied().collect(),
            builtins: ALLOWED_BUILTINS.iter().copied().collect(),
        }
    }

    /// Pure lookup; no side effects, no error conditions.
    pub fn is_module_allowed(&self, name: &str) -> bool {
        self.modules.contains(name)
    }

    /// Pure lookup; no side effects, no error conditions.
    pub fn is_builtin_allowed(&self, name: &str) -> bool {
        self.builtins.contains(name)
    }

    pub fn modules(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.modules.iter().copied()
    }

    pub fn builtins(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.builtins.iter().copied()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
