//! Runtime values strategy scripts compute over.

use std::fmt;

use crate::domain::{Frame, Series};

use super::exec::ExecError;
use super::modules;

/// A value bound in a script namespace.
#[derive(Debug, Clone)]
pub enum Value {
    Num(f64),
    Bool(bool),
    Str(String),
    Series(Series),
    Mask(Mask),
    Frame(Frame),
    Rolling(Rolling),
    Module(Module),
    Func(NativeFn),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Num(_) => "number",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Series(_) => "series",
            Value::Mask(_) => "mask",
            Value::Frame(_) => "frame",
            Value::Rolling(_) => "rolling window",
            Value::Module(_) => "module",
            Value::Func(_) => "function",
        }
    }
}

/// Per-row boolean series, produced by comparisons and consumed by
/// `where(...)` and mask-indexed assignment. NaN comparisons are false,
/// so undefined rows never select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    values: Vec<bool>,
}

impl Mask {
    pub fn new(values: Vec<bool>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[bool] {
        &self.values
    }

    pub fn and(&self, other: &Mask) -> Result<Mask, ExecError> {
        self.zip(other, |a, b| a && b)
    }

    pub fn or(&self, other: &Mask) -> Result<Mask, ExecError> {
        self.zip(other, |a, b| a || b)
    }

    pub fn not(&self) -> Mask {
        Mask::new(self.values.iter().map(|v| !v).collect())
    }

    fn zip(&self, other: &Mask, f: impl Fn(bool, bool) -> bool) -> Result<Mask, ExecError> {
        if self.len() != other.len() {
            return Err(ExecError::new(format!(
                "mask length mismatch: {} vs {}",
                self.len(),
                other.len()
            )));
        }
        Ok(Mask::new(
            self.values
                .iter()
                .zip(&other.values)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        ))
    }
}

/// Handle produced by `series.rolling(n)`; its `mean/sum/min/max` methods
/// yield the windowed series.
#[derive(Debug, Clone)]
pub struct Rolling {
    pub series: Series,
    pub window: usize,
}

/// A native function bound in the global namespace (a builtin, or a
/// module attribute).
#[derive(Clone, Copy)]
pub struct NativeFn {
    pub name: &'static str,
    pub call: fn(&[Value]) -> Result<Value, ExecError>,
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

/// A permitted module, bound under its short name. Attribute lookup goes
/// through a fixed dispatch table; there is nothing else to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Module {
    Ta,
    Math,
}

impl Module {
    pub fn by_name(name: &str) -> Option<Module> {
        match name {
            "ta" => Some(Module::Ta),
            "math" => Some(Module::Math),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Module::Ta => "ta",
            Module::Math => "math",
        }
    }

    pub fn attr(self, name: &str) -> Option<NativeFn> {
        match self {
            Module::Ta => modules::ta_attr(name),
            Module::Math => modules::math_attr(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_boolean_algebra() {
        let a = Mask::new(vec![true, true, false]);
        let b = Mask::new(vec![true, false, false]);
        assert_eq!(a.and(&b).unwrap().values(), &[true, false, false]);
        assert_eq!(a.or(&b).unwrap().values(), &[true, true, false]);
        assert_eq!(a.not().values(), &[false, false, true]);
    }

    #[test]
    fn mask_length_mismatch_is_an_error() {
        let a = Mask::new(vec![true]);
        let b = Mask::new(vec![true, false]);
        assert!(a.and(&b).is_err());
    }

    #[test]
    fn module_lookup() {
        assert_eq!(Module::by_name("ta"), Some(Module::Ta));
        assert_eq!(Module::by_name("os"), None);
        assert!(Module::Ta.attr("sma").is_some());
        assert!(Module::Ta.attr("__class__").is_none());
    }

    #[test]
    fn builtin_for_every_registry_name() {
        // The registry promises these names; the namespace builder binds
        // them via this table. A missing entry is a configuration bug.
        use crate::sandbox::builtins;
        use crate::sandbox::registry::CapabilityRegistry;
        let registry = CapabilityRegistry::new();
        for name in registry.builtins() {
            assert!(builtins::lookup(name).is_some(), "no builtin for {name}");
        }
        for name in registry.modules() {
            assert!(Module::by_name(name).is_some(), "no module for {name}");
        }
    }
}
