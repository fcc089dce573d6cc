//! Result contract — what a strategy script owes its caller.
//!
//! A run is only useful if it leaves a binding named [`OUTPUT_BINDING`]
//! holding one signal per input row, each drawn from {-1, 0, 1}. The
//! checker turns the raw local bindings into a [`SignalSeries`] or
//! explains exactly which clause of the contract was broken, so the
//! message can be fed back to a code generator for a retry.

use thiserror::Error;

use crate::domain::{Frame, SignalSeries};

use super::namespace::Namespace;
use super::value::Value;

/// Name the script must bind its output under.
pub const OUTPUT_BINDING: &str = "signals";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ContractViolation {
    #[error("script did not produce a '{name}' output")]
    MissingOutput { name: &'static str },

    #[error("'{name}' must be a series, found {found}")]
    WrongType {
        name: &'static str,
        found: &'static str,
    },

    #[error("'signals' has {found} rows but the input has {expected}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("'signals' row {index} is {value}, expected -1, 0, or 1")]
    DomainViolation { index: usize, value: f64 },
}

/// Checks the contract against the final bindings and pairs each signal
/// with its input timestamp.
pub fn extract_signals(
    bindings: &Namespace,
    frame: &Frame,
) -> Result<SignalSeries, ContractViolation> {
    let value = bindings
        .get(OUTPUT_BINDING)
        .ok_or(ContractViolation::MissingOutput {
            name: OUTPUT_BINDING,
        })?;
    let series = match value {
        Value::Series(s) => s,
        other => {
            return Err(ContractViolation::WrongType {
                name: OUTPUT_BINDING,
                found: other.type_name(),
            })
        }
    };
    if series.len() != frame.len() {
        return Err(ContractViolation::LengthMismatch {
            expected: frame.len(),
            found: series.len(),
        });
    }
    let mut signals = Vec::with_capacity(series.len());
    for (index, &value) in series.values().iter().enumerate() {
        match value {
            v if v == -1.0 => signals.push(-1),
            v if v == 0.0 => signals.push(0),
            v if v == 1.0 => signals.push(1),
            value => return Err(ContractViolation::DomainViolation { index, value }),
        }
    }
    Ok(SignalSeries::new(frame.index().to_vec(), signals))
}
