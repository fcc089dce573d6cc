//! Sandboxed execution of strategy scripts.
//!
//! The pipeline has four stages, each with its own error type:
//!
//! 1. parse — source text to statement list ([`ParseError`])
//! 2. validate — capability policy over the tree ([`PolicyViolation`])
//! 3. execute — evaluation in a two-scope namespace ([`ExecError`])
//! 4. contract — the `signals` output check ([`ContractViolation`])
//!
//! [`Sandbox`] owns the registry and the shared global scope and runs
//! the stages in order; nothing downstream ever sees a script that an
//! earlier stage rejected.

pub mod contract;
pub mod exec;
pub mod namespace;
pub mod registry;
pub mod validator;

mod builtins;
mod modules;
mod value;

pub use contract::{ContractViolation, OUTPUT_BINDING};
pub use exec::ExecError;
pub use namespace::{Namespace, INPUT_BINDING};
pub use registry::CapabilityRegistry;
pub use validator::PolicyViolation;
pub use value::Value;

use thiserror::Error;

use crate::domain::{Frame, SignalSeries};
use crate::script::{parse, ParseError, Stmt};

/// Any failure along the pipeline, tagged by stage.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SandboxError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Contract(#[from] ContractViolation),
}

impl SandboxError {
    /// Pipeline stage that produced the error, for log fields and
    /// retry decisions.
    pub fn stage(&self) -> &'static str {
        match self {
            SandboxError::Parse(_) => "parse",
            SandboxError::Policy(_) => "validate",
            SandboxError::Exec(_) => "execute",
            SandboxError::Contract(_) => "contract",
        }
    }
}

/// Capability registry plus the global scope built from it. Build one
/// and reuse it across calls; per-call state lives entirely in the
/// locals each run creates.
#[derive(Debug)]
pub struct Sandbox {
    registry: CapabilityRegistry,
    globals: Namespace,
}

impl Sandbox {
    pub fn new() -> Self {
        Self::with_registry(CapabilityRegistry::new())
    }

    pub fn with_registry(registry: CapabilityRegistry) -> Self {
        let globals = namespace::build_globals(&registry);
        Self { registry, globals }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Static half of the pipeline: parse and policy-check without
    /// executing. Returns the validated statements.
    pub fn check(&self, source: &str) -> Result<Vec<Stmt>, SandboxError> {
        let stmts = parse(source)?;
        validator::validate(&stmts, &self.registry)?;
        Ok(stmts)
    }

    /// Full pipeline minus the contract: returns every local binding
    /// the script produced. The caller's frame is never mutated.
    pub fn run(&self, source: &str, frame: &Frame) -> Result<Namespace, SandboxError> {
        let stmts = self.check(source)?;
        let bindings = exec::run(&self.globals, &stmts, frame)?;
        Ok(bindings)
    }

    /// Full pipeline: returns the per-row signal series or the first
    /// error along the way.
    pub fn run_strategy(&self, source: &str, frame: &Frame) -> Result<SignalSeries, SandboxError> {
        let bindings = self.run(source, frame)?;
        let signals = contract::extract_signals(&bindings, frame)?;
        Ok(signals)
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use chrono::NaiveDate;

    fn frame(closes: &[f64]) -> Frame {
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                timestamp: NaiveDate::from_ymd_opt(2023, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
                    + chrono::Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000.0,
            })
            .collect();
        Frame::from_bars(&bars)
    }

    #[test]
    fn stage_tags_follow_the_pipeline() {
        let sandbox = Sandbox::new();
        let data = frame(&[100.0, 101.0]);

        let parse = sandbox.run_strategy("x = ", &data).unwrap_err();
        assert_eq!(parse.stage(), "parse");

        let policy = sandbox.run_strategy("import os", &data).unwrap_err();
        assert_eq!(policy.stage(), "validate");

        let exec = sandbox.run_strategy("signals = nope", &data).unwrap_err();
        assert_eq!(exec.stage(), "execute");

        let contract = sandbox.run_strategy("x = 1", &data).unwrap_err();
        assert_eq!(contract.stage(), "contract");
    }

    #[test]
    fn validated_script_runs_end_to_end() {
        let sandbox = Sandbox::new();
        let data = frame(&[100.0, 101.0, 99.0]);
        let src = "signals = series(0, df)\n\
                   signals[df[\"close\"] > 100] = 1";
        let signals = sandbox.run_strategy(src, &data).unwrap();
        assert_eq!(signals.values(), &[0, 1, 0]);
    }

    #[test]
    fn policy_rejection_happens_before_execution() {
        let sandbox = Sandbox::new();
        let data = frame(&[100.0]);
        // The import would also fail at runtime, but the policy stage
        // must claim it first.
        let err = sandbox
            .run_strategy("import subprocess\nsignals = series(0, df)", &data)
            .unwrap_err();
        assert!(matches!(err, SandboxError::Policy(_)));
    }
}
