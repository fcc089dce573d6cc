//! Generate → sandbox → retry loop.
//!
//! The sandbox itself never retries; deciding what a failure means and
//! whether to ask the model again happens here. Each failure kind maps
//! to one piece of advice:
//! - policy and runtime failures want a regenerated script
//! - contract violations want the same idea with its output reshaped
//! - a script that cannot even parse is flagged as model garbage

use tracing::{info, warn};

use signalbox_core::domain::{Frame, SignalSeries};
use signalbox_core::sandbox::{Sandbox, SandboxError};

use crate::codegen::CodeGenerator;
use crate::AgentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAdvice {
    /// The script is structurally wrong; ask for a new one.
    RegenerateScript,
    /// The logic ran but the `signals` output broke the contract; ask
    /// for the same strategy with a corrected output.
    ReshapeOutput,
    /// The model is not producing parseable scripts; stop asking.
    Fatal,
}

pub fn advice_for(error: &SandboxError) -> RetryAdvice {
    match error {
        SandboxError::Parse(_) => RetryAdvice::Fatal,
        SandboxError::Policy(_) | SandboxError::Exec(_) => RetryAdvice::RegenerateScript,
        SandboxError::Contract(_) => RetryAdvice::ReshapeOutput,
    }
}

/// A script that made it through the sandbox, with the trail that got
/// it there.
#[derive(Debug, Clone)]
pub struct TestedStrategy {
    pub code: String,
    pub signals: SignalSeries,
    /// Sandbox runs spent, first attempt included.
    pub attempts: u32,
}

/// Run one candidate through the sandbox. Pure function of its inputs;
/// no retrying here.
pub fn test_strategy(
    sandbox: &Sandbox,
    code: &str,
    frame: &Frame,
) -> Result<SignalSeries, SandboxError> {
    sandbox.run_strategy(code, frame)
}

/// Ask the generator for a script and keep refining until the sandbox
/// accepts it or the attempt budget runs out.
pub fn generate_and_test(
    generator: &mut CodeGenerator,
    sandbox: &Sandbox,
    request: &str,
    frame: &Frame,
    max_fix_attempts: u32,
) -> Result<TestedStrategy, AgentError> {
    let mut code = generator.generate(request)?;
    let mut attempts = 0;
    loop {
        attempts += 1;
        match test_strategy(sandbox, &code, frame) {
            Ok(signals) => {
                info!(attempts, "strategy accepted");
                return Ok(TestedStrategy {
                    code,
                    signals,
                    attempts,
                });
            }
            Err(error) => {
                let advice = advice_for(&error);
                warn!(stage = error.stage(), ?advice, attempts, "strategy rejected");
                if advice == RetryAdvice::Fatal || attempts > max_fix_attempts {
                    return Err(AgentError::StrategyRejected {
                        attempts,
                        last_error: error.to_string(),
                    });
                }
                code = generator.refine(&error.to_string())?;
            }
        }
    }
}
