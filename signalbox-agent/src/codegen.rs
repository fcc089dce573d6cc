//! Strategy code generation.
//!
//! The generator keeps one chat session per conversation, so a refine
//! request after a sandbox failure sees the script it produced and the
//! error it caused. Responses come back in strict JSON-schema mode as a
//! single `{"code": "..."}` document.

use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::client::ChatClient;
use crate::session::Session;
use crate::AgentError;

/// Pinned system prompt: the whole script language contract the model
/// writes against.
pub const SYSTEM_PROMPT: &str = "\
You write trading strategy scripts in a restricted Python-like language.

Rules:
- The input data is bound to `df`, a frame with columns \"open\", \"high\", \
\"low\", \"close\", \"volume\". Read a column with df[\"close\"].
- You MUST assign a series named `signals` with one value per row, each \
exactly -1 (sell), 0 (hold), or 1 (buy). Start with `signals = series(0, df)` \
and set rows with mask assignments like `signals[condition] = 1`.
- Only straight-line statements: imports, assignments, expressions. No \
loops, no conditionals, no function definitions, no attribute names \
starting with `__`.
- Importable modules: `ta` (sma, ema, rsi, roc, highest, lowest, shift, \
crossover, crossunder) and `math` (floor, ceil, sqrt, log, exp).
- Available builtins: abs, ceil, floor, len, max, min, round, series, sum, \
where.
- Series support .rolling(n).mean()/.sum()/.min()/.max(), .shift(n), .abs(), \
arithmetic, and comparisons producing masks. Combine masks with & and |.

Respond with JSON: {\"code\": \"<the script>\"}.";

/// Response format for strict JSON-schema mode.
pub fn code_schema() -> serde_json::Value {
    json!({
        "name": "strategy_code",
        "strict": true,
        "schema": {
            "type": "object",
            "properties": {
                "code": { "type": "string" }
            },
            "required": ["code"],
            "additionalProperties": false
        }
    })
}

#[derive(Debug, Deserialize)]
struct CodePayload {
    code: String,
}

/// Chat-backed code generator with per-conversation memory.
pub struct CodeGenerator {
    client: ChatClient,
    session: Session,
}

impl CodeGenerator {
    pub fn new(client: ChatClient, session_window: usize) -> Self {
        Self {
            client,
            session: Session::new(SYSTEM_PROMPT, session_window),
        }
    }

    /// Generate a script for a plain-language strategy description.
    pub fn generate(&mut self, request: &str) -> Result<String, AgentError> {
        info!(request_len = request.len(), "generating strategy script");
        self.ask(request.to_string())
    }

    /// Ask for a corrected script after a sandbox rejection. The failed
    /// script is already in session memory as the last assistant turn.
    pub fn refine(&mut self, error: &str) -> Result<String, AgentError> {
        info!(error = %error, "requesting script fix");
        let prompt = format!(
            "The script failed with this error:\n{error}\n\
             Produce a corrected script that satisfies the rules."
        );
        self.ask(prompt)
    }

    pub fn reset(&mut self) {
        self.session.clear();
    }

    fn ask(&mut self, prompt: String) -> Result<String, AgentError> {
        self.session.push_user(prompt);
        let raw = self
            .client
            .complete(&self.session.messages(), Some(code_schema()))?;
        self.session.push_assistant(raw.clone());
        let payload: CodePayload = serde_json::from_str(&raw)
            .map_err(|e| AgentError::MalformedResponse(e.to_string()))?;
        Ok(payload.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_requires_only_code() {
        let schema = code_schema();
        assert_eq!(schema["schema"]["required"], json!(["code"]));
        assert_eq!(schema["schema"]["additionalProperties"], json!(false));
    }

    #[test]
    fn payload_parses_model_output() {
        let payload: CodePayload =
            serde_json::from_str(r#"{"code":"signals = series(0, df)"}"#).unwrap();
        assert_eq!(payload.code, "signals = series(0, df)");
    }

    #[test]
    fn system_prompt_states_the_output_contract() {
        assert!(SYSTEM_PROMPT.contains("signals"));
        assert!(SYSTEM_PROMPT.contains("-1"));
        assert!(SYSTEM_PROMPT.contains("series(0, df)"));
    }
}
