//! Signalbox Agent — chat-driven strategy generation on top of the
//! sandbox.
//!
//! - Chat completions client with retry/backoff
//! - Code generator with per-conversation session memory
//! - Generate → sandbox → refine pipeline
//! - On-disk strategy store

pub mod client;
pub mod codegen;
pub mod config;
pub mod pipeline;
pub mod session;
pub mod store;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Client(#[from] client::ClientError),

    #[error(transparent)]
    Store(#[from] store::StoreError),

    #[error("model response was not the expected JSON document: {0}")]
    MalformedResponse(String),

    #[error("no accepted strategy after {attempts} attempts, last error: {last_error}")]
    StrategyRejected { attempts: u32, last_error: String },
}
