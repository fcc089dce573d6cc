//! Signalbox Core — domain types, market data, the strategy-script
//! language, and its sandbox.
//!
//! The crate is organized around a four-stage pipeline for running
//! untrusted strategy scripts against OHLCV data:
//! - Domain types (bars, frames, series, signal series)
//! - Script lexer, parser, and AST
//! - Capability registry and syntax validator
//! - Executor with a shared read-only global scope
//! - Result contract checker producing a per-row signal series
//!
//! Market data loading, quality validation, synthetic series, and
//! script/dataset fingerprinting round out the crate.

pub mod data;
pub mod domain;
pub mod fingerprint;
pub mod sandbox;
pub mod script;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: the types shared across threads by callers
    /// (web handlers, CLI workers) are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Frame>();
        require_sync::<domain::Frame>();
        require_send::<domain::Series>();
        require_sync::<domain::Series>();
        require_send::<domain::SignalSeries>();
        require_sync::<domain::SignalSeries>();

        require_send::<sandbox::Sandbox>();
        require_sync::<sandbox::Sandbox>();
        require_send::<sandbox::SandboxError>();
        require_sync::<sandbox::SandboxError>();

        require_send::<fingerprint::StrategyId>();
        require_sync::<fingerprint::StrategyId>();

        require_send::<data::MarketData>();
        require_sync::<data::MarketData>();
    }
}
