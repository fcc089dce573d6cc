//! End-to-end tests for the script sandbox.
//!
//! Covers:
//! 1. A moving-average crossover strategy over a small hand-checked frame
//! 2. Policy rejections (imports, dunder access) before any execution
//! 3. Contract rejections (missing output, wrong length, wrong domain)
//! 4. Call isolation: bindings never leak between runs
//! 5. Idempotence: same script + same frame = same signals
//! 6. The caller's frame is never mutated, even by column assignment

use chrono::{Duration, NaiveDate};
use signalbox_core::data::random_walk;
use signalbox_core::domain::{Bar, Frame};
use signalbox_core::sandbox::{ContractViolation, PolicyViolation, Sandbox, SandboxError};

/// Six daily bars with closes chosen so a 2/3 SMA crossover strategy
/// fires on known rows.
fn crossover_frame() -> Frame {
    let closes = [100.0, 101.0, 99.0, 102.0, 98.0, 103.0];
    let volumes = [1000.0, 1100.0, 900.0, 1200.0, 950.0, 1300.0];
    let base = NaiveDate::from_ymd_opt(2023, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let bars: Vec<Bar> = closes
        .iter()
        .zip(&volumes)
        .enumerate()
        .map(|(i, (&close, &volume))| Bar {
            timestamp: base + Duration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume,
        })
        .collect();
    Frame::from_bars(&bars)
}

const CROSSOVER_SCRIPT: &str = "\
import ta
fast = ta.sma(df[\"close\"], 2)
slow = ta.sma(df[\"close\"], 3)
signals = series(0, df)
signals[ta.crossover(fast, slow)] = 1
signals[ta.crossunder(fast, slow)] = -1
";

#[test]
fn crossover_strategy_produces_expected_signals() {
    let sandbox = Sandbox::new();
    let frame = crossover_frame();
    let signals = sandbox.run_strategy(CROSSOVER_SCRIPT, &frame).unwrap();

    // fast: [-, 100.5, 100.0, 100.5, 100.0, 100.5]
    // slow: [-, -, 100.0, 100.67, 99.67, 101.0]
    assert_eq!(signals.values(), &[0, 0, 0, -1, 1, -1]);
    assert_eq!(signals.len(), frame.len());
    assert_eq!(signals.counts(), (1, 3, 2));
}

#[test]
fn sma_comparison_strategy_holds_on_ties_and_warmup() {
    // On this frame the 2- and 4-period SMAs are equal on every row
    // where both are defined, and the first three rows have an
    // undefined long average. Neither branch fires anywhere.
    let sandbox = Sandbox::new();
    let frame = crossover_frame();
    let script = "\
import ta
short = ta.sma(df[\"close\"], 2)
long_avg = ta.sma(df[\"close\"], 4)
signals = series(0, df)
signals[short > long_avg] = 1
signals[short < long_avg] = -1
";
    let signals = sandbox.run_strategy(script, &frame).unwrap();
    assert_eq!(signals.values(), &[0, 0, 0, 0, 0, 0]);
    assert_eq!(signals.timestamps(), frame.index());
}

#[test]
fn signals_carry_the_input_timestamps() {
    let sandbox = Sandbox::new();
    let frame = crossover_frame();
    let signals = sandbox.run_strategy(CROSSOVER_SCRIPT, &frame).unwrap();
    assert_eq!(signals.timestamps(), frame.index());
}

#[test]
fn same_script_same_frame_same_signals() {
    let sandbox = Sandbox::new();
    let frame = random_walk(11, 120, 100.0);
    let first = sandbox.run_strategy(CROSSOVER_SCRIPT, &frame).unwrap();
    let second = sandbox.run_strategy(CROSSOVER_SCRIPT, &frame).unwrap();
    assert_eq!(first.values(), second.values());
}

#[test]
fn bindings_do_not_leak_between_runs() {
    let sandbox = Sandbox::new();
    let frame = crossover_frame();

    let script_a = "helper = 42\nsignals = series(0, df)";
    sandbox.run_strategy(script_a, &frame).unwrap();

    // If `helper` leaked into shared state this would execute.
    let script_b = "signals = series(0, df)\nsignals[df[\"close\"] > helper] = 1";
    let err = sandbox.run_strategy(script_b, &frame).unwrap_err();
    assert!(matches!(err, SandboxError::Exec(_)));
    assert!(err.to_string().contains("helper"));
}

#[test]
fn caller_frame_survives_column_assignment() {
    let sandbox = Sandbox::new();
    let frame = crossover_frame();
    let script = "\
df[\"fast\"] = ta.sma(df[\"close\"], 2)
signals = series(0, df)
signals[df[\"fast\"] > 100] = 1
";
    sandbox.run_strategy(script, &frame).unwrap();
    assert!(frame.column("fast").is_none());
}

#[test]
fn disallowed_import_is_rejected_before_running() {
    let sandbox = Sandbox::new();
    let frame = crossover_frame();
    let before: Vec<f64> = frame.column("close").unwrap().values().to_vec();
    let script = "import os\nsignals = series(0, df)";
    let err = sandbox.run_strategy(script, &frame).unwrap_err();
    match err {
        SandboxError::Policy(PolicyViolation::DisallowedImport { name }) => {
            assert_eq!(name, "os");
        }
        other => panic!("expected policy violation, got {other:?}"),
    }
    // Rejected before execution; the dataset was never touched.
    assert_eq!(frame.column("close").unwrap().values(), &before[..]);
}

#[test]
fn dunder_access_is_rejected() {
    let sandbox = Sandbox::new();
    let frame = crossover_frame();
    let script = "signals = df.__class__";
    let err = sandbox.run_strategy(script, &frame).unwrap_err();
    assert!(matches!(
        err,
        SandboxError::Policy(PolicyViolation::DunderAccess { .. })
    ));
}

#[test]
fn missing_signals_output_is_a_contract_violation() {
    let sandbox = Sandbox::new();
    let frame = crossover_frame();
    let err = sandbox.run_strategy("x = 1", &frame).unwrap_err();
    assert!(matches!(
        err,
        SandboxError::Contract(ContractViolation::MissingOutput { name: "signals" })
    ));
}

#[test]
fn short_signals_series_is_a_contract_violation() {
    let sandbox = Sandbox::new();
    let frame = crossover_frame();
    let script = "signals = series(0, 3)";
    let err = sandbox.run_strategy(script, &frame).unwrap_err();
    assert!(matches!(
        err,
        SandboxError::Contract(ContractViolation::LengthMismatch {
            expected: 6,
            found: 3
        })
    ));
}

#[test]
fn out_of_domain_signal_value_is_a_contract_violation() {
    let sandbox = Sandbox::new();
    let frame = crossover_frame();
    let script = "signals = series(2, df)";
    let err = sandbox.run_strategy(script, &frame).unwrap_err();
    assert!(matches!(
        err,
        SandboxError::Contract(ContractViolation::DomainViolation { index: 0, .. })
    ));
}

#[test]
fn syntax_error_reports_position() {
    let sandbox = Sandbox::new();
    let err = sandbox.check("signals = (1 + ").unwrap_err();
    match err {
        SandboxError::Parse(parse) => assert_eq!(parse.line, 1),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn rsi_mean_reversion_runs_on_synthetic_data() {
    let sandbox = Sandbox::new();
    let frame = random_walk(5, 250, 100.0);
    let script = "\
import ta
rsi = ta.rsi(df[\"close\"], 14)
signals = series(0, df)
signals[rsi < 30] = 1
signals[rsi > 70] = -1
";
    let signals = sandbox.run_strategy(script, &frame).unwrap();
    assert_eq!(signals.len(), 250);
    // Warmup rows stay flat: NaN RSI compares false against both bands.
    assert!(signals.values()[..14].iter().all(|&v| v == 0));
}

#[test]
fn check_accepts_a_script_without_data() {
    let sandbox = Sandbox::new();
    assert!(sandbox.check(CROSSOVER_SCRIPT).is_ok());
}
