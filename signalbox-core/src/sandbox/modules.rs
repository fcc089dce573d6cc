//! Permitted modules: `ta` (indicator toolkit) and `math`.
//!
//! Indicator conventions: the first valid value appears after the
//! warmup window (NaN before that), EMA seeds with the SMA of the first
//! window, and RSI uses Wilder smoothing with avg_loss == 0 → 100,
//! avg_gain == 0 → 0, neither moving → 50.

use crate::domain::Series;

use super::builtins::{arg_int, arg_series, arg_usize, elementwise, expect_arity};
use super::exec::ExecError;
use super::value::{Mask, NativeFn, Value};

type ModuleImpl = fn(&[Value]) -> Result<Value, ExecError>;

pub(super) fn ta_attr(name: &str) -> Option<NativeFn> {
    let (name, call): (&'static str, ModuleImpl) = match name {
        "sma" => ("sma", ta_sma),
        "ema" => ("ema", ta_ema),
        "rsi" => ("rsi", ta_rsi),
        "highest" => ("highest", ta_highest),
        "lowest" => ("lowest", ta_lowest),
        "shift" => ("shift", ta_shift),
        "roc" => ("roc", ta_roc),
        "crossover" => ("crossover", ta_crossover),
        "crossunder" => ("crossunder", ta_crossunder),
        _ => return None,
    };
    Some(NativeFn { name, call })
}

pub(super) fn math_attr(name: &str) -> Option<NativeFn> {
    let (name, call): (&'static str, ModuleImpl) = match name {
        "floor" => ("floor", |args| elementwise("floor", args, f64::floor)),
        "ceil" => ("ceil", |args| elementwise("ceil", args, f64::ceil)),
        "sqrt" => ("sqrt", |args| elementwise("sqrt", args, f64::sqrt)),
        "log" => ("log", |args| elementwise("log", args, f64::ln)),
        "exp" => ("exp", |args| elementwise("exp", args, f64::exp)),
        _ => return None,
    };
    Some(NativeFn { name, call })
}

// ── ta ───────────────────────────────────────────────────────────

fn ta_sma(args: &[Value]) -> Result<Value, ExecError> {
    expect_arity("sma", args, 2)?;
    let s = arg_series("sma", args, 0)?;
    let period = window("sma", args)?;
    Ok(Value::Series(s.rolling_mean(period)))
}

fn ta_highest(args: &[Value]) -> Result<Value, ExecError> {
    expect_arity("highest", args, 2)?;
    let s = arg_series("highest", args, 0)?;
    let period = window("highest", args)?;
    Ok(Value::Series(s.rolling_max(period)))
}

fn ta_lowest(args: &[Value]) -> Result<Value, ExecError> {
    expect_arity("lowest", args, 2)?;
    let s = arg_series("lowest", args, 0)?;
    let period = window("lowest", args)?;
    Ok(Value::Series(s.rolling_min(period)))
}

fn ta_shift(args: &[Value]) -> Result<Value, ExecError> {
    expect_arity("shift", args, 2)?;
    let s = arg_series("shift", args, 0)?;
    let n = arg_int("shift", args, 1)?;
    Ok(Value::Series(s.shift(n)))
}

fn ta_ema(args: &[Value]) -> Result<Value, ExecError> {
    expect_arity("ema", args, 2)?;
    let s = arg_series("ema", args, 0)?;
    let period = window("ema", args)?;
    let values = s.values();
    let n = values.len();
    let mut out = vec![f64::NAN; n];

    if period <= n {
        let alpha = 2.0 / (period as f64 + 1.0);
        let seed_window = &values[..period];
        if !seed_window.iter().any(|v| v.is_nan()) {
            let mut prev = seed_window.iter().sum::<f64>() / period as f64;
            out[period - 1] = prev;
            for i in period..n {
                if values[i].is_nan() {
                    // Tainted from here on.
                    break;
                }
                prev = alpha * values[i] + (1.0 - alpha) * prev;
                out[i] = prev;
            }
        }
    }
    Ok(Value::Series(Series::new(out)))
}

fn ta_rsi(args: &[Value]) -> Result<Value, ExecError> {
    expect_arity("rsi", args, 2)?;
    let s = arg_series("rsi", args, 0)?;
    let period = window("rsi", args)?;
    let values = s.values();
    let n = values.len();
    let mut out = vec![f64::NAN; n];

    if n < period + 1 {
        return Ok(Value::Series(Series::new(out)));
    }

    let mut changes = vec![f64::NAN; n];
    for i in 1..n {
        changes[i] = values[i] - values[i - 1];
    }

    // Seed averages over the first `period` changes.
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for &ch in &changes[1..=period] {
        if ch.is_nan() {
            return Ok(Value::Series(Series::new(out)));
        }
        if ch > 0.0 {
            avg_gain += ch;
        } else {
            avg_loss -= ch;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = rsi_value(avg_gain, avg_loss);

    // Wilder smoothing.
    let alpha = 1.0 / period as f64;
    for i in (period + 1)..n {
        if changes[i].is_nan() {
            break;
        }
        let gain = changes[i].max(0.0);
        let loss = (-changes[i]).max(0.0);
        avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;
        out[i] = rsi_value(avg_gain, avg_loss);
    }
    Ok(Value::Series(Series::new(out)))
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

fn ta_roc(args: &[Value]) -> Result<Value, ExecError> {
    expect_arity("roc", args, 2)?;
    let s = arg_series("roc", args, 0)?;
    let period = window("roc", args)?;
    let values = s.values();
    let mut out = vec![f64::NAN; values.len()];
    for i in period..values.len() {
        let base = values[i - period];
        if base != 0.0 {
            out[i] = (values[i] / base - 1.0) * 100.0;
        }
    }
    Ok(Value::Series(Series::new(out)))
}

/// True on rows where `a` closes above `b` after being at or below it on
/// the previous row. Rows with undefined values never fire.
fn ta_crossover(args: &[Value]) -> Result<Value, ExecError> {
    cross("crossover", args, |prev_a, prev_b, a, b| {
        prev_a <= prev_b && a > b
    })
}

fn ta_crossunder(args: &[Value]) -> Result<Value, ExecError> {
    cross("crossunder", args, |prev_a, prev_b, a, b| {
        prev_a >= prev_b && a < b
    })
}

fn cross(
    name: &str,
    args: &[Value],
    fires: fn(f64, f64, f64, f64) -> bool,
) -> Result<Value, ExecError> {
    expect_arity(name, args, 2)?;
    let a = arg_series(name, args, 0)?;
    let b = arg_series(name, args, 1)?;
    if a.len() != b.len() {
        return Err(ExecError::new(format!(
            "{name}() series lengths differ: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    let av = a.values();
    let bv = b.values();
    let mut out = vec![false; av.len()];
    for i in 1..av.len() {
        let vals = [av[i - 1], bv[i - 1], av[i], bv[i]];
        if vals.iter().any(|v| v.is_nan()) {
            continue;
        }
        out[i] = fires(vals[0], vals[1], vals[2], vals[3]);
    }
    Ok(Value::Mask(Mask::new(out)))
}

fn window(name: &str, args: &[Value]) -> Result<usize, ExecError> {
    let period = arg_usize(name, args, 1)?;
    if period == 0 {
        return Err(ExecError::new(format!("{name}() window must be >= 1")));
    }
    Ok(period)
}
