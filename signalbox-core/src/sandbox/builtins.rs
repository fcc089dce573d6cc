//! Built-in functions bound into the global namespace.
//!
//! Only names in the Capability Registry are looked up here; the
//! consistency of the two tables is checked by a unit test. Every builtin
//! is a pure function over [`Value`]s returning `ExecError` on misuse.

use crate::domain::Series;

use super::exec::ExecError;
use super::value::{Mask, NativeFn, Value};

type BuiltinImpl = fn(&[Value]) -> Result<Value, ExecError>;

/// Resolve an allowed builtin name to its implementation.
pub fn lookup(name: &str) -> Option<NativeFn> {
    let (name, call): (&'static str, BuiltinImpl) = match name {
        "abs" => ("abs", builtin_abs),
        "ceil" => ("ceil", builtin_ceil),
        "floor" => ("floor", builtin_floor),
        "len" => ("len", builtin_len),
        "max" => ("max", builtin_max),
        "min" => ("min", builtin_min),
        "round" => ("round", builtin_round),
        "series" => ("series", builtin_series),
        "sum" => ("sum", builtin_sum),
        "where" => ("where", builtin_where),
        _ => return None,
    };
    Some(NativeFn { name, call })
}

// ── argument helpers (shared with the module tables) ─────────────

pub(super) fn expect_arity(name: &str, args: &[Value], n: usize) -> Result<(), ExecError> {
    if args.len() != n {
        return Err(ExecError::new(format!(
            "{name}() takes {n} argument(s), got {}",
            args.len()
        )));
    }
    Ok(())
}

pub(super) fn arg_num(name: &str, args: &[Value], i: usize) -> Result<f64, ExecError> {
    match args.get(i) {
        Some(Value::Num(v)) => Ok(*v),
        Some(other) => Err(ExecError::new(format!(
            "{name}() argument {} must be a number, found {}",
            i + 1,
            other.type_name()
        ))),
        None => Err(ExecError::new(format!("{name}() missing argument {}", i + 1))),
    }
}

pub(super) fn arg_series<'a>(
    name: &str,
    args: &'a [Value],
    i: usize,
) -> Result<&'a Series, ExecError> {
    match args.get(i) {
        Some(Value::Series(s)) => Ok(s),
        Some(other) => Err(ExecError::new(format!(
            "{name}() argument {} must be a series, found {}",
            i + 1,
            other.type_name()
        ))),
        None => Err(ExecError::new(format!("{name}() missing argument {}", i + 1))),
    }
}

pub(super) fn arg_mask<'a>(name: &str, args: &'a [Value], i: usize) -> Result<&'a Mask, ExecError> {
    match args.get(i) {
        Some(Value::Mask(m)) => Ok(m),
        Some(other) => Err(ExecError::new(format!(
            "{name}() argument {} must be a mask, found {}",
            i + 1,
            other.type_name()
        ))),
        None => Err(ExecError::new(format!("{name}() missing argument {}", i + 1))),
    }
}

/// Non-negative integral number argument (window sizes, lengths).
pub(super) fn arg_usize(name: &str, args: &[Value], i: usize) -> Result<usize, ExecError> {
    let v = arg_num(name, args, i)?;
    if !v.is_finite() || v.fract() != 0.0 || v < 0.0 {
        return Err(ExecError::new(format!(
            "{name}() argument {} must be a non-negative integer, found {v}",
            i + 1
        )));
    }
    Ok(v as usize)
}

/// Integral number argument that may be negative (shift offsets).
pub(super) fn arg_int(name: &str, args: &[Value], i: usize) -> Result<i64, ExecError> {
    let v = arg_num(name, args, i)?;
    if !v.is_finite() || v.fract() != 0.0 {
        return Err(ExecError::new(format!(
            "{name}() argument {} must be an integer, found {v}",
            i + 1
        )));
    }
    Ok(v as i64)
}

// ── builtins ─────────────────────────────────────────────────────

fn builtin_len(args: &[Value]) -> Result<Value, ExecError> {
    expect_arity("len", args, 1)?;
    let len = match &args[0] {
        Value::Series(s) => s.len(),
        Value::Mask(m) => m.len(),
        Value::Frame(f) => f.len(),
        Value::Str(s) => s.chars().count(),
        other => {
            return Err(ExecError::new(format!(
                "len() does not apply to {}",
                other.type_name()
            )))
        }
    };
    Ok(Value::Num(len as f64))
}

fn builtin_abs(args: &[Value]) -> Result<Value, ExecError> {
    elementwise("abs", args, f64::abs)
}

fn builtin_round(args: &[Value]) -> Result<Value, ExecError> {
    elementwise("round", args, f64::round)
}

fn builtin_floor(args: &[Value]) -> Result<Value, ExecError> {
    elementwise("floor", args, f64::floor)
}

fn builtin_ceil(args: &[Value]) -> Result<Value, ExecError> {
    elementwise("ceil", args, f64::ceil)
}

/// Apply a scalar function to a number, or elementwise to a series.
pub(super) fn elementwise(
    name: &str,
    args: &[Value],
    f: fn(f64) -> f64,
) -> Result<Value, ExecError> {
    expect_arity(name, args, 1)?;
    match &args[0] {
        Value::Num(v) => Ok(Value::Num(f(*v))),
        Value::Series(s) => Ok(Value::Series(s.map(f))),
        other => Err(ExecError::new(format!(
            "{name}() does not apply to {}",
            other.type_name()
        ))),
    }
}

fn builtin_min(args: &[Value]) -> Result<Value, ExecError> {
    reduce("min", args, Series::min, f64::min)
}

fn builtin_max(args: &[Value]) -> Result<Value, ExecError> {
    reduce("max", args, Series::max, f64::max)
}

fn builtin_sum(args: &[Value]) -> Result<Value, ExecError> {
    reduce("sum", args, Series::sum, |a, b| a + b)
}

/// `f(series)` reduces a single series; `f(a, b, ...)` folds numbers.
fn reduce(
    name: &str,
    args: &[Value],
    series_reduce: fn(&Series) -> f64,
    fold: fn(f64, f64) -> f64,
) -> Result<Value, ExecError> {
    match args {
        [Value::Series(s)] => Ok(Value::Num(series_reduce(s))),
        [] => Err(ExecError::new(format!("{name}() takes at least 1 argument"))),
        _ => {
            let mut acc: Option<f64> = None;
            for (i, _) in args.iter().enumerate() {
                let v = arg_num(name, args, i)?;
                acc = Some(match acc {
                    Some(a) => fold(a, v),
                    None => v,
                });
            }
            // acc is always Some: args is non-empty here.
            Ok(Value::Num(acc.unwrap_or(f64::NAN)))
        }
    }
}

/// `series(value, n)` or `series(value, df)` — a constant series, one
/// value per row. The frame form mirrors `pd.Series(0, index=df.index)`.
fn builtin_series(args: &[Value]) -> Result<Value, ExecError> {
    expect_arity("series", args, 2)?;
    let value = arg_num("series", args, 0)?;
    let len = match &args[1] {
        Value::Num(_) => arg_usize("series", args, 1)?,
        Value::Frame(f) => f.len(),
        other => {
            return Err(ExecError::new(format!(
                "series() argument 2 must be a length or a frame, found {}",
                other.type_name()
            )))
        }
    };
    Ok(Value::Series(Series::constant(len, value)))
}

/// `where(mask, a, b)` — per-row select: `a` where the mask is true,
/// `b` elsewhere. `a`/`b` are numbers or series of the mask's length.
fn builtin_where(args: &[Value]) -> Result<Value, ExecError> {
    expect_arity("where", args, 3)?;
    let mask = arg_mask("where", args, 0)?;
    let len = mask.len();
    let pick = |arg: &Value, i: usize, argno: usize| -> Result<f64, ExecError> {
        match arg {
            Value::Num(v) => Ok(*v),
            Value::Series(s) if s.len() == len => Ok(s.values()[i]),
            Value::Series(s) => Err(ExecError::new(format!(
                "where() argument {argno} has length {}, expected {len}",
                s.len()
            ))),
            other => Err(ExecError::new(format!(
                "where() argument {argno} must be a number or series, found {}",
                other.type_name()
            ))),
        }
    };
    let mut out = Vec::with_capacity(len);
    for (i, &selected) in mask.values().iter().enumerate() {
        let v = if selected {
            pick(&args[1], i, 2)?
        } else {
            pick(&args[2], i, 3)?
        };
        out.push(v);
    }
    Ok(Value::Series(Series::new(out)))
}
