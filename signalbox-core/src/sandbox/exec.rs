//! Executor — runs a validated script against the two namespaces.
//!
//! Reads consult locals first, then globals; writes always land in
//! locals. Globals are never mutated (assignment into a global-bound
//! name is an error), which is what makes the shared global scope safe
//! to reuse across calls without locking.
//!
//! Every runtime fault is converted into an [`ExecError`]; the caller
//! never sees a panic or an unhandled failure from this component. There
//! is no timeout or memory accounting: scripts are straight-line, so
//! termination is structural, and allocation is bounded by the input
//! size and window arithmetic.
//!
//! Precondition: the script has passed the Syntax Validator. The
//! executor does not re-validate; the [`Sandbox`](super::Sandbox) facade
//! enforces the ordering.

use thiserror::Error;

use crate::domain::{Frame, Series};
use crate::script::{BinOp, CmpOp, Expr, Stmt, Target, UnaryOp};

use super::namespace::{build_locals, Namespace};
use super::value::{Mask, Module, Rolling, Value};

/// Script passed policy checks but raised or faulted while running.
/// The sandbox state is discarded; only the message survives.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("execution error: {message}")]
pub struct ExecError {
    pub message: String,
}

impl ExecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Evaluate the statement list and return the final local bindings
/// verbatim. The caller's frame is cloned into the local scope and never
/// mutated.
pub fn run(globals: &Namespace, stmts: &[Stmt], frame: &Frame) -> Result<Namespace, ExecError> {
    let mut env = Env {
        globals,
        locals: build_locals(frame),
    };
    for stmt in stmts {
        env.exec_stmt(stmt)?;
    }
    Ok(env.locals)
}

struct Env<'a> {
    globals: &'a Namespace,
    locals: Namespace,
}

impl Env<'_> {
    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<(), ExecError> {
        match stmt {
            Stmt::Import { module } => {
                let m = Module::by_name(module).ok_or_else(|| {
                    ExecError::new(format!("module '{module}' is not available"))
                })?;
                self.locals.insert(module.clone(), Value::Module(m));
                Ok(())
            }
            Stmt::FromImport { module, names } => {
                let m = Module::by_name(module).ok_or_else(|| {
                    ExecError::new(format!("module '{module}' is not available"))
                })?;
                for name in names {
                    let f = m.attr(name).ok_or_else(|| {
                        ExecError::new(format!(
                            "module '{module}' has no attribute '{name}'"
                        ))
                    })?;
                    self.locals.insert(name.clone(), Value::Func(f));
                }
                Ok(())
            }
            Stmt::Assign { target, value } => {
                let value = self.eval(value)?;
                self.assign(target, value)
            }
            Stmt::Expr(expr) => {
                self.eval(expr)?;
                Ok(())
            }
        }
    }

    fn assign(&mut self, target: &Target, value: Value) -> Result<(), ExecError> {
        match target {
            Target::Name(name) => {
                self.locals.insert(name.clone(), value);
                Ok(())
            }
            Target::Subscript { object, index } => {
                let index = self.eval(index)?;
                if !self.locals.contains_key(object) {
                    if self.globals.contains_key(object) {
                        return Err(ExecError::new(format!(
                            "cannot assign into read-only global '{object}'"
                        )));
                    }
                    return Err(ExecError::new(format!("name '{object}' is not defined")));
                }
                // contains_key above guarantees the entry exists.
                let slot = self
                    .locals
                    .get_mut(object)
                    .ok_or_else(|| ExecError::new(format!("name '{object}' is not defined")))?;
                match slot {
                    Value::Frame(frame) => assign_column(frame, &index, value),
                    Value::Series(series) => assign_elements(series, &index, value),
                    other => Err(ExecError::new(format!(
                        "cannot index-assign into {}",
                        other.type_name()
                    ))),
                }
            }
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, ExecError> {
        match expr {
            Expr::Num(v) => Ok(Value::Num(*v)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Name(name) => self.lookup(name),
            Expr::Unary { op, operand } => {
                let v = self.eval(operand)?;
                unary(*op, v)
            }
            Expr::Binary { op, left, right } => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                binary(*op, l, r)
            }
            Expr::Compare { op, left, right } => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                compare(*op, l, r)
            }
            Expr::Call { func, args } => {
                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated.push(self.eval(arg)?);
                }
                // Method calls dispatch on the receiver without
                // materializing a bound-method value.
                if let Expr::Attribute { object, name } = func.as_ref() {
                    let receiver = self.eval(object)?;
                    return call_method(receiver, name, &evaluated);
                }
                match self.eval(func)? {
                    Value::Func(f) => (f.call)(&evaluated),
                    other => Err(ExecError::new(format!(
                        "{} is not callable",
                        other.type_name()
                    ))),
                }
            }
            Expr::Attribute { object, name } => {
                let receiver = self.eval(object)?;
                match receiver {
                    Value::Module(m) => m.attr(name).map(Value::Func).ok_or_else(|| {
                        ExecError::new(format!(
                            "module '{}' has no attribute '{name}'",
                            m.name()
                        ))
                    }),
                    other => Err(ExecError::new(format!(
                        "{} has no attribute '{name}'",
                        other.type_name()
                    ))),
                }
            }
            Expr::Subscript { object, index } => {
                let receiver = self.eval(object)?;
                let index = self.eval(index)?;
                subscript(receiver, index)
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<Value, ExecError> {
        if let Some(v) = self.locals.get(name) {
            return Ok(v.clone());
        }
        if let Some(v) = self.globals.get(name) {
            return Ok(v.clone());
        }
        Err(ExecError::new(format!("name '{name}' is not defined")))
    }
}

// ── assignment helpers ───────────────────────────────────────────

/// `df["col"] = series_or_number`
fn assign_column(frame: &mut Frame, index: &Value, value: Value) -> Result<(), ExecError> {
    let name = match index {
        Value::Str(s) => s,
        other => {
            return Err(ExecError::new(format!(
                "frame columns are indexed by name, found {}",
                other.type_name()
            )))
        }
    };
    let series = match value {
        Value::Series(s) => s,
        Value::Num(v) => Series::constant(frame.len(), v),
        other => {
            return Err(ExecError::new(format!(
                "cannot store {} in a frame column",
                other.type_name()
            )))
        }
    };
    frame
        .set_column(name, series)
        .map_err(|e| ExecError::new(e.to_string()))
}

/// `signals[mask] = v` or `signals[i] = v`
fn assign_elements(series: &mut Series, index: &Value, value: Value) -> Result<(), ExecError> {
    match index {
        Value::Mask(mask) => {
            if mask.len() != series.len() {
                return Err(ExecError::new(format!(
                    "mask length {} does not match series length {}",
                    mask.len(),
                    series.len()
                )));
            }
            match value {
                Value::Num(v) => {
                    for (slot, &selected) in series.values_mut().iter_mut().zip(mask.values()) {
                        if selected {
                            *slot = v;
                        }
                    }
                    Ok(())
                }
                Value::Series(src) => {
                    if src.len() != series.len() {
                        return Err(ExecError::new(format!(
                            "assigned series length {} does not match target length {}",
                            src.len(),
                            series.len()
                        )));
                    }
                    let src = src.values().to_vec();
                    for (i, (slot, &selected)) in series
                        .values_mut()
                        .iter_mut()
                        .zip(mask.values())
                        .enumerate()
                    {
                        if selected {
                            *slot = src[i];
                        }
                    }
                    Ok(())
                }
                other => Err(ExecError::new(format!(
                    "cannot mask-assign {} into a series",
                    other.type_name()
                ))),
            }
        }
        Value::Num(_) => {
            let i = resolve_index(index, series.len())?;
            match value {
                Value::Num(v) => {
                    series.values_mut()[i] = v;
                    Ok(())
                }
                other => Err(ExecError::new(format!(
                    "cannot store {} at a series position",
                    other.type_name()
                ))),
            }
        }
        other => Err(ExecError::new(format!(
            "series are indexed by mask or position, found {}",
            other.type_name()
        ))),
    }
}

// ── operators ────────────────────────────────────────────────────

fn unary(op: UnaryOp, v: Value) -> Result<Value, ExecError> {
    match (op, v) {
        (UnaryOp::Neg, Value::Num(v)) => Ok(Value::Num(-v)),
        (UnaryOp::Neg, Value::Series(s)) => Ok(Value::Series(s.map(|v| -v))),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Not, Value::Mask(m)) => Ok(Value::Mask(m.not())),
        (op, v) => Err(ExecError::new(format!(
            "unary {} does not apply to {}",
            match op {
                UnaryOp::Neg => "-",
                UnaryOp::Not => "not",
            },
            v.type_name()
        ))),
    }
}

fn binary(op: BinOp, l: Value, r: Value) -> Result<Value, ExecError> {
    match op {
        BinOp::And | BinOp::Or => logical(op, l, r),
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => arith(op, l, r),
    }
}

fn logical(op: BinOp, l: Value, r: Value) -> Result<Value, ExecError> {
    match (l, r) {
        (Value::Mask(a), Value::Mask(b)) => {
            let out = match op {
                BinOp::And => a.and(&b)?,
                _ => a.or(&b)?,
            };
            Ok(Value::Mask(out))
        }
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(match op {
            BinOp::And => a && b,
            _ => a || b,
        })),
        (l, r) => Err(ExecError::new(format!(
            "'{}' does not apply to {} and {}",
            op_symbol(op),
            l.type_name(),
            r.type_name()
        ))),
    }
}

fn arith(op: BinOp, l: Value, r: Value) -> Result<Value, ExecError> {
    let f = |a: f64, b: f64| match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
        // logical ops are handled in `binary`
        BinOp::And | BinOp::Or => f64::NAN,
    };
    match (l, r) {
        (Value::Num(a), Value::Num(b)) => Ok(Value::Num(f(a, b))),
        (Value::Series(a), Value::Series(b)) => {
            if a.len() != b.len() {
                return Err(ExecError::new(format!(
                    "series lengths differ: {} vs {}",
                    a.len(),
                    b.len()
                )));
            }
            let out = a
                .values()
                .iter()
                .zip(b.values())
                .map(|(&x, &y)| f(x, y))
                .collect();
            Ok(Value::Series(Series::new(out)))
        }
        (Value::Series(a), Value::Num(b)) => Ok(Value::Series(a.map(|x| f(x, b)))),
        (Value::Num(a), Value::Series(b)) => Ok(Value::Series(b.map(|y| f(a, y)))),
        (l, r) => Err(ExecError::new(format!(
            "'{}' does not apply to {} and {}",
            op_symbol(op),
            l.type_name(),
            r.type_name()
        ))),
    }
}

/// NaN never compares true, under any operator — undefined rows fall
/// into else-branches instead of raising.
fn cmp_f64(op: CmpOp, a: f64, b: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return false;
    }
    match op {
        CmpOp::Gt => a > b,
        CmpOp::Ge => a >= b,
        CmpOp::Lt => a < b,
        CmpOp::Le => a <= b,
        CmpOp::Eq => a == b,
        CmpOp::Ne => a != b,
    }
}

fn compare(op: CmpOp, l: Value, r: Value) -> Result<Value, ExecError> {
    match (l, r) {
        (Value::Num(a), Value::Num(b)) => Ok(Value::Bool(cmp_f64(op, a, b))),
        (Value::Series(a), Value::Series(b)) => {
            if a.len() != b.len() {
                return Err(ExecError::new(format!(
                    "series lengths differ: {} vs {}",
                    a.len(),
                    b.len()
                )));
            }
            let out = a
                .values()
                .iter()
                .zip(b.values())
                .map(|(&x, &y)| cmp_f64(op, x, y))
                .collect();
            Ok(Value::Mask(Mask::new(out)))
        }
        (Value::Series(a), Value::Num(b)) => Ok(Value::Mask(Mask::new(
            a.values().iter().map(|&x| cmp_f64(op, x, b)).collect(),
        ))),
        (Value::Num(a), Value::Series(b)) => Ok(Value::Mask(Mask::new(
            b.values().iter().map(|&y| cmp_f64(op, a, y)).collect(),
        ))),
        (Value::Str(a), Value::Str(b)) => match op {
            CmpOp::Eq => Ok(Value::Bool(a == b)),
            CmpOp::Ne => Ok(Value::Bool(a != b)),
            _ => Err(ExecError::new("strings only support == and !=")),
        },
        (Value::Bool(a), Value::Bool(b)) => match op {
            CmpOp::Eq => Ok(Value::Bool(a == b)),
            CmpOp::Ne => Ok(Value::Bool(a != b)),
            _ => Err(ExecError::new("bools only support == and !=")),
        },
        (l, r) => Err(ExecError::new(format!(
            "cannot compare {} with {}",
            l.type_name(),
            r.type_name()
        ))),
    }
}

fn op_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::And => "&",
        BinOp::Or => "|",
    }
}

// ── subscripts and methods ───────────────────────────────────────

fn subscript(receiver: Value, index: Value) -> Result<Value, ExecError> {
    match (receiver, index) {
        (Value::Frame(frame), Value::Str(name)) => frame
            .column(&name)
            .cloned()
            .map(Value::Series)
            .ok_or_else(|| ExecError::new(format!("frame has no column '{name}'"))),
        (Value::Series(series), index @ Value::Num(_)) => {
            let i = resolve_index(&index, series.len())?;
            Ok(Value::Num(series.values()[i]))
        }
        (receiver, index) => Err(ExecError::new(format!(
            "cannot index {} with {}",
            receiver.type_name(),
            index.type_name()
        ))),
    }
}

/// Integral index with Python-style negative offsets and bounds checks.
fn resolve_index(index: &Value, len: usize) -> Result<usize, ExecError> {
    let v = match index {
        Value::Num(v) => *v,
        other => {
            return Err(ExecError::new(format!(
                "index must be a number, found {}",
                other.type_name()
            )))
        }
    };
    if !v.is_finite() || v.fract() != 0.0 {
        return Err(ExecError::new(format!("index must be an integer, found {v}")));
    }
    let i = v as i64;
    let resolved = if i < 0 { i + len as i64 } else { i };
    if resolved < 0 || resolved as usize >= len {
        return Err(ExecError::new(format!(
            "index {i} out of bounds for length {len}"
        )));
    }
    Ok(resolved as usize)
}

fn call_method(receiver: Value, name: &str, args: &[Value]) -> Result<Value, ExecError> {
    match receiver {
        Value::Module(m) => match m.attr(name) {
            Some(f) => (f.call)(args),
            None => Err(ExecError::new(format!(
                "module '{}' has no attribute '{name}'",
                m.name()
            ))),
        },
        Value::Series(series) => series_method(series, name, args),
        Value::Rolling(rolling) => rolling_method(rolling, name, args),
        other => Err(ExecError::new(format!(
            "{} has no method '{name}'",
            other.type_name()
        ))),
    }
}

fn series_method(series: Series, name: &str, args: &[Value]) -> Result<Value, ExecError> {
    use super::builtins::{arg_int, arg_usize, expect_arity};
    match name {
        "rolling" => {
            expect_arity("rolling", args, 1)?;
            let window = arg_usize("rolling", args, 0)?;
            if window == 0 {
                return Err(ExecError::new("rolling() window must be >= 1"));
            }
            Ok(Value::Rolling(Rolling { series, window }))
        }
        "shift" => {
            expect_arity("shift", args, 1)?;
            let n = arg_int("shift", args, 0)?;
            Ok(Value::Series(series.shift(n)))
        }
        "abs" => {
            expect_arity("abs", args, 0)?;
            Ok(Value::Series(series.map(f64::abs)))
        }
        "mean" => {
            expect_arity("mean", args, 0)?;
            Ok(Value::Num(series.mean()))
        }
        "sum" => {
            expect_arity("sum", args, 0)?;
            Ok(Value::Num(series.sum()))
        }
        "min" => {
            expect_arity("min", args, 0)?;
            Ok(Value::Num(series.min()))
        }
        "max" => {
            expect_arity("max", args, 0)?;
            Ok(Value::Num(series.max()))
        }
        _ => Err(ExecError::new(format!("series has no method '{name}'"))),
    }
}

fn rolling_method(rolling: Rolling, name: &str, args: &[Value]) -> Result<Value, ExecError> {
    use super::builtins::expect_arity;
    expect_arity(name, args, 0)?;
    let Rolling { series, window } = rolling;
    let out = match name {
        "mean" => series.rolling_mean(window),
        "sum" => series.rolling_sum(window),
        "min" => series.rolling_min(window),
        "max" => series.rolling_max(window),
        _ => {
            return Err(ExecError::new(format!(
                "rolling window has no method '{name}'"
            )))
        }
    };
    Ok(Value::Series(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use crate::sandbox::namespace::build_globals;
    use crate::sandbox::registry::CapabilityRegistry;
    use crate::script::parse;
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

    fn run_script(source: &str, closes: &[f64]) -> Result<Namespace, ExecError> {
        let globals = build_globals(&CapabilityRegistry::new());
        run(&globals, &parse(source).unwrap(), &frame(closes))
    }

    fn series_binding(bindings: &Namespace, name: &str) -> Series {
        match bindings.get(name) {
            Some(Value::Series(s)) => s.clone(),
            other => panic!("expected series binding '{name}', got {other:?}"),
        }
    }

    #[test]
    fn arithmetic_and_binding() {
        let bindings = run_script("x = 2 + 3 * 4", &[1.0]).unwrap();
        assert!(matches!(bindings.get("x"), Some(Value::Num(v)) if *v == 14.0));
    }

    #[test]
    fn column_read_and_series_math() {
        let bindings = run_script("spread = df[\"high\"] - df[\"low\"]", &[10.0, 20.0]).unwrap();
        let spread = series_binding(&bindings, "spread");
        assert_eq!(spread.values(), &[2.0, 2.0]);
    }

    #[test]
    fn method_chain_rolling_mean() {
        let bindings =
            run_script("m = df[\"close\"].rolling(2).mean()", &[10.0, 12.0, 14.0]).unwrap();
        let m = series_binding(&bindings, "m");
        assert!(m.get(0).unwrap().is_nan());
        assert_eq!(m.get(1).unwrap(), 11.0);
        assert_eq!(m.get(2).unwrap(), 13.0);
    }

    #[test]
    fn module_call_and_where() {
        let src = "import ta\n\
                   short = ta.sma(df[\"close\"], 2)\n\
                   signals = where(short > 10, 1, 0)";
        let bindings = run_script(src, &[10.0, 12.0, 6.0]).unwrap();
        let signals = series_binding(&bindings, "signals");
        assert_eq!(signals.values(), &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn from_import_binds_function() {
        let src = "from ta import sma\nm = sma(df[\"close\"], 2)";
        let bindings = run_script(src, &[10.0, 12.0]).unwrap();
        assert_eq!(series_binding(&bindings, "m").get(1).unwrap(), 11.0);
    }

    #[test]
    fn mask_assignment_updates_selected_rows() {
        let src = "signals = series(0, df)\n\
                   signals[df[\"close\"] > 10] = 1\n\
                   signals[df[\"close\"] < 10] = -1";
        let bindings = run_script(src, &[10.0, 12.0, 6.0]).unwrap();
        let signals = series_binding(&bindings, "signals");
        assert_eq!(signals.values(), &[0.0, 1.0, -1.0]);
    }

    #[test]
    fn column_assignment_mutates_local_frame_only() {
        let globals = build_globals(&CapabilityRegistry::new());
        let original = frame(&[10.0, 12.0]);
        let stmts = parse("df[\"sma\"] = ta.sma(df[\"close\"], 2)\nout = df[\"sma\"]").unwrap();
        let bindings = run(&globals, &stmts, &original).unwrap();
        assert!(bindings.contains_key("out"));
        // Caller's frame is untouched.
        assert!(original.column("sma").is_none());
    }

    #[test]
    fn unknown_name_is_exec_error() {
        let err = run_script("x = undefined_thing + 1", &[1.0]).unwrap_err();
        assert!(err.message.contains("undefined_thing"));
    }

    #[test]
    fn unknown_column_is_exec_error() {
        let err = run_script("x = df[\"vwap\"]", &[1.0]).unwrap_err();
        assert!(err.message.contains("vwap"));
    }

    #[test]
    fn type_mismatch_is_exec_error() {
        let err = run_script("x = \"text\" + 1", &[1.0]).unwrap_err();
        assert!(err.message.contains("does not apply"));
    }

    #[test]
    fn length_mismatch_is_exec_error() {
        let src = "a = df[\"close\"]\nb = a.shift(1)\nc = series(0, 2)\nx = a + c";
        let err = run_script(src, &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(err.message.contains("lengths differ"));
    }

    #[test]
    fn cannot_assign_into_global() {
        let err = run_script("ta[\"x\"] = 1", &[1.0]).unwrap_err();
        assert!(err.message.contains("read-only global"));
    }

    #[test]
    fn negative_index_reads_from_end() {
        let bindings = run_script("last = df[\"close\"][-1]", &[1.0, 2.0, 3.0]).unwrap();
        assert!(matches!(bindings.get("last"), Some(Value::Num(v)) if *v == 3.0));
    }

    #[test]
    fn out_of_bounds_index_is_exec_error() {
        let err = run_script("x = df[\"close\"][10]", &[1.0]).unwrap_err();
        assert!(err.message.contains("out of bounds"));
    }

    #[test]
    fn division_by_zero_follows_ieee() {
        let bindings = run_script("x = 1 / 0", &[1.0]).unwrap();
        assert!(matches!(bindings.get("x"), Some(Value::Num(v)) if v.is_infinite()));
    }

    #[test]
    fn nan_comparisons_are_false() {
        let src = "m = df[\"close\"].rolling(3).mean()\n\
                   hits = where(m > 0, 1, 0)";
        let bindings = run_script(src, &[1.0, 2.0]).unwrap();
        // Whole series is NaN warmup; nothing compares true.
        let hits = series_binding(&bindings, "hits");
        assert!(hits.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn locals_contain_seed_and_script_bindings() {
        let bindings = run_script("x = 1", &[1.0]).unwrap();
        assert_eq!(bindings.len(), 2); // df + x
        assert!(bindings.contains_key("df"));
        assert!(bindings.contains_key("x"));
    }
}
