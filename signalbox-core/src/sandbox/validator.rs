//! Syntax Validator — allow-list walk over the parsed script.
//!
//! Runs strictly before execution and has no side effects. Walks every
//! statement in source order and every expression in syntax order, so
//! identical input always produces the identical diagnostic: the first
//! violation encountered in that deterministic traversal.
//!
//! Two rules are enforced:
//! 1. imports (either form) must name a registry-approved module;
//! 2. no attribute access or method call may use a dunder name.
//!
//! Calls to unknown names are left to the executor (an `ExecError` at
//! runtime): this dialect has no dynamic-execution or filesystem
//! primitives to reach, so the escape routes the dunder rule guards
//! against in a reflective language do not exist here. The rule is kept
//! anyway so hostile scripts are rejected with a policy diagnostic before
//! any evaluation starts.

use thiserror::Error;

use crate::script::{Expr, Stmt, Target};

use super::registry::{CapabilityRegistry, DUNDER_PREFIX};

/// Script references a capability outside the allow-list. Issued before
/// execution; the script never runs.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PolicyViolation {
    #[error("import of '{name}' is not allowed")]
    DisallowedImport { name: String },

    #[error("access to dunder attribute '{name}' is not allowed")]
    DunderAccess { name: String },
}

/// Walk the whole tree; return the first violation in traversal order.
pub fn validate(stmts: &[Stmt], registry: &CapabilityRegistry) -> Result<(), PolicyViolation> {
    for stmt in stmts {
        match stmt {
            Stmt::Import { module } | Stmt::FromImport { module, .. } => {
                if !registry.is_module_allowed(module) {
                    return Err(PolicyViolation::DisallowedImport {
                        name: module.clone(),
                    });
                }
            }
            Stmt::Assign { target, value } => {
                if let Target::Subscript { index, .. } = target {
                    walk_expr(index)?;
                }
                walk_expr(value)?;
            }
            Stmt::Expr(expr) => walk_expr(expr)?,
        }
    }
    Ok(())
}

fn walk_expr(expr: &Expr) -> Result<(), PolicyViolation> {
    match expr {
        Expr::Num(_) | Expr::Str(_) | Expr::Name(_) => Ok(()),
        Expr::Unary { operand, .. } => walk_expr(operand),
        Expr::Binary { left, right, .. } | Expr::Compare { left, right, .. } => {
            walk_expr(left)?;
            walk_expr(right)
        }
        Expr::Call { func, args } => {
            walk_expr(func)?;
            for arg in args {
                walk_expr(arg)?;
            }
            Ok(())
        }
        Expr::Attribute { object, name } => {
            walk_expr(object)?;
            if name.starts_with(DUNDER_PREFIX) {
                return Err(PolicyViolation::DunderAccess { name: name.clone() });
            }
            Ok(())
        }
        Expr::Subscript { object, index } => {
            walk_expr(object)?;
            walk_expr(index)
        }
    }
}
