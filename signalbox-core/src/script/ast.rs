//! Syntax tree for strategy scripts.

/// A statement. Scripts are a flat statement list; there are no blocks.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `import ta`
    Import { module: String },
    /// `from ta import sma, ema`
    FromImport { module: String, names: Vec<String> },
    /// `target = expr`
    Assign { target: Target, value: Expr },
    /// Bare expression, evaluated for effect (none) and discarded.
    Expr(Expr),
}

/// Assignment target. Subscript targets name the container directly so the
/// executor can mutate the binding in place.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// `name = ...`
    Name(String),
    /// `name[index] = ...` — mask-indexed series update or frame column.
    Subscript { object: String, index: Expr },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Str(String),
    Name(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Compare {
        op: CmpOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    Attribute {
        object: Box<Expr>,
        name: String,
    },
    Subscript {
        object: Box<Expr>,
        index: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    /// `&` — conjunction over masks.
    And,
    /// `|` — disjunction over masks.
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}
