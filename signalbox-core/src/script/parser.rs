//! Recursive-descent parser.
//!
//! Precedence, loosest to tightest:
//! `|` < `&` < `not` < comparison < `+ -` < `* /` < unary `-` < postfix
//! (call, attribute, subscript). Comparisons do not chain; `a < b < c` is
//! a parse error. `&`/`|` bind looser than comparisons, so
//! `short > long & fast < slow` reads as `(short > long) & (fast < slow)`.

use super::ast::{BinOp, CmpOp, Expr, Stmt, Target, UnaryOp};
use super::token::{lex, Tok, Token};
use super::ParseError;

/// Parse a script into its statement list. Never executes anything.
pub fn parse(source: &str) -> Result<Vec<Stmt>, ParseError> {
    let tokens = lex(source)?;
    Parser { tokens, pos: 0 }.program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn program(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        while self.pos < self.tokens.len() {
            if self.check(&Tok::Newline) {
                self.advance();
                continue;
            }
            stmts.push(self.statement()?);
            if self.pos < self.tokens.len() {
                self.expect(Tok::Newline, "expected end of statement")?;
            }
        }
        Ok(stmts)
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        if self.check(&Tok::Import) {
            self.advance();
            let module = self.ident("expected module name after 'import'")?;
            return Ok(Stmt::Import { module });
        }
        if self.check(&Tok::From) {
            self.advance();
            let module = self.ident("expected module name after 'from'")?;
            self.expect(Tok::Import, "expected 'import' after module name")?;
            let mut names = vec![self.ident("expected name to import")?];
            while self.check(&Tok::Comma) {
                self.advance();
                names.push(self.ident("expected name after ','")?);
            }
            return Ok(Stmt::FromImport { module, names });
        }

        let expr = self.expression()?;
        if self.check(&Tok::Assign) {
            let (line, col) = self.position();
            self.advance();
            let target = Self::as_target(expr)
                .ok_or_else(|| ParseError::new(line, col, "invalid assignment target"))?;
            let value = self.expression()?;
            return Ok(Stmt::Assign { target, value });
        }
        Ok(Stmt::Expr(expr))
    }

    /// Only plain names and name-rooted subscripts are assignable.
    fn as_target(expr: Expr) -> Option<Target> {
        match expr {
            Expr::Name(name) => Some(Target::Name(name)),
            Expr::Subscript { object, index } => match *object {
                Expr::Name(name) => Some(Target::Subscript {
                    object: name,
                    index: *index,
                }),
                _ => None,
            },
            _ => None,
        }
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.and_expr()?;
        while self.check(&Tok::Pipe) {
            self.advance();
            let right = self.and_expr()?;
            left = Expr::Binary {
                op: BinOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.not_expr()?;
        while self.check(&Tok::Amp) {
            self.advance();
            let right = self.not_expr()?;
            left = Expr::Binary {
                op: BinOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, ParseError> {
        if self.check(&Tok::Not) {
            self.advance();
            let operand = self.not_expr()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.additive()?;
        if let Some(op) = self.cmp_op() {
            self.advance();
            let right = self.additive()?;
            if self.cmp_op().is_some() {
                let (line, col) = self.position();
                return Err(ParseError::new(
                    line,
                    col,
                    "chained comparisons are not supported",
                ));
            }
            return Ok(Expr::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn cmp_op(&self) -> Option<CmpOp> {
        match self.peek()? {
            Tok::Gt => Some(CmpOp::Gt),
            Tok::Ge => Some(CmpOp::Ge),
            Tok::Lt => Some(CmpOp::Lt),
            Tok::Le => Some(CmpOp::Le),
            Tok::Eq => Some(CmpOp::Eq),
            Tok::Ne => Some(CmpOp::Ne),
            _ => None,
        }
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Plus) => BinOp::Add,
                Some(Tok::Minus) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Star) => BinOp::Mul,
                Some(Tok::Slash) => BinOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.check(&Tok::Minus) {
            self.advance();
            let operand = self.unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                Some(Tok::Dot) => {
                    self.advance();
                    let name = self.ident("expected attribute name after '.'")?;
                    expr = Expr::Attribute {
                        object: Box::new(expr),
                        name,
                    };
                }
                Some(Tok::LParen) => {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(&Tok::RParen) {
                        args.push(self.expression()?);
                        while self.check(&Tok::Comma) {
                            self.advance();
                            args.push(self.expression()?);
                        }
                    }
                    self.expect(Tok::RParen, "expected ')' after arguments")?;
                    expr = Expr::Call {
                        func: Box::new(expr),
                        args,
                    };
                }
                Some(Tok::LBracket) => {
                    self.advance();
                    let index = self.expression()?;
                    self.expect(Tok::RBracket, "expected ']' after subscript")?;
                    expr = Expr::Subscript {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let (line, col) = self.position();
        match self.peek() {
            Some(Tok::Num(value)) => {
                let value = *value;
                self.advance();
                Ok(Expr::Num(value))
            }
            Some(Tok::Str(text)) => {
                let text = text.clone();
                self.advance();
                Ok(Expr::Str(text))
            }
            Some(Tok::Ident(name)) => {
                let name = name.clone();
                self.advance();
                Ok(Expr::Name(name))
            }
            Some(Tok::LParen) => {
                self.advance();
                let expr = self.expression()?;
                self.expect(Tok::RParen, "expected ')'")?;
                Ok(expr)
            }
            Some(other) => Err(ParseError::new(
                line,
                col,
                format!("unexpected token {other:?}"),
            )),
            None => Err(ParseError::new(line, col, "unexpected end of script")),
        }
    }

    // ── cursor helpers ──────────────────────────────────────────

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|t| &t.tok)
    }

    fn check(&self, tok: &Tok) -> bool {
        self.peek() == Some(tok)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    /// Position of the current token, or just past the last one at EOF.
    fn position(&self) -> (usize, usize) {
        match self.tokens.get(self.pos).or_else(|| self.tokens.last()) {
            Some(t) => (t.line, t.col),
            None => (1, 1),
        }
    }

    fn expect(&mut self, tok: Tok, message: &str) -> Result<(), ParseError> {
        if self.check(&tok) {
            self.advance();
            Ok(())
        } else {
            let (line, col) = self.position();
            Err(ParseError::new(line, col, message))
        }
    }

    fn ident(&mut self, message: &str) -> Result<String, ParseError> {
        match self.peek() {
            Some(Tok::Ident(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => {
                let (line, col) = self.position();
                Err(ParseError::new(line, col, message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_import_forms() {
        let stmts = parse("import ta\nfrom math import floor, ceil").unwrap();
        assert_eq!(
            stmts[0],
            Stmt::Import {
                module: "ta".into()
            }
        );
        assert_eq!(
            stmts[1],
            Stmt::FromImport {
                module: "math".into(),
                names: vec!["floor".into(), "ceil".into()],
            }
        );
    }

    #[test]
    fn parses_column_assignment() {
        let stmts = parse("df[\"sma\"] = ta.sma(df[\"close\"], 20)").unwrap();
        match &stmts[0] {
            Stmt::Assign {
                target: Target::Subscript { object, index },
                value,
            } => {
                assert_eq!(object, "df");
                assert_eq!(index, &Expr::Str("sma".into()));
                assert!(matches!(value, Expr::Call { .. }));
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn mask_binds_looser_than_comparison() {
        let stmts = parse("m = a > b & c < d").unwrap();
        match &stmts[0] {
            Stmt::Assign { value, .. } => match value {
                Expr::Binary {
                    op: BinOp::And,
                    left,
                    right,
                } => {
                    assert!(matches!(**left, Expr::Compare { op: CmpOp::Gt, .. }));
                    assert!(matches!(**right, Expr::Compare { op: CmpOp::Lt, .. }));
                }
                other => panic!("unexpected expr: {other:?}"),
            },
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let stmts = parse("x = 1 + 2 * 3").unwrap();
        match &stmts[0] {
            Stmt::Assign { value, .. } => match value {
                Expr::Binary {
                    op: BinOp::Add,
                    right,
                    ..
                } => {
                    assert!(matches!(**right, Expr::Binary { op: BinOp::Mul, .. }));
                }
                other => panic!("unexpected expr: {other:?}"),
            },
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn method_chain_parses() {
        let stmts = parse("x = df[\"close\"].rolling(20).mean()").unwrap();
        match &stmts[0] {
            Stmt::Assign { value, .. } => {
                // Outermost node is the .mean() call.
                assert!(matches!(value, Expr::Call { .. }));
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn rejects_chained_comparison() {
        let err = parse("x = a < b < c").unwrap_err();
        assert!(err.message.contains("chained comparisons"));
    }

    #[test]
    fn rejects_invalid_assignment_target() {
        let err = parse("f(x) = 1").unwrap_err();
        assert!(err.message.contains("assignment target"));
    }

    #[test]
    fn rejects_unbalanced_parens() {
        assert!(parse("x = (1 + 2").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("strategy please buy low sell high").is_err());
    }

    #[test]
    fn blank_lines_and_comments_are_ignored() {
        let stmts = parse("\n# setup\n\nx = 1\n\n# done\n").unwrap();
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn identical_input_gives_identical_ast() {
        let src = "s = ta.sma(df[\"close\"], 2)\nsignals = where(s > 1, 1, 0)";
        assert_eq!(parse(src).unwrap(), parse(src).unwrap());
    }
}
