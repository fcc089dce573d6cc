//! Lexer: source text to a positioned token stream.

use super::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Ident(String),
    Num(f64),
    Str(String),

    // Keywords
    Import,
    From,
    Not,

    // Operators
    Assign,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Amp,
    Pipe,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Newline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub line: usize,
    pub col: usize,
}

/// Tokenize a script. A trailing `Newline` token is always emitted so the
/// parser can treat every statement as newline-terminated.
pub fn lex(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let mut line = 1usize;
    let mut col = 1usize;

    macro_rules! push {
        ($tok:expr, $line:expr, $col:expr) => {
            tokens.push(Token {
                tok: $tok,
                line: $line,
                col: $col,
            })
        };
    }

    while let Some(&c) = chars.peek() {
        let start_line = line;
        let start_col = col;
        match c {
            ' ' | '\t' | '\r' => {
                chars.next();
                col += 1;
            }
            '\n' => {
                chars.next();
                push!(Tok::Newline, start_line, start_col);
                line += 1;
                col = 1;
            }
            '#' => {
                // Comment runs to end of line; the newline itself is lexed
                // on the next iteration.
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                    col += 1;
                }
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                col += 1;
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == quote => {
                            col += 1;
                            break;
                        }
                        Some('\n') | None => {
                            return Err(ParseError::new(
                                start_line,
                                start_col,
                                "unterminated string literal",
                            ));
                        }
                        Some(c) => {
                            text.push(c);
                            col += 1;
                        }
                    }
                }
                push!(Tok::Str(text), start_line, start_col);
            }
            '0'..='9' => {
                let mut text = String::new();
                let mut seen_dot = false;
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || (c == '.' && !seen_dot) {
                        if c == '.' {
                            seen_dot = true;
                        }
                        text.push(c);
                        chars.next();
                        col += 1;
                    } else {
                        break;
                    }
                }
                let value: f64 = text.parse().map_err(|_| {
                    ParseError::new(start_line, start_col, format!("invalid number '{text}'"))
                })?;
                push!(Tok::Num(value), start_line, start_col);
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut text = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        text.push(c);
                        chars.next();
                        col += 1;
                    } else {
                        break;
                    }
                }
                let tok = match text.as_str() {
                    "import" => Tok::Import,
                    "from" => Tok::From,
                    "not" => Tok::Not,
                    _ => Tok::Ident(text),
                };
                push!(tok, start_line, start_col);
            }
            '=' | '!' | '<' | '>' => {
                chars.next();
                col += 1;
                let followed_by_eq = chars.peek() == Some(&'=');
                if followed_by_eq {
                    chars.next();
                    col += 1;
                }
                let tok = match (c, followed_by_eq) {
                    ('=', true) => Tok::Eq,
                    ('=', false) => Tok::Assign,
                    ('!', true) => Tok::Ne,
                    ('<', true) => Tok::Le,
                    ('<', false) => Tok::Lt,
                    ('>', true) => Tok::Ge,
                    ('>', false) => Tok::Gt,
                    ('!', false) => {
                        return Err(ParseError::new(
                            start_line,
                            start_col,
                            "unexpected character '!'",
                        ));
                    }
                    _ => unreachable!(),
                };
                push!(tok, start_line, start_col);
            }
            _ => {
                let tok = match c {
                    '+' => Tok::Plus,
                    '-' => Tok::Minus,
                    '*' => Tok::Star,
                    '/' => Tok::Slash,
                    '&' => Tok::Amp,
                    '|' => Tok::Pipe,
                    '(' => Tok::LParen,
                    ')' => Tok::RParen,
                    '[' => Tok::LBracket,
                    ']' => Tok::RBracket,
                    ',' => Tok::Comma,
                    '.' => Tok::Dot,
                    _ => {
                        return Err(ParseError::new(
                            start_line,
                            start_col,
                            format!("unexpected character '{c}'"),
                        ));
                    }
                };
                chars.next();
                col += 1;
                push!(tok, start_line, start_col);
            }
        }
    }

    if !matches!(tokens.last(), Some(Token { tok: Tok::Newline, .. })) {
        tokens.push(Token {
            tok: Tok::Newline,
            line,
            col,
        });
    }
    Ok(tokens)
}
