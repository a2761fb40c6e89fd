/*
 * parser.rs
 * Copyright (c) 2026 Stencil Contributors
 *
 * Hand-written lexer and recursive-descent parser for the generated
 * statement language.
 */

//! Parser for the generated-source statement language.
//!
//! The grammar is a flat statement sequence:
//!
//! ```text
//! program   = { statement }
//! statement = "emit" expr ";" | "literal" string ";"
//! expr      = term { "+" term }
//! term      = string | number | path | ident "(" [ expr { "," expr } ] ")"
//! path      = ("model" | "viewbag") { "." ident }
//! ```
//!
//! Parsing never stops at the first problem: after an error the parser
//! skips to the next `;` and continues, so one pass reports every broken
//! statement. All positions are 1-based.

use stencil_core::Diagnostic;

use crate::ast::{Expr, Stmt};

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Ident(String),
    String(String),
    Number(f64),
    Plus,
    Dot,
    Comma,
    LParen,
    RParen,
    Semi,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    line: usize,
    column: usize,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Lexer {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn tokenize(mut self) -> Result<Vec<Token>, Vec<Diagnostic>> {
        let mut tokens = Vec::new();
        let mut diagnostics = Vec::new();

        while let Some(&c) = self.chars.peek() {
            let (line, column) = (self.line, self.column);

            if c.is_whitespace() {
                self.bump();
                continue;
            }

            let kind = match c {
                '+' => {
                    self.bump();
                    Some(TokenKind::Plus)
                }
                '.' => {
                    self.bump();
                    Some(TokenKind::Dot)
                }
                ',' => {
                    self.bump();
                    Some(TokenKind::Comma)
                }
                '(' => {
                    self.bump();
                    Some(TokenKind::LParen)
                }
                ')' => {
                    self.bump();
                    Some(TokenKind::RParen)
                }
                ';' => {
                    self.bump();
                    Some(TokenKind::Semi)
                }
                '"' => match self.lex_string() {
                    Ok(text) => Some(TokenKind::String(text)),
                    Err(diagnostic) => {
                        diagnostics.push(diagnostic);
                        None
                    }
                },
                c if c.is_ascii_digit() => Some(self.lex_number()),
                c if c.is_alphabetic() || c == '_' => Some(self.lex_ident()),
                other => {
                    self.bump();
                    diagnostics.push(Diagnostic::error_at(
                        format!("unexpected character `{other}`"),
                        line,
                        column,
                    ));
                    None
                }
            };

            if let Some(kind) = kind {
                tokens.push(Token { kind, line, column });
            }
        }

        if diagnostics.is_empty() {
            Ok(tokens)
        } else {
            Err(diagnostics)
        }
    }

    fn lex_string(&mut self) -> Result<String, Diagnostic> {
        let (line, column) = (self.line, self.column);
        self.bump(); // opening quote
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(text),
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('"') => text.push('"'),
                    Some('\\') => text.push('\\'),
                    Some(other) => {
                        return Err(Diagnostic::error_at(
                            format!("unknown escape `\\{other}`"),
                            line,
                            column,
                        ));
                    }
                    None => break,
                },
                Some(c) => text.push(c),
                None => break,
            }
        }
        Err(Diagnostic::error_at(
            "unterminated string literal",
            line,
            column,
        ))
    }

    fn lex_number(&mut self) -> TokenKind {
        let mut raw = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() || c == '.' {
                // Only consume a dot followed by a digit, so `1.foo`
                // lexes as `1` `.` `foo`.
                if c == '.' {
                    let mut ahead = self.chars.clone();
                    ahead.next();
                    if !ahead.peek().is_some_and(|d| d.is_ascii_digit()) {
                        break;
                    }
                }
                raw.push(c);
                self.bump();
            } else {
                break;
            }
        }
        // Digits and at most one interior dot always parse.
        TokenKind::Number(raw.parse().unwrap_or(f64::NAN))
    }

    fn lex_ident(&mut self) -> TokenKind {
        let mut raw = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                raw.push(c);
                self.bump();
            } else {
                break;
            }
        }
        TokenKind::Ident(raw)
    }
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn last_position(&self) -> (usize, usize) {
        self.tokens
            .last()
            .map(|t| (t.line, t.column))
            .unwrap_or((1, 1))
    }

    fn error_here(&mut self, message: impl Into<String>) {
        let (line, column) = self
            .peek()
            .map(|t| (t.line, t.column))
            .unwrap_or_else(|| self.last_position());
        self.diagnostics
            .push(Diagnostic::error_at(message.into(), line, column));
    }

    /// Skip past the next `;` so parsing can resume at the following
    /// statement.
    fn recover(&mut self) {
        while let Some(token) = self.bump() {
            if token.kind == TokenKind::Semi {
                break;
            }
        }
    }

    fn parse_program(mut self) -> Result<Vec<Stmt>, Vec<Diagnostic>> {
        let mut statements = Vec::new();
        while self.peek().is_some() {
            match self.parse_statement() {
                Some(stmt) => statements.push(stmt),
                None => self.recover(),
            }
        }
        if self.diagnostics.is_empty() {
            Ok(statements)
        } else {
            Err(self.diagnostics)
        }
    }

    fn parse_statement(&mut self) -> Option<Stmt> {
        let keyword = match self.bump() {
            Some(Token {
                kind: TokenKind::Ident(word),
                ..
            }) => word,
            _ => {
                self.position = self.position.saturating_sub(1);
                self.error_here("expected `emit` or `literal`");
                return None;
            }
        };

        let stmt = match keyword.as_str() {
            "emit" => {
                let expr = self.parse_expr()?;
                Stmt::Emit(expr)
            }
            "literal" => match self.bump() {
                Some(Token {
                    kind: TokenKind::String(text),
                    ..
                }) => Stmt::Literal(text),
                _ => {
                    self.position = self.position.saturating_sub(1);
                    self.error_here("`literal` takes a string literal");
                    return None;
                }
            },
            other => {
                self.error_here(format!("unknown statement `{other}`"));
                return None;
            }
        };

        match self.bump() {
            Some(Token {
                kind: TokenKind::Semi,
                ..
            }) => Some(stmt),
            _ => {
                self.position = self.position.saturating_sub(1);
                self.error_here("expected `;` after statement");
                None
            }
        }
    }

    fn parse_expr(&mut self) -> Option<Expr> {
        let mut expr = self.parse_term()?;
        while matches!(
            self.peek(),
            Some(Token {
                kind: TokenKind::Plus,
                ..
            })
        ) {
            self.bump();
            let right = self.parse_term()?;
            expr = Expr::Concat(Box::new(expr), Box::new(right));
        }
        Some(expr)
    }

    fn parse_term(&mut self) -> Option<Expr> {
        match self.bump() {
            Some(Token {
                kind: TokenKind::String(text),
                ..
            }) => Some(Expr::String(text)),
            Some(Token {
                kind: TokenKind::Number(n),
                ..
            }) => Some(Expr::Number(n)),
            Some(Token {
                kind: TokenKind::Ident(name),
                ..
            }) => match name.as_str() {
                "model" => Some(Expr::ModelPath(self.parse_path())),
                "viewbag" => Some(Expr::ViewBagPath(self.parse_path())),
                _ => self.parse_call(name),
            },
            _ => {
                self.position = self.position.saturating_sub(1);
                self.error_here("expected an expression");
                None
            }
        }
    }

    fn parse_path(&mut self) -> Vec<String> {
        let mut segments = Vec::new();
        while matches!(
            self.peek(),
            Some(Token {
                kind: TokenKind::Dot,
                ..
            })
        ) {
            self.bump();
            match self.bump() {
                Some(Token {
                    kind: TokenKind::Ident(segment),
                    ..
                }) => segments.push(segment),
                _ => {
                    self.position = self.position.saturating_sub(1);
                    self.error_here("expected a field name after `.`");
                    break;
                }
            }
        }
        segments
    }

    fn parse_call(&mut self, name: String) -> Option<Expr> {
        match self.bump() {
            Some(Token {
                kind: TokenKind::LParen,
                ..
            }) => {}
            _ => {
                self.position = self.position.saturating_sub(1);
                self.error_here(format!("expected `(` after function name `{name}`"));
                return None;
            }
        }

        let mut args = Vec::new();
        if !matches!(
            self.peek(),
            Some(Token {
                kind: TokenKind::RParen,
                ..
            })
        ) {
            loop {
                args.push(self.parse_expr()?);
                match self.peek() {
                    Some(Token {
                        kind: TokenKind::Comma,
                        ..
                    }) => {
                        self.bump();
                    }
                    _ => break,
                }
            }
        }

        match self.bump() {
            Some(Token {
                kind: TokenKind::RParen,
                ..
            }) => Some(Expr::Call { name, args }),
            _ => {
                self.position = self.position.saturating_sub(1);
                self.error_here("expected `)` to close the argument list");
                None
            }
        }
    }
}

/// Parse generated source into a statement list, or fail with every
/// diagnostic found.
pub fn parse(source: &str) -> Result<Vec<Stmt>, Vec<Diagnostic>> {
    let tokens = Lexer::new(source).tokenize()?;
    let parser = Parser {
        tokens,
        position: 0,
        diagnostics: Vec::new(),
    };
    parser.parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_hello_world() {
        let statements = parse("emit \"Hello, \" + model.name;").unwrap();
        assert_eq!(
            statements,
            vec![Stmt::Emit(Expr::Concat(
                Box::new(Expr::String("Hello, ".to_string())),
                Box::new(Expr::ModelPath(vec!["name".to_string()])),
            ))]
        );
    }

    #[test]
    fn test_parse_literal_and_calls() {
        let statements = parse(
            "literal \"<h1>\";\n\
             emit upper(model.title);\n\
             literal \"</h1>\";\n\
             emit join(model.tags, \", \");",
        )
        .unwrap();
        assert_eq!(statements.len(), 4);
        assert_eq!(statements[0], Stmt::Literal("<h1>".to_string()));
        match &statements[3] {
            Stmt::Emit(Expr::Call { name, args }) => {
                assert_eq!(name, "join");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_viewbag_path_and_numbers() {
        let statements = parse("emit viewbag.title; emit 42;").unwrap();
        assert_eq!(
            statements[0],
            Stmt::Emit(Expr::ViewBagPath(vec!["title".to_string()]))
        );
        assert_eq!(statements[1], Stmt::Emit(Expr::Number(42.0)));
    }

    #[test]
    fn test_errors_carry_positions_and_recover() {
        let err = parse("emit ;\nemit \"ok\";\nemit model.;").unwrap_err();
        assert_eq!(err.len(), 2);
        assert_eq!(err[0].line, Some(1));
        assert_eq!(err[1].line, Some(3));
    }

    #[test]
    fn test_unterminated_string() {
        let err = parse("emit \"oops;").unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err[0].message.contains("unterminated"));
    }

    #[test]
    fn test_missing_semicolon() {
        let err = parse("emit \"a\"").unwrap_err();
        assert!(err[0].message.contains("expected `;`"));
    }
}
