//! Recursive descent parser for SNEX.
//!
//! Produces the flat AST of `snex_ir`. Parsing never stops at the first
//! error: a failed statement or item is reported, the cursor skips to the
//! next boundary, and parsing resumes, so one run reports every syntax
//! error and still yields a partial AST.

mod cursor;
mod grammar;
mod recovery;

pub use recovery::{synchronize, TokenSet};

use snex_diagnostic::{Diagnostic, ErrorCode};
use snex_ir::{Ast, Expr, ExprId, ExprKind, Name, Span, Stmt, StmtId, StmtKind, StringInterner, TokenKind};

use crate::cursor::{Cursor, CursorMark};

/// Result of parsing a unit.
#[derive(Debug)]
pub struct ParseOutput {
    pub module: Ast,
    /// Lexer (E0xxx) and parser (E1xxx) diagnostics.
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Result of parsing a standalone expression.
#[derive(Debug)]
pub struct ExpressionOutput {
    pub module: Ast,
    /// `None` when the input held no parsable expression.
    pub expr: Option<ExprId>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse a whole compilation unit.
#[tracing::instrument(level = "debug", skip_all, fields(file = file))]
pub fn parse(source: &str, file: &str, interner: &mut StringInterner) -> ParseOutput {
    let (tokens, mut diagnostics) = snex_lexer::lex(source, interner);
    let mut parser = Parser::new(tokens, interner);
    let items = parser.parse_items_until(TokenKind::Eof);
    parser.ast.items = items;
    diagnostics.append(&mut parser.diagnostics);
    tracing::debug!(
        functions = parser.ast.function_count(),
        errors = diagnostics.len(),
        "parsed unit"
    );
    ParseOutput {
        module: parser.ast,
        diagnostics,
    }
}

/// Parse `source` as a single expression followed by end of input.
#[tracing::instrument(level = "debug", skip_all)]
pub fn parse_expression(source: &str, interner: &mut StringInterner) -> ExpressionOutput {
    let (tokens, mut diagnostics) = snex_lexer::lex(source, interner);
    let mut parser = Parser::new(tokens, interner);
    let expr = match parser.parse_expr() {
        Ok(expr) => {
            if !parser.cursor.is_at_end() {
                let err = parser.unexpected("end of expression");
                parser.diagnostics.push(err.0);
            }
            Some(expr)
        }
        Err(err) => {
            parser.diagnostics.push(err.0);
            None
        }
    };
    diagnostics.append(&mut parser.diagnostics);
    ExpressionOutput {
        module: parser.ast,
        expr,
        diagnostics,
    }
}

/// A syntax error not yet reported; recovery points push it.
#[derive(Debug)]
pub(crate) struct ParseError(pub(crate) Diagnostic);

pub(crate) type PResult<T> = Result<T, ParseError>;

/// Parser state.
pub(crate) struct Parser<'i> {
    cursor: Cursor,
    interner: &'i StringInterner,
    ast: Ast,
    diagnostics: Vec<Diagnostic>,
}

impl<'i> Parser<'i> {
    fn new(tokens: snex_ir::TokenList, interner: &'i StringInterner) -> Self {
        Parser {
            cursor: Cursor::new(tokens),
            interner,
            ast: Ast::new(),
            diagnostics: Vec::new(),
        }
    }

    fn alloc_expr(&mut self, kind: ExprKind, span: Span) -> ExprId {
        self.ast.exprs.alloc(Expr::new(kind, span))
    }

    fn alloc_stmt(&mut self, kind: StmtKind, span: Span) -> StmtId {
        self.ast.stmts.alloc(Stmt::new(kind, span))
    }

    /// Span from `start` to the end of the last consumed token.
    fn span_from(&self, start: Span) -> Span {
        let end = self.cursor.previous_span();
        if end.end < start.start {
            start
        } else {
            start.merge(end)
        }
    }

    fn mark(&self) -> (CursorMark, usize) {
        (self.cursor.mark(), self.diagnostics.len())
    }

    /// Undo a speculative parse, including diagnostics it reported.
    fn rewind(&mut self, mark: (CursorMark, usize)) {
        self.cursor.rewind(mark.0);
        self.diagnostics.truncate(mark.1);
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.cursor.current();
        let found = token.kind.display_name();
        ParseError(
            Diagnostic::error(ErrorCode::E1001)
                .with_message(format!("expected {expected}, found `{found}`"))
                .with_label(token.span, format!("expected {expected}")),
        )
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Span> {
        if self.cursor.check(kind) {
            Ok(self.cursor.advance().span)
        } else {
            Err(self.unexpected(&format!("`{}`", kind.display_name())))
        }
    }

    /// Expect a closing delimiter opened at `open`.
    fn expect_closing(&mut self, kind: TokenKind, open: Span) -> PResult<Span> {
        if self.cursor.check(kind) {
            return Ok(self.cursor.advance().span);
        }
        let token = self.cursor.current();
        let code = if token.kind == TokenKind::Eof {
            ErrorCode::E1003
        } else {
            ErrorCode::E1001
        };
        Err(ParseError(
            Diagnostic::error(code)
                .with_message(format!(
                    "expected `{}`, found `{}`",
                    kind.display_name(),
                    token.kind.display_name()
                ))
                .with_label(token.span, format!("expected `{}`", kind.display_name()))
                .with_secondary_label(open, "unclosed delimiter opened here"),
        ))
    }

    fn expect_ident(&mut self) -> PResult<(Name, Span)> {
        match self.cursor.current_name() {
            Some(name) => Ok((name, self.cursor.advance().span)),
            None => {
                let token = self.cursor.current();
                Err(ParseError(
                    Diagnostic::error(ErrorCode::E1004)
                        .with_message(format!(
                            "expected identifier, found `{}`",
                            token.kind.display_name()
                        ))
                        .with_label(token.span, "expected identifier"),
                ))
            }
        }
    }

    fn name_text(&self, name: Name) -> &str {
        self.interner.lookup(name)
    }
}

#[cfg(test)]
mod tests;
