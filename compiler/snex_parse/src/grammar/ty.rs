//! Type expressions and template argument lists.

use smallvec::SmallVec;
use snex_diagnostic::{Diagnostic, ErrorCode};
use snex_ir::{Path, Primitive, TemplateArgExpr, TokenKind, TypeExpr, TypeExprKind};

use crate::{PResult, ParseError, Parser};

/// Template value arguments stop below additive operators, so a `>` or
/// `>>` closes the list instead of comparing or shifting.
const TEMPLATE_VALUE_PREC: u8 = 9;

pub(crate) fn primitive_of(kind: TokenKind) -> Option<Primitive> {
    match kind {
        TokenKind::Void => Some(Primitive::Void),
        TokenKind::Int => Some(Primitive::Int),
        TokenKind::Float => Some(Primitive::Float),
        TokenKind::Double => Some(Primitive::Double),
        TokenKind::Bool => Some(Primitive::Bool),
        _ => None,
    }
}

impl Parser<'_> {
    /// `type := base '&'?`
    pub(crate) fn parse_type(&mut self) -> PResult<TypeExpr> {
        let base = self.parse_base_type()?;
        if self.cursor.check(TokenKind::Amp) {
            let amp = self.cursor.advance().span;
            let span = base.span.merge(amp);
            return Ok(TypeExpr::new(TypeExprKind::Ref(Box::new(base)), span));
        }
        Ok(base)
    }

    fn parse_base_type(&mut self) -> PResult<TypeExpr> {
        let start = self.cursor.current_span();
        let kind = self.cursor.current_kind();

        if let Some(prim) = primitive_of(kind) {
            self.cursor.advance();
            return Ok(TypeExpr::new(TypeExprKind::Primitive(prim), start));
        }

        match kind {
            TokenKind::Auto => {
                self.cursor.advance();
                Ok(TypeExpr::new(TypeExprKind::Auto, start))
            }
            TokenKind::Span => {
                self.cursor.advance();
                let open = self.expect(TokenKind::Lt)?;
                let elem = self.parse_type()?;
                self.expect(TokenKind::Comma)?;
                let len = self.parse_binary(TEMPLATE_VALUE_PREC)?;
                self.expect_closing_angle(open)?;
                Ok(TypeExpr::new(
                    TypeExprKind::Span {
                        elem: Box::new(elem),
                        len,
                    },
                    self.span_from(start),
                ))
            }
            TokenKind::Dyn => {
                self.cursor.advance();
                let open = self.expect(TokenKind::Lt)?;
                let elem = self.parse_type()?;
                self.expect_closing_angle(open)?;
                Ok(TypeExpr::new(
                    TypeExprKind::Dyn(Box::new(elem)),
                    self.span_from(start),
                ))
            }
            TokenKind::Ident => {
                let path = self.parse_path()?;
                let args = if self.cursor.check(TokenKind::Lt) {
                    self.parse_template_args()?
                } else {
                    Vec::new()
                };
                Ok(TypeExpr::new(
                    TypeExprKind::Path { path, args },
                    self.span_from(start),
                ))
            }
            _ => {
                let token = self.cursor.current();
                Err(ParseError(
                    Diagnostic::error(ErrorCode::E1005)
                        .with_message(format!(
                            "expected type, found `{}`",
                            token.kind.display_name()
                        ))
                        .with_label(token.span, "expected type"),
                ))
            }
        }
    }

    /// `path := IDENT ('::' IDENT)*`
    pub(crate) fn parse_path(&mut self) -> PResult<Path> {
        let (first, start) = self.expect_ident()?;
        let mut segments: SmallVec<[_; 2]> = SmallVec::new();
        segments.push(first);
        while self.cursor.check(TokenKind::ColonColon) && self.cursor.peek_kind(1) == TokenKind::Ident {
            self.cursor.advance();
            let (name, _) = self.expect_ident()?;
            segments.push(name);
        }
        Ok(Path {
            segments,
            span: self.span_from(start),
        })
    }

    /// `'<' arg (',' arg)* '>'`
    ///
    /// Arguments that start like a type are parsed as types; a bare name
    /// is left for the analyzer to read as a type or a constant.
    pub(crate) fn parse_template_args(&mut self) -> PResult<Vec<TemplateArgExpr>> {
        let open = self.expect(TokenKind::Lt)?;
        let mut args = Vec::new();
        loop {
            let kind = self.cursor.current_kind();
            let starts_type = primitive_of(kind).is_some()
                || matches!(kind, TokenKind::Auto | TokenKind::Span | TokenKind::Dyn)
                || (kind == TokenKind::Ident && self.ident_arg_is_type());
            if starts_type {
                args.push(TemplateArgExpr::Type(self.parse_type()?));
            } else {
                args.push(TemplateArgExpr::Value(self.parse_binary(TEMPLATE_VALUE_PREC)?));
            }
            if !self.cursor.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect_closing_angle(open)?;
        Ok(args)
    }

    /// A name argument is a type unless an operator follows it (`N * 2`).
    fn ident_arg_is_type(&self) -> bool {
        let mut n = 1;
        while self.cursor.peek_kind(n) == TokenKind::ColonColon
            && self.cursor.peek_kind(n + 1) == TokenKind::Ident
        {
            n += 2;
        }
        matches!(
            self.cursor.peek_kind(n),
            TokenKind::Comma | TokenKind::Gt | TokenKind::Shr | TokenKind::Lt | TokenKind::Amp
        )
    }

    fn expect_closing_angle(&mut self, open: snex_ir::Span) -> PResult<()> {
        if self.cursor.eat_closing_angle() {
            Ok(())
        } else {
            self.expect_closing(TokenKind::Gt, open).map(|_| ())
        }
    }

    /// Whether the tokens ahead read as `type IDENT` (a declaration).
    ///
    /// Parses speculatively and always rewinds.
    pub(crate) fn looks_like_declaration(&mut self) -> bool {
        let mark = self.mark();
        let is_decl = self.parse_type().is_ok() && self.cursor.check(TokenKind::Ident);
        self.rewind(mark);
        is_decl
    }
}
