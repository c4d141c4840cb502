//! Expressions: precedence climbing over the binary operator table.

use snex_diagnostic::{Diagnostic, ErrorCode};
use snex_ir::{BinaryOp, ExprId, ExprKind, Path, TokenKind, TokenValue, UnaryOp};
use snex_stack::ensure_sufficient_stack;

use super::ty::primitive_of;
use crate::{PResult, ParseError, Parser};

fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Mod,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Shl => BinaryOp::Shl,
        TokenKind::Shr => BinaryOp::Shr,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::LtEq => BinaryOp::LtEq,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::GtEq => BinaryOp::GtEq,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::NotEq => BinaryOp::NotEq,
        TokenKind::Amp => BinaryOp::BitAnd,
        TokenKind::Caret => BinaryOp::BitXor,
        TokenKind::Pipe => BinaryOp::BitOr,
        TokenKind::AmpAmp => BinaryOp::And,
        TokenKind::PipePipe => BinaryOp::Or,
        _ => return None,
    })
}

impl Parser<'_> {
    /// `expr := binary ('?' expr ':' expr)?`
    pub(crate) fn parse_expr(&mut self) -> PResult<ExprId> {
        ensure_sufficient_stack(|| {
            let start = self.cursor.current_span();
            let cond = self.parse_binary(1)?;
            if !self.cursor.eat(TokenKind::Question) {
                return Ok(cond);
            }
            let then_expr = self.parse_expr()?;
            self.expect(TokenKind::Colon)?;
            let else_expr = self.parse_expr()?;
            let span = self.span_from(start);
            Ok(self.alloc_expr(
                ExprKind::Ternary {
                    cond,
                    then_expr,
                    else_expr,
                },
                span,
            ))
        })
    }

    /// Left-associative binary operators binding at least `min_prec`.
    pub(crate) fn parse_binary(&mut self, min_prec: u8) -> PResult<ExprId> {
        let start = self.cursor.current_span();
        let mut lhs = self.parse_unary()?;
        while let Some(op) = binary_op(self.cursor.current_kind()) {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.cursor.advance();
            let rhs = self.parse_binary(prec + 1)?;
            let span = self.span_from(start);
            lhs = self.alloc_expr(ExprKind::Binary { op, lhs, rhs }, span);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<ExprId> {
        ensure_sufficient_stack(|| {
            let start = self.cursor.current_span();
            let op = match self.cursor.current_kind() {
                TokenKind::Minus => Some(UnaryOp::Neg),
                TokenKind::Bang => Some(UnaryOp::Not),
                TokenKind::Tilde => Some(UnaryOp::BitNot),
                TokenKind::Plus => {
                    self.cursor.advance();
                    return self.parse_unary();
                }
                TokenKind::LParen
                    if primitive_of(self.cursor.peek_kind(1)).is_some()
                        && self.cursor.peek_kind(2) == TokenKind::RParen =>
                {
                    self.cursor.advance();
                    let to = primitive_of(self.cursor.advance().kind).unwrap_or(snex_ir::Primitive::Int);
                    self.cursor.advance();
                    let expr = self.parse_unary()?;
                    let span = self.span_from(start);
                    return Ok(self.alloc_expr(ExprKind::Cast { to, expr }, span));
                }
                _ => None,
            };
            match op {
                Some(op) => {
                    self.cursor.advance();
                    let operand = self.parse_unary()?;
                    let span = self.span_from(start);
                    Ok(self.alloc_expr(ExprKind::Unary { op, operand }, span))
                }
                None => self.parse_postfix(),
            }
        })
    }

    fn parse_postfix(&mut self) -> PResult<ExprId> {
        let start = self.cursor.current_span();
        let mut expr = self.parse_primary()?;
        loop {
            match self.cursor.current_kind() {
                TokenKind::LParen => {
                    let args = self.parse_call_args()?;
                    let span = self.span_from(start);
                    expr = self.alloc_expr(
                        ExprKind::Call {
                            callee: expr,
                            template_args: Vec::new(),
                            args,
                        },
                        span,
                    );
                }
                TokenKind::Lt if matches!(self.ast.expr(expr).kind, ExprKind::Path(_)) => {
                    // `f<4>(x)` if the bracketed part parses as template
                    // arguments followed by a call, `a < b` otherwise.
                    let mark = self.mark();
                    let args = match self.parse_template_args() {
                        Ok(args) if self.cursor.check(TokenKind::LParen) => args,
                        _ => {
                            self.rewind(mark);
                            break;
                        }
                    };
                    let call_args = self.parse_call_args()?;
                    let span = self.span_from(start);
                    expr = self.alloc_expr(
                        ExprKind::Call {
                            callee: expr,
                            template_args: args,
                            args: call_args,
                        },
                        span,
                    );
                }
                TokenKind::LBracket => {
                    let open = self.cursor.advance().span;
                    let index = self.parse_expr()?;
                    self.expect_closing(TokenKind::RBracket, open)?;
                    let span = self.span_from(start);
                    expr = self.alloc_expr(ExprKind::Index { base: expr, index }, span);
                }
                TokenKind::Dot => {
                    self.cursor.advance();
                    let (name, name_span) = self.expect_ident()?;
                    let span = self.span_from(start);
                    expr = self.alloc_expr(
                        ExprKind::Member {
                            base: expr,
                            name,
                            name_span,
                        },
                        span,
                    );
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> PResult<Vec<ExprId>> {
        let open = self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.cursor.check(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.cursor.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect_closing(TokenKind::RParen, open)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> PResult<ExprId> {
        let token = self.cursor.current();
        let literal = match (token.kind, token.value) {
            (TokenKind::IntLit, TokenValue::Int(v)) => Some(ExprKind::Int(v)),
            (TokenKind::FloatLit, TokenValue::Float(bits)) => Some(ExprKind::Float(bits)),
            (TokenKind::DoubleLit, TokenValue::Double(bits)) => Some(ExprKind::Double(bits)),
            (TokenKind::True, _) => Some(ExprKind::Bool(true)),
            (TokenKind::False, _) => Some(ExprKind::Bool(false)),
            // Already reported by the lexer.
            (TokenKind::Error, _) => Some(ExprKind::Error),
            _ => None,
        };
        if let Some(kind) = literal {
            self.cursor.advance();
            return Ok(self.alloc_expr(kind, token.span));
        }

        match token.kind {
            TokenKind::Ident => {
                let path: Path = self.parse_path()?;
                let span = path.span;
                Ok(self.alloc_expr(ExprKind::Path(path), span))
            }
            TokenKind::LParen => {
                self.cursor.advance();
                let inner = self.parse_expr()?;
                self.expect_closing(TokenKind::RParen, token.span)?;
                Ok(inner)
            }
            TokenKind::LBrace => self.parse_init_list(),
            kind if primitive_of(kind).is_some() && self.cursor.peek_kind(1) == TokenKind::LParen => {
                // Functional cast `float(x)`.
                let to = primitive_of(self.cursor.advance().kind).unwrap_or(snex_ir::Primitive::Int);
                let open = self.expect(TokenKind::LParen)?;
                let expr = self.parse_expr()?;
                self.expect_closing(TokenKind::RParen, open)?;
                let span = self.span_from(token.span);
                Ok(self.alloc_expr(ExprKind::Cast { to, expr }, span))
            }
            _ => Err(ParseError(
                Diagnostic::error(ErrorCode::E1002)
                    .with_message(format!(
                        "expected expression, found `{}`",
                        token.kind.display_name()
                    ))
                    .with_label(token.span, "expected expression"),
            )),
        }
    }

    /// `'{' (expr (',' expr)* ','?)? '}'`
    pub(crate) fn parse_init_list(&mut self) -> PResult<ExprId> {
        let open = self.expect(TokenKind::LBrace)?;
        let mut elems = Vec::new();
        while !self.cursor.check(TokenKind::RBrace) {
            elems.push(self.parse_expr()?);
            if !self.cursor.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect_closing(TokenKind::RBrace, open)?;
        let span = self.span_from(open);
        Ok(self.alloc_expr(ExprKind::InitList(elems), span))
    }

    /// Initializer after `=`: an expression or a braced list.
    pub(crate) fn parse_initializer(&mut self) -> PResult<ExprId> {
        if self.cursor.check(TokenKind::LBrace) {
            self.parse_init_list()
        } else {
            self.parse_expr()
        }
    }
}
