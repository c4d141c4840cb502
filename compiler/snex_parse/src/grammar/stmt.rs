//! Statements and blocks.

use snex_ir::{AssignOp, BinaryOp, ExprKind, StmtId, StmtKind, TokenKind};
use snex_stack::ensure_sufficient_stack;

use super::ty::primitive_of;
use crate::recovery::{synchronize, STMT_RECOVERY};
use crate::{PResult, Parser};

fn assign_op(kind: TokenKind) -> Option<AssignOp> {
    Some(match kind {
        TokenKind::Eq => AssignOp::Assign,
        TokenKind::PlusEq => AssignOp::Compound(BinaryOp::Add),
        TokenKind::MinusEq => AssignOp::Compound(BinaryOp::Sub),
        TokenKind::StarEq => AssignOp::Compound(BinaryOp::Mul),
        TokenKind::SlashEq => AssignOp::Compound(BinaryOp::Div),
        TokenKind::PercentEq => AssignOp::Compound(BinaryOp::Mod),
        TokenKind::AmpEq => AssignOp::Compound(BinaryOp::BitAnd),
        TokenKind::PipeEq => AssignOp::Compound(BinaryOp::BitOr),
        TokenKind::CaretEq => AssignOp::Compound(BinaryOp::BitXor),
        TokenKind::ShlEq => AssignOp::Compound(BinaryOp::Shl),
        TokenKind::ShrEq => AssignOp::Compound(BinaryOp::Shr),
        _ => return None,
    })
}

impl Parser<'_> {
    /// `block := '{' stmt* '}'`
    pub(crate) fn parse_block(&mut self) -> PResult<StmtId> {
        let open = self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.cursor.check(TokenKind::RBrace) && !self.cursor.is_at_end() {
            stmts.push(self.parse_statement_recovering());
        }
        self.expect_closing(TokenKind::RBrace, open)?;
        let span = self.span_from(open);
        Ok(self.alloc_stmt(StmtKind::Block(stmts), span))
    }

    /// Parse one statement; on error report it and skip to the next
    /// statement boundary.
    fn parse_statement_recovering(&mut self) -> StmtId {
        let start = self.cursor.current_span();
        let before = self.cursor.position();
        match self.parse_statement() {
            Ok(stmt) => stmt,
            Err(err) => {
                self.diagnostics.push(err.0);
                synchronize(&mut self.cursor, STMT_RECOVERY);
                if self.cursor.position() == before {
                    self.cursor.advance();
                }
                let span = self.span_from(start);
                self.alloc_stmt(StmtKind::Error, span)
            }
        }
    }

    pub(crate) fn parse_statement(&mut self) -> PResult<StmtId> {
        ensure_sufficient_stack(|| {
            let start = self.cursor.current_span();
            match self.cursor.current_kind() {
                TokenKind::LBrace => self.parse_block(),
                TokenKind::Semicolon => {
                    self.cursor.advance();
                    Ok(self.alloc_stmt(StmtKind::Empty, start))
                }
                TokenKind::If => self.parse_if(),
                TokenKind::While => {
                    self.cursor.advance();
                    let open = self.expect(TokenKind::LParen)?;
                    let cond = self.parse_expr()?;
                    self.expect_closing(TokenKind::RParen, open)?;
                    let body = self.parse_statement()?;
                    let span = self.span_from(start);
                    Ok(self.alloc_stmt(StmtKind::While { cond, body }, span))
                }
                TokenKind::For => self.parse_for(),
                TokenKind::Return => {
                    self.cursor.advance();
                    let value = if self.cursor.check(TokenKind::Semicolon) {
                        None
                    } else {
                        Some(self.parse_initializer()?)
                    };
                    self.expect(TokenKind::Semicolon)?;
                    let span = self.span_from(start);
                    Ok(self.alloc_stmt(StmtKind::Return(value), span))
                }
                TokenKind::Break | TokenKind::Continue => {
                    let kind = if self.cursor.advance().kind == TokenKind::Break {
                        StmtKind::Break
                    } else {
                        StmtKind::Continue
                    };
                    self.expect(TokenKind::Semicolon)?;
                    let span = self.span_from(start);
                    Ok(self.alloc_stmt(kind, span))
                }
                _ => {
                    let stmt = if self.at_local_declaration() {
                        self.parse_local()?
                    } else {
                        self.parse_simple()?
                    };
                    self.expect(TokenKind::Semicolon)?;
                    Ok(stmt)
                }
            }
        })
    }

    fn at_local_declaration(&mut self) -> bool {
        match self.cursor.current_kind() {
            TokenKind::Const | TokenKind::Static | TokenKind::Auto | TokenKind::Span | TokenKind::Dyn => true,
            // `float(x)` is a cast, `float x` a declaration.
            kind if primitive_of(kind).is_some() => self.cursor.peek_kind(1) != TokenKind::LParen,
            _ => self.looks_like_declaration(),
        }
    }

    fn parse_if(&mut self) -> PResult<StmtId> {
        let start = self.expect(TokenKind::If)?;
        let open = self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect_closing(TokenKind::RParen, open)?;
        let then_branch = self.parse_statement()?;
        let else_branch = if self.cursor.eat(TokenKind::Else) {
            Some(self.parse_statement()?)
        } else {
            None
        };
        let span = self.span_from(start);
        Ok(self.alloc_stmt(
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            },
            span,
        ))
    }

    /// `for (init; cond; update) body` or `for (T x : iterable) body`.
    fn parse_for(&mut self) -> PResult<StmtId> {
        let start = self.expect(TokenKind::For)?;
        let open = self.expect(TokenKind::LParen)?;

        let mark = self.mark();
        let range_head = self.parse_type().and_then(|ty| {
            let (name, name_span) = self.expect_ident()?;
            self.expect(TokenKind::Colon)?;
            Ok((ty, name, name_span))
        });
        if let Ok((ty, name, name_span)) = range_head {
            let iterable = self.parse_expr()?;
            self.expect_closing(TokenKind::RParen, open)?;
            let body = self.parse_statement()?;
            let span = self.span_from(start);
            return Ok(self.alloc_stmt(
                StmtKind::RangeFor {
                    ty,
                    name,
                    name_span,
                    iterable,
                    body,
                },
                span,
            ));
        }
        self.rewind(mark);

        let init = if self.cursor.check(TokenKind::Semicolon) {
            None
        } else if self.at_local_declaration() {
            Some(self.parse_local()?)
        } else {
            Some(self.parse_simple()?)
        };
        self.expect(TokenKind::Semicolon)?;

        let cond = if self.cursor.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::Semicolon)?;

        let update = if self.cursor.check(TokenKind::RParen) {
            None
        } else {
            Some(self.parse_simple()?)
        };
        self.expect_closing(TokenKind::RParen, open)?;

        let body = self.parse_statement()?;
        let span = self.span_from(start);
        Ok(self.alloc_stmt(
            StmtKind::For {
                init,
                cond,
                update,
                body,
            },
            span,
        ))
    }

    /// `'const'? type IDENT ('=' init | init_list)?`, without the `;`.
    pub(crate) fn parse_local(&mut self) -> PResult<StmtId> {
        let start = self.cursor.current_span();
        self.cursor.eat(TokenKind::Static);
        let is_const = self.cursor.eat(TokenKind::Const);
        let ty = self.parse_type()?;
        let (name, name_span) = self.expect_ident()?;
        let init = if self.cursor.eat(TokenKind::Eq) {
            Some(self.parse_initializer()?)
        } else if self.cursor.check(TokenKind::LBrace) {
            Some(self.parse_init_list()?)
        } else {
            None
        };
        let span = self.span_from(start);
        Ok(self.alloc_stmt(
            StmtKind::Local {
                ty,
                name,
                name_span,
                init,
                is_const,
            },
            span,
        ))
    }

    /// Expression, assignment or increment, without the `;`.
    ///
    /// `x++` and `++x` become `x += 1`; increments are statements only.
    pub(crate) fn parse_simple(&mut self) -> PResult<StmtId> {
        let start = self.cursor.current_span();

        if matches!(
            self.cursor.current_kind(),
            TokenKind::PlusPlus | TokenKind::MinusMinus
        ) {
            let op_token = self.cursor.advance();
            let target = self.parse_expr()?;
            return Ok(self.increment(op_token.kind, op_token.span, target, start));
        }

        let target = self.parse_expr()?;
        let kind = self.cursor.current_kind();
        if let Some(op) = assign_op(kind) {
            self.cursor.advance();
            let value = self.parse_initializer()?;
            let span = self.span_from(start);
            return Ok(self.alloc_stmt(StmtKind::Assign { op, target, value }, span));
        }
        if matches!(kind, TokenKind::PlusPlus | TokenKind::MinusMinus) {
            let op_token = self.cursor.advance();
            return Ok(self.increment(op_token.kind, op_token.span, target, start));
        }

        let span = self.span_from(start);
        Ok(self.alloc_stmt(StmtKind::Expr(target), span))
    }

    fn increment(
        &mut self,
        kind: TokenKind,
        op_span: snex_ir::Span,
        target: snex_ir::ExprId,
        start: snex_ir::Span,
    ) -> StmtId {
        let op = if kind == TokenKind::PlusPlus {
            BinaryOp::Add
        } else {
            BinaryOp::Sub
        };
        let one = self.alloc_expr(ExprKind::Int(1), op_span);
        let span = self.span_from(start);
        self.alloc_stmt(
            StmtKind::Assign {
                op: AssignOp::Compound(op),
                target,
                value: one,
            },
            span,
        )
    }
}
