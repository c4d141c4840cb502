//! Items: namespaces, usings, structs, templates, functions and globals.

use snex_diagnostic::{Diagnostic, ErrorCode};
use snex_ir::{
    FieldDecl, FunctionDecl, GlobalDecl, Item, ItemKind, Param, Span, StructDecl, TemplateDecl,
    TemplateParam, TemplateParamKind, TokenKind, TypeExpr, TypeExprKind,
};

use crate::recovery::{synchronize, ITEM_RECOVERY, TYPE_START};
use crate::{PResult, ParseError, Parser};

impl Parser<'_> {
    /// Items up to (not including) `end`.
    pub(crate) fn parse_items_until(&mut self, end: TokenKind) -> Vec<Item> {
        let mut items = Vec::new();
        while !self.cursor.check(end) && !self.cursor.is_at_end() {
            let before = self.cursor.position();
            match self.parse_item() {
                Ok(Some(item)) => items.push(item),
                Ok(None) => {}
                Err(err) => {
                    self.diagnostics.push(err.0);
                    synchronize(&mut self.cursor, ITEM_RECOVERY);
                    if self.cursor.position() == before {
                        self.cursor.advance();
                    }
                }
            }
        }
        items
    }

    fn parse_item(&mut self) -> PResult<Option<Item>> {
        let start = self.cursor.current_span();
        let kind = match self.cursor.current_kind() {
            TokenKind::Semicolon => {
                self.cursor.advance();
                return Ok(None);
            }
            TokenKind::Namespace => {
                self.cursor.advance();
                let (name, name_span) = self.expect_ident()?;
                let open = self.expect(TokenKind::LBrace)?;
                let items = self.parse_items_until(TokenKind::RBrace);
                self.expect_closing(TokenKind::RBrace, open)?;
                ItemKind::Namespace {
                    name,
                    name_span,
                    items,
                }
            }
            TokenKind::Using => self.parse_using()?,
            TokenKind::Struct => {
                let decl = self.parse_struct()?;
                self.cursor.eat(TokenKind::Semicolon);
                ItemKind::Struct(decl)
            }
            TokenKind::Template => ItemKind::Template(self.parse_template()?),
            kind if kind == TokenKind::Static
                || kind == TokenKind::Const
                || TYPE_START.contains(kind) =>
            {
                self.parse_function_or_global()?
            }
            found => {
                return Err(ParseError(
                    Diagnostic::error(ErrorCode::E1006)
                        .with_message(format!(
                            "expected a declaration, found `{}`",
                            found.display_name()
                        ))
                        .with_label(start, "not valid at this level")
                        .with_note("statements are only allowed inside function bodies"),
                ));
            }
        };
        Ok(Some(Item {
            kind,
            span: self.span_from(start),
        }))
    }

    /// `using namespace path;` or `using Name = type;`
    fn parse_using(&mut self) -> PResult<ItemKind> {
        self.expect(TokenKind::Using)?;
        if self.cursor.eat(TokenKind::Namespace) {
            let path = self.parse_path()?;
            self.expect(TokenKind::Semicolon)?;
            return Ok(ItemKind::UsingNamespace(path));
        }
        let (name, name_span) = self.expect_ident()?;
        self.expect(TokenKind::Eq)?;
        let target = self.parse_type()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(ItemKind::Alias {
            name,
            name_span,
            target,
        })
    }

    /// `template '<' param (',' param)* '>' (struct | function)`
    fn parse_template(&mut self) -> PResult<TemplateDecl> {
        self.expect(TokenKind::Template)?;
        let open = self.expect(TokenKind::Lt)?;
        let mut params = Vec::new();
        loop {
            let start = self.cursor.current_span();
            let kind = match self.cursor.current_kind() {
                TokenKind::Typename => TemplateParamKind::Type,
                TokenKind::Int => TemplateParamKind::Int,
                _ => return Err(self.unexpected("`typename` or `int`")),
            };
            self.cursor.advance();
            let (name, _) = self.expect_ident()?;
            params.push(TemplateParam {
                kind,
                name,
                span: self.span_from(start),
            });
            if !self.cursor.eat(TokenKind::Comma) {
                break;
            }
        }
        if !self.cursor.eat_closing_angle() {
            self.expect_closing(TokenKind::Gt, open)?;
        }

        let start = self.cursor.current_span();
        let kind = if self.cursor.check(TokenKind::Struct) {
            let decl = self.parse_struct()?;
            self.cursor.eat(TokenKind::Semicolon);
            ItemKind::Struct(decl)
        } else {
            match self.parse_function_or_global()? {
                ItemKind::Function(f) => ItemKind::Function(f),
                _ => {
                    return Err(ParseError(
                        Diagnostic::error(ErrorCode::E1006)
                            .with_message("templates must declare a struct or a function")
                            .with_label(self.span_from(start), "not a struct or function"),
                    ))
                }
            }
        };
        Ok(TemplateDecl {
            params,
            item: Box::new(Item {
                kind,
                span: self.span_from(start),
            }),
        })
    }

    /// `struct Name { (field ';' | function)* }`
    fn parse_struct(&mut self) -> PResult<StructDecl> {
        self.expect(TokenKind::Struct)?;
        let (name, name_span) = self.expect_ident()?;
        let open = self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !self.cursor.check(TokenKind::RBrace) && !self.cursor.is_at_end() {
            let before = self.cursor.position();
            match self.parse_member() {
                Ok(Member::Field(field)) => fields.push(field),
                Ok(Member::Method(method)) => methods.push(method),
                Ok(Member::None) => {}
                Err(err) => {
                    self.diagnostics.push(err.0);
                    synchronize(&mut self.cursor, ITEM_RECOVERY);
                    if self.cursor.position() == before {
                        self.cursor.advance();
                    }
                }
            }
        }
        self.expect_closing(TokenKind::RBrace, open)?;
        Ok(StructDecl {
            name,
            name_span,
            fields,
            methods,
        })
    }

    fn parse_member(&mut self) -> PResult<Member> {
        let start = self.cursor.current_span();
        if self.cursor.eat(TokenKind::Semicolon) {
            return Ok(Member::None);
        }
        self.cursor.eat(TokenKind::Static);
        self.cursor.eat(TokenKind::Const);
        let ty = self.parse_type()?;
        let (name, name_span) = self.expect_ident()?;
        if self.cursor.check(TokenKind::LParen) {
            return Ok(Member::Method(self.parse_function_rest(ty, name, name_span)?));
        }
        let init = if self.cursor.eat(TokenKind::Eq) {
            Some(self.parse_initializer()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;
        Ok(Member::Field(FieldDecl {
            ty,
            name,
            span: self.span_from(start),
            init,
        }))
    }

    fn parse_function_or_global(&mut self) -> PResult<ItemKind> {
        // Globals have static storage either way.
        self.cursor.eat(TokenKind::Static);
        let is_const = self.cursor.eat(TokenKind::Const);
        let ty = self.parse_type()?;
        let (name, name_span) = self.expect_ident()?;
        if self.cursor.check(TokenKind::LParen) {
            return Ok(ItemKind::Function(self.parse_function_rest(ty, name, name_span)?));
        }
        let init = if self.cursor.eat(TokenKind::Eq) {
            Some(self.parse_initializer()?)
        } else if self.cursor.check(TokenKind::LBrace) {
            Some(self.parse_init_list()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;
        Ok(ItemKind::Global(GlobalDecl {
            ty,
            name,
            name_span,
            init,
            is_const,
        }))
    }

    /// Parameter list and body after `ret name`.
    fn parse_function_rest(
        &mut self,
        ret: TypeExpr,
        name: snex_ir::Name,
        name_span: Span,
    ) -> PResult<FunctionDecl> {
        let open = self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.cursor.check(TokenKind::RParen) {
            loop {
                params.push(self.parse_param()?);
                if !self.cursor.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect_closing(TokenKind::RParen, open)?;
        // `void f(void)`
        if params.len() == 1
            && matches!(params[0].ty.kind, TypeExprKind::Primitive(snex_ir::Primitive::Void))
        {
            params.clear();
        }

        if !self.cursor.check(TokenKind::LBrace) {
            let token = self.cursor.current();
            return Err(ParseError(
                Diagnostic::error(ErrorCode::E1007)
                    .with_message(format!(
                        "function `{}` has no body",
                        self.name_text(name)
                    ))
                    .with_label(token.span, "expected `{`")
                    .with_secondary_label(name_span, "function declared here")
                    .with_note("every function must be defined where it is declared"),
            ));
        }
        let body = self.parse_block()?;
        Ok(FunctionDecl {
            ret,
            name,
            name_span,
            params,
            body: Some(body),
        })
    }

    fn parse_param(&mut self) -> PResult<Param> {
        let start = self.cursor.current_span();
        let is_const = self.cursor.eat(TokenKind::Const);
        let ty = self.parse_type()?;
        // `void f(void)` has a nameless parameter.
        let name = if matches!(ty.kind, TypeExprKind::Primitive(snex_ir::Primitive::Void))
            && self.cursor.check(TokenKind::RParen)
        {
            snex_ir::Name::EMPTY
        } else {
            self.expect_ident()?.0
        };
        Ok(Param {
            ty,
            name,
            is_const,
            span: self.span_from(start),
        })
    }
}

enum Member {
    Field(FieldDecl),
    Method(FunctionDecl),
    None,
}
