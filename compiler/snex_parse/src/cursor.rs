//! Token cursor for navigating the token stream.

use snex_ir::{Name, Span, Token, TokenKind, TokenList, TokenValue};

/// Saved cursor state for speculative parsing.
#[derive(Copy, Clone, Debug)]
pub struct CursorMark {
    pos: usize,
    splits: usize,
}

/// Cursor over an owned token vector.
///
/// The last token is always `Eof`, so `current()` is always valid.
/// A `>>` that closes two template argument lists is split in place;
/// splits are logged so [`Cursor::rewind`] can undo them.
pub struct Cursor {
    tokens: Vec<Token>,
    pos: usize,
    split_log: Vec<(usize, Token)>,
}

impl Cursor {
    pub fn new(tokens: TokenList) -> Self {
        let mut tokens = tokens.into_vec();
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let end = tokens.last().map_or(0, |t| t.span.end);
            tokens.push(Token::new(TokenKind::Eof, Span::point(end)));
        }
        Cursor {
            tokens,
            pos: 0,
            split_log: Vec::new(),
        }
    }

    #[inline]
    pub fn current(&self) -> Token {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    #[inline]
    pub fn current_kind(&self) -> TokenKind {
        self.current().kind
    }

    #[inline]
    pub fn current_span(&self) -> Span {
        self.current().span
    }

    /// Span of the last consumed token.
    pub fn previous_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            Span::DUMMY
        }
    }

    /// Kind `n` tokens ahead; `Eof` past the end.
    pub fn peek_kind(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.current_kind() == TokenKind::Eof
    }

    #[inline]
    pub fn check(&self, kind: TokenKind) -> bool {
        self.current_kind() == kind
    }

    /// Consume the current token; `Eof` is never consumed.
    pub fn advance(&mut self) -> Token {
        let token = self.current();
        if token.kind != TokenKind::Eof {
            tracing::trace!(kind = ?token.kind, pos = self.pos, "advance");
            self.pos += 1;
        }
        token
    }

    /// Consume the current token if it is `kind`.
    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Name carried by the current identifier token.
    pub fn current_name(&self) -> Option<Name> {
        match self.current().value {
            TokenValue::Name(name) if self.check(TokenKind::Ident) => Some(name),
            _ => None,
        }
    }

    /// Consume one `>` of a closing template argument list.
    ///
    /// A `>>` token is split: the first half is consumed and the second
    /// remains as a `>` token at the same position.
    pub fn eat_closing_angle(&mut self) -> bool {
        match self.current_kind() {
            TokenKind::Gt => {
                self.advance();
                true
            }
            TokenKind::Shr => {
                let original = self.current();
                let half = Span::new(original.span.start + 1, original.span.end);
                self.split_log.push((self.pos, original));
                self.tokens[self.pos] = Token::new(TokenKind::Gt, half);
                true
            }
            _ => false,
        }
    }

    pub fn mark(&self) -> CursorMark {
        CursorMark {
            pos: self.pos,
            splits: self.split_log.len(),
        }
    }

    /// Restore a state saved by [`Cursor::mark`].
    pub fn rewind(&mut self, mark: CursorMark) {
        while self.split_log.len() > mark.splits {
            if let Some((pos, token)) = self.split_log.pop() {
                self.tokens[pos] = token;
            }
        }
        self.pos = mark.pos;
    }

    pub fn position(&self) -> usize {
        self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snex_ir::StringInterner;

    fn cursor(source: &str) -> Cursor {
        let mut interner = StringInterner::new();
        let (tokens, _) = snex_lexer::lex(source, &mut interner);
        Cursor::new(tokens)
    }

    #[test]
    fn advance_stops_at_eof() {
        let mut c = cursor("a");
        c.advance();
        c.advance();
        assert!(c.is_at_end());
    }

    #[test]
    fn split_shift_and_rewind() {
        let mut c = cursor(">> x");
        let mark = c.mark();
        assert!(c.eat_closing_angle());
        assert_eq!(c.current_kind(), TokenKind::Gt);
        assert_eq!(c.current_span(), Span::new(1, 2));
        assert!(c.eat_closing_angle());
        assert_eq!(c.current_kind(), TokenKind::Ident);
        c.rewind(mark);
        assert_eq!(c.current_kind(), TokenKind::Shr);
    }
}
