//! Error recovery for the parser.
//!
//! Token sets use a bitset so membership is a single AND.

use snex_ir::TokenKind;

use crate::cursor::Cursor;

/// A set of token kinds; bit `i` is the kind with discriminant `i`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct TokenSet(u128);

impl TokenSet {
    #[inline]
    pub const fn new() -> Self {
        Self(0)
    }

    #[inline]
    #[must_use]
    pub const fn with(self, kind: TokenKind) -> Self {
        Self(self.0 | (1u128 << kind.discriminant_index()))
    }

    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub const fn contains(&self, kind: TokenKind) -> bool {
        (self.0 & (1u128 << kind.discriminant_index())) != 0
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Tokens that begin an item at unit or namespace level.
pub const ITEM_START: TokenSet = TokenSet::new()
    .with(TokenKind::Namespace)
    .with(TokenKind::Using)
    .with(TokenKind::Struct)
    .with(TokenKind::Template)
    .with(TokenKind::Static)
    .with(TokenKind::Eof);

/// Tokens that begin a statement that cannot also start an expression.
pub const STMT_START: TokenSet = TokenSet::new()
    .with(TokenKind::If)
    .with(TokenKind::While)
    .with(TokenKind::For)
    .with(TokenKind::Return)
    .with(TokenKind::Break)
    .with(TokenKind::Continue)
    .with(TokenKind::Const)
    .with(TokenKind::LBrace)
    .with(TokenKind::Eof);

/// Recovery inside a block: stop before these and resume.
pub const STMT_RECOVERY: TokenSet = STMT_START.with(TokenKind::RBrace);

/// Recovery between items.
pub const ITEM_RECOVERY: TokenSet = ITEM_START.with(TokenKind::RBrace);

/// Tokens that begin a type.
pub const TYPE_START: TokenSet = TokenSet::new()
    .with(TokenKind::Void)
    .with(TokenKind::Int)
    .with(TokenKind::Float)
    .with(TokenKind::Double)
    .with(TokenKind::Bool)
    .with(TokenKind::Auto)
    .with(TokenKind::Span)
    .with(TokenKind::Dyn)
    .with(TokenKind::Ident);

/// Skip tokens until one in `recovery` is reached, or just past a `;`.
///
/// Returns `true` if the stop was a member of `recovery`.
pub fn synchronize(cursor: &mut Cursor, recovery: TokenSet) -> bool {
    loop {
        let kind = cursor.current_kind();
        if recovery.contains(kind) {
            return true;
        }
        if kind == TokenKind::Semicolon {
            cursor.advance();
            return false;
        }
        if kind == TokenKind::Eof {
            return false;
        }
        cursor.advance();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_set_membership() {
        assert!(STMT_RECOVERY.contains(TokenKind::RBrace));
        assert!(STMT_RECOVERY.contains(TokenKind::Return));
        assert!(!STMT_RECOVERY.contains(TokenKind::Plus));
        assert!(TokenSet::new().is_empty());
        assert!(ITEM_START.union(TYPE_START).contains(TokenKind::Ident));
    }
}
