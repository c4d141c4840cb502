//! Lexer for SNEX using logos with string interning.
//!
//! - Identifiers are interned into the unit's [`StringInterner`]
//! - Whitespace and comments are skipped
//! - Number literals are typed by form: `1` int, `1.5` double, `1.5f` float
//! - Invalid input becomes an error token plus a diagnostic; lexing continues

use logos::Logos;
use snex_diagnostic::{Diagnostic, ErrorCode};
use snex_ir::{Span, StringInterner, Token, TokenKind, TokenList, TokenValue};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum CommentEnd {
    Closed,
    Unterminated,
}

/// Consume a block comment body after the opening `/*`.
fn block_comment(lex: &mut logos::Lexer<'_, RawToken>) -> CommentEnd {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            CommentEnd::Closed
        }
        None => {
            lex.bump(lex.remainder().len());
            CommentEnd::Unterminated
        }
    }
}

/// Raw token from logos (before interning and literal checking).
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
enum RawToken {
    #[token("/*", block_comment)]
    BlockComment(CommentEnd),

    // === Keywords ===
    #[token("void")]
    Void,
    #[token("int")]
    Int,
    #[token("float")]
    Float,
    #[token("double")]
    Double,
    #[token("bool")]
    Bool,
    #[token("auto")]
    Auto,
    #[token("const")]
    Const,
    #[token("static")]
    Static,
    #[token("struct")]
    Struct,
    #[token("namespace")]
    Namespace,
    #[token("using")]
    Using,
    #[token("template")]
    Template,
    #[token("typename")]
    Typename,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("span")]
    Span,
    #[token("dyn")]
    Dyn,

    // === Delimiters ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token("::")]
    ColonColon,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("->")]
    Arrow,
    #[token("?")]
    Question,

    // === Operators ===
    #[token("++")]
    PlusPlus,
    #[token("+=")]
    PlusEq,
    #[token("+")]
    Plus,
    #[token("--")]
    MinusMinus,
    #[token("-=")]
    MinusEq,
    #[token("-")]
    Minus,
    #[token("*=")]
    StarEq,
    #[token("*")]
    Star,
    #[token("/=")]
    SlashEq,
    #[token("/")]
    Slash,
    #[token("%=")]
    PercentEq,
    #[token("%")]
    Percent,
    #[token("&&")]
    AmpAmp,
    #[token("&=")]
    AmpEq,
    #[token("&")]
    Amp,
    #[token("||")]
    PipePipe,
    #[token("|=")]
    PipeEq,
    #[token("|")]
    Pipe,
    #[token("^=")]
    CaretEq,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("!=")]
    NotEq,
    #[token("!")]
    Bang,
    #[token("<<=")]
    ShlEq,
    #[token("<<")]
    Shl,
    #[token("<=")]
    LtEq,
    #[token("<")]
    Lt,
    #[token(">>=")]
    ShrEq,
    #[token(">>")]
    Shr,
    #[token(">=")]
    GtEq,
    #[token(">")]
    Gt,
    #[token("==")]
    EqEq,
    #[token("=")]
    Eq,

    // === Literals ===
    #[regex(r"0[xX][0-9a-fA-F]+")]
    HexInt,

    #[regex(r"[0-9]+")]
    DecInt,

    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+")]
    DoubleLit,

    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?[fF]")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?[fF]")]
    #[regex(r"[0-9]+([eE][+-]?[0-9]+)?[fF]")]
    FloatLit,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

/// Lex `source` into tokens, interning identifiers into `interner`.
///
/// The token list always ends with `Eof`. Diagnostics are E0xxx errors.
#[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
pub fn lex(source: &str, interner: &mut StringInterner) -> (TokenList, Vec<Diagnostic>) {
    let mut tokens = TokenList::new();
    let mut diagnostics = Vec::new();
    let mut logos = RawToken::lexer(source);

    while let Some(result) = logos.next() {
        let span = Span::from_range(logos.span());
        let slice = logos.slice();

        let raw = match result {
            Ok(raw) => raw,
            Err(()) => {
                diagnostics.push(invalid_character(slice, span));
                tokens.push(Token::new(TokenKind::Error, span));
                continue;
            }
        };

        let token = match raw {
            RawToken::BlockComment(CommentEnd::Closed) => continue,
            RawToken::BlockComment(CommentEnd::Unterminated) => {
                diagnostics.push(
                    Diagnostic::error(ErrorCode::E0001)
                        .with_message("unterminated block comment")
                        .with_label(Span::new(span.start, span.start + 2), "comment starts here")
                        .with_suggestion("close the comment with `*/`"),
                );
                continue;
            }
            RawToken::Ident => {
                let name = interner.intern(slice);
                Token::new(TokenKind::Ident, span).with_value(TokenValue::Name(name))
            }
            RawToken::DecInt => match slice.parse::<i32>() {
                Ok(value) => Token::new(TokenKind::IntLit, span).with_value(TokenValue::Int(value)),
                Err(_) => {
                    diagnostics.push(invalid_number(slice, span, "does not fit in `int`"));
                    Token::new(TokenKind::IntLit, span).with_value(TokenValue::Int(0))
                }
            },
            RawToken::HexInt => match u32::from_str_radix(&slice[2..], 16) {
                // Hex literals are bit patterns: 0xFFFFFFFF is -1.
                Ok(bits) => Token::new(TokenKind::IntLit, span)
                    .with_value(TokenValue::Int(bits as i32)),
                Err(_) => {
                    diagnostics.push(invalid_number(slice, span, "does not fit in 32 bits"));
                    Token::new(TokenKind::IntLit, span).with_value(TokenValue::Int(0))
                }
            },
            RawToken::DoubleLit => match slice.parse::<f64>() {
                Ok(value) if value.is_finite() => Token::new(TokenKind::DoubleLit, span)
                    .with_value(TokenValue::Double(value.to_bits())),
                _ => {
                    diagnostics.push(invalid_number(slice, span, "is not a finite `double`"));
                    Token::new(TokenKind::DoubleLit, span).with_value(TokenValue::Double(0))
                }
            },
            RawToken::FloatLit => {
                let digits = &slice[..slice.len() - 1];
                match digits.parse::<f32>() {
                    Ok(value) if value.is_finite() => Token::new(TokenKind::FloatLit, span)
                        .with_value(TokenValue::Float(value.to_bits())),
                    _ => {
                        diagnostics.push(invalid_number(slice, span, "is not a finite `float`"));
                        Token::new(TokenKind::FloatLit, span).with_value(TokenValue::Float(0))
                    }
                }
            }
            other => Token::new(convert_simple(&other), span),
        };
        tokens.push(token);
    }

    let end = u32::try_from(source.len()).unwrap_or(u32::MAX);
    tokens.push(Token::new(TokenKind::Eof, Span::point(end)));
    tracing::debug!(
        tokens = tokens.len(),
        errors = diagnostics.len(),
        "lexed source"
    );
    (tokens, diagnostics)
}

fn invalid_character(slice: &str, span: Span) -> Diagnostic {
    Diagnostic::error(ErrorCode::E0002)
        .with_message(format!("invalid character `{}`", slice.escape_debug()))
        .with_label(span, "not valid in SNEX source")
}

fn invalid_number(slice: &str, span: Span, problem: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E0003)
        .with_message(format!("number literal `{slice}` {problem}"))
        .with_label(span, "invalid literal")
}

/// Map payload-free raw tokens to their kind.
fn convert_simple(raw: &RawToken) -> TokenKind {
    match raw {
        RawToken::Void => TokenKind::Void,
        RawToken::Int => TokenKind::Int,
        RawToken::Float => TokenKind::Float,
        RawToken::Double => TokenKind::Double,
        RawToken::Bool => TokenKind::Bool,
        RawToken::Auto => TokenKind::Auto,
        RawToken::Const => TokenKind::Const,
        RawToken::Static => TokenKind::Static,
        RawToken::Struct => TokenKind::Struct,
        RawToken::Namespace => TokenKind::Namespace,
        RawToken::Using => TokenKind::Using,
        RawToken::Template => TokenKind::Template,
        RawToken::Typename => TokenKind::Typename,
        RawToken::Return => TokenKind::Return,
        RawToken::If => TokenKind::If,
        RawToken::Else => TokenKind::Else,
        RawToken::While => TokenKind::While,
        RawToken::For => TokenKind::For,
        RawToken::Break => TokenKind::Break,
        RawToken::Continue => TokenKind::Continue,
        RawToken::True => TokenKind::True,
        RawToken::False => TokenKind::False,
        RawToken::Span => TokenKind::Span,
        RawToken::Dyn => TokenKind::Dyn,
        RawToken::LParen => TokenKind::LParen,
        RawToken::RParen => TokenKind::RParen,
        RawToken::LBrace => TokenKind::LBrace,
        RawToken::RBrace => TokenKind::RBrace,
        RawToken::LBracket => TokenKind::LBracket,
        RawToken::RBracket => TokenKind::RBracket,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Semicolon => TokenKind::Semicolon,
        RawToken::ColonColon => TokenKind::ColonColon,
        RawToken::Colon => TokenKind::Colon,
        RawToken::Dot => TokenKind::Dot,
        RawToken::Arrow => TokenKind::Arrow,
        RawToken::Question => TokenKind::Question,
        RawToken::PlusPlus => TokenKind::PlusPlus,
        RawToken::PlusEq => TokenKind::PlusEq,
        RawToken::Plus => TokenKind::Plus,
        RawToken::MinusMinus => TokenKind::MinusMinus,
        RawToken::MinusEq => TokenKind::MinusEq,
        RawToken::Minus => TokenKind::Minus,
        RawToken::StarEq => TokenKind::StarEq,
        RawToken::Star => TokenKind::Star,
        RawToken::SlashEq => TokenKind::SlashEq,
        RawToken::Slash => TokenKind::Slash,
        RawToken::PercentEq => TokenKind::PercentEq,
        RawToken::Percent => TokenKind::Percent,
        RawToken::AmpAmp => TokenKind::AmpAmp,
        RawToken::AmpEq => TokenKind::AmpEq,
        RawToken::Amp => TokenKind::Amp,
        RawToken::PipePipe => TokenKind::PipePipe,
        RawToken::PipeEq => TokenKind::PipeEq,
        RawToken::Pipe => TokenKind::Pipe,
        RawToken::CaretEq => TokenKind::CaretEq,
        RawToken::Caret => TokenKind::Caret,
        RawToken::Tilde => TokenKind::Tilde,
        RawToken::NotEq => TokenKind::NotEq,
        RawToken::Bang => TokenKind::Bang,
        RawToken::ShlEq => TokenKind::ShlEq,
        RawToken::Shl => TokenKind::Shl,
        RawToken::LtEq => TokenKind::LtEq,
        RawToken::Lt => TokenKind::Lt,
        RawToken::ShrEq => TokenKind::ShrEq,
        RawToken::Shr => TokenKind::Shr,
        RawToken::GtEq => TokenKind::GtEq,
        RawToken::Gt => TokenKind::Gt,
        RawToken::EqEq => TokenKind::EqEq,
        RawToken::Eq => TokenKind::Eq,
        RawToken::BlockComment(_)
        | RawToken::HexInt
        | RawToken::DecInt
        | RawToken::DoubleLit
        | RawToken::FloatLit
        | RawToken::Ident => TokenKind::Error,
    }
}
