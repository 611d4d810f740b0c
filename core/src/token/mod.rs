mod error;
mod lexer;


pub use error::{FilePos, LexError, Range};
pub use lexer::Lexer;

use serde::Serialize;

/// Kind of a lexed token. The set is closed: consumers match exhaustively
/// and the lexer never produces anything outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // Keywords
    Use,
    Require,
    If,
    Else,
    ElsIf,
    Unless,
    While,
    Until,
    For,
    Foreach,
    When,
    Do,
    Next,
    Redo,
    Last,
    My,
    Our,
    Local,
    State,
    Break,
    Continue,
    Given,
    Sub,
    Package,

    // Variables
    ScalarVariable,
    ArrayVariable,
    HashVariable,
    Deref,

    // Structural punctuation
    LBrace,
    RBrace,
    LParen,
    RParen,
    LSquareBracket,
    RSquareBracket,
    Semicolon,
    Comma,
    Dot,
    Assignment,
    Operator,

    // Strings and quote-like constructs
    StringStart,
    String,
    StringEnd,
    StringModifiers,
    QuoteIdent,
    HereDoc,
    HereDocEnd,

    // Hash access (some produced only by the second pass)
    HashKey,
    HashSubStart,
    HashSubEnd,
    HashDerefStart,
    HashDerefEnd,

    // Subroutine headers
    SubName,
    Prototype,
    Signature,
    Attribute,
    AttributeArgs,
    AttributeColon,

    // Literals
    NumericLiteral,
    VersionLiteral,

    // Trivia
    Whitespace,
    Newline,
    Comment,
    Pod,

    // Words
    Name,
    Builtin,
    FileTest,

    EndOfInput,
}

impl TokenKind {
    /// True for the three sigil-carrying variable kinds.
    pub fn is_variable(self) -> bool {
        matches!(
            self,
            TokenKind::ScalarVariable | TokenKind::ArrayVariable | TokenKind::HashVariable
        )
    }

    /// Tokens that carry no syntactic weight between significant tokens.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::Newline | TokenKind::Comment
        )
    }
}

/// A single lexed token. `text` is the raw source text of the token, except
/// for delimited strings where the delimiters live in their own
/// `StringStart`/`StringEnd` tokens. `start` is the position of the first
/// character; `end` points one past the last character, so `offset` spans
/// are half-open and concatenate losslessly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: FilePos,
    pub end: FilePos,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, start: FilePos, end: FilePos) -> Self {
        Self {
            kind,
            text: text.into(),
            start,
            end,
        }
    }
}

/// Forward cursor over a token slice that transparently skips the given
/// kinds. The symbol passes skip all trivia; the retagging passes keep
/// newlines significant and skip only whitespace and comments.
pub struct TokenIterator<'a> {
    tokens: &'a [Token],
    skip: &'a [TokenKind],
    pos: usize,
}

impl<'a> TokenIterator<'a> {
    pub fn new(tokens: &'a [Token], skip: &'a [TokenKind]) -> Self {
        Self {
            tokens,
            skip,
            pos: 0,
        }
    }

    pub fn starting_at(tokens: &'a [Token], skip: &'a [TokenKind], pos: usize) -> Self {
        Self { tokens, skip, pos }
    }

    /// Index of the next token to be inspected. After `next()` returns a
    /// token at index `i`, this is `i + 1`.
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn next(&mut self) -> Option<&'a Token> {
        while let Some(token) = self.tokens.get(self.pos) {
            self.pos += 1;
            if !self.skip.contains(&token.kind) {
                return Some(token);
            }
        }
        None
    }

    /// Look at the next significant token without consuming it.
    pub fn peek(&self) -> Option<&'a Token> {
        let mut pos = self.pos;
        while let Some(token) = self.tokens.get(pos) {
            pos += 1;
            if !self.skip.contains(&token.kind) {
                return Some(token);
            }
        }
        None
    }

    /// Consume a `StringStart [String] StringEnd` run and return its
    /// contents. Leaves the iterator untouched when the next significant
    /// token is not a string start.
    pub fn try_get_string(&mut self) -> Option<String> {
        let saved = self.pos;
        match self.next() {
            Some(token) if token.kind == TokenKind::StringStart => {}
            _ => {
                self.pos = saved;
                return None;
            }
        }
        match self.next() {
            Some(token) if token.kind == TokenKind::String => {
                let contents = token.text.clone();
                let before_end = self.pos;
                match self.next() {
                    Some(end) if end.kind == TokenKind::StringEnd => {}
                    _ => self.pos = before_end,
                }
                Some(contents)
            }
            Some(token) if token.kind == TokenKind::StringEnd => Some(String::new()),
            _ => {
                self.pos = saved;
                None
            }
        }
    }
}

/// Skip set used by the symbol passes.
pub const SKIP_TRIVIA: &[TokenKind] = &[
    TokenKind::Whitespace,
    TokenKind::Comment,
    TokenKind::Newline,
];

/// Skip set used by the retagging passes, where newlines stay significant.
pub const SKIP_INLINE_TRIVIA: &[TokenKind] = &[TokenKind::Whitespace, TokenKind::Comment];
