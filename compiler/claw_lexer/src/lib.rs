//! Raw C lexer, token kinds and keyword tables for the claw toolkit.
//!
//! The [`Lexer`] turns one file buffer into a stream of [`LexedToken`]s with
//! no preprocessing: directives are delivered as ordinary `#`-led tokens,
//! identifiers come out as [`TokenKind::RawIdentifier`], and keyword
//! resolution is the caller's job via [`IdentifierTable`]. This is the layer
//! both the preprocessor and the spelled-token retokenizer share.
//!
//! # Lexing rules
//!
//! - Whitespace and comments (`//`, `/* */`) separate tokens and set the
//!   `LEADING_SPACE` flag on the following token.
//! - A newline sets `AT_LINE_START` on the next token; a backslash-newline
//!   splice does *not* (spliced lines continue the logical line).
//! - Splices inside identifiers, numbers and literals are consumed into the
//!   token and flagged `NEEDS_CLEANING`; token lengths always cover the raw
//!   source extent.
//! - `\u`/`\U` escapes in identifiers are consumed and flagged `HAS_UCN`.
//! - Punctuators use maximal munch (`>>=` before `>>` before `>`).
//! - At end of file the lexer produces a zero-length [`TokenKind::Eof`]
//!   token at the end-of-file location, and keeps producing it.
//!
//! # Modules
//!
//! - [`token_kind`]: the C token-kind enumeration
//! - [`keywords`]: length-bucketed keyword lookup per dialect
//! - [`token`]: `LexedToken` and `TokenFlags`
//! - [`lang_options`]: dialect switches

mod keywords;
mod lang_options;
mod token;
mod token_kind;

pub use keywords::IdentifierTable;
pub use lang_options::LangOptions;
pub use token::{LexedToken, TokenFlags};
pub use token_kind::TokenKind;

use claw_source::{FileId, SourceLocation, SourceManager};
use std::sync::Arc;

/// Returns the number of bytes in the UTF-8 character starting with `byte`.
#[inline]
fn utf8_char_width(byte: u8) -> u32 {
    match byte {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 1,
    }
}

#[inline]
fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[inline]
fn is_number_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}

/// Raw lexer over a single file.
///
/// Holds a shared handle to the file's text, so it stays usable while the
/// source manager grows new entries behind it.
pub struct Lexer {
    buffer: Arc<str>,
    pos: u32,
    source_len: u32,
    /// Raw encoding of the file's offset-zero location; token locations are
    /// `base_raw + offset` since file entries are contiguous.
    base_raw: u32,
    at_line_start: bool,
    leading_space: bool,
}

impl Lexer {
    /// Create a lexer positioned at the start of `fid`.
    pub fn new(fid: FileId, sm: &SourceManager) -> Self {
        let buffer = sm.file_buffer(fid);
        let source_len = buffer.len() as u32;
        Lexer {
            buffer,
            pos: 0,
            source_len,
            base_raw: sm.compose(fid, 0).raw_encoding(),
            at_line_start: true,
            leading_space: false,
        }
    }

    /// Byte at `i`, or `0` past the end of the buffer.
    #[inline]
    fn byte(&self, i: u32) -> u8 {
        self.buffer.as_bytes().get(i as usize).copied().unwrap_or(0)
    }

    #[inline]
    fn loc(&self, offset: u32) -> SourceLocation {
        SourceLocation::from_raw(self.base_raw + offset)
    }

    /// Length of a backslash-newline splice starting at `at`, if any.
    fn splice_len(&self, at: u32) -> Option<u32> {
        if self.byte(at) != b'\\' {
            return None;
        }
        match self.byte(at + 1) {
            b'\n' => Some(2),
            b'\r' => Some(if self.byte(at + 2) == b'\n' { 3 } else { 2 }),
            _ => None,
        }
    }

    /// Produce the next token.
    ///
    /// Returns `Eof` with zero length once the buffer is exhausted, and on
    /// every call thereafter.
    pub fn next_token(&mut self) -> LexedToken {
        self.skip_trivia();

        let start = self.pos;
        let mut flags = TokenFlags::EMPTY;
        if self.at_line_start {
            flags.set(TokenFlags::AT_LINE_START);
        }
        if self.leading_space {
            flags.set(TokenFlags::LEADING_SPACE);
        }

        if start >= self.source_len {
            // Eof always terminates a directive line.
            flags.set(TokenFlags::AT_LINE_START);
            let mut tok = LexedToken::new(self.loc(self.source_len), 0, TokenKind::Eof);
            tok.flags = flags;
            return tok;
        }

        let kind = self.dispatch(&mut flags);
        self.at_line_start = false;
        self.leading_space = false;

        let mut tok = LexedToken::new(self.loc(start), self.pos - start, kind);
        tok.flags = flags;
        tok
    }

    fn dispatch(&mut self, flags: &mut TokenFlags) -> TokenKind {
        use TokenKind::*;
        match self.byte(self.pos) {
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.lex_identifier(flags),
            b'\\' if matches!(self.byte(self.pos + 1), b'u' | b'U') => self.lex_identifier(flags),
            b'0'..=b'9' => self.lex_number(flags),
            b'.' => {
                if self.byte(self.pos + 1).is_ascii_digit() {
                    self.lex_number(flags)
                } else if self.byte(self.pos + 1) == b'.' && self.byte(self.pos + 2) == b'.' {
                    self.punct(3, Ellipsis)
                } else {
                    self.punct(1, Period)
                }
            }
            b'"' => self.lex_quoted(b'"', flags),
            b'\'' => self.lex_quoted(b'\'', flags),
            b'(' => self.punct(1, LParen),
            b')' => self.punct(1, RParen),
            b'[' => self.punct(1, LBracket),
            b']' => self.punct(1, RBracket),
            b'{' => self.punct(1, LBrace),
            b'}' => self.punct(1, RBrace),
            b'~' => self.punct(1, Tilde),
            b'?' => self.punct(1, Question),
            b';' => self.punct(1, Semi),
            b',' => self.punct(1, Comma),
            b':' => self.punct(1, Colon),
            b'#' => {
                if self.byte(self.pos + 1) == b'#' {
                    self.punct(2, HashHash)
                } else {
                    self.punct(1, Hash)
                }
            }
            b'+' => match self.byte(self.pos + 1) {
                b'+' => self.punct(2, PlusPlus),
                b'=' => self.punct(2, PlusEqual),
                _ => self.punct(1, Plus),
            },
            b'-' => match self.byte(self.pos + 1) {
                b'-' => self.punct(2, MinusMinus),
                b'=' => self.punct(2, MinusEqual),
                b'>' => self.punct(2, Arrow),
                _ => self.punct(1, Minus),
            },
            b'&' => match self.byte(self.pos + 1) {
                b'&' => self.punct(2, AmpAmp),
                b'=' => self.punct(2, AmpEqual),
                _ => self.punct(1, Amp),
            },
            b'|' => match self.byte(self.pos + 1) {
                b'|' => self.punct(2, PipePipe),
                b'=' => self.punct(2, PipeEqual),
                _ => self.punct(1, Pipe),
            },
            b'<' => match (self.byte(self.pos + 1), self.byte(self.pos + 2)) {
                (b'<', b'=') => self.punct(3, LessLessEqual),
                (b'<', _) => self.punct(2, LessLess),
                (b'=', _) => self.punct(2, LessEqual),
                _ => self.punct(1, Less),
            },
            b'>' => match (self.byte(self.pos + 1), self.byte(self.pos + 2)) {
                (b'>', b'=') => self.punct(3, GreaterGreaterEqual),
                (b'>', _) => self.punct(2, GreaterGreater),
                (b'=', _) => self.punct(2, GreaterEqual),
                _ => self.punct(1, Greater),
            },
            b'=' => {
                if self.byte(self.pos + 1) == b'=' {
                    self.punct(2, EqualEqual)
                } else {
                    self.punct(1, Equal)
                }
            }
            b'!' => {
                if self.byte(self.pos + 1) == b'=' {
                    self.punct(2, ExclaimEqual)
                } else {
                    self.punct(1, Exclaim)
                }
            }
            b'*' => {
                if self.byte(self.pos + 1) == b'=' {
                    self.punct(2, StarEqual)
                } else {
                    self.punct(1, Star)
                }
            }
            b'%' => {
                if self.byte(self.pos + 1) == b'=' {
                    self.punct(2, PercentEqual)
                } else {
                    self.punct(1, Percent)
                }
            }
            b'^' => {
                if self.byte(self.pos + 1) == b'=' {
                    self.punct(2, CaretEqual)
                } else {
                    self.punct(1, Caret)
                }
            }
            // Comments were consumed as trivia; a remaining '/' is an
            // operator.
            b'/' => {
                if self.byte(self.pos + 1) == b'=' {
                    self.punct(2, SlashEqual)
                } else {
                    self.punct(1, Slash)
                }
            }
            b => {
                self.pos += utf8_char_width(b);
                Unknown
            }
        }
    }

    fn punct(&mut self, width: u32, kind: TokenKind) -> TokenKind {
        self.pos += width;
        kind
    }

    /// Skip whitespace, newlines, comments and between-token splices,
    /// updating the line-start and leading-space state.
    fn skip_trivia(&mut self) {
        loop {
            match self.byte(self.pos) {
                b' ' | b'\t' | 0x0B | 0x0C => {
                    self.pos += 1;
                    self.leading_space = true;
                }
                b'\n' => {
                    self.pos += 1;
                    self.at_line_start = true;
                    self.leading_space = false;
                }
                b'\r' => {
                    self.pos += if self.byte(self.pos + 1) == b'\n' { 2 } else { 1 };
                    self.at_line_start = true;
                    self.leading_space = false;
                }
                b'\\' => match self.splice_len(self.pos) {
                    Some(n) => {
                        self.pos += n;
                        self.leading_space = true;
                    }
                    None => break,
                },
                b'/' => match self.byte(self.pos + 1) {
                    b'/' => {
                        self.skip_line_comment();
                        self.leading_space = true;
                    }
                    b'*' => self.skip_block_comment(),
                    _ => break,
                },
                _ => break,
            }
        }
    }

    /// Advance to the newline terminating a `//` comment (or to EOF).
    fn skip_line_comment(&mut self) {
        let rest = &self.buffer.as_bytes()[self.pos as usize..self.source_len as usize];
        match memchr::memchr2(b'\n', b'\r', rest) {
            Some(off) => self.pos += off as u32,
            None => self.pos = self.source_len,
        }
    }

    fn skip_block_comment(&mut self) {
        let start = self.pos;
        self.pos += 2; // consume "/*"
        loop {
            let rest = &self.buffer.as_bytes()[self.pos as usize..self.source_len as usize];
            match memchr::memchr(b'*', rest) {
                Some(off) => {
                    self.pos += off as u32 + 1;
                    if self.byte(self.pos) == b'/' {
                        self.pos += 1;
                        break;
                    }
                }
                None => {
                    // Unterminated comment runs to EOF.
                    self.pos = self.source_len;
                    break;
                }
            }
        }
        let body = &self.buffer.as_bytes()[start as usize..self.pos as usize];
        if memchr::memchr(b'\n', body).is_some() {
            self.at_line_start = true;
            self.leading_space = false;
        } else {
            self.leading_space = true;
        }
    }

    fn lex_identifier(&mut self, flags: &mut TokenFlags) -> TokenKind {
        loop {
            let b = self.byte(self.pos);
            if is_ident_continue(b) {
                self.pos += 1;
                continue;
            }
            if b == b'\\' {
                if let Some(n) = self.splice_len(self.pos) {
                    // The splice joins the identifier only if it continues
                    // on the next line.
                    let after = self.byte(self.pos + n);
                    if is_ident_continue(after) || after == b'\\' {
                        self.pos += n;
                        flags.set(TokenFlags::NEEDS_CLEANING);
                        continue;
                    }
                    break;
                }
                if matches!(self.byte(self.pos + 1), b'u' | b'U') {
                    self.pos += 2;
                    while self.byte(self.pos).is_ascii_hexdigit() {
                        self.pos += 1;
                    }
                    flags.set(TokenFlags::HAS_UCN);
                    continue;
                }
            }
            break;
        }
        TokenKind::RawIdentifier
    }

    /// Lex a preprocessing number: digits, identifier characters, `.`, and
    /// exponent sign pairs (`e+`, `E-`, `p+`, `P-`).
    fn lex_number(&mut self, flags: &mut TokenFlags) -> TokenKind {
        loop {
            let b = self.byte(self.pos);
            if matches!(b, b'e' | b'E' | b'p' | b'P')
                && matches!(self.byte(self.pos + 1), b'+' | b'-')
            {
                self.pos += 2;
                continue;
            }
            if is_number_continue(b) {
                self.pos += 1;
                continue;
            }
            if b == b'\\' {
                if let Some(n) = self.splice_len(self.pos) {
                    if is_number_continue(self.byte(self.pos + n)) {
                        self.pos += n;
                        flags.set(TokenFlags::NEEDS_CLEANING);
                        continue;
                    }
                }
            }
            break;
        }
        TokenKind::NumericConstant
    }

    /// Lex a string literal or character constant. Unterminated literals end
    /// at the newline (or EOF) without consuming it.
    fn lex_quoted(&mut self, quote: u8, flags: &mut TokenFlags) -> TokenKind {
        self.pos += 1; // opening quote
        loop {
            let b = self.byte(self.pos);
            match b {
                0 if self.pos >= self.source_len => break,
                b'\n' | b'\r' => break,
                b'\\' => {
                    if let Some(n) = self.splice_len(self.pos) {
                        self.pos += n;
                        flags.set(TokenFlags::NEEDS_CLEANING);
                    } else {
                        self.pos += 1;
                        if self.pos >= self.source_len {
                            break; // lone backslash at end of buffer
                        }
                        self.pos += utf8_char_width(self.byte(self.pos));
                    }
                }
                _ if b == quote => {
                    self.pos += 1;
                    break;
                }
                _ => self.pos += utf8_char_width(b),
            }
        }
        if quote == b'"' {
            TokenKind::StringLiteral
        } else {
            TokenKind::CharConstant
        }
    }
}

#[cfg(test)]
mod tests;
