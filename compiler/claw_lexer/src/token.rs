//! Lexed tokens and per-token metadata flags.

use crate::TokenKind;
use claw_source::SourceLocation;
use std::fmt;

/// Per-token metadata flags packed into a single byte.
///
/// The lexer sets the whitespace-context and spelling flags; the
/// preprocessor owns `NO_EXPAND`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct TokenFlags(u8);

impl TokenFlags {
    /// Token is the first token on its line (ignoring line splices).
    pub const AT_LINE_START: u8 = 1 << 0;
    /// Whitespace or a comment preceded this token.
    pub const LEADING_SPACE: u8 = 1 << 1;
    /// Token text contains a backslash-newline splice; its raw spelling
    /// needs cleaning before textual comparison.
    pub const NEEDS_CLEANING: u8 = 1 << 2;
    /// Identifier contains a universal character name (`\u`/`\U` escape).
    pub const HAS_UCN: u8 = 1 << 3;
    /// Preprocessor stamp: this identifier must never be macro-expanded
    /// again (it named a macro that was already being expanded).
    pub const NO_EXPAND: u8 = 1 << 4;

    /// Empty flags (no bits set).
    pub const EMPTY: Self = TokenFlags(0);

    /// Create flags from raw bits.
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        TokenFlags(bits)
    }

    /// Get the raw bits.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check if a specific flag is set.
    #[inline]
    pub const fn contains(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    /// Set a flag.
    #[inline]
    pub fn set(&mut self, flag: u8) {
        self.0 |= flag;
    }

    /// Clear a flag.
    #[inline]
    pub fn clear(&mut self, flag: u8) {
        self.0 &= !flag;
    }
}

/// A token as produced by the raw lexer and routed through the preprocessor.
///
/// Carries its source extent and metadata flags; the token's text lives in
/// the source manager and is looked up on demand.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LexedToken {
    pub location: SourceLocation,
    /// Raw source extent in bytes (line splices included).
    pub length: u32,
    pub kind: TokenKind,
    pub flags: TokenFlags,
}

claw_source::static_assert_size!(LexedToken, 12);

impl LexedToken {
    #[inline]
    pub fn new(location: SourceLocation, length: u32, kind: TokenKind) -> Self {
        debug_assert!(location.is_valid());
        LexedToken {
            location,
            length,
            kind,
            flags: TokenFlags::EMPTY,
        }
    }

    /// First token on its line?
    #[inline]
    pub fn is_at_line_start(&self) -> bool {
        self.flags.contains(TokenFlags::AT_LINE_START)
    }

    /// Preceded by whitespace or a comment?
    #[inline]
    pub fn has_leading_space(&self) -> bool {
        self.flags.contains(TokenFlags::LEADING_SPACE)
    }

    /// Does the raw spelling contain a line splice?
    #[inline]
    pub fn needs_cleaning(&self) -> bool {
        self.flags.contains(TokenFlags::NEEDS_CLEANING)
    }

    /// Does the identifier contain a universal character name?
    #[inline]
    pub fn has_ucn(&self) -> bool {
        self.flags.contains(TokenFlags::HAS_UCN)
    }
}

impl fmt::Debug for LexedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {:?} len {}",
            self.kind.name(),
            self.location,
            self.length
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_operations() {
        let mut flags = TokenFlags::EMPTY;
        assert!(!flags.contains(TokenFlags::AT_LINE_START));
        flags.set(TokenFlags::AT_LINE_START);
        flags.set(TokenFlags::NO_EXPAND);
        assert!(flags.contains(TokenFlags::AT_LINE_START));
        assert!(flags.contains(TokenFlags::NO_EXPAND));
        flags.clear(TokenFlags::AT_LINE_START);
        assert!(!flags.contains(TokenFlags::AT_LINE_START));
        assert!(flags.contains(TokenFlags::NO_EXPAND));
    }
}
