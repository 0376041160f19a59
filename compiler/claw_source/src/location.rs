//! Opaque source locations and token ranges.

use std::fmt;

/// Bit 31 of the raw encoding. Set for locations inside macro-expansion
/// entries, clear for locations inside file entries.
const MACRO_BIT: u32 = 1 << 31;

/// An opaque, compact encoding of a position in the translation unit.
///
/// A location is either a *file* location (it points at real source text and
/// the token carrying it is *spelled*) or a *macro* location (the token was
/// synthesized by a macro expansion). The raw value `0` is the invalid
/// location.
///
/// Locations are meaningless without the [`SourceManager`] that created them;
/// all non-trivial queries (decompose, expansion walking, translation-unit
/// ordering) go through it.
///
/// The derived `Ord` compares raw encodings. Within a single entry this
/// matches source order; across entries use
/// [`SourceManager::is_before_in_translation_unit`].
///
/// [`SourceManager`]: crate::SourceManager
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct SourceLocation(u32);

crate::static_assert_size!(SourceLocation, 4);

impl SourceLocation {
    /// The invalid location.
    #[inline]
    pub const fn invalid() -> Self {
        SourceLocation(0)
    }

    /// Rebuild a location from its raw encoding.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        SourceLocation(raw)
    }

    /// The raw `u32` encoding. Stable for the lifetime of the source manager;
    /// usable as a hash or ordering key over opaque locations.
    #[inline]
    pub const fn raw_encoding(self) -> u32 {
        self.0
    }

    /// Returns `true` unless this is the invalid location.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Returns `true` if this is a valid location pointing at real file text.
    #[inline]
    pub const fn is_file_id(self) -> bool {
        self.is_valid() && self.0 & MACRO_BIT == 0
    }

    /// Returns `true` if this is a valid location inside a macro expansion.
    #[inline]
    pub const fn is_macro_id(self) -> bool {
        self.is_valid() && self.0 & MACRO_BIT != 0
    }

    /// Offset within the source manager's shared allocation space.
    #[inline]
    pub(crate) const fn space_offset(self) -> u32 {
        self.0 & !MACRO_BIT
    }

    #[inline]
    pub(crate) const fn from_space_offset(offset: u32, is_macro: bool) -> Self {
        debug_assert!(offset & MACRO_BIT == 0);
        if is_macro {
            SourceLocation(offset | MACRO_BIT)
        } else {
            SourceLocation(offset)
        }
    }

    /// The location `n` raw units after this one.
    ///
    /// Only meaningful while the result stays within the same entry of the
    /// source manager (e.g. advancing by a token length within one file).
    #[inline]
    #[must_use]
    pub const fn offset_by(self, n: u32) -> Self {
        SourceLocation(self.0 + n)
    }
}

impl fmt::Debug for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            write!(f, "<invalid loc>")
        } else if self.is_macro_id() {
            write!(f, "<macro loc {}>", self.space_offset())
        } else {
            write!(f, "<file loc {}>", self.space_offset())
        }
    }
}

/// A pair of locations delimiting a token range.
///
/// Both endpoints are the locations of the *first byte* of a token, so the
/// range is inclusive of the token starting at `end`, the convention the
/// preprocessor callbacks and [`TokenBuffer::expanded_tokens_in`] use.
///
/// [`TokenBuffer::expanded_tokens_in`]: ../claw_tokens/struct.TokenBuffer.html
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceRange {
    begin: SourceLocation,
    end: SourceLocation,
}

crate::static_assert_size!(SourceRange, 8);

impl SourceRange {
    /// Create a range from its two endpoints.
    #[inline]
    pub const fn new(begin: SourceLocation, end: SourceLocation) -> Self {
        SourceRange { begin, end }
    }

    /// Location of the first token of the range.
    #[inline]
    pub const fn begin(self) -> SourceLocation {
        self.begin
    }

    /// Location of the last token of the range.
    #[inline]
    pub const fn end(self) -> SourceLocation {
        self.end
    }

    /// Returns `true` if both endpoints are valid.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.begin.is_valid() && self.end.is_valid()
    }
}

impl fmt::Debug for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}..{:?}", self.begin, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_location() {
        let loc = SourceLocation::invalid();
        assert!(!loc.is_valid());
        assert!(!loc.is_file_id());
        assert!(!loc.is_macro_id());
        assert_eq!(loc.raw_encoding(), 0);
    }

    #[test]
    fn file_and_macro_bits() {
        let file = SourceLocation::from_space_offset(42, false);
        assert!(file.is_valid());
        assert!(file.is_file_id());
        assert!(!file.is_macro_id());
        assert_eq!(file.space_offset(), 42);

        let mac = SourceLocation::from_space_offset(42, true);
        assert!(mac.is_valid());
        assert!(mac.is_macro_id());
        assert!(!mac.is_file_id());
        assert_eq!(mac.space_offset(), 42);
    }

    #[test]
    fn raw_order_within_entry() {
        let a = SourceLocation::from_space_offset(10, false);
        let b = a.offset_by(3);
        assert!(a < b);
        assert_eq!(b.space_offset(), 13);
    }

    #[test]
    fn range_validity() {
        let a = SourceLocation::from_space_offset(1, false);
        let b = SourceLocation::from_space_offset(5, false);
        assert!(SourceRange::new(a, b).is_valid());
        assert!(!SourceRange::new(SourceLocation::invalid(), b).is_valid());
    }
}
