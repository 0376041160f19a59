//! Token and file-range value types.

use claw_lexer::{LexedToken, TokenKind};
use claw_source::{FileId, SourceLocation, SourceManager, SourceRange};
use std::fmt;

/// A token in the token buffer: location, length and kind.
///
/// A token is *spelled* when its location points at real file text and
/// *expanded* when a macro synthesized it. The token's text always lives in
/// the source manager and is looked up on demand.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Token {
    location: SourceLocation,
    length: u32,
    kind: TokenKind,
}

claw_source::static_assert_size!(Token, 12);

impl Token {
    pub fn new(location: SourceLocation, length: u32, kind: TokenKind) -> Self {
        assert!(location.is_valid());
        Token {
            location,
            length,
            kind,
        }
    }

    /// Location of the first character of the token.
    #[inline]
    pub fn location(&self) -> SourceLocation {
        self.location
    }

    /// Location right after the last character of the token.
    #[inline]
    pub fn end_location(&self) -> SourceLocation {
        self.location.offset_by(self.length)
    }

    #[inline]
    pub fn length(&self) -> u32 {
        self.length
    }

    #[inline]
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// The token's text, resolved through its spelling location.
    pub fn text<'sm>(&self, sm: &'sm SourceManager) -> &'sm str {
        &sm.character_data(self.location)[..self.length as usize]
    }

    /// The file range the token covers. Valid only for spelled tokens.
    pub fn range(&self, sm: &SourceManager) -> FileRange {
        assert!(self.location.is_file_id(), "must be a spelled token");
        let (file, begin) = sm.decompose(self.location);
        FileRange::new(file, begin, begin + self.length)
    }

    /// The file range spanning from `first` to `last`, which must be spelled
    /// in the same file with `first` before `last`.
    pub fn range_between(sm: &SourceManager, first: &Token, last: &Token) -> FileRange {
        let first = first.range(sm);
        let last = last.range(sm);
        assert!(first.file() == last.file(), "tokens from different files");
        assert!(
            first == last || first.end_offset() <= last.begin_offset(),
            "wrong order of tokens"
        );
        FileRange::new(first.file(), first.begin_offset(), last.end_offset())
    }

    /// One-line rendering with the token text, for test dumps and builder
    /// diagnostics.
    pub fn dump_for_tests(&self, sm: &SourceManager) -> String {
        format!("{}   {}", self.kind.name(), self.text(sm))
    }
}

impl From<&LexedToken> for Token {
    fn from(tok: &LexedToken) -> Self {
        Token::new(tok.location, tok.length, tok.kind)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({}, length = {})", self.kind.name(), self.length)
    }
}

/// A half-open byte range `[begin, end)` within one file.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileRange {
    file: FileId,
    begin: u32,
    end: u32,
}

impl FileRange {
    /// Create a range from explicit offsets.
    pub fn new(file: FileId, begin: u32, end: u32) -> Self {
        assert!(begin <= end);
        FileRange { file, begin, end }
    }

    /// Range of `length` bytes starting at a spelled location.
    pub fn from_begin_len(sm: &SourceManager, begin: SourceLocation, length: u32) -> Self {
        assert!(begin.is_file_id());
        let (file, offset) = sm.decompose(begin);
        FileRange::new(file, offset, offset + length)
    }

    /// Range between two spelled locations in the same file.
    pub fn from_bounds(sm: &SourceManager, begin: SourceLocation, end: SourceLocation) -> Self {
        assert!(begin.is_file_id());
        assert!(end.is_file_id());
        let (file, begin_offset) = sm.decompose(begin);
        let (end_file, end_offset) = sm.decompose(end);
        assert!(file == end_file, "locations from different files");
        FileRange::new(file, begin_offset, end_offset)
    }

    #[inline]
    pub fn file(&self) -> FileId {
        self.file
    }

    #[inline]
    pub fn begin_offset(&self) -> u32 {
        self.begin
    }

    #[inline]
    pub fn end_offset(&self) -> u32 {
        self.end
    }

    #[inline]
    pub fn length(&self) -> u32 {
        self.end - self.begin
    }

    /// The covered source text.
    pub fn text<'sm>(&self, sm: &'sm SourceManager) -> &'sm str {
        &sm.file_text(self.file)[self.begin as usize..self.end as usize]
    }

    /// The range as a pair of composed character locations.
    pub fn to_source_range(&self, sm: &SourceManager) -> SourceRange {
        SourceRange::new(
            sm.compose(self.file, self.begin),
            sm.compose(self.file, self.end),
        )
    }
}

impl fmt::Debug for FileRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FileRange(file = {}, offsets = {}-{})",
            self.file.raw(),
            self.begin,
            self.end
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sm_with(text: &str) -> (SourceManager, FileId) {
        let mut sm = SourceManager::new();
        sm.provide_file("file.c", text);
        let fid = sm
            .create_file_id("file.c", SourceLocation::invalid())
            .expect("buffer provided");
        (sm, fid)
    }

    #[test]
    fn token_text_and_range() {
        let (sm, fid) = sm_with("int x;");
        let tok = Token::new(sm.compose(fid, 4), 1, TokenKind::Identifier);
        assert_eq!(tok.text(&sm), "x");
        let range = tok.range(&sm);
        assert_eq!(range.file(), fid);
        assert_eq!(range.begin_offset(), 4);
        assert_eq!(range.end_offset(), 5);
        assert_eq!(range.text(&sm), "x");
    }

    #[test]
    fn range_between_spans_tokens() {
        let (sm, fid) = sm_with("int x;");
        let first = Token::new(sm.compose(fid, 0), 3, TokenKind::KwInt);
        let last = Token::new(sm.compose(fid, 4), 1, TokenKind::Identifier);
        let range = Token::range_between(&sm, &first, &last);
        assert_eq!(range.text(&sm), "int x");
    }

    #[test]
    fn file_range_constructors_agree() {
        let (sm, fid) = sm_with("hello world");
        let by_len = FileRange::from_begin_len(&sm, sm.compose(fid, 6), 5);
        let by_bounds = FileRange::from_bounds(&sm, sm.compose(fid, 6), sm.compose(fid, 11));
        assert_eq!(by_len, by_bounds);
        assert_eq!(by_len.length(), 5);
        assert_eq!(by_len.text(&sm), "world");
    }

    #[test]
    fn to_source_range_composes_endpoints() {
        let (sm, fid) = sm_with("hello");
        let range = FileRange::new(fid, 1, 4);
        let sr = range.to_source_range(&sm);
        assert_eq!(sm.decompose(sr.begin()), (fid, 1));
        assert_eq!(sm.decompose(sr.end()), (fid, 4));
    }
}
