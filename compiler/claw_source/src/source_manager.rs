//! File buffers, macro-expansion records and location queries.

use crate::{FileId, SourceLocation};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Error when resolving a named buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// No buffer with this name was provided to the manager.
    UnknownFile(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::UnknownFile(name) => write!(f, "no buffer provided for '{name}'"),
        }
    }
}

impl std::error::Error for SourceError {}

/// A file entry: one inclusion of a named buffer.
///
/// Occupies `text.len() + 1` offsets of the shared space, so every file has a
/// distinct end-of-file location one past its last byte.
struct FileInfo {
    base: u32,
    text: Arc<str>,
    name: Box<str>,
    /// Where this file was included from. Invalid for the main file and for
    /// builtin buffers.
    include_loc: SourceLocation,
    /// Builtin buffers (scratch space for pasted/stringized tokens) have no
    /// backing file and are omitted from dumps.
    builtin: bool,
}

/// An expansion entry: the tokens produced by one macro invocation.
///
/// Occupies one offset per produced token. Each slot records the spelling
/// location of that token (where its characters actually live: the macro
/// definition, an argument, or a scratch buffer).
struct ExpansionInfo {
    base: u32,
    spelling: Vec<SourceLocation>,
    /// Location of the macro name at the invocation site. May itself be a
    /// macro location when the invocation was rescanned out of another
    /// expansion; walking this chain reaches the top-level file position.
    expansion_begin: SourceLocation,
    /// Location of the last token of the invocation (the name itself for
    /// object-like macros, the closing paren for function-like ones).
    #[allow(dead_code)]
    expansion_end: SourceLocation,
}

enum SLocEntry {
    File(FileInfo),
    Expansion(ExpansionInfo),
}

impl SLocEntry {
    fn base(&self) -> u32 {
        match self {
            SLocEntry::File(f) => f.base,
            SLocEntry::Expansion(e) => e.base,
        }
    }
}

/// Owns every source buffer and macro-expansion record of a translation unit
/// and answers all location queries.
///
/// Buffers are registered up front with [`provide_file`] (an in-memory file
/// store); entries are allocated lazily as the preprocessor enters files and
/// expands macros, which keeps entry order consistent with translation-unit
/// order.
///
/// The manager is append-only: nothing is ever removed or rewritten, so
/// locations stay valid for its whole lifetime.
///
/// [`provide_file`]: SourceManager::provide_file
pub struct SourceManager {
    entries: Vec<SLocEntry>,
    /// Next free offset of the shared space. Offset 0 is reserved so that a
    /// raw encoding of 0 stays invalid.
    next_offset: u32,
    file_store: FxHashMap<Box<str>, Arc<str>>,
}

impl SourceManager {
    pub fn new() -> Self {
        SourceManager {
            entries: Vec::new(),
            next_offset: 1,
            file_store: FxHashMap::default(),
        }
    }

    /// Register a named buffer without allocating an entry for it.
    ///
    /// The buffer becomes visible to [`create_file_id`], which the
    /// preprocessor calls when it actually enters the file.
    ///
    /// [`create_file_id`]: SourceManager::create_file_id
    pub fn provide_file(&mut self, name: &str, text: &str) {
        self.file_store.insert(name.into(), Arc::from(text));
    }

    /// Allocate a file entry for one inclusion of a named buffer.
    ///
    /// Every call creates a fresh entry with its own offset range, so a file
    /// included twice is tracked twice. `include_loc` is the location of the
    /// include that brought the file in; pass the invalid location for the
    /// main file.
    pub fn create_file_id(
        &mut self,
        name: &str,
        include_loc: SourceLocation,
    ) -> Result<FileId, SourceError> {
        let text = self
            .file_store
            .get(name)
            .cloned()
            .ok_or_else(|| SourceError::UnknownFile(name.to_string()))?;
        Ok(self.push_file(name, text, include_loc, false))
    }

    /// Allocate a builtin scratch buffer holding `text`.
    ///
    /// Scratch buffers carry the characters of tokens the preprocessor
    /// manufactures (`#` stringization, `##` pasting). They have no backing
    /// file and are skipped by dump output.
    pub fn create_scratch_buffer(&mut self, text: &str) -> FileId {
        self.push_file("<scratch space>", Arc::from(text), SourceLocation::invalid(), true)
    }

    fn push_file(
        &mut self,
        name: &str,
        text: Arc<str>,
        include_loc: SourceLocation,
        builtin: bool,
    ) -> FileId {
        let base = self.next_offset;
        let len = u32::try_from(text.len()).expect("source buffer exceeds 2 GiB");
        // One extra offset so the end-of-file location is addressable.
        self.next_offset = base + len + 1;
        self.entries.push(SLocEntry::File(FileInfo {
            base,
            text,
            name: name.into(),
            include_loc,
            builtin,
        }));
        FileId::new(self.entries.len() - 1)
    }

    /// Allocate an expansion entry for the tokens produced by one macro
    /// invocation and return the location of its first slot.
    ///
    /// `spelling[i]` is where the characters of produced token `i` live.
    /// `expansion_begin` is the location of the macro name at the call site;
    /// `expansion_end` the location of the invocation's last token.
    pub fn create_expansion(
        &mut self,
        spelling: Vec<SourceLocation>,
        expansion_begin: SourceLocation,
        expansion_end: SourceLocation,
    ) -> SourceLocation {
        assert!(!spelling.is_empty(), "expansion entry must produce tokens");
        assert!(expansion_begin.is_valid() && expansion_end.is_valid());
        let base = self.next_offset;
        let len = u32::try_from(spelling.len()).expect("expansion token count exceeds u32");
        self.next_offset = base + len;
        self.entries.push(SLocEntry::Expansion(ExpansionInfo {
            base,
            spelling,
            expansion_begin,
            expansion_end,
        }));
        SourceLocation::from_space_offset(base, true)
    }

    /// Index of the entry containing `loc`.
    fn entry_index(&self, loc: SourceLocation) -> usize {
        debug_assert!(loc.is_valid());
        let off = loc.space_offset();
        let idx = self.entries.partition_point(|e| e.base() <= off);
        assert!(idx > 0, "location before first entry");
        let idx = idx - 1;
        debug_assert_eq!(
            matches!(self.entries[idx], SLocEntry::Expansion(_)),
            loc.is_macro_id(),
            "location kind does not match its entry"
        );
        idx
    }

    fn file_info(&self, fid: FileId) -> &FileInfo {
        match &self.entries[fid.index()] {
            SLocEntry::File(f) => f,
            SLocEntry::Expansion(_) => panic!("FileId does not name a file entry"),
        }
    }

    /// The file containing the given file location.
    pub fn file_id(&self, loc: SourceLocation) -> FileId {
        assert!(loc.is_file_id(), "file_id requires a file location");
        FileId::new(self.entry_index(loc))
    }

    /// Split a file location into its file and byte offset.
    pub fn decompose(&self, loc: SourceLocation) -> (FileId, u32) {
        assert!(loc.is_file_id(), "decompose requires a file location");
        let idx = self.entry_index(loc);
        let base = self.entries[idx].base();
        (FileId::new(idx), loc.space_offset() - base)
    }

    /// Build the file location for a byte offset within a file.
    ///
    /// `offset` may equal the file length, giving the end-of-file location.
    pub fn compose(&self, fid: FileId, offset: u32) -> SourceLocation {
        let info = self.file_info(fid);
        assert!(
            offset as usize <= info.text.len(),
            "offset {offset} past end of '{}'",
            info.name
        );
        SourceLocation::from_space_offset(info.base + offset, false)
    }

    /// The location one past the last byte of a file.
    pub fn end_of_file_loc(&self, fid: FileId) -> SourceLocation {
        let info = self.file_info(fid);
        SourceLocation::from_space_offset(info.base + info.text.len() as u32, false)
    }

    /// Full text of a file.
    pub fn file_text(&self, fid: FileId) -> &str {
        &self.file_info(fid).text
    }

    /// Shared handle to a file's text, for lexers that outlive a borrow.
    pub fn file_buffer(&self, fid: FileId) -> Arc<str> {
        Arc::clone(&self.file_info(fid).text)
    }

    /// Name the file was registered under.
    pub fn file_name(&self, fid: FileId) -> &str {
        &self.file_info(fid).name
    }

    /// Returns `true` for scratch/builtin buffers with no backing file.
    pub fn is_builtin(&self, fid: FileId) -> bool {
        self.file_info(fid).builtin
    }

    /// The include location recorded for a file. Invalid for the main file.
    pub fn include_loc(&self, fid: FileId) -> SourceLocation {
        self.file_info(fid).include_loc
    }

    /// Walk a macro location up to the file position of the invocation that
    /// ultimately produced it. File locations map to themselves.
    pub fn expansion_loc(&self, mut loc: SourceLocation) -> SourceLocation {
        while loc.is_macro_id() {
            match &self.entries[self.entry_index(loc)] {
                SLocEntry::Expansion(e) => loc = e.expansion_begin,
                SLocEntry::File(_) => unreachable!("macro location inside a file entry"),
            }
        }
        loc
    }

    /// Walk a macro location to the file position its characters were
    /// spelled at. File locations map to themselves.
    pub fn spelling_loc(&self, mut loc: SourceLocation) -> SourceLocation {
        while loc.is_macro_id() {
            match &self.entries[self.entry_index(loc)] {
                SLocEntry::Expansion(e) => {
                    let slot = (loc.space_offset() - e.base) as usize;
                    loc = e.spelling[slot];
                }
                SLocEntry::File(_) => unreachable!("macro location inside a file entry"),
            }
        }
        loc
    }

    /// The source text starting at a location's spelling position.
    ///
    /// Callers slice the result to the token length they carry.
    pub fn character_data(&self, loc: SourceLocation) -> &str {
        let (fid, offset) = self.decompose(self.spelling_loc(loc));
        &self.file_info(fid).text[offset as usize..]
    }

    /// Ancestor chain of a location, root first.
    ///
    /// Each step records `(entry index, offset in the shared space)`; the
    /// walk follows include locations for files and expansion-begin
    /// locations for expansions. Entries always originate in earlier
    /// entries, so the walk terminates.
    fn ancestor_chain(&self, mut loc: SourceLocation) -> Vec<(usize, u32)> {
        let mut chain = Vec::new();
        loop {
            let idx = self.entry_index(loc);
            chain.push((idx, loc.space_offset()));
            let origin = match &self.entries[idx] {
                SLocEntry::File(f) => f.include_loc,
                SLocEntry::Expansion(e) => e.expansion_begin,
            };
            if !origin.is_valid() {
                break;
            }
            loc = origin;
        }
        chain.reverse();
        chain
    }

    /// Returns `true` if `lhs` comes strictly before `rhs` in the order a
    /// reader of the fully-preprocessed translation unit would see them.
    ///
    /// Correct across include boundaries and macro expansions: both
    /// locations are walked up to a common entry, where their offsets
    /// decide. A location that *is* the origin point of the other's entry
    /// (an include position against the included file's content, a macro
    /// name against its expansion) orders before that content.
    pub fn is_before_in_translation_unit(
        &self,
        lhs: SourceLocation,
        rhs: SourceLocation,
    ) -> bool {
        assert!(lhs.is_valid() && rhs.is_valid());
        if lhs == rhs {
            return false;
        }
        let a = self.ancestor_chain(lhs);
        let b = self.ancestor_chain(rhs);
        for (&(ea, oa), &(eb, ob)) in a.iter().zip(&b) {
            if ea != eb {
                // Sibling entries that share an origin point: entry creation
                // order is translation-unit order.
                return ea < eb;
            }
            if oa != ob {
                return oa < ob;
            }
        }
        // One chain is a prefix of the other: the shorter one is the origin
        // point of the deeper content, and content follows its origin.
        a.len() < b.len()
    }

    /// 1-based line and column of a byte offset within a file.
    pub fn line_and_column(&self, fid: FileId, offset: u32) -> (u32, u32) {
        let text = &self.file_info(fid).text[..offset as usize];
        let line = memchr::memchr_iter(b'\n', text.as_bytes()).count() as u32 + 1;
        let col = match memchr::memrchr(b'\n', text.as_bytes()) {
            Some(nl) => offset - nl as u32,
            None => offset + 1,
        };
        (line, col)
    }

    /// Render a location as `name:line:col` for diagnostics.
    ///
    /// Macro locations are rendered at their expansion position.
    pub fn location_string(&self, loc: SourceLocation) -> String {
        if !loc.is_valid() {
            return "<invalid>".to_string();
        }
        let (fid, offset) = self.decompose(self.expansion_loc(loc));
        let (line, col) = self.line_and_column(fid, offset);
        format!("{}:{line}:{col}", self.file_name(fid))
    }
}

impl Default for SourceManager {
    fn default() -> Self {
        SourceManager::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with(files: &[(&str, &str)]) -> SourceManager {
        let mut sm = SourceManager::new();
        for (name, text) in files {
            sm.provide_file(name, text);
        }
        sm
    }

    #[test]
    fn compose_decompose_roundtrip() {
        let mut sm = manager_with(&[("a.c", "int x;\n")]);
        let fid = sm.create_file_id("a.c", SourceLocation::invalid()).unwrap();
        for off in [0, 3, 7] {
            let loc = sm.compose(fid, off);
            assert!(loc.is_file_id());
            assert_eq!(sm.decompose(loc), (fid, off));
        }
        assert_eq!(sm.end_of_file_loc(fid), sm.compose(fid, 7));
    }

    #[test]
    fn unknown_file_is_an_error() {
        let mut sm = SourceManager::new();
        let err = sm
            .create_file_id("missing.h", SourceLocation::invalid())
            .unwrap_err();
        assert_eq!(err, SourceError::UnknownFile("missing.h".to_string()));
    }

    #[test]
    fn each_inclusion_gets_its_own_entry() {
        let mut sm = manager_with(&[("a.c", "x"), ("h.h", "y")]);
        let main = sm.create_file_id("a.c", SourceLocation::invalid()).unwrap();
        let inc1 = sm.create_file_id("h.h", sm.compose(main, 0)).unwrap();
        let inc2 = sm.create_file_id("h.h", sm.compose(main, 1)).unwrap();
        assert_ne!(inc1, inc2);
        assert_eq!(sm.file_text(inc1), sm.file_text(inc2));
    }

    #[test]
    fn expansion_and_spelling_walks() {
        let mut sm = manager_with(&[("a.c", "M N;\n")]);
        let fid = sm.create_file_id("a.c", SourceLocation::invalid()).unwrap();
        let call = sm.compose(fid, 0);
        let def_spelling = sm.compose(fid, 2);
        let base = sm.create_expansion(vec![def_spelling], call, call);

        assert!(base.is_macro_id());
        assert_eq!(sm.expansion_loc(base), call);
        assert_eq!(sm.spelling_loc(base), def_spelling);
        // A nested expansion rooted inside the first walks to the same file
        // position.
        let nested = sm.create_expansion(vec![sm.compose(fid, 0)], base, base);
        assert_eq!(sm.expansion_loc(nested), call);
    }

    #[test]
    fn character_data_resolves_spelling() {
        let mut sm = manager_with(&[("a.c", "alpha beta")]);
        let fid = sm.create_file_id("a.c", SourceLocation::invalid()).unwrap();
        let spelled = sm.compose(fid, 6);
        assert!(sm.character_data(spelled).starts_with("beta"));
        let call = sm.compose(fid, 0);
        let mac = sm.create_expansion(vec![spelled], call, call);
        assert!(sm.character_data(mac).starts_with("beta"));
    }

    #[test]
    fn scratch_buffers_are_builtin() {
        let mut sm = SourceManager::new();
        let fid = sm.create_scratch_buffer("ab");
        assert!(sm.is_builtin(fid));
        assert_eq!(sm.file_text(fid), "ab");
        assert_eq!(sm.file_name(fid), "<scratch space>");
    }

    #[test]
    fn tu_order_within_one_file() {
        let mut sm = manager_with(&[("a.c", "int x;\n")]);
        let fid = sm.create_file_id("a.c", SourceLocation::invalid()).unwrap();
        let a = sm.compose(fid, 0);
        let b = sm.compose(fid, 4);
        assert!(sm.is_before_in_translation_unit(a, b));
        assert!(!sm.is_before_in_translation_unit(b, a));
        assert!(!sm.is_before_in_translation_unit(a, a));
    }

    #[test]
    fn tu_order_across_an_include() {
        // main:  AA <include> BB  -- the included file's content must order
        // after tokens before the include point and before tokens after it,
        // even though its raw offsets are larger than both.
        let mut sm = manager_with(&[("main.c", "AA ## BB"), ("h.h", "hh")]);
        let main = sm.create_file_id("main.c", SourceLocation::invalid()).unwrap();
        let include_point = sm.compose(main, 3);
        let header = sm.create_file_id("h.h", include_point).unwrap();

        let before = sm.compose(main, 0);
        let inside = sm.compose(header, 0);
        let after = sm.compose(main, 6);

        assert!(sm.is_before_in_translation_unit(before, inside));
        assert!(sm.is_before_in_translation_unit(inside, after));
        assert!(!sm.is_before_in_translation_unit(after, inside));
        // The include point itself orders before the included content.
        assert!(sm.is_before_in_translation_unit(include_point, inside));
        assert!(!sm.is_before_in_translation_unit(inside, include_point));
    }

    #[test]
    fn tu_order_across_an_expansion() {
        let mut sm = manager_with(&[("a.c", "x M y")]);
        let fid = sm.create_file_id("a.c", SourceLocation::invalid()).unwrap();
        let call = sm.compose(fid, 2);
        let mac = sm.create_expansion(vec![sm.compose(fid, 0)], call, call);

        assert!(sm.is_before_in_translation_unit(sm.compose(fid, 0), mac));
        assert!(sm.is_before_in_translation_unit(mac, sm.compose(fid, 4)));
        // The macro name position orders before the tokens it expanded to.
        assert!(sm.is_before_in_translation_unit(call, mac));
    }

    #[test]
    fn line_and_column_rendering() {
        let mut sm = manager_with(&[("a.c", "ab\ncdef\ng")]);
        let fid = sm.create_file_id("a.c", SourceLocation::invalid()).unwrap();
        assert_eq!(sm.line_and_column(fid, 0), (1, 1));
        assert_eq!(sm.line_and_column(fid, 3), (2, 1));
        assert_eq!(sm.line_and_column(fid, 6), (2, 4));
        assert_eq!(sm.location_string(sm.compose(fid, 8)), "a.c:3:1");
    }
}
