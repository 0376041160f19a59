//! The token buffer and its query surface.

use crate::Token;
use claw_lexer::TokenKind;
use claw_source::{FileId, SourceLocation, SourceManager, SourceRange};
use rustc_hash::FxHashMap;
use std::fmt;

/// A mapping between a contiguous spelled range of one file and a
/// contiguous expanded range.
///
/// All four fields are indices: the spelled side into the file's
/// `spelled_tokens`, the expanded side into the buffer's `expanded_tokens`.
/// The spelled side is never empty; an empty expanded side records a
/// construct that produced no tokens (an empty macro expansion or a
/// directive).
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Mapping {
    pub begin_spelled: u32,
    pub end_spelled: u32,
    pub begin_expanded: u32,
    pub end_expanded: u32,
}

claw_source::static_assert_size!(Mapping, 16);

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "spelled tokens: [{},{}), expanded tokens: [{},{})",
            self.begin_spelled, self.end_spelled, self.begin_expanded, self.end_expanded
        )
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Per-file data tracked by the buffer.
#[derive(Default)]
pub(crate) struct MarkedFile {
    /// The raw-lex of the whole file. Never contains `Eof`.
    pub(crate) spelled_tokens: Vec<Token>,
    /// Mappings ordered by both spelled and expanded position.
    pub(crate) mappings: Vec<Mapping>,
    /// Half-open range of `expanded_tokens` indices covered by this file's
    /// top-level contribution.
    pub(crate) begin_expanded: u32,
    pub(crate) end_expanded: u32,
}

/// A macro expansion resolved by [`TokenBuffer::expansion_starting_at`].
pub struct Expansion<'a> {
    /// The spelled tokens of the invocation.
    pub spelled: &'a [Token],
    /// The expanded tokens the invocation produced. Empty for macros that
    /// expanded to nothing.
    pub expanded: &'a [Token],
}

/// Two parallel views of a preprocessed translation unit: the *expanded*
/// token stream the front-end consumes and the *spelled* tokens of every
/// contributing file, plus the mappings tying them together through macro
/// expansions.
///
/// Built once by [`TokenCollector::consume`] and immutable afterwards; all
/// queries take `&self` and the buffer is safe to share across threads for
/// reading. It borrows the source manager for its whole life.
///
/// Regions without a mapping are *file-token runs*: stretches where each
/// expanded token is a spelled token copied verbatim, matched by position.
///
/// [`TokenCollector::consume`]: crate::TokenCollector::consume
pub struct TokenBuffer<'sm> {
    pub(crate) source_mgr: &'sm SourceManager,
    /// The expanded stream; always ends with a single `Eof` token.
    pub(crate) expanded_tokens: Vec<Token>,
    pub(crate) files: FxHashMap<FileId, MarkedFile>,
}

impl<'sm> TokenBuffer<'sm> {
    pub(crate) fn new(source_mgr: &'sm SourceManager, expanded_tokens: Vec<Token>) -> Self {
        TokenBuffer {
            source_mgr,
            expanded_tokens,
            files: FxHashMap::default(),
        }
    }

    pub fn source_manager(&self) -> &'sm SourceManager {
        self.source_mgr
    }

    /// All expanded tokens, terminated by `Eof`.
    pub fn expanded_tokens(&self) -> &[Token] {
        &self.expanded_tokens
    }

    /// The expanded tokens whose locations fall inside the closed range
    /// `[range.begin(), range.end()]` in translation-unit order. Empty for
    /// an invalid range.
    pub fn expanded_tokens_in(&self, range: SourceRange) -> &[Token] {
        if !range.is_valid() {
            return &[];
        }
        let begin = self.expanded_tokens.partition_point(|t| {
            self.source_mgr
                .is_before_in_translation_unit(t.location(), range.begin())
        });
        let end = self.expanded_tokens.partition_point(|t| {
            !self
                .source_mgr
                .is_before_in_translation_unit(range.end(), t.location())
        });
        if begin > end {
            return &[];
        }
        &self.expanded_tokens[begin..end]
    }

    /// The spelled tokens of a tracked file.
    pub fn spelled_tokens(&self, fid: FileId) -> &[Token] {
        let file = self.files.get(&fid).expect("file not tracked by token buffer");
        &file.spelled_tokens
    }

    /// Index of `tok` within the expanded stream. `tok` must be a reference
    /// into [`expanded_tokens`](Self::expanded_tokens).
    fn expanded_index(&self, tok: &Token) -> usize {
        index_within(&self.expanded_tokens, tok)
    }

    /// The spelled token that produced one expanded token, along with the
    /// mapping that produced it when the token came out of a macro
    /// expansion (`None` for file-token runs).
    ///
    /// For a macro-produced token the answer is the *first* spelled token
    /// of the invocation.
    pub fn spelled_for_expanded_token(&self, expanded: &Token) -> (&Token, Option<&Mapping>) {
        let expanded_index = self.expanded_index(expanded) as u32;
        let fid = self
            .source_mgr
            .file_id(self.source_mgr.expansion_loc(expanded.location()));
        let file = self.files.get(&fid).expect("no file for an expanded token");

        // Find the last mapping that starts at or before the token.
        let it = file
            .mappings
            .partition_point(|m| m.begin_expanded <= expanded_index);
        if it == 0 {
            // Before any mapping: a file-token run anchored at the file's
            // first expanded index.
            return (
                &file.spelled_tokens[(expanded_index - file.begin_expanded) as usize],
                None,
            );
        }
        let mapping = &file.mappings[it - 1];
        if expanded_index < mapping.end_expanded {
            return (&file.spelled_tokens[mapping.begin_spelled as usize], Some(mapping));
        }
        // A file-token run after the mapping.
        (
            &file.spelled_tokens
                [(mapping.end_spelled + (expanded_index - mapping.end_expanded)) as usize],
            None,
        )
    }

    /// The smallest spelled range that covers `expanded`, or `None` when no
    /// unique spelled range exists.
    ///
    /// Fails for empty ranges (ambiguous against empty mappings), ranges
    /// whose endpoints resolve to different files, and ranges that cut a
    /// macro expansion in half.
    pub fn spelled_for_expanded(&self, expanded: &[Token]) -> Option<&[Token]> {
        if expanded.is_empty() {
            return None;
        }
        let first = expanded.first().expect("checked non-empty");
        let last = expanded.last().expect("checked non-empty");
        let (begin_spelled, begin_mapping) = self.spelled_for_expanded_token(first);
        let (last_spelled, last_mapping) = self.spelled_for_expanded_token(last);

        let fid = self.source_mgr.file_id(begin_spelled.location());
        if fid != self.source_mgr.file_id(last_spelled.location()) {
            return None;
        }
        let file = &self.files[&fid];

        // Do not allow changes that cross macro expansion boundaries.
        let begin_expanded = self.expanded_index(first) as u32;
        let end_expanded = self.expanded_index(last) as u32 + 1;
        if let Some(mapping) = begin_mapping {
            if mapping.begin_expanded < begin_expanded {
                return None;
            }
        }
        if let Some(mapping) = last_mapping {
            if end_expanded < mapping.end_expanded {
                return None;
            }
        }

        let begin = match begin_mapping {
            Some(mapping) => mapping.begin_spelled as usize,
            None => index_within(&file.spelled_tokens, begin_spelled),
        };
        let end = match last_mapping {
            Some(mapping) => mapping.end_spelled as usize,
            None => index_within(&file.spelled_tokens, last_spelled) + 1,
        };
        Some(&file.spelled_tokens[begin..end])
    }

    /// The expansion whose first spelled token is `spelled`, or `None` if
    /// no mapping starts exactly there.
    pub fn expansion_starting_at(&self, spelled: &Token) -> Option<Expansion<'_>> {
        assert!(spelled.location().is_file_id(), "not a spelled token");
        let fid = self.source_mgr.file_id(spelled.location());
        let file = self.files.get(&fid).expect("file not tracked by token buffer");
        let spelled_index = index_within(&file.spelled_tokens, spelled) as u32;

        let it = file
            .mappings
            .partition_point(|m| m.begin_spelled < spelled_index);
        let mapping = file.mappings.get(it)?;
        if mapping.begin_spelled != spelled_index {
            return None;
        }
        Some(Expansion {
            spelled: &file.spelled_tokens
                [mapping.begin_spelled as usize..mapping.end_spelled as usize],
            expanded: &self.expanded_tokens
                [mapping.begin_expanded as usize..mapping.end_expanded as usize],
        })
    }

    /// The first spelled token of every macro invocation mapped in `fid`.
    ///
    /// Filters mappings by identifier kind, which keeps object- and
    /// function-like invocations but drops directive regions.
    pub fn macro_expansions(&self, fid: FileId) -> Vec<&Token> {
        let file = self.files.get(&fid).expect("file not tracked by token buffer");
        let mut expansions = Vec::new();
        for mapping in &file.mappings {
            let token = &file.spelled_tokens[mapping.begin_spelled as usize];
            if token.kind() == TokenKind::Identifier {
                expansions.push(token);
            }
        }
        expansions
    }

    /// Render the buffer in the stable test format.
    pub fn dump_for_tests(&self) -> String {
        let print_token = |t: &Token| -> String {
            if t.kind() == TokenKind::Eof {
                "<eof>".to_string()
            } else {
                t.text(self.source_mgr).to_string()
            }
        };
        let dump_tokens = |out: &mut String, tokens: &[Token]| {
            if tokens.is_empty() {
                out.push_str("<empty>");
                return;
            }
            for (i, tok) in tokens.iter().enumerate() {
                if tok.kind() == TokenKind::Eof {
                    continue;
                }
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(&print_token(tok));
            }
        };

        let mut out = String::new();
        out.push_str("expanded tokens:\n  ");
        // (!) we do not show '<eof>'.
        dump_tokens(
            &mut out,
            &self.expanded_tokens[..self.expanded_tokens.len() - 1],
        );
        out.push('\n');

        let mut keys: Vec<FileId> = self.files.keys().copied().collect();
        keys.sort();

        for fid in keys {
            if self.source_mgr.is_builtin(fid) {
                continue; // Skip builtin buffers.
            }
            let file = &self.files[&fid];
            out.push_str(&format!("file '{}'\n", self.source_mgr.file_name(fid)));
            out.push_str("  spelled tokens:\n    ");
            dump_tokens(&mut out, &file.spelled_tokens);
            out.push('\n');

            if file.mappings.is_empty() {
                out.push_str("  no mappings.\n");
                continue;
            }
            out.push_str("  mappings:\n");
            for m in &file.mappings {
                let end_spelled = if m.end_spelled as usize == file.spelled_tokens.len() {
                    "<eof>".to_string()
                } else {
                    print_token(&file.spelled_tokens[m.end_spelled as usize])
                };
                out.push_str(&format!(
                    "    ['{}'_{}, '{}'_{}) => ['{}'_{}, '{}'_{})\n",
                    print_token(&file.spelled_tokens[m.begin_spelled as usize]),
                    m.begin_spelled,
                    end_spelled,
                    m.end_spelled,
                    print_token(&self.expanded_tokens[m.begin_expanded as usize]),
                    m.begin_expanded,
                    print_token(&self.expanded_tokens[m.end_expanded as usize]),
                    m.end_expanded,
                ));
            }
        }
        out
    }
}

/// Index of `tok` within `slice`, by identity.
fn index_within(slice: &[Token], tok: &Token) -> usize {
    let base = slice.as_ptr() as usize;
    let addr = std::ptr::from_ref(tok) as usize;
    debug_assert!(
        addr >= base && addr < base + std::mem::size_of_val(slice),
        "token is not a member of the slice"
    );
    (addr - base) / std::mem::size_of::<Token>()
}

/// The 0, 1 or 2 spelled tokens in `loc`'s file that touch `loc`: the token
/// starting at or after `loc` when it begins no later than `loc`, preceded
/// by the token ending at or after `loc`.
pub fn spelled_tokens_touching<'a>(
    loc: SourceLocation,
    tokens: &'a TokenBuffer<'_>,
) -> &'a [Token] {
    assert!(loc.is_file_id());
    let all = tokens.spelled_tokens(tokens.source_manager().file_id(loc));
    let right = all.partition_point(|tok| tok.location() < loc);
    let accept_right = right != all.len() && all[right].location() <= loc;
    let accept_left = right != 0 && all[right - 1].end_location() >= loc;
    &all[right - usize::from(accept_left)..right + usize::from(accept_right)]
}

/// The first identifier among [`spelled_tokens_touching`], if any.
pub fn spelled_identifier_touching<'a>(
    loc: SourceLocation,
    tokens: &'a TokenBuffer<'_>,
) -> Option<&'a Token> {
    spelled_tokens_touching(loc, tokens)
        .iter()
        .find(|tok| tok.kind() == TokenKind::Identifier)
}
