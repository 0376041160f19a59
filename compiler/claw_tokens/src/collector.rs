//! Collecting tokens out of a preprocessor run and building the buffer.

use crate::buffer::MarkedFile;
use crate::{Mapping, Token, TokenBuffer};
use claw_lexer::{IdentifierTable, LangOptions, LexedToken, Lexer, TokenKind};
use claw_pp::{MacroDefinition, PpCallbacks, Preprocessor};
use claw_source::{FileId, SourceLocation, SourceManager, SourceRange};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Captured top-level expansion spans: raw encoding of the spelling-begin
/// of a macro invocation to the location of its last token.
type PpExpansions = FxHashMap<u32, SourceLocation>;

/// Raw-lex a whole file into its spelled tokens.
///
/// Raw identifiers that need no cleaning and contain no universal character
/// name are resolved against the keyword table for the dialect; the rest
/// stay raw identifiers. The result never contains `Eof`.
pub fn tokenize(fid: FileId, sm: &SourceManager, lang_opts: LangOptions) -> Vec<Token> {
    let identifiers = IdentifierTable::new(lang_opts);
    let mut lexer = Lexer::new(fid, sm);
    let mut tokens = Vec::new();
    loop {
        let mut tok = lexer.next_token();
        if tok.kind == TokenKind::Eof {
            // Never store eof, for consistency: spelled streams are
            // eof-free.
            return tokens;
        }
        if tok.kind == TokenKind::RawIdentifier && !tok.needs_cleaning() && !tok.has_ucn() {
            tok.kind = identifiers.get(&sm.character_data(tok.location)[..tok.length as usize]);
        }
        tokens.push(Token::from(&tok));
    }
}

/// State shared between the collector, its watcher closure and its
/// preprocessor callback.
struct CollectorState {
    expanded: Vec<Token>,
    expansions: PpExpansions,
    /// Cleared at `consume()`; late preprocessor callbacks then become
    /// no-ops instead of touching a consumed collector.
    enabled: bool,
}

/// Records the spelling spans of top-level macro expansions.
struct CollectPpExpansions {
    state: Rc<RefCell<CollectorState>>,
    /// End of the last recorded top-level expansion, for detecting
    /// expansions contained in an earlier one.
    last_expansion_end: SourceLocation,
}

impl PpCallbacks for CollectPpExpansions {
    fn macro_expands(
        &mut self,
        sm: &SourceManager,
        _name: &LexedToken,
        _def: &MacroDefinition,
        range: SourceRange,
    ) {
        let mut state = self.state.borrow_mut();
        if !state.enabled {
            return;
        }
        // Only record top-level expansions that directly produce expanded
        // tokens. This excludes those where:
        //   - the macro use is inside a macro body,
        //   - the macro appears in an argument to another macro.
        // However macro expansion isn't really a tree, it's token rewrite
        // rules, so there are other cases, e.g.
        //   #define B(X) X
        //   #define A 1 + B
        //   A(2)
        // Both A and B produce expanded tokens, though the macro name 'B'
        // comes from an expansion. The best we can do is merge the mappings
        // for both.

        // The *last* token of any top-level macro expansion must be in a
        // file (in the example above, see the closing paren of B's
        // invocation).
        if !range.end().is_file_id() {
            return;
        }
        // If there's a current expansion that encloses this one, this one
        // can't be top-level.
        if self.last_expansion_end.is_valid()
            && !sm.is_before_in_translation_unit(self.last_expansion_end, range.end())
        {
            return;
        }

        // If the invocation (B) starts in a macro (A) but ends in a file,
        // record a merged span for A + B by overwriting the endpoint stored
        // for A's start.
        let mut begin = range.begin();
        if !begin.is_file_id() {
            begin = sm.expansion_loc(begin);
            debug_assert!(
                state.expansions.contains_key(&begin.raw_encoding()),
                "overlapping macros should have the same expansion location"
            );
        }

        state.expansions.insert(begin.raw_encoding(), range.end());
        self.last_expansion_end = range.end();
    }
}

/// Collects the expanded token stream and macro-expansion spans of one
/// preprocessor run, then builds the [`TokenBuffer`].
///
/// Create the collector before driving the preprocessor, run the unit to
/// `Eof`, then call [`consume`]. Consuming unregisters the watcher and
/// disables the expansion capturer, so a preprocessor that outlives the
/// collector stops feeding it.
///
/// [`consume`]: TokenCollector::consume
pub struct TokenCollector {
    state: Rc<RefCell<CollectorState>>,
}

impl TokenCollector {
    /// Register the collector's watcher and callbacks on `pp`.
    pub fn new(pp: &mut Preprocessor) -> Self {
        let state = Rc::new(RefCell::new(CollectorState {
            expanded: Vec::new(),
            expansions: PpExpansions::default(),
            enabled: true,
        }));
        // Collect the expanded token stream during preprocessing.
        let watcher_state = Rc::clone(&state);
        pp.set_token_watcher(move |tok: &LexedToken| {
            let mut state = watcher_state.borrow_mut();
            if !state.enabled {
                return;
            }
            tracing::trace!(kind = tok.kind.name(), "collected expanded token");
            state.expanded.push(Token::from(tok));
        });
        // And spans of macro invocations, to recover the boundaries of
        // empty expansions.
        pp.add_callbacks(Box::new(CollectPpExpansions {
            state: Rc::clone(&state),
            last_expansion_end: SourceLocation::invalid(),
        }));
        TokenCollector { state }
    }

    /// Build the token buffer from everything collected.
    ///
    /// The preprocessor must have run its translation unit to `Eof`.
    pub fn consume<'pp>(self, pp: &'pp mut Preprocessor) -> TokenBuffer<'pp> {
        pp.clear_token_watcher();
        let (expanded, expansions) = {
            let mut state = self.state.borrow_mut();
            state.enabled = false;
            (
                std::mem::take(&mut state.expanded),
                std::mem::take(&mut state.expansions),
            )
        };
        let lang_opts = pp.lang_options();
        Builder::new(expanded, expansions, pp.source_manager(), lang_opts).build()
    }
}

/// Builds mappings and spelled token streams from the expanded stream.
struct Builder<'sm> {
    result: TokenBuffer<'sm>,
    /// Cursor over the expanded stream.
    next_expanded: u32,
    /// Per-file cursors over the spelled streams.
    next_spelled: FxHashMap<FileId, u32>,
    collected_expansions: PpExpansions,
    sm: &'sm SourceManager,
    lang_opts: LangOptions,
}

impl<'sm> Builder<'sm> {
    fn new(
        expanded: Vec<Token>,
        collected_expansions: PpExpansions,
        sm: &'sm SourceManager,
        lang_opts: LangOptions,
    ) -> Self {
        Builder {
            result: TokenBuffer::new(sm, expanded),
            next_expanded: 0,
            next_spelled: FxHashMap::default(),
            collected_expansions,
            sm,
            lang_opts,
        }
    }

    fn build(mut self) -> TokenBuffer<'sm> {
        assert!(!self.result.expanded_tokens.is_empty());
        assert_eq!(
            self.result
                .expanded_tokens
                .last()
                .expect("checked non-empty")
                .kind(),
            TokenKind::Eof
        );

        // Tokenize every file that contributed tokens to the expanded
        // stream.
        self.build_spelled_tokens();

        // The expanded stream consists of runs of tokens that came from the
        // same source (a macro expansion, part of a file, ...). Between
        // these runs sit the logical positions of spelled tokens that
        // expanded to nothing.
        while (self.next_expanded as usize) < self.result.expanded_tokens.len() - 1 {
            // Create empty mappings for spelled tokens that expanded to
            // nothing here. May advance the spelled cursor only.
            self.discard(None);
            // Create a mapping for a contiguous run of expanded tokens,
            // advancing both cursors.
            let old_position = self.next_expanded;
            self.advance();
            if self.next_expanded == old_position {
                self.diagnose_advance_failure();
            }
        }
        // Tokens that remain in any file expanded to nothing; drain them
        // into empty mappings up to each file's end.
        let mut fids: Vec<FileId> = self.result.files.keys().copied().collect();
        fids.sort();
        for fid in fids {
            self.discard(Some(fid));
        }

        self.result
    }

    /// Initialize the per-file records: spelled tokens and expanded ranges.
    fn build_spelled_tokens(&mut self) {
        for i in 0..self.result.expanded_tokens.len() {
            let tok = self.result.expanded_tokens[i];
            let fid = self.sm.file_id(self.sm.expansion_loc(tok.location()));
            let is_new = !self.result.files.contains_key(&fid);
            let file = self.result.files.entry(fid).or_default();

            // The eof token is not part of the main file's expanded range.
            file.end_expanded = if tok.kind() == TokenKind::Eof {
                i as u32
            } else {
                i as u32 + 1
            };

            if is_new {
                file.begin_expanded = i as u32;
                file.spelled_tokens = tokenize(fid, self.sm, self.lang_opts);
            }
        }
    }

    /// Consume spelled tokens that expanded to nothing, emitting empty
    /// mappings for them. Walks up to the expansion position of the next
    /// expanded token, or, when draining, to the end of `drain`'s file.
    fn discard(&mut self, drain: Option<FileId>) {
        let target = match drain {
            Some(fid) => self.sm.end_of_file_loc(fid),
            None => self
                .sm
                .expansion_loc(self.result.expanded_tokens[self.next_expanded as usize].location()),
        };
        let fid = self.sm.file_id(target);
        // A drained empty mapping sits at the end of the file's expanded
        // range.
        let begin_expanded = match drain {
            Some(fid) => self.result.files[&fid].end_expanded,
            None => self.next_expanded,
        };

        let next_spelled = self.next_spelled.entry(fid).or_insert(0);
        let file = self
            .result
            .files
            .get_mut(&fid)
            .expect("discard target file is tracked");
        let MarkedFile {
            ref spelled_tokens,
            ref mut mappings,
            ..
        } = *file;

        let mut mapping = Mapping {
            begin_spelled: *next_spelled,
            end_spelled: *next_spelled,
            begin_expanded,
            end_expanded: begin_expanded,
        };
        // Emits the current mapping (when non-degenerate) and starts a new
        // one; used to split the region into several adjacent empty
        // mappings.
        fn flush(mapping: &mut Mapping, mappings: &mut Vec<Mapping>, next_spelled: u32) {
            mapping.end_spelled = next_spelled;
            if mapping.begin_spelled != mapping.end_spelled {
                mappings.push(*mapping);
            }
            mapping.begin_spelled = next_spelled;
        }

        while (*next_spelled as usize) < spelled_tokens.len()
            && spelled_tokens[*next_spelled as usize].location() < target
        {
            // A known expansion starting here gets its own empty mapping:
            //   [begin, next_spelled) [next_spelled, known_end] (known_end, target)
            let known_end = self
                .collected_expansions
                .get(&spelled_tokens[*next_spelled as usize].location().raw_encoding())
                .copied();
            if let Some(end) = known_end {
                flush(&mut mapping, mappings, *next_spelled);
                while (*next_spelled as usize) < spelled_tokens.len()
                    && spelled_tokens[*next_spelled as usize].location() <= end
                {
                    *next_spelled += 1;
                }
                flush(&mut mapping, mappings, *next_spelled);
            } else {
                *next_spelled += 1;
            }
        }
        flush(&mut mapping, mappings, *next_spelled);
    }

    /// Consume the next contiguous run of expanded tokens, advancing both
    /// cursors by at least one (a file-token run produces no mapping).
    fn advance(&mut self) {
        let TokenBuffer {
            ref expanded_tokens,
            ref mut files,
            ..
        } = self.result;

        let tok = expanded_tokens[self.next_expanded as usize];
        let expansion = self.sm.expansion_loc(tok.location());
        let fid = self.sm.file_id(expansion);
        let next_spelled = self.next_spelled.entry(fid).or_insert(0);
        let file = files.get_mut(&fid).expect("expanded token's file is tracked");
        let MarkedFile {
            ref spelled_tokens,
            ref mut mappings,
            ..
        } = *file;

        if tok.location().is_file_id() {
            // A run of file tokens continues while the expanded and spelled
            // tokens match; it needs no mapping.
            while (*next_spelled as usize) < spelled_tokens.len()
                && (self.next_expanded as usize) < expanded_tokens.len()
                && spelled_tokens[*next_spelled as usize].location()
                    == expanded_tokens[self.next_expanded as usize].location()
            {
                *next_spelled += 1;
                self.next_expanded += 1;
            }
        } else {
            // A macro expansion; its spelling bounds must have been
            // captured.
            let Some(end) = self
                .collected_expansions
                .get(&expansion.raw_encoding())
                .copied()
            else {
                unreachable!("macro expansion wasn't captured");
            };

            let mut mapping = Mapping {
                begin_expanded: self.next_expanded,
                begin_spelled: *next_spelled,
                ..Mapping::default()
            };
            // Consume spelled tokens within the captured bounds...
            while (*next_spelled as usize) < spelled_tokens.len()
                && spelled_tokens[*next_spelled as usize].location() <= end
            {
                *next_spelled += 1;
            }
            // ...and expanded tokens rooted at the same expansion. Several
            // merged invocations may share `end`, but each owns a disjoint
            // expanded run keyed by its expansion location.
            while (self.next_expanded as usize) < expanded_tokens.len()
                && self
                    .sm
                    .expansion_loc(expanded_tokens[self.next_expanded as usize].location())
                    == expansion
            {
                self.next_expanded += 1;
            }
            mapping.end_expanded = self.next_expanded;
            mapping.end_spelled = *next_spelled;
            mappings.push(mapping);
        }
    }

    /// `advance()` must consume at least one token; failure means the
    /// collected streams are inconsistent.
    fn diagnose_advance_failure(&self) -> ! {
        let begin = self.next_expanded.saturating_sub(10) as usize;
        let end = ((self.next_expanded + 5) as usize).min(self.result.expanded_tokens.len());
        for i in begin..end {
            let marker = if i as u32 == self.next_expanded {
                "!! "
            } else if (i as u32) < self.next_expanded {
                "ok "
            } else {
                "   "
            };
            tracing::error!(
                "{marker}{}",
                self.result.expanded_tokens[i].dump_for_tests(self.sm)
            );
        }
        unreachable!("couldn't map expanded token to spelled tokens");
    }
}
