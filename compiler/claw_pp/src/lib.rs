//! C preprocessor for the claw toolkit.
//!
//! The [`Preprocessor`] drives a stack of token sources (the main file,
//! entered includes, and macro-expansion streams being rescanned) and hands
//! its client one fully-expanded token at a time. Directives are consumed
//! internally and never reach the client; macro invocations are replaced by
//! their expansions, with every produced token relocated into a fresh
//! expansion entry of the source manager so its expansion chain leads back
//! to the call site.
//!
//! Observers hook in two ways:
//! - a *token watcher* closure sees every token delivered to the client, in
//!   translation-unit order, ending with `Eof`;
//! - [`PpCallbacks`] implementations see macro events, most importantly
//!   [`PpCallbacks::macro_expands`] with the full invocation range.
//!
//! # Modules
//!
//! - [`macros`]: macro-table entries
//! - [`callbacks`]: the observer trait
//! - [`cond_expr`]: `#if` constant-expression evaluation
//! - [`directives`]: directive parsing and conditional skipping
//! - [`expand`]: invocation parsing, substitution, `#` and `##`
//! - [`error`]: error type

mod callbacks;
mod cond_expr;
mod directives;
mod error;
mod expand;
mod macros;

pub use callbacks::PpCallbacks;
pub use error::{PpError, PpErrorKind};
pub use macros::MacroDefinition;

use claw_lexer::{IdentifierTable, LangOptions, LexedToken, Lexer, TokenFlags, TokenKind};
use claw_source::{FileId, SourceLocation, SourceManager};
use rustc_hash::FxHashMap;
use std::borrow::Cow;

/// Safety limit on `#include` nesting.
const MAX_INCLUDE_DEPTH: usize = 64;

/// The raw spelling of a token, with line splices removed when the lexer
/// flagged the token as needing cleaning.
pub fn token_spelling<'a>(sm: &'a SourceManager, tok: &LexedToken) -> Cow<'a, str> {
    let raw = &sm.character_data(tok.location)[..tok.length as usize];
    if !tok.needs_cleaning() {
        return Cow::Borrowed(raw);
    }
    let bytes = raw.as_bytes();
    let mut cleaned = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            match bytes[i + 1] {
                b'\n' => {
                    i += 2;
                    continue;
                }
                b'\r' => {
                    i += if bytes.get(i + 2) == Some(&b'\n') { 3 } else { 2 };
                    continue;
                }
                _ => {}
            }
        }
        cleaned.push(bytes[i]);
        i += 1;
    }
    // Splices are pure ASCII removals, so the remainder is still UTF-8.
    Cow::Owned(String::from_utf8(cleaned).expect("cleaned spelling stays UTF-8"))
}

/// One source on the preprocessing stack.
enum Source {
    /// A file being lexed (the main file or an entered include).
    File {
        lexer: Lexer,
        /// Conditional-stack depth when the file was entered; the stack must
        /// return to this depth by the file's end.
        cond_depth: usize,
    },
    /// A macro expansion being rescanned.
    Stream {
        tokens: Vec<LexedToken>,
        idx: usize,
        /// Macro to re-enable when the stream is exhausted.
        macro_name: Option<String>,
        /// Argument pre-expansion barrier: when exhausted, report a
        /// zero-length `Eof` at this location instead of falling through to
        /// the sources below (the argument is expanded as if it were the
        /// whole remaining file).
        barrier_end: Option<SourceLocation>,
    },
    /// A single token parked across a source push: reading an `#include`
    /// line overshoots onto the next line's first token, which must resume
    /// only after the included file is exhausted.
    Pending { tok: LexedToken, from_file: bool },
}

/// One open `#if`/`#ifdef` region.
pub(crate) struct CondState {
    /// Location of the opening directive, for unterminated-conditional
    /// reporting.
    pub(crate) loc: SourceLocation,
    /// Some branch of this region has been entered.
    pub(crate) was_taken: bool,
    /// `#else` has been seen; further `#elif`/`#else` are stray.
    pub(crate) seen_else: bool,
}

/// The preprocessor.
///
/// Owns the source manager for the duration of preprocessing; borrow it back
/// through [`source_manager`] once [`run`] completes.
///
/// [`source_manager`]: Preprocessor::source_manager
/// [`run`]: Preprocessor::run
pub struct Preprocessor {
    pub(crate) sm: SourceManager,
    lang_opts: LangOptions,
    identifiers: IdentifierTable,
    pub(crate) macros: FxHashMap<String, MacroDefinition>,
    sources: Vec<Source>,
    /// Tokens handed back by lookahead, most recent last. The flag records
    /// whether the token originally came from a file source.
    pushback: Vec<(LexedToken, bool)>,
    pub(crate) cond_stack: Vec<CondState>,
    pub(crate) callbacks: Vec<Box<dyn PpCallbacks>>,
    watcher: Option<Box<dyn FnMut(&LexedToken)>>,
    main_file: FileId,
}

impl Preprocessor {
    /// Create a preprocessor over `main_file_name`, which must have been
    /// provided to `sm` beforehand.
    pub fn new(
        mut sm: SourceManager,
        main_file_name: &str,
        lang_opts: LangOptions,
    ) -> Result<Self, PpError> {
        let main_file = sm
            .create_file_id(main_file_name, SourceLocation::invalid())
            .map_err(|_| {
                PpError::new(
                    PpErrorKind::FileNotProvided(main_file_name.to_string()),
                    SourceLocation::invalid(),
                )
            })?;
        let lexer = Lexer::new(main_file, &sm);
        Ok(Preprocessor {
            sm,
            lang_opts,
            identifiers: IdentifierTable::new(lang_opts),
            macros: FxHashMap::default(),
            sources: vec![Source::File {
                lexer,
                cond_depth: 0,
            }],
            pushback: Vec::new(),
            cond_stack: Vec::new(),
            callbacks: Vec::new(),
            watcher: None,
            main_file,
        })
    }

    pub fn source_manager(&self) -> &SourceManager {
        &self.sm
    }

    pub fn lang_options(&self) -> LangOptions {
        self.lang_opts
    }

    pub fn main_file(&self) -> FileId {
        self.main_file
    }

    /// Install the token watcher, replacing any previous one.
    pub fn set_token_watcher(&mut self, watcher: impl FnMut(&LexedToken) + 'static) {
        self.watcher = Some(Box::new(watcher));
    }

    /// Remove the token watcher.
    pub fn clear_token_watcher(&mut self) {
        self.watcher = None;
    }

    /// Register an event observer. Observers stay registered for the
    /// preprocessor's lifetime.
    pub fn add_callbacks(&mut self, callbacks: Box<dyn PpCallbacks>) {
        self.callbacks.push(callbacks);
    }

    /// Preprocess the whole translation unit, delivering every token to the
    /// watcher and stopping after `Eof`.
    pub fn run(&mut self) -> Result<(), PpError> {
        loop {
            let tok = self.lex()?;
            if tok.kind == TokenKind::Eof {
                return Ok(());
            }
        }
    }

    /// Produce the next fully-expanded token.
    ///
    /// Handles directives and macro expansion internally; identifiers are
    /// resolved against the keyword table before being returned. At the end
    /// of the main file this returns `Eof` (and keeps returning it).
    pub fn lex(&mut self) -> Result<LexedToken, PpError> {
        loop {
            let (mut tok, from_file) = self.next_raw()?;
            if tok.kind == TokenKind::Eof {
                if let Some(open) = self.cond_stack.last() {
                    return Err(PpError::new(PpErrorKind::UnterminatedConditional, open.loc));
                }
                self.emit(&tok);
                return Ok(tok);
            }
            if tok.kind == TokenKind::Hash && from_file && tok.is_at_line_start() {
                self.handle_directive()?;
                continue;
            }
            if tok.kind == TokenKind::RawIdentifier {
                if !tok.flags.contains(TokenFlags::NO_EXPAND) && self.try_expand(&mut tok)? {
                    continue;
                }
                tok.kind = self.identifiers.get(&self.spelling(&tok));
                self.emit(&tok);
                return Ok(tok);
            }
            self.emit(&tok);
            return Ok(tok);
        }
    }

    /// Cleaned spelling of a token.
    pub(crate) fn spelling(&self, tok: &LexedToken) -> Cow<'_, str> {
        token_spelling(&self.sm, tok)
    }

    fn emit(&mut self, tok: &LexedToken) {
        if let Some(watcher) = &mut self.watcher {
            watcher(tok);
        }
    }

    pub(crate) fn push_back(&mut self, tok: LexedToken, from_file: bool) {
        self.pushback.push((tok, from_file));
    }

    /// Pull the next token off the source stack, popping exhausted streams
    /// and finished includes. The flag reports whether the token came from a
    /// file source (pushback preserves the original provenance).
    pub(crate) fn next_raw(&mut self) -> Result<(LexedToken, bool), PpError> {
        if let Some(entry) = self.pushback.pop() {
            return Ok(entry);
        }
        loop {
            enum Step {
                Tok(LexedToken, bool),
                PopStream(Option<String>),
                PopFile,
                PopPending(LexedToken, bool),
            }
            let source_count = self.sources.len();
            let step = match self.sources.last_mut() {
                None => unreachable!("the main file source is never popped"),
                Some(Source::Stream {
                    tokens,
                    idx,
                    macro_name,
                    barrier_end,
                }) => {
                    if *idx < tokens.len() {
                        let tok = tokens[*idx];
                        *idx += 1;
                        Step::Tok(tok, false)
                    } else if let Some(end) = *barrier_end {
                        let mut eof = LexedToken::new(end, 0, TokenKind::Eof);
                        eof.flags.set(TokenFlags::AT_LINE_START);
                        Step::Tok(eof, false)
                    } else {
                        Step::PopStream(macro_name.take())
                    }
                }
                Some(Source::Pending { tok, from_file }) => Step::PopPending(*tok, *from_file),
                Some(Source::File { lexer, cond_depth }) => {
                    let tok = lexer.next_token();
                    if tok.kind == TokenKind::Eof {
                        if source_count == 1 {
                            // Main-file Eof is delivered; conditional
                            // balance is checked by lex().
                            Step::Tok(tok, true)
                        } else if self.cond_stack.len() > *cond_depth {
                            let loc = self
                                .cond_stack
                                .last()
                                .map(|c| c.loc)
                                .unwrap_or(tok.location);
                            return Err(PpError::new(PpErrorKind::UnterminatedConditional, loc));
                        } else {
                            Step::PopFile
                        }
                    } else {
                        Step::Tok(tok, true)
                    }
                }
            };
            match step {
                Step::Tok(tok, from_file) => return Ok((tok, from_file)),
                Step::PopStream(name) => {
                    if let Some(name) = name {
                        if let Some(def) = self.macros.get_mut(&name) {
                            def.disabled = false;
                        }
                    }
                    self.sources.pop();
                }
                Step::PopFile => {
                    self.sources.pop();
                }
                Step::PopPending(tok, from_file) => {
                    self.sources.pop();
                    return Ok((tok, from_file));
                }
            }
        }
    }

    /// Current `#include` nesting depth.
    pub(crate) fn file_depth(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| matches!(s, Source::File { .. }))
            .count()
    }

    /// Move the most recently pushed-back token into a `Pending` source, so
    /// a source pushed next is read before it.
    pub(crate) fn park_pushback(&mut self) {
        if let Some((tok, from_file)) = self.pushback.pop() {
            self.sources.push(Source::Pending { tok, from_file });
        }
    }

    /// Enter an included file.
    pub(crate) fn push_include(&mut self, fid: FileId) {
        let lexer = Lexer::new(fid, &self.sm);
        self.sources.push(Source::File {
            lexer,
            cond_depth: self.cond_stack.len(),
        });
    }

    /// Push a macro-expansion stream for rescanning, disabling the macro
    /// until the stream is exhausted.
    pub(crate) fn push_expansion(&mut self, name: String, tokens: Vec<LexedToken>) {
        if let Some(def) = self.macros.get_mut(&name) {
            def.disabled = true;
        }
        self.sources.push(Source::Stream {
            tokens,
            idx: 0,
            macro_name: Some(name),
            barrier_end: None,
        });
    }

    /// Push an argument-expansion barrier stream.
    pub(crate) fn push_arg_barrier(&mut self, tokens: Vec<LexedToken>, end: SourceLocation) {
        self.sources.push(Source::Stream {
            tokens,
            idx: 0,
            macro_name: None,
            barrier_end: Some(end),
        });
    }

    /// Pop the (exhausted) argument-expansion barrier on top of the stack.
    pub(crate) fn pop_arg_barrier(&mut self) {
        let popped = self.sources.pop();
        debug_assert!(
            matches!(
                popped,
                Some(Source::Stream {
                    barrier_end: Some(_),
                    ..
                })
            ),
            "expected an argument barrier on top of the source stack"
        );
    }
}

#[cfg(test)]
mod tests;
