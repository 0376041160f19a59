//! Preprocessor-aware token buffer.
//!
//! Records two parallel token streams for a preprocessed translation unit:
//! the raw *spelled* tokens as they appear in each source file and the
//! final *expanded* tokens the front-end consumes, together with the
//! mappings between them, so tools can answer "which source text produced
//! this token?" and its inverse through macro expansions, including empty
//! ones.
//!
//! # Collecting
//!
//! ```no_run
//! use claw_lexer::LangOptions;
//! use claw_pp::Preprocessor;
//! use claw_source::SourceManager;
//! use claw_tokens::TokenCollector;
//!
//! let mut sm = SourceManager::new();
//! sm.provide_file("input.c", "#define X 1\nint a = X;\n");
//! let mut pp = Preprocessor::new(sm, "input.c", LangOptions::c11()).unwrap();
//! let collector = TokenCollector::new(&mut pp);
//! pp.run().unwrap();
//! let buffer = collector.consume(&mut pp);
//! assert_eq!(buffer.expanded_tokens().len(), 6); // int a = 1 ; <eof>
//! ```
//!
//! # Modules
//!
//! - [`token`]: the [`Token`] and [`FileRange`] value types
//! - [`buffer`]: [`TokenBuffer`], [`Mapping`] and the query surface
//! - [`collector`]: [`TokenCollector`], the mapping builder and [`tokenize`]

mod buffer;
mod collector;
mod token;

pub use buffer::{
    spelled_identifier_touching, spelled_tokens_touching, Expansion, Mapping, TokenBuffer,
};
pub use collector::{tokenize, TokenCollector};
pub use token::{FileRange, Token};
