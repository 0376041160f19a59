//! Macro definitions.

use claw_lexer::LexedToken;
use claw_source::SourceLocation;
use smallvec::SmallVec;

/// One `#define` as stored in the macro table.
///
/// Body tokens keep their definition-site locations and flags; each
/// expansion clones and relocates them into a fresh expansion entry.
#[derive(Clone, Debug)]
pub struct MacroDefinition {
    /// Location of the macro name in its `#define`.
    pub name_loc: SourceLocation,
    /// Parameter names, present only for function-like macros. A
    /// function-like macro with zero parameters carries an empty list.
    pub params: Option<SmallVec<[Box<str>; 4]>>,
    /// Replacement-list tokens.
    pub body: Vec<LexedToken>,
    /// Set while an expansion of this macro is on the rescan stack; a
    /// disabled name encountered during rescanning is permanently stamped
    /// `NO_EXPAND`.
    pub(crate) disabled: bool,
}

impl MacroDefinition {
    /// Object-like or function-like?
    pub fn is_function_like(&self) -> bool {
        self.params.is_some()
    }
}
