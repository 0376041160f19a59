//! Preprocessor event callbacks.

use crate::MacroDefinition;
use claw_lexer::LexedToken;
use claw_source::{SourceManager, SourceRange};

/// Observer for preprocessing events.
///
/// All methods default to no-ops; implement the ones you care about and
/// register the observer with [`Preprocessor::add_callbacks`]. Callbacks run
/// inline on the preprocessing thread, in translation-unit order.
///
/// [`Preprocessor::add_callbacks`]: crate::Preprocessor::add_callbacks
pub trait PpCallbacks {
    /// A macro is about to be expanded.
    ///
    /// `range` covers the whole invocation: from the macro name to its last
    /// token (the name itself for object-like macros, the closing paren for
    /// function-like ones). When the invocation was rescanned out of another
    /// expansion, `range.begin()` is a macro location.
    fn macro_expands(
        &mut self,
        _sm: &SourceManager,
        _name: &LexedToken,
        _def: &MacroDefinition,
        _range: SourceRange,
    ) {
    }

    /// A `#define` completed.
    fn macro_defined(&mut self, _sm: &SourceManager, _name: &LexedToken, _def: &MacroDefinition) {}

    /// A `#undef` removed a known macro.
    fn macro_undefined(&mut self, _sm: &SourceManager, _name: &LexedToken) {}
}
