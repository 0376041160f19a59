//! Preprocessing errors.

use claw_source::SourceLocation;
use std::fmt;

/// What went wrong during preprocessing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PpErrorKind {
    /// The named buffer was never provided to the source manager.
    FileNotProvided(String),
    /// `#include` named a buffer the source manager does not know.
    IncludeNotFound(String),
    /// Include nesting exceeded the safety limit.
    IncludeDepthExceeded,
    /// `#include` was not followed by `"file"` or `<file>`.
    ExpectedFileName,
    /// A directive that needs a macro name had none.
    MacroNameMissing,
    /// The macro name position held a non-identifier token.
    MacroNameNotIdentifier,
    /// Malformed parameter list in a function-like `#define`.
    BadMacroParameterList,
    /// End of file inside a function-like macro's argument list.
    UnterminatedMacroArgs(String),
    /// A function-like macro was invoked with the wrong argument count.
    WrongArgCount {
        name: String,
        expected: usize,
        actual: usize,
    },
    /// `#` in a function-like macro body not followed by a parameter.
    HashMissingParameter,
    /// `##` at the beginning or end of a macro body.
    PasteAtEdge,
    /// `##` produced text that is not a single token.
    InvalidPaste(String),
    /// Unrecognized directive name.
    InvalidDirective(String),
    /// `#elif`, `#else` or `#endif` without a matching `#if`.
    StrayDirective(&'static str),
    /// A conditional block was still open at end of file.
    UnterminatedConditional,
    /// Malformed `#if`/`#elif` constant expression.
    BadConditionalExpression(&'static str),
    /// `#error` directive reached in live code.
    UserError(String),
}

impl fmt::Display for PpErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use PpErrorKind::*;
        match self {
            FileNotProvided(name) => write!(f, "no buffer provided for main file '{name}'"),
            IncludeNotFound(name) => write!(f, "'{name}' file not found"),
            IncludeDepthExceeded => write!(f, "#include nested too deeply"),
            ExpectedFileName => write!(f, "expected \"FILENAME\" or <FILENAME>"),
            MacroNameMissing => write!(f, "macro name missing"),
            MacroNameNotIdentifier => write!(f, "macro name must be an identifier"),
            BadMacroParameterList => write!(f, "invalid token in macro parameter list"),
            UnterminatedMacroArgs(name) => {
                write!(f, "unterminated argument list invoking macro '{name}'")
            }
            WrongArgCount {
                name,
                expected,
                actual,
            } => write!(
                f,
                "macro '{name}' expects {expected} argument(s), got {actual}"
            ),
            HashMissingParameter => write!(f, "'#' is not followed by a macro parameter"),
            PasteAtEdge => write!(f, "'##' cannot appear at either end of a macro expansion"),
            InvalidPaste(text) => write!(f, "pasting formed '{text}', an invalid token"),
            InvalidDirective(name) => write!(f, "invalid preprocessing directive '#{name}'"),
            StrayDirective(name) => write!(f, "#{name} without #if"),
            UnterminatedConditional => write!(f, "unterminated conditional directive"),
            BadConditionalExpression(why) => {
                write!(f, "invalid constant expression in conditional: {why}")
            }
            UserError(msg) => write!(f, "#error{}{msg}", if msg.is_empty() { "" } else { " " }),
        }
    }
}

/// A preprocessing error with the location it was detected at.
///
/// The location is opaque; render it through
/// [`SourceManager::location_string`] when reporting to a user.
///
/// [`SourceManager::location_string`]: claw_source::SourceManager::location_string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpError {
    kind: PpErrorKind,
    location: SourceLocation,
}

impl PpError {
    pub fn new(kind: PpErrorKind, location: SourceLocation) -> Self {
        PpError { kind, location }
    }

    pub fn kind(&self) -> &PpErrorKind {
        &self.kind
    }

    pub fn location(&self) -> SourceLocation {
        self.location
    }
}

impl fmt::Display for PpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for PpError {}
