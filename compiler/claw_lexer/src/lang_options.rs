//! Dialect switches affecting lexing.

/// Language options for the active C dialect.
///
/// Only the keyword set depends on these today: the identifier table
/// recognizes the C99 and C11 keyword additions when the corresponding
/// switch is on. C11 implies C99.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LangOptions {
    pub c99: bool,
    pub c11: bool,
}

impl LangOptions {
    /// Strict C89: the base keyword set only.
    pub const fn c89() -> Self {
        LangOptions {
            c99: false,
            c11: false,
        }
    }

    pub const fn c99() -> Self {
        LangOptions {
            c99: true,
            c11: false,
        }
    }

    pub const fn c11() -> Self {
        LangOptions {
            c99: true,
            c11: true,
        }
    }
}

impl Default for LangOptions {
    fn default() -> Self {
        LangOptions::c11()
    }
}
