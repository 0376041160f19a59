//! Keyword resolution for raw identifiers.
//!
//! The lookup uses the identifier's length as a first-pass filter (C
//! keywords range from 2-14 chars), then matches against the keywords of
//! that length. Dialect-gated keywords (C99, C11) resolve to plain
//! identifiers when the dialect switch is off.

use crate::{LangOptions, TokenKind};

/// Look up a keyword by text for the given dialect.
///
/// Returns the keyword kind, or `None` if the text is a regular identifier
/// in this dialect.
pub(crate) fn lookup(text: &str, opts: &LangOptions) -> Option<TokenKind> {
    let len = text.len();

    // Guard: all keywords are 2-14 chars and start with an ASCII letter or
    // an underscore (the C99/C11 reserved `_X...` spellings).
    if !(2..=14).contains(&len) {
        return None;
    }

    let kind = match len {
        2 => match text {
            "do" => TokenKind::KwDo,
            "if" => TokenKind::KwIf,
            _ => return None,
        },
        3 => match text {
            "for" => TokenKind::KwFor,
            "int" => TokenKind::KwInt,
            _ => return None,
        },
        4 => match text {
            "auto" => TokenKind::KwAuto,
            "case" => TokenKind::KwCase,
            "char" => TokenKind::KwChar,
            "else" => TokenKind::KwElse,
            "enum" => TokenKind::KwEnum,
            "goto" => TokenKind::KwGoto,
            "long" => TokenKind::KwLong,
            "void" => TokenKind::KwVoid,
            _ => return None,
        },
        5 => match text {
            "break" => TokenKind::KwBreak,
            "const" => TokenKind::KwConst,
            "float" => TokenKind::KwFloat,
            "short" => TokenKind::KwShort,
            "union" => TokenKind::KwUnion,
            "while" => TokenKind::KwWhile,
            "_Bool" if opts.c99 => TokenKind::KwBool,
            _ => return None,
        },
        6 => match text {
            "double" => TokenKind::KwDouble,
            "extern" => TokenKind::KwExtern,
            "return" => TokenKind::KwReturn,
            "signed" => TokenKind::KwSigned,
            "sizeof" => TokenKind::KwSizeof,
            "static" => TokenKind::KwStatic,
            "struct" => TokenKind::KwStruct,
            "switch" => TokenKind::KwSwitch,
            "inline" if opts.c99 => TokenKind::KwInline,
            _ => return None,
        },
        7 => match text {
            "default" => TokenKind::KwDefault,
            "typedef" => TokenKind::KwTypedef,
            "_Atomic" if opts.c11 => TokenKind::KwAtomic,
            _ => return None,
        },
        8 => match text {
            "continue" => TokenKind::KwContinue,
            "register" => TokenKind::KwRegister,
            "unsigned" => TokenKind::KwUnsigned,
            "volatile" => TokenKind::KwVolatile,
            "restrict" if opts.c99 => TokenKind::KwRestrict,
            "_Complex" if opts.c99 => TokenKind::KwComplex,
            "_Alignas" if opts.c11 => TokenKind::KwAlignas,
            "_Alignof" if opts.c11 => TokenKind::KwAlignof,
            "_Generic" if opts.c11 => TokenKind::KwGeneric,
            _ => return None,
        },
        9 => match text {
            "_Noreturn" if opts.c11 => TokenKind::KwNoreturn,
            _ => return None,
        },
        10 => match text {
            "_Imaginary" if opts.c99 => TokenKind::KwImaginary,
            _ => return None,
        },
        13 => match text {
            "_Thread_local" if opts.c11 => TokenKind::KwThreadLocal,
            _ => return None,
        },
        14 => match text {
            "_Static_assert" if opts.c11 => TokenKind::KwStaticAssert,
            _ => return None,
        },
        _ => return None,
    };
    Some(kind)
}

/// Resolves raw identifiers to keyword kinds for one dialect.
///
/// The table is stateless beyond the dialect switches; construction is free
/// and instances are typically created per tokenization pass.
#[derive(Clone, Copy, Debug)]
pub struct IdentifierTable {
    opts: LangOptions,
}

impl IdentifierTable {
    pub fn new(opts: LangOptions) -> Self {
        IdentifierTable { opts }
    }

    /// The kind identifier-shaped `text` resolves to: a keyword kind for the
    /// active dialect, or [`TokenKind::Identifier`].
    pub fn get(&self, text: &str) -> TokenKind {
        lookup(text, &self.opts).unwrap_or(TokenKind::Identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_keywords_resolve() {
        let table = IdentifierTable::new(LangOptions::c89());
        assert_eq!(table.get("int"), TokenKind::KwInt);
        assert_eq!(table.get("while"), TokenKind::KwWhile);
        assert_eq!(table.get("typedef"), TokenKind::KwTypedef);
        assert_eq!(table.get("x"), TokenKind::Identifier);
        assert_eq!(table.get("integer"), TokenKind::Identifier);
    }

    #[test]
    fn c99_keywords_are_gated() {
        let c89 = IdentifierTable::new(LangOptions::c89());
        let c99 = IdentifierTable::new(LangOptions::c99());
        assert_eq!(c89.get("inline"), TokenKind::Identifier);
        assert_eq!(c99.get("inline"), TokenKind::KwInline);
        assert_eq!(c89.get("restrict"), TokenKind::Identifier);
        assert_eq!(c99.get("restrict"), TokenKind::KwRestrict);
        assert_eq!(c99.get("_Bool"), TokenKind::KwBool);
    }

    #[test]
    fn c11_keywords_are_gated() {
        let c99 = IdentifierTable::new(LangOptions::c99());
        let c11 = IdentifierTable::new(LangOptions::c11());
        assert_eq!(c99.get("_Generic"), TokenKind::Identifier);
        assert_eq!(c11.get("_Generic"), TokenKind::KwGeneric);
        assert_eq!(c11.get("_Static_assert"), TokenKind::KwStaticAssert);
        assert_eq!(c11.get("_Thread_local"), TokenKind::KwThreadLocal);
        // C11 implies C99.
        assert_eq!(c11.get("inline"), TokenKind::KwInline);
    }

    #[test]
    fn length_buckets_reject_quickly() {
        let table = IdentifierTable::new(LangOptions::c11());
        assert_eq!(table.get("a"), TokenKind::Identifier);
        assert_eq!(table.get("averyverylongidentifiername"), TokenKind::Identifier);
        assert_eq!(table.get("_Bool_"), TokenKind::Identifier);
    }
}
