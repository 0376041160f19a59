//! Token kinds for the C family.

/// Kind of a lexed token.
///
/// The raw lexer only ever produces `RawIdentifier` for identifier-shaped
/// text; resolution to `Identifier` or a keyword kind happens later, against
/// an [`IdentifierTable`] for the active dialect.
///
/// [`IdentifierTable`]: crate::IdentifierTable
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TokenKind {
    /// End of the translation unit. Zero length.
    Eof,
    /// A byte sequence with no token interpretation.
    Unknown,
    /// Identifier-shaped text, not yet resolved against the keyword table.
    RawIdentifier,
    /// Resolved non-keyword identifier.
    Identifier,
    /// Preprocessing number: `42`, `0x1f`, `1.5e-3`, ...
    NumericConstant,
    /// Character constant: `'a'`, `'\n'`.
    CharConstant,
    /// String literal: `"text"`.
    StringLiteral,

    // Punctuators.
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Period,
    Ellipsis,
    Amp,
    AmpAmp,
    AmpEqual,
    Star,
    StarEqual,
    Plus,
    PlusPlus,
    PlusEqual,
    Minus,
    MinusMinus,
    MinusEqual,
    Arrow,
    Tilde,
    Exclaim,
    ExclaimEqual,
    Slash,
    SlashEqual,
    Percent,
    PercentEqual,
    Less,
    LessLess,
    LessEqual,
    LessLessEqual,
    Greater,
    GreaterGreater,
    GreaterEqual,
    GreaterGreaterEqual,
    Caret,
    CaretEqual,
    Pipe,
    PipePipe,
    PipeEqual,
    Question,
    Colon,
    Semi,
    Equal,
    EqualEqual,
    Comma,
    Hash,
    HashHash,

    // C89 keywords.
    KwAuto,
    KwBreak,
    KwCase,
    KwChar,
    KwConst,
    KwContinue,
    KwDefault,
    KwDo,
    KwDouble,
    KwElse,
    KwEnum,
    KwExtern,
    KwFloat,
    KwFor,
    KwGoto,
    KwIf,
    KwInt,
    KwLong,
    KwRegister,
    KwReturn,
    KwShort,
    KwSigned,
    KwSizeof,
    KwStatic,
    KwStruct,
    KwSwitch,
    KwTypedef,
    KwUnion,
    KwUnsigned,
    KwVoid,
    KwVolatile,
    KwWhile,

    // C99 keywords.
    KwInline,
    KwRestrict,
    KwBool,
    KwComplex,
    KwImaginary,

    // C11 keywords.
    KwAlignas,
    KwAlignof,
    KwAtomic,
    KwGeneric,
    KwNoreturn,
    KwStaticAssert,
    KwThreadLocal,
}

impl TokenKind {
    /// Stable mnemonic for dumps and diagnostics.
    pub fn name(self) -> &'static str {
        use TokenKind::*;
        match self {
            Eof => "eof",
            Unknown => "unknown",
            RawIdentifier => "raw_identifier",
            Identifier => "identifier",
            NumericConstant => "numeric_constant",
            CharConstant => "char_constant",
            StringLiteral => "string_literal",
            LParen => "l_paren",
            RParen => "r_paren",
            LBracket => "l_square",
            RBracket => "r_square",
            LBrace => "l_brace",
            RBrace => "r_brace",
            Period => "period",
            Ellipsis => "ellipsis",
            Amp => "amp",
            AmpAmp => "ampamp",
            AmpEqual => "ampequal",
            Star => "star",
            StarEqual => "starequal",
            Plus => "plus",
            PlusPlus => "plusplus",
            PlusEqual => "plusequal",
            Minus => "minus",
            MinusMinus => "minusminus",
            MinusEqual => "minusequal",
            Arrow => "arrow",
            Tilde => "tilde",
            Exclaim => "exclaim",
            ExclaimEqual => "exclaimequal",
            Slash => "slash",
            SlashEqual => "slashequal",
            Percent => "percent",
            PercentEqual => "percentequal",
            Less => "less",
            LessLess => "lessless",
            LessEqual => "lessequal",
            LessLessEqual => "lesslessequal",
            Greater => "greater",
            GreaterGreater => "greatergreater",
            GreaterEqual => "greaterequal",
            GreaterGreaterEqual => "greatergreaterequal",
            Caret => "caret",
            CaretEqual => "caretequal",
            Pipe => "pipe",
            PipePipe => "pipepipe",
            PipeEqual => "pipeequal",
            Question => "question",
            Colon => "colon",
            Semi => "semi",
            Equal => "equal",
            EqualEqual => "equalequal",
            Comma => "comma",
            Hash => "hash",
            HashHash => "hashhash",
            KwAuto => "auto",
            KwBreak => "break",
            KwCase => "case",
            KwChar => "char",
            KwConst => "const",
            KwContinue => "continue",
            KwDefault => "default",
            KwDo => "do",
            KwDouble => "double",
            KwElse => "else",
            KwEnum => "enum",
            KwExtern => "extern",
            KwFloat => "float",
            KwFor => "for",
            KwGoto => "goto",
            KwIf => "if",
            KwInt => "int",
            KwLong => "long",
            KwRegister => "register",
            KwReturn => "return",
            KwShort => "short",
            KwSigned => "signed",
            KwSizeof => "sizeof",
            KwStatic => "static",
            KwStruct => "struct",
            KwSwitch => "switch",
            KwTypedef => "typedef",
            KwUnion => "union",
            KwUnsigned => "unsigned",
            KwVoid => "void",
            KwVolatile => "volatile",
            KwWhile => "while",
            KwInline => "inline",
            KwRestrict => "restrict",
            KwBool => "_Bool",
            KwComplex => "_Complex",
            KwImaginary => "_Imaginary",
            KwAlignas => "_Alignas",
            KwAlignof => "_Alignof",
            KwAtomic => "_Atomic",
            KwGeneric => "_Generic",
            KwNoreturn => "_Noreturn",
            KwStaticAssert => "_Static_assert",
            KwThreadLocal => "_Thread_local",
        }
    }

    /// Returns `true` for keyword kinds.
    pub fn is_keyword(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            KwAuto
                | KwBreak
                | KwCase
                | KwChar
                | KwConst
                | KwContinue
                | KwDefault
                | KwDo
                | KwDouble
                | KwElse
                | KwEnum
                | KwExtern
                | KwFloat
                | KwFor
                | KwGoto
                | KwIf
                | KwInt
                | KwLong
                | KwRegister
                | KwReturn
                | KwShort
                | KwSigned
                | KwSizeof
                | KwStatic
                | KwStruct
                | KwSwitch
                | KwTypedef
                | KwUnion
                | KwUnsigned
                | KwVoid
                | KwVolatile
                | KwWhile
                | KwInline
                | KwRestrict
                | KwBool
                | KwComplex
                | KwImaginary
                | KwAlignas
                | KwAlignof
                | KwAtomic
                | KwGeneric
                | KwNoreturn
                | KwStaticAssert
                | KwThreadLocal
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_stable() {
        assert_eq!(TokenKind::Eof.name(), "eof");
        assert_eq!(TokenKind::LParen.name(), "l_paren");
        assert_eq!(TokenKind::KwInt.name(), "int");
        assert_eq!(TokenKind::KwStaticAssert.name(), "_Static_assert");
    }

    #[test]
    fn keyword_predicate() {
        assert!(TokenKind::KwWhile.is_keyword());
        assert!(TokenKind::KwThreadLocal.is_keyword());
        assert!(!TokenKind::Identifier.is_keyword());
        assert!(!TokenKind::Hash.is_keyword());
    }
}
