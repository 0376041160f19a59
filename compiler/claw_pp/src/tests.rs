use super::*;
use claw_source::SourceRange;
use std::cell::RefCell;
use std::rc::Rc;

fn pp_with(files: &[(&str, &str)]) -> Preprocessor {
    let mut sm = SourceManager::new();
    for (name, text) in files {
        sm.provide_file(name, text);
    }
    Preprocessor::new(sm, files[0].0, LangOptions::c11()).expect("main file provided")
}

fn pp_from(source: &str) -> Preprocessor {
    pp_with(&[("input.c", source)])
}

/// Lex the whole unit, returning the cleaned spellings of delivered tokens.
fn lex_texts(pp: &mut Preprocessor) -> Vec<String> {
    let mut out = Vec::new();
    loop {
        let tok = pp.lex().expect("preprocessing succeeds");
        if tok.kind == TokenKind::Eof {
            return out;
        }
        out.push(pp.spelling(&tok).into_owned());
    }
}

fn texts_of(source: &str) -> Vec<String> {
    lex_texts(&mut pp_from(source))
}

fn kinds_of(source: &str) -> Vec<TokenKind> {
    let mut pp = pp_from(source);
    let mut out = Vec::new();
    loop {
        let tok = pp.lex().expect("preprocessing succeeds");
        if tok.kind == TokenKind::Eof {
            return out;
        }
        out.push(tok.kind);
    }
}

fn error_of(source: &str) -> PpError {
    let mut pp = pp_from(source);
    pp.run().expect_err("preprocessing fails")
}

#[test]
fn plain_tokens_pass_through_resolved() {
    use TokenKind::*;
    assert_eq!(
        kinds_of("int x = 1;"),
        vec![KwInt, Identifier, Equal, NumericConstant, Semi]
    );
}

#[test]
fn object_like_expansion() {
    assert_eq!(texts_of("#define X 1\nint a = X;"), ["int", "a", "=", "1", ";"]);
}

#[test]
fn empty_macro_expands_to_nothing() {
    assert_eq!(texts_of("#define E\nint a = E 1;"), ["int", "a", "=", "1", ";"]);
}

#[test]
fn object_like_body_is_rescanned() {
    assert_eq!(
        texts_of("#define INNER 1\n#define OUTER INNER + 2\nOUTER;"),
        ["1", "+", "2", ";"]
    );
}

#[test]
fn function_like_expansion_substitutes_arguments() {
    assert_eq!(
        texts_of("#define ADD(a, b) a + b\nADD(1, 2);"),
        ["1", "+", "2", ";"]
    );
}

#[test]
fn function_like_name_without_parens_is_an_identifier() {
    use TokenKind::*;
    assert_eq!(kinds_of("#define F(x) x\nF;"), vec![Identifier, Semi]);
}

#[test]
fn arguments_are_macro_expanded() {
    assert_eq!(
        texts_of("#define ONE 1\n#define ID(x) x\nID(ONE);"),
        ["1", ";"]
    );
}

#[test]
fn nested_invocations_in_arguments_expand() {
    assert_eq!(
        texts_of("#define INC(x) x + 1\nint y = INC(INC(2));"),
        ["int", "y", "=", "2", "+", "1", "+", "1", ";"]
    );
}

#[test]
fn rescanning_includes_following_context() {
    // After substitution the result is rescanned together with the tokens
    // that follow the invocation, so the paren after ID(F) invokes F.
    assert_eq!(
        texts_of("#define F(x) x\n#define ID(x) x\nID(F) (3);"),
        ["3", ";"]
    );
}

#[test]
fn argument_expansion_stops_at_the_argument_end() {
    // Each argument expands as if it were the whole remaining input: the
    // trailing F in TWICE's argument sees no '(' and stays unexpanded, so
    // only the second substituted copy picks up the file's paren.
    assert_eq!(
        texts_of("#define F(x) x\n#define TWICE(x) x x\nTWICE(F) (3);"),
        ["F", "3", ";"]
    );
}

#[test]
fn parenthesized_arguments_keep_commas() {
    assert_eq!(
        texts_of("#define FIRST(a, b) a\nFIRST((1, 2), 3);"),
        ["(", "1", ",", "2", ")", ";"]
    );
}

#[test]
fn empty_argument_is_accepted() {
    assert_eq!(texts_of("#define WRAP(x) [x]\nWRAP();"), ["[", "]", ";"]);
}

#[test]
fn invocation_spanning_lines() {
    assert_eq!(
        texts_of("#define ADD(a, b) a + b\nADD(1,\n    2);"),
        ["1", "+", "2", ";"]
    );
}

#[test]
fn self_referential_macro_stops() {
    use TokenKind::*;
    assert_eq!(kinds_of("#define x x\nx;"), vec![Identifier, Semi]);
}

#[test]
fn mutually_recursive_macros_stop() {
    assert_eq!(texts_of("#define a b\n#define b a\na;"), ["a", ";"]);
}

#[test]
fn recursive_function_like_macro_stops() {
    assert_eq!(texts_of("#define f(x) f(x)\nf(1);"), ["f", "(", "1", ")", ";"]);
}

#[test]
fn keywords_can_be_macro_names() {
    use TokenKind::*;
    assert_eq!(kinds_of("#define int long\nint x;"), vec![KwLong, Identifier, Semi]);
}

#[test]
fn undef_removes_a_macro() {
    assert_eq!(texts_of("#define X 1\n#undef X\nX;"), ["X", ";"]);
}

#[test]
fn redefinition_takes_effect() {
    assert_eq!(texts_of("#define X 1\n#define X 2\nX;"), ["2", ";"]);
}

#[test]
fn spliced_define_body_continues() {
    assert_eq!(texts_of("#define X 1 + \\\n 2\nX;"), ["1", "+", "2", ";"]);
}

// === Conditionals ===

#[test]
fn ifdef_takes_the_defined_branch() {
    assert_eq!(
        texts_of("#define FOO\n#ifdef FOO\nyes\n#else\nno\n#endif"),
        ["yes"]
    );
}

#[test]
fn ifdef_skips_the_undefined_branch() {
    assert_eq!(texts_of("#ifdef FOO\nyes\n#else\nno\n#endif"), ["no"]);
}

#[test]
fn ifndef_negates() {
    assert_eq!(texts_of("#ifndef FOO\nyes\n#endif"), ["yes"]);
}

#[test]
fn if_evaluates_arithmetic() {
    assert_eq!(texts_of("#if 1 + 2 * 3 == 7\nyes\n#endif"), ["yes"]);
    assert_eq!(texts_of("#if (1 + 2) * 3 == 7\nyes\n#else\nno\n#endif"), ["no"]);
}

#[test]
fn if_expands_macros() {
    assert_eq!(texts_of("#define N 4\n#if N > 3\nbig\n#endif"), ["big"]);
    assert_eq!(
        texts_of("#define DOUBLE(x) ((x) * 2)\n#if DOUBLE(3) == 6\nyes\n#endif"),
        ["yes"]
    );
}

#[test]
fn undefined_identifiers_evaluate_to_zero() {
    assert_eq!(texts_of("#if MISSING\nyes\n#else\nno\n#endif"), ["no"]);
}

#[test]
fn defined_operator() {
    assert_eq!(
        texts_of("#define FOO\n#if defined(FOO) && !defined(BAR)\nyes\n#endif"),
        ["yes"]
    );
    assert_eq!(texts_of("#if defined FOO\nyes\n#else\nno\n#endif"), ["no"]);
}

#[test]
fn elif_chains() {
    let source = "#define B\n#if defined(A)\na\n#elif defined(B)\nb\n#else\nc\n#endif";
    assert_eq!(texts_of(source), ["b"]);
}

#[test]
fn nested_conditionals_in_dead_regions() {
    let source = "#if 0\n#if 1\nx\n#endif\ny\n#else\nz\n#endif";
    assert_eq!(texts_of(source), ["z"]);
}

#[test]
fn ternary_in_conditional_expression() {
    assert_eq!(texts_of("#if 1 ? 2 : 0\nyes\n#endif"), ["yes"]);
}

#[test]
fn directives_in_dead_regions_are_inert() {
    let source = "#if 0\n#define X 1\n#error dead\n#endif\nX;";
    assert_eq!(texts_of(source), ["X", ";"]);
}

#[test]
fn unterminated_conditional_is_an_error() {
    let err = error_of("#ifdef FOO\nint x;\n");
    assert_eq!(err.kind(), &PpErrorKind::UnterminatedConditional);
}

#[test]
fn stray_endif_is_an_error() {
    let err = error_of("#endif\n");
    assert_eq!(err.kind(), &PpErrorKind::StrayDirective("endif"));
}

#[test]
fn double_else_is_an_error() {
    let err = error_of("#if 1\n#else\n#else\n#endif\n");
    assert_eq!(err.kind(), &PpErrorKind::StrayDirective("else"));
}

// === Includes ===

#[test]
fn quoted_include_splices_tokens() {
    let mut pp = pp_with(&[
        ("main.c", "int before;\n#include \"h.h\"\nint after;\n"),
        ("h.h", "int inside;\n"),
    ]);
    assert_eq!(
        lex_texts(&mut pp),
        ["int", "before", ";", "int", "inside", ";", "int", "after", ";"]
    );
}

#[test]
fn angled_include_resolves() {
    let mut pp = pp_with(&[("main.c", "#include <sys/h.h>\nx;\n"), ("sys/h.h", "y;\n")]);
    assert_eq!(lex_texts(&mut pp), ["y", ";", "x", ";"]);
}

#[test]
fn macros_defined_in_includes_are_visible() {
    let mut pp = pp_with(&[
        ("main.c", "#include \"def.h\"\nVALUE;\n"),
        ("def.h", "#define VALUE 42\n"),
    ]);
    assert_eq!(lex_texts(&mut pp), ["42", ";"]);
}

#[test]
fn missing_include_is_an_error() {
    let mut pp = pp_from("#include \"nope.h\"\n");
    let err = pp.run().expect_err("include fails");
    assert_eq!(err.kind(), &PpErrorKind::IncludeNotFound("nope.h".to_string()));
}

#[test]
fn conditional_open_across_include_end_is_an_error() {
    let mut pp = pp_with(&[("main.c", "#include \"h.h\"\n"), ("h.h", "#ifdef X\n")]);
    let err = pp.run().expect_err("unbalanced include");
    assert_eq!(err.kind(), &PpErrorKind::UnterminatedConditional);
}

// === Stringize and paste ===

#[test]
fn hash_stringizes_raw_argument() {
    let mut pp = pp_from("#define STR(x) #x\nSTR(a + 1);");
    let texts = lex_texts(&mut pp);
    assert_eq!(texts, ["\"a + 1\"", ";"]);
}

#[test]
fn stringize_escapes_inner_quotes() {
    let mut pp = pp_from("#define STR(x) #x\nSTR(\"hi\");");
    assert_eq!(lex_texts(&mut pp), ["\"\\\"hi\\\"\"", ";"]);
}

#[test]
fn paste_forms_one_token() {
    use TokenKind::*;
    assert_eq!(kinds_of("#define GLUE(a, b) a ## b\nGLUE(foo, bar);"), vec![Identifier, Semi]);
    assert_eq!(texts_of("#define GLUE(a, b) a ## b\nGLUE(foo, bar);"), ["foobar", ";"]);
}

#[test]
fn pasted_token_can_invoke_a_macro() {
    let source = "#define foobar 1\n#define GLUE(a, b) a ## b\nGLUE(foo, bar);";
    assert_eq!(texts_of(source), ["1", ";"]);
}

#[test]
fn paste_with_empty_argument_drops_placemarker() {
    assert_eq!(texts_of("#define TAG(p, n) p ## n\nTAG(, x);"), ["x", ";"]);
}

#[test]
fn invalid_paste_is_an_error() {
    let err = error_of("#define GLUE(a, b) a ## b\nGLUE(+, /);");
    assert!(matches!(err.kind(), PpErrorKind::InvalidPaste(text) if text == "+/"));
}

#[test]
fn object_like_hash_is_a_plain_token() {
    use TokenKind::*;
    assert_eq!(kinds_of("#define H #\nH;"), vec![Hash, Semi]);
}

// === Errors and misc directives ===

#[test]
fn error_directive_reports_its_text() {
    let err = error_of("#error something broke\n");
    assert_eq!(
        err.kind(),
        &PpErrorKind::UserError("something broke".to_string())
    );
}

#[test]
fn error_in_dead_branch_is_ignored() {
    assert_eq!(texts_of("#ifdef NOPE\n#error dead\n#endif\nok;"), ["ok", ";"]);
}

#[test]
fn wrong_argument_count_is_an_error() {
    let err = error_of("#define PAIR(a, b) a b\nPAIR(1);\n");
    assert_eq!(
        err.kind(),
        &PpErrorKind::WrongArgCount {
            name: "PAIR".to_string(),
            expected: 2,
            actual: 1
        }
    );
}

#[test]
fn unterminated_argument_list_is_an_error() {
    let err = error_of("#define F(x) x\nF(1\n");
    assert_eq!(
        err.kind(),
        &PpErrorKind::UnterminatedMacroArgs("F".to_string())
    );
}

#[test]
fn invalid_directive_is_an_error() {
    let err = error_of("#frobnicate\n");
    assert_eq!(
        err.kind(),
        &PpErrorKind::InvalidDirective("frobnicate".to_string())
    );
}

#[test]
fn null_directive_and_line_markers_are_skipped() {
    assert_eq!(texts_of("#\n# 1 \"input.c\"\n#pragma once\nx;"), ["x", ";"]);
}

// === Observers ===

#[test]
fn watcher_sees_every_delivered_token() {
    let seen: Rc<RefCell<Vec<TokenKind>>> = Rc::default();
    let mut pp = pp_from("#define X 1\nint a = X;");
    let sink = Rc::clone(&seen);
    pp.set_token_watcher(move |tok| sink.borrow_mut().push(tok.kind));
    pp.run().expect("preprocessing succeeds");
    use TokenKind::*;
    assert_eq!(
        *seen.borrow(),
        vec![KwInt, Identifier, Equal, NumericConstant, Semi, Eof]
    );
}

#[derive(Default)]
struct RecordExpansions {
    /// (name spelling, begin-is-file, end-is-file) per event.
    events: Rc<RefCell<Vec<(String, bool, bool)>>>,
}

impl PpCallbacks for RecordExpansions {
    fn macro_expands(
        &mut self,
        sm: &SourceManager,
        name: &LexedToken,
        _def: &MacroDefinition,
        range: SourceRange,
    ) {
        self.events.borrow_mut().push((
            token_spelling(sm, name).into_owned(),
            range.begin().is_file_id(),
            range.end().is_file_id(),
        ));
    }
}

#[test]
fn macro_expands_fires_with_invocation_ranges() {
    let events: Rc<RefCell<Vec<(String, bool, bool)>>> = Rc::default();
    let mut pp = pp_from("#define ONE 1\n#define ID(x) x\nONE; ID(2);");
    pp.add_callbacks(Box::new(RecordExpansions {
        events: Rc::clone(&events),
    }));
    pp.run().expect("preprocessing succeeds");
    assert_eq!(
        *events.borrow(),
        vec![
            ("ONE".to_string(), true, true),
            ("ID".to_string(), true, true),
        ]
    );
}

#[test]
fn nested_expansion_reports_macro_locations() {
    // B's invocation is rescanned out of A's body: its name (and range
    // begin) is a macro location, while the closing paren is in the file.
    let events: Rc<RefCell<Vec<(String, bool, bool)>>> = Rc::default();
    let mut pp = pp_from("#define B(x) x\n#define A 1 + B\nA(2);");
    pp.add_callbacks(Box::new(RecordExpansions {
        events: Rc::clone(&events),
    }));
    pp.run().expect("preprocessing succeeds");
    assert_eq!(
        *events.borrow(),
        vec![
            ("A".to_string(), true, true),
            ("B".to_string(), false, true),
        ]
    );
}

#[test]
fn expanded_tokens_lead_back_to_the_call_site() {
    let mut pp = pp_from("#define X 40 + 2\nX;");
    let mut expanded = Vec::new();
    loop {
        let tok = pp.lex().expect("preprocessing succeeds");
        if tok.kind == TokenKind::Eof {
            break;
        }
        expanded.push(tok);
    }
    let sm = pp.source_manager();
    // "40", "+", "2" are macro locations whose expansion location is the
    // spelled X of the second line; ";" is a plain file token.
    let call_site = sm.expansion_loc(expanded[0].location);
    assert!(expanded[0].location.is_macro_id());
    assert!(call_site.is_file_id());
    for tok in &expanded[..3] {
        assert_eq!(sm.expansion_loc(tok.location), call_site);
    }
    assert!(expanded[3].location.is_file_id());
    // Spelling resolves into the macro definition.
    assert_eq!(&sm.character_data(expanded[0].location)[..2], "40");
}
