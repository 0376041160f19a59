use super::*;
use claw_source::SourceLocation;

fn lex_all(text: &str) -> (SourceManager, Vec<LexedToken>) {
    let mut sm = SourceManager::new();
    sm.provide_file("test.c", text);
    let fid = sm
        .create_file_id("test.c", SourceLocation::invalid())
        .expect("buffer provided");
    let mut lexer = Lexer::new(fid, &sm);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token();
        let done = tok.kind == TokenKind::Eof;
        tokens.push(tok);
        if done {
            break;
        }
    }
    (sm, tokens)
}

fn kinds(tokens: &[LexedToken]) -> Vec<TokenKind> {
    tokens.iter().map(|t| t.kind).collect()
}

fn text_of<'a>(sm: &'a SourceManager, tok: &LexedToken) -> &'a str {
    &sm.character_data(tok.location)[..tok.length as usize]
}

#[test]
fn empty_input_is_just_eof() {
    let (_, tokens) = lex_all("");
    assert_eq!(kinds(&tokens), vec![TokenKind::Eof]);
    assert_eq!(tokens[0].length, 0);
    assert!(tokens[0].is_at_line_start());
}

#[test]
fn basic_declaration() {
    use TokenKind::*;
    let (sm, tokens) = lex_all("int x = 1;");
    assert_eq!(
        kinds(&tokens),
        vec![RawIdentifier, RawIdentifier, Equal, NumericConstant, Semi, Eof]
    );
    assert_eq!(text_of(&sm, &tokens[0]), "int");
    assert_eq!(text_of(&sm, &tokens[1]), "x");
    assert_eq!(text_of(&sm, &tokens[3]), "1");
}

#[test]
fn line_start_and_leading_space_flags() {
    let (_, tokens) = lex_all("a b\nc");
    assert!(tokens[0].is_at_line_start());
    assert!(!tokens[0].has_leading_space());
    assert!(!tokens[1].is_at_line_start());
    assert!(tokens[1].has_leading_space());
    assert!(tokens[2].is_at_line_start());
}

#[test]
fn directives_lex_as_plain_tokens() {
    use TokenKind::*;
    let (sm, tokens) = lex_all("#define X 1\n");
    assert_eq!(
        kinds(&tokens),
        vec![Hash, RawIdentifier, RawIdentifier, NumericConstant, Eof]
    );
    assert!(tokens[0].is_at_line_start());
    assert_eq!(text_of(&sm, &tokens[1]), "define");
}

#[test]
fn maximal_munch_punctuators() {
    use TokenKind::*;
    let (_, tokens) = lex_all(">>= >> >= > <<= ... . -> -- ## #");
    assert_eq!(
        kinds(&tokens),
        vec![
            GreaterGreaterEqual,
            GreaterGreater,
            GreaterEqual,
            Greater,
            LessLessEqual,
            Ellipsis,
            Period,
            Arrow,
            MinusMinus,
            HashHash,
            Hash,
            Eof
        ]
    );
}

#[test]
fn comments_are_trivia() {
    use TokenKind::*;
    let (_, tokens) = lex_all("a /* x */ b // y\nc");
    assert_eq!(
        kinds(&tokens),
        vec![RawIdentifier, RawIdentifier, RawIdentifier, Eof]
    );
    assert!(tokens[1].has_leading_space());
    assert!(tokens[2].is_at_line_start());
}

#[test]
fn block_comment_spanning_lines_starts_a_line() {
    let (_, tokens) = lex_all("a /* x\ny */ b");
    assert!(tokens[1].is_at_line_start());
}

#[test]
fn spliced_identifier_needs_cleaning() {
    let (sm, tokens) = lex_all("ab\\\ncd e");
    assert_eq!(tokens[0].kind, TokenKind::RawIdentifier);
    assert!(tokens[0].needs_cleaning());
    // Length covers the raw extent including the splice.
    assert_eq!(text_of(&sm, &tokens[0]), "ab\\\ncd");
    // The spliced newline does not start a new line.
    assert!(!tokens[1].is_at_line_start());
}

#[test]
fn splice_between_tokens_is_whitespace() {
    let (_, tokens) = lex_all("a \\\n b");
    assert_eq!(tokens.len(), 3);
    assert!(!tokens[1].is_at_line_start());
    assert!(tokens[1].has_leading_space());
}

#[test]
fn ucn_identifier_is_flagged() {
    let (_, tokens) = lex_all("a\\u00e9b c");
    assert_eq!(tokens[0].kind, TokenKind::RawIdentifier);
    assert!(tokens[0].has_ucn());
    assert_eq!(tokens[0].length, 8);
    assert!(!tokens[1].has_ucn());
}

#[test]
fn pp_numbers() {
    let (sm, tokens) = lex_all("0x1f 1.5e-3 1e+9 .5 42ul");
    for tok in &tokens[..5] {
        assert_eq!(tok.kind, TokenKind::NumericConstant);
    }
    assert_eq!(text_of(&sm, &tokens[1]), "1.5e-3");
    assert_eq!(text_of(&sm, &tokens[2]), "1e+9");
    assert_eq!(text_of(&sm, &tokens[3]), ".5");
}

#[test]
fn string_and_char_literals() {
    use TokenKind::*;
    let (sm, tokens) = lex_all(r#""hi \"there\"" 'a' '\n'"#);
    assert_eq!(
        kinds(&tokens),
        vec![StringLiteral, CharConstant, CharConstant, Eof]
    );
    assert_eq!(text_of(&sm, &tokens[0]), r#""hi \"there\"""#);
    assert_eq!(text_of(&sm, &tokens[2]), r"'\n'");
}

#[test]
fn unterminated_string_stops_at_newline() {
    use TokenKind::*;
    let (_, tokens) = lex_all("\"oops\nx");
    assert_eq!(kinds(&tokens), vec![StringLiteral, RawIdentifier, Eof]);
    assert!(tokens[1].is_at_line_start());
}

#[test]
fn unknown_bytes_become_unknown_tokens() {
    use TokenKind::*;
    let (_, tokens) = lex_all("a @ b");
    assert_eq!(
        kinds(&tokens),
        vec![RawIdentifier, Unknown, RawIdentifier, Eof]
    );
}

#[test]
fn eof_location_and_repetition() {
    let mut sm = SourceManager::new();
    sm.provide_file("t.c", "ab");
    let fid = sm
        .create_file_id("t.c", SourceLocation::invalid())
        .expect("buffer provided");
    let mut lexer = Lexer::new(fid, &sm);
    assert_eq!(lexer.next_token().kind, TokenKind::RawIdentifier);
    let eof = lexer.next_token();
    assert_eq!(eof.kind, TokenKind::Eof);
    assert_eq!(eof.location, sm.end_of_file_loc(fid));
    // The lexer keeps reporting Eof.
    assert_eq!(lexer.next_token().kind, TokenKind::Eof);
}

#[test]
fn token_locations_are_file_offsets() {
    let (sm, tokens) = lex_all("ab cd");
    let (_, off0) = sm.decompose(tokens[0].location);
    let (_, off1) = sm.decompose(tokens[1].location);
    assert_eq!(off0, 0);
    assert_eq!(off1, 3);
    assert_eq!(tokens[1].length, 2);
}
