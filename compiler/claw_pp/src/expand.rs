//! Macro invocation parsing, substitution, `#` and `##`.

use crate::error::{PpError, PpErrorKind};
use crate::{token_spelling, MacroDefinition, Preprocessor};
use claw_lexer::{LexedToken, Lexer, TokenFlags, TokenKind};
use claw_source::{SourceLocation, SourceRange};

impl Preprocessor {
    /// Try to expand the macro named by `tok`.
    ///
    /// Returns `true` when an expansion was pushed (or the macro expanded to
    /// nothing) and the caller should continue lexing. Returns `false` when
    /// the token is not an invocation; if the name is a macro currently
    /// being expanded, the token is stamped `NO_EXPAND` first.
    pub(crate) fn try_expand(&mut self, tok: &mut LexedToken) -> Result<bool, PpError> {
        let name = self.spelling(tok).into_owned();
        let def = match self.macros.get(&name) {
            None => return Ok(false),
            Some(def) if def.disabled => {
                tok.flags.set(TokenFlags::NO_EXPAND);
                return Ok(false);
            }
            Some(def) => def.clone(),
        };

        let range_end;
        let produced;
        if let Some(params) = &def.params {
            // A function-like name is only an invocation when '(' follows;
            // the lookahead may cross out of the current expansion stream
            // into the surrounding file.
            let (next, next_from_file) = self.next_raw()?;
            if next.kind != TokenKind::LParen {
                self.push_back(next, next_from_file);
                return Ok(false);
            }
            let (args, rparen) = self.collect_args(tok, &name, params.len())?;
            range_end = rparen.location;
            // Report the invocation before expanding its arguments, so
            // argument-position expansions observe an enclosing range.
            self.report_expansion(tok, &def, range_end);
            produced = self.substitute(&def, &args)?;
        } else {
            range_end = tok.location;
            self.report_expansion(tok, &def, range_end);
            produced = def.body.clone();
        }
        tracing::debug!(name = %name, tokens = produced.len(), "expanding macro");

        let Some(produced) = self.relocate_into_expansion(produced, tok.location, range_end) else {
            return Ok(true);
        };
        self.push_expansion(name, produced);
        Ok(true)
    }

    fn report_expansion(&mut self, name: &LexedToken, def: &MacroDefinition, end: SourceLocation) {
        let range = SourceRange::new(name.location, end);
        for cb in &mut self.callbacks {
            cb.macro_expands(&self.sm, name, def, range);
        }
    }

    /// Allocate an expansion entry covering `produced` and relocate the
    /// tokens into it, so every token's expansion chain leads back to the
    /// invocation at `begin`. Returns `None` for empty expansions.
    fn relocate_into_expansion(
        &mut self,
        mut produced: Vec<LexedToken>,
        begin: SourceLocation,
        end: SourceLocation,
    ) -> Option<Vec<LexedToken>> {
        if produced.is_empty() {
            return None;
        }
        let spelling: Vec<SourceLocation> = produced.iter().map(|t| t.location).collect();
        let base = self.sm.create_expansion(spelling, begin, end);
        for (i, tok) in produced.iter_mut().enumerate() {
            tok.location = base.offset_by(i as u32);
            tok.flags.clear(TokenFlags::AT_LINE_START);
        }
        Some(produced)
    }

    /// Collect the argument list of a function-like invocation. The opening
    /// paren has been consumed; returns the arguments and the closing paren.
    fn collect_args(
        &mut self,
        name_tok: &LexedToken,
        name: &str,
        expected: usize,
    ) -> Result<(Vec<Vec<LexedToken>>, LexedToken), PpError> {
        let mut args: Vec<Vec<LexedToken>> = vec![Vec::new()];
        let mut depth = 0usize;
        let rparen;
        loop {
            let (tok, _from_file) = self.next_raw()?;
            match tok.kind {
                TokenKind::Eof => {
                    return Err(PpError::new(
                        PpErrorKind::UnterminatedMacroArgs(name.to_string()),
                        name_tok.location,
                    ));
                }
                TokenKind::LParen => {
                    depth += 1;
                    args.last_mut().expect("argument list never empty").push(tok);
                }
                TokenKind::RParen => {
                    if depth == 0 {
                        rparen = tok;
                        break;
                    }
                    depth -= 1;
                    args.last_mut().expect("argument list never empty").push(tok);
                }
                TokenKind::Comma if depth == 0 => args.push(Vec::new()),
                _ => args.last_mut().expect("argument list never empty").push(tok),
            }
        }
        let actual = if expected == 0 && args.len() == 1 && args[0].is_empty() {
            0
        } else {
            args.len()
        };
        if actual != expected {
            return Err(PpError::new(
                PpErrorKind::WrongArgCount {
                    name: name.to_string(),
                    expected,
                    actual,
                },
                name_tok.location,
            ));
        }
        Ok((args, rparen))
    }

    /// Fully macro-expand one argument, as if its tokens were the whole
    /// remaining input (a trailing function-like name is not invoked).
    fn expand_arg_tokens(&mut self, tokens: &[LexedToken]) -> Result<Vec<LexedToken>, PpError> {
        let Some(last) = tokens.last() else {
            return Ok(Vec::new());
        };
        self.push_arg_barrier(tokens.to_vec(), last.location);
        let mut out = Vec::new();
        loop {
            let (mut tok, _from_file) = self.next_raw()?;
            if tok.kind == TokenKind::Eof {
                // The barrier reports Eof when the argument is exhausted;
                // nested expansions above it have already been popped.
                self.pop_arg_barrier();
                return Ok(out);
            }
            if tok.kind == TokenKind::RawIdentifier
                && !tok.flags.contains(TokenFlags::NO_EXPAND)
                && self.try_expand(&mut tok)?
            {
                continue;
            }
            out.push(tok);
        }
    }

    /// Replace parameters in the macro body with the collected arguments,
    /// applying `#` and `##`.
    ///
    /// Parameters adjacent to `#` or `##` substitute the raw argument;
    /// everything else substitutes the macro-expanded argument, computed
    /// once per parameter.
    fn substitute(
        &mut self,
        def: &MacroDefinition,
        args: &[Vec<LexedToken>],
    ) -> Result<Vec<LexedToken>, PpError> {
        let body = &def.body;
        let mut expanded_cache: Vec<Option<Vec<LexedToken>>> = vec![None; args.len()];
        let mut out: Vec<LexedToken> = Vec::with_capacity(body.len());
        let mut i = 0;
        while i < body.len() {
            let tok = body[i];

            // `#param` stringizes the raw argument.
            if tok.kind == TokenKind::Hash && def.is_function_like() {
                let param = body.get(i + 1).and_then(|t| self.param_index(def, t));
                let Some(param) = param else {
                    return Err(PpError::new(
                        PpErrorKind::HashMissingParameter,
                        tok.location,
                    ));
                };
                let stringized = self.stringize(&tok, &args[param]);
                out.push(stringized);
                i += 2;
                continue;
            }

            // `a ## b` pastes neighbors; parameter operands use raw
            // arguments.
            if tok.kind == TokenKind::HashHash {
                if out.is_empty() {
                    return Err(PpError::new(PpErrorKind::PasteAtEdge, tok.location));
                }
                let Some(&rhs) = body.get(i + 1) else {
                    return Err(PpError::new(PpErrorKind::PasteAtEdge, tok.location));
                };
                if let Some(param) = self.param_index(def, &rhs) {
                    let arg = &args[param];
                    if !arg.is_empty() {
                        let lhs = out.pop().expect("checked non-empty");
                        let pasted = self.paste(&lhs, &arg[0])?;
                        out.push(pasted);
                        out.extend_from_slice(&arg[1..]);
                    }
                } else {
                    let lhs = out.pop().expect("checked non-empty");
                    let pasted = self.paste(&lhs, &rhs)?;
                    out.push(pasted);
                }
                i += 2;
                continue;
            }

            if let Some(param) = self.param_index(def, &tok) {
                let arg = &args[param];
                let before_paste = body.get(i + 1).map(|t| t.kind) == Some(TokenKind::HashHash);
                if before_paste {
                    // Empty argument directly followed by `##`: drop the
                    // placemarker and splice in the right-hand side.
                    if arg.is_empty() {
                        let Some(&rhs) = body.get(i + 2) else {
                            return Err(PpError::new(
                                PpErrorKind::PasteAtEdge,
                                body[i + 1].location,
                            ));
                        };
                        if let Some(param2) = self.param_index(def, &rhs) {
                            out.extend_from_slice(&args[param2]);
                        } else {
                            out.push(rhs);
                        }
                        i += 3;
                        continue;
                    }
                    out.extend_from_slice(arg);
                    i += 1;
                    continue;
                }
                if expanded_cache[param].is_none() {
                    expanded_cache[param] = Some(self.expand_arg_tokens(arg)?);
                }
                out.extend_from_slice(
                    expanded_cache[param]
                        .as_ref()
                        .expect("cache filled above"),
                );
                i += 1;
                continue;
            }

            out.push(tok);
            i += 1;
        }
        Ok(out)
    }

    /// Index of the parameter `tok` names, if any.
    fn param_index(&self, def: &MacroDefinition, tok: &LexedToken) -> Option<usize> {
        if tok.kind != TokenKind::RawIdentifier {
            return None;
        }
        let params = def.params.as_ref()?;
        let text = token_spelling(&self.sm, tok);
        params.iter().position(|p| **p == *text)
    }

    /// Build the string literal for `#arg`, spelled in a scratch buffer.
    fn stringize(&mut self, hash: &LexedToken, arg: &[LexedToken]) -> LexedToken {
        let mut text = String::from("\"");
        for (i, tok) in arg.iter().enumerate() {
            if i > 0 && tok.has_leading_space() {
                text.push(' ');
            }
            let spelling = token_spelling(&self.sm, tok);
            if matches!(tok.kind, TokenKind::StringLiteral | TokenKind::CharConstant) {
                for c in spelling.chars() {
                    if c == '\\' || c == '"' {
                        text.push('\\');
                    }
                    text.push(c);
                }
            } else {
                text.push_str(&spelling);
            }
        }
        text.push('"');

        let fid = self.sm.create_scratch_buffer(&text);
        let mut tok = LexedToken::new(
            self.sm.compose(fid, 0),
            text.len() as u32,
            TokenKind::StringLiteral,
        );
        if hash.has_leading_space() {
            tok.flags.set(TokenFlags::LEADING_SPACE);
        }
        tok
    }

    /// Paste two tokens by re-lexing their joined spelling from a scratch
    /// buffer. The result must be exactly one token.
    fn paste(&mut self, lhs: &LexedToken, rhs: &LexedToken) -> Result<LexedToken, PpError> {
        let text = format!(
            "{}{}",
            token_spelling(&self.sm, lhs),
            token_spelling(&self.sm, rhs)
        );
        let fid = self.sm.create_scratch_buffer(&text);
        let mut lexer = Lexer::new(fid, &self.sm);
        let mut tok = lexer.next_token();
        let rest = lexer.next_token();
        if tok.kind == TokenKind::Eof || rest.kind != TokenKind::Eof {
            return Err(PpError::new(PpErrorKind::InvalidPaste(text), lhs.location));
        }
        tok.flags = TokenFlags::EMPTY;
        if lhs.has_leading_space() {
            tok.flags.set(TokenFlags::LEADING_SPACE);
        }
        Ok(tok)
    }
}
