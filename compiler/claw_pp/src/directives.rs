//! Directive parsing and conditional-region skipping.

use crate::error::{PpError, PpErrorKind};
use crate::{cond_expr, token_spelling, CondState, MacroDefinition, Preprocessor, MAX_INCLUDE_DEPTH};
use claw_lexer::{LexedToken, TokenKind};
use smallvec::SmallVec;

impl Preprocessor {
    /// Handle one directive. The introducing `#` has been consumed; on
    /// return the whole directive line (and any skipped region it controls)
    /// has been consumed as well.
    pub(crate) fn handle_directive(&mut self) -> Result<(), PpError> {
        let (tok, from_file) = self.next_raw()?;
        if tok.is_at_line_start() {
            // Null directive: a lone '#'.
            self.push_back(tok, from_file);
            return Ok(());
        }
        match tok.kind {
            TokenKind::RawIdentifier => {
                let name = self.spelling(&tok).into_owned();
                match name.as_str() {
                    "define" => self.handle_define(&tok),
                    "undef" => self.handle_undef(&tok),
                    "include" => self.handle_include(&tok),
                    "ifdef" => self.handle_ifdef(false, &tok),
                    "ifndef" => self.handle_ifdef(true, &tok),
                    "if" => self.handle_if(&tok),
                    "elif" => self.handle_live_elif(&tok),
                    "else" => self.handle_live_else(&tok),
                    "endif" => self.handle_endif(&tok),
                    "error" => self.handle_error(&tok),
                    "warning" => {
                        let line = self.read_directive_line()?;
                        let message = self.join_spellings(&line);
                        tracing::warn!(%message, "#warning directive");
                        Ok(())
                    }
                    // Processed for their side effects elsewhere; not
                    // recorded here.
                    "pragma" | "line" => {
                        self.read_directive_line()?;
                        Ok(())
                    }
                    _ => Err(PpError::new(
                        PpErrorKind::InvalidDirective(name),
                        tok.location,
                    )),
                }
            }
            // Line markers in preprocessed output: `# 1 "file.c"`.
            TokenKind::NumericConstant => {
                self.read_directive_line()?;
                Ok(())
            }
            _ => Err(PpError::new(
                PpErrorKind::InvalidDirective(self.spelling(&tok).into_owned()),
                tok.location,
            )),
        }
    }

    /// Collect the remaining tokens of the current directive line. The first
    /// token of the next line (or `Eof`) is pushed back.
    pub(crate) fn read_directive_line(&mut self) -> Result<Vec<LexedToken>, PpError> {
        let mut tokens = Vec::new();
        loop {
            let (tok, from_file) = self.next_raw()?;
            if tok.is_at_line_start() || tok.kind == TokenKind::Eof {
                self.push_back(tok, from_file);
                return Ok(tokens);
            }
            tokens.push(tok);
        }
    }

    fn join_spellings(&self, tokens: &[LexedToken]) -> String {
        let mut out = String::new();
        for (i, tok) in tokens.iter().enumerate() {
            if i > 0 && tok.has_leading_space() {
                out.push(' ');
            }
            out.push_str(&self.spelling(tok));
        }
        out
    }

    fn handle_define(&mut self, directive: &LexedToken) -> Result<(), PpError> {
        let line = self.read_directive_line()?;
        let Some((name_tok, rest)) = line.split_first() else {
            return Err(PpError::new(
                PpErrorKind::MacroNameMissing,
                directive.location,
            ));
        };
        if name_tok.kind != TokenKind::RawIdentifier {
            return Err(PpError::new(
                PpErrorKind::MacroNameNotIdentifier,
                name_tok.location,
            ));
        }
        let name = self.spelling(name_tok).into_owned();

        let mut params = None;
        let mut body = rest;
        if let Some(first) = rest.first() {
            // A '(' directly after the name (no whitespace) opens a
            // parameter list; with whitespace it is part of the body.
            if first.kind == TokenKind::LParen && !first.has_leading_space() {
                let (list, consumed) = self.parse_macro_params(rest)?;
                params = Some(list);
                body = &rest[consumed..];
            }
        }

        let def = MacroDefinition {
            name_loc: name_tok.location,
            params,
            body: body.to_vec(),
            disabled: false,
        };
        for cb in &mut self.callbacks {
            cb.macro_defined(&self.sm, name_tok, &def);
        }
        tracing::debug!(
            name = %name,
            function_like = def.is_function_like(),
            tokens = def.body.len(),
            "macro defined"
        );
        self.macros.insert(name, def);
        Ok(())
    }

    /// Parse `( ident (, ident)* )` or `()` at the start of `rest`.
    /// Returns the parameter names and the number of tokens consumed.
    fn parse_macro_params(
        &self,
        rest: &[LexedToken],
    ) -> Result<(SmallVec<[Box<str>; 4]>, usize), PpError> {
        let lparen = &rest[0];
        let mut list = SmallVec::new();
        if rest.get(1).map(|t| t.kind) == Some(TokenKind::RParen) {
            return Ok((list, 2));
        }
        let mut i = 1;
        loop {
            let Some(param) = rest.get(i) else {
                return Err(PpError::new(
                    PpErrorKind::BadMacroParameterList,
                    lparen.location,
                ));
            };
            if param.kind != TokenKind::RawIdentifier {
                return Err(PpError::new(
                    PpErrorKind::BadMacroParameterList,
                    param.location,
                ));
            }
            list.push(self.spelling(param).into_owned().into_boxed_str());
            i += 1;
            match rest.get(i).map(|t| t.kind) {
                Some(TokenKind::Comma) => i += 1,
                Some(TokenKind::RParen) => return Ok((list, i + 1)),
                _ => {
                    return Err(PpError::new(
                        PpErrorKind::BadMacroParameterList,
                        param.location,
                    ))
                }
            }
        }
    }

    fn handle_undef(&mut self, directive: &LexedToken) -> Result<(), PpError> {
        let line = self.read_directive_line()?;
        let Some(name_tok) = line.first() else {
            return Err(PpError::new(
                PpErrorKind::MacroNameMissing,
                directive.location,
            ));
        };
        if name_tok.kind != TokenKind::RawIdentifier {
            return Err(PpError::new(
                PpErrorKind::MacroNameNotIdentifier,
                name_tok.location,
            ));
        }
        let name = self.spelling(name_tok).into_owned();
        if self.macros.remove(&name).is_some() {
            for cb in &mut self.callbacks {
                cb.macro_undefined(&self.sm, name_tok);
            }
            tracing::debug!(name = %name, "macro undefined");
        }
        Ok(())
    }

    fn handle_include(&mut self, directive: &LexedToken) -> Result<(), PpError> {
        let line = self.read_directive_line()?;
        let Some(first) = line.first() else {
            return Err(PpError::new(
                PpErrorKind::ExpectedFileName,
                directive.location,
            ));
        };
        let name = match first.kind {
            TokenKind::StringLiteral => {
                let text = self.spelling(first).into_owned();
                if text.len() < 2 || !text.starts_with('"') || !text.ends_with('"') {
                    return Err(PpError::new(PpErrorKind::ExpectedFileName, first.location));
                }
                text[1..text.len() - 1].to_string()
            }
            TokenKind::Less => {
                // Angled form: the file name is the raw source between '<'
                // and '>', however it happened to tokenize.
                let Some(gt) = line.iter().find(|t| t.kind == TokenKind::Greater) else {
                    return Err(PpError::new(PpErrorKind::ExpectedFileName, first.location));
                };
                let (fid, begin) = self.sm.decompose(first.location);
                let (_, end) = self.sm.decompose(gt.location);
                self.sm.file_text(fid)[(begin + 1) as usize..end as usize].to_string()
            }
            _ => return Err(PpError::new(PpErrorKind::ExpectedFileName, first.location)),
        };

        if self.file_depth() >= MAX_INCLUDE_DEPTH {
            return Err(PpError::new(
                PpErrorKind::IncludeDepthExceeded,
                first.location,
            ));
        }
        let fid = self
            .sm
            .create_file_id(&name, first.location)
            .map_err(|_| PpError::new(PpErrorKind::IncludeNotFound(name.clone()), first.location))?;
        tracing::debug!(file = %name, "entering include");
        // Reading the directive line overshot onto the next line's first
        // token; park it under the included file so it resumes afterwards.
        self.park_pushback();
        self.push_include(fid);
        Ok(())
    }

    fn handle_ifdef(&mut self, negated: bool, directive: &LexedToken) -> Result<(), PpError> {
        let line = self.read_directive_line()?;
        let Some(name_tok) = line.first() else {
            return Err(PpError::new(
                PpErrorKind::MacroNameMissing,
                directive.location,
            ));
        };
        if name_tok.kind != TokenKind::RawIdentifier {
            return Err(PpError::new(
                PpErrorKind::MacroNameNotIdentifier,
                name_tok.location,
            ));
        }
        let defined = self
            .macros
            .contains_key(self.spelling(name_tok).as_ref());
        let live = defined != negated;
        self.cond_stack.push(CondState {
            loc: directive.location,
            was_taken: live,
            seen_else: false,
        });
        if !live {
            self.skip_until_live_branch()?;
        }
        Ok(())
    }

    fn handle_if(&mut self, directive: &LexedToken) -> Result<(), PpError> {
        let line = self.read_directive_line()?;
        if line.is_empty() {
            return Err(PpError::new(
                PpErrorKind::BadConditionalExpression("expected an expression"),
                directive.location,
            ));
        }
        let value = cond_expr::evaluate(&self.sm, &self.macros, &line, directive.location)?;
        let live = value != 0;
        self.cond_stack.push(CondState {
            loc: directive.location,
            was_taken: live,
            seen_else: false,
        });
        if !live {
            self.skip_until_live_branch()?;
        }
        Ok(())
    }

    /// `#elif` reached while lexing a live branch: that branch is done, skip
    /// everything to the matching `#endif`.
    fn handle_live_elif(&mut self, directive: &LexedToken) -> Result<(), PpError> {
        self.read_directive_line()?;
        let Some(top) = self.cond_stack.last() else {
            return Err(PpError::new(
                PpErrorKind::StrayDirective("elif"),
                directive.location,
            ));
        };
        if top.seen_else {
            return Err(PpError::new(
                PpErrorKind::StrayDirective("elif"),
                directive.location,
            ));
        }
        self.skip_until_live_branch()
    }

    /// `#else` reached while lexing a live branch.
    fn handle_live_else(&mut self, directive: &LexedToken) -> Result<(), PpError> {
        self.read_directive_line()?;
        let Some(top) = self.cond_stack.last_mut() else {
            return Err(PpError::new(
                PpErrorKind::StrayDirective("else"),
                directive.location,
            ));
        };
        if top.seen_else {
            return Err(PpError::new(
                PpErrorKind::StrayDirective("else"),
                directive.location,
            ));
        }
        top.seen_else = true;
        self.skip_until_live_branch()
    }

    fn handle_endif(&mut self, directive: &LexedToken) -> Result<(), PpError> {
        // Pop before reading the rest of the line: the line may end at a
        // file boundary, where conditional balance is checked.
        if self.cond_stack.pop().is_none() {
            return Err(PpError::new(
                PpErrorKind::StrayDirective("endif"),
                directive.location,
            ));
        }
        self.read_directive_line()?;
        Ok(())
    }

    fn handle_error(&mut self, directive: &LexedToken) -> Result<(), PpError> {
        let line = self.read_directive_line()?;
        let message = self.join_spellings(&line);
        Err(PpError::new(
            PpErrorKind::UserError(message),
            directive.location,
        ))
    }

    /// Skip tokens of a dead conditional region until a branch becomes live
    /// or the region's `#endif` closes it.
    ///
    /// Entered with the top of `cond_stack` describing the region. Nested
    /// conditionals inside the dead region are tracked purely structurally.
    pub(crate) fn skip_until_live_branch(&mut self) -> Result<(), PpError> {
        let mut depth = 0usize;
        loop {
            let (tok, _from_file) = self.next_raw()?;
            if tok.kind == TokenKind::Eof {
                let loc = self
                    .cond_stack
                    .last()
                    .map(|c| c.loc)
                    .unwrap_or(tok.location);
                return Err(PpError::new(PpErrorKind::UnterminatedConditional, loc));
            }
            if tok.kind != TokenKind::Hash || !tok.is_at_line_start() {
                continue;
            }
            let (name_tok, nf) = self.next_raw()?;
            if name_tok.is_at_line_start() {
                self.push_back(name_tok, nf);
                continue;
            }
            if name_tok.kind != TokenKind::RawIdentifier {
                continue;
            }
            let name = token_spelling(&self.sm, &name_tok).into_owned();
            match name.as_str() {
                "if" | "ifdef" | "ifndef" => {
                    self.read_directive_line()?;
                    depth += 1;
                }
                "endif" => {
                    if depth == 0 {
                        self.cond_stack.pop();
                        self.read_directive_line()?;
                        return Ok(());
                    }
                    depth -= 1;
                    self.read_directive_line()?;
                }
                "elif" => {
                    let line = self.read_directive_line()?;
                    if depth > 0 {
                        continue;
                    }
                    let (was_taken, seen_else) = {
                        let top = self
                            .cond_stack
                            .last()
                            .expect("skipping requires an open conditional");
                        (top.was_taken, top.seen_else)
                    };
                    if seen_else {
                        return Err(PpError::new(
                            PpErrorKind::StrayDirective("elif"),
                            name_tok.location,
                        ));
                    }
                    if !was_taken {
                        let value =
                            cond_expr::evaluate(&self.sm, &self.macros, &line, name_tok.location)?;
                        if value != 0 {
                            if let Some(top) = self.cond_stack.last_mut() {
                                top.was_taken = true;
                            }
                            return Ok(());
                        }
                    }
                }
                "else" => {
                    self.read_directive_line()?;
                    if depth > 0 {
                        continue;
                    }
                    let top = self
                        .cond_stack
                        .last_mut()
                        .expect("skipping requires an open conditional");
                    if top.seen_else {
                        return Err(PpError::new(
                            PpErrorKind::StrayDirective("else"),
                            name_tok.location,
                        ));
                    }
                    top.seen_else = true;
                    if !top.was_taken {
                        top.was_taken = true;
                        return Ok(());
                    }
                }
                _ => {
                    self.read_directive_line()?;
                }
            }
        }
    }
}
