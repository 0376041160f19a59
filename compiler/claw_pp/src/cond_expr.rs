//! Integer constant-expression evaluation for `#if` and `#elif`.
//!
//! The directive line is macro-expanded (with `defined` operands protected),
//! literals are folded to integers, and every identifier left over evaluates
//! to 0, per the C rules. The expression grammar covers unary `! ~ - +`,
//! the usual binary operator ladder, and `?:`.

use crate::error::{PpError, PpErrorKind};
use crate::{token_spelling, MacroDefinition};
use claw_lexer::{LexedToken, TokenKind};
use claw_source::{SourceLocation, SourceManager};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// Cap on macro expansions per conditional line. Self-referential macros
/// stop expanding once exhausted and fall back to evaluating as 0.
const EXPANSION_BUDGET: usize = 4096;

/// Evaluate a `#if`/`#elif` controlling expression.
pub(crate) fn evaluate(
    sm: &SourceManager,
    macros: &FxHashMap<String, MacroDefinition>,
    tokens: &[LexedToken],
    directive_loc: SourceLocation,
) -> Result<i64, PpError> {
    let prepared = prepare(sm, macros, tokens, directive_loc)?;
    let mut parser = Parser {
        tokens: &prepared,
        pos: 0,
        loc: directive_loc,
    };
    let value = parser.parse_expr(0)?;
    if parser.pos != prepared.len() {
        return Err(parser.bad("trailing tokens after expression"));
    }
    Ok(value)
}

/// A prepared expression token: a folded integer or a punctuator.
enum PTok {
    Num(i64),
    Punct(TokenKind),
}

fn bad_at(why: &'static str, loc: SourceLocation) -> PpError {
    PpError::new(PpErrorKind::BadConditionalExpression(why), loc)
}

/// Expand macros (protecting `defined` operands) and fold literals.
fn prepare(
    sm: &SourceManager,
    macros: &FxHashMap<String, MacroDefinition>,
    tokens: &[LexedToken],
    loc: SourceLocation,
) -> Result<Vec<PTok>, PpError> {
    let mut work: VecDeque<LexedToken> = tokens.iter().copied().collect();
    let mut out = Vec::new();
    let mut budget = EXPANSION_BUDGET;

    while let Some(tok) = work.pop_front() {
        match tok.kind {
            TokenKind::RawIdentifier => {
                let text = token_spelling(sm, &tok);
                if text == "defined" {
                    out.push(PTok::Num(eval_defined(sm, macros, &mut work, loc)?));
                    continue;
                }
                let text = text.into_owned();
                if budget > 0 {
                    if let Some(def) = macros.get(&text) {
                        budget -= 1;
                        if expand_into(sm, def, &mut work, loc)? {
                            continue;
                        }
                    }
                }
                // Identifiers without a (usable) definition evaluate to 0.
                out.push(PTok::Num(0));
            }
            TokenKind::NumericConstant => {
                let text = token_spelling(sm, &tok);
                let value =
                    parse_int(&text).ok_or_else(|| bad_at("malformed integer literal", loc))?;
                out.push(PTok::Num(value));
            }
            TokenKind::CharConstant => {
                out.push(PTok::Num(char_value(&token_spelling(sm, &tok))));
            }
            TokenKind::StringLiteral => {
                return Err(bad_at("string literal is not allowed", loc));
            }
            TokenKind::Eof | TokenKind::Unknown | TokenKind::Identifier => {
                return Err(bad_at("unexpected token", loc));
            }
            kind => out.push(PTok::Punct(kind)),
        }
    }
    Ok(out)
}

/// Consume the operand of a `defined` operator from the worklist.
fn eval_defined(
    sm: &SourceManager,
    macros: &FxHashMap<String, MacroDefinition>,
    work: &mut VecDeque<LexedToken>,
    loc: SourceLocation,
) -> Result<i64, PpError> {
    let mut next = work
        .pop_front()
        .ok_or_else(|| bad_at("expected a name after 'defined'", loc))?;
    let parenthesized = next.kind == TokenKind::LParen;
    if parenthesized {
        next = work
            .pop_front()
            .ok_or_else(|| bad_at("expected a name after 'defined('", loc))?;
    }
    if next.kind != TokenKind::RawIdentifier {
        return Err(bad_at("operand of 'defined' must be an identifier", loc));
    }
    let defined = macros.contains_key(token_spelling(sm, &next).as_ref());
    if parenthesized {
        let close = work
            .pop_front()
            .ok_or_else(|| bad_at("expected ')' after 'defined('", loc))?;
        if close.kind != TokenKind::RParen {
            return Err(bad_at("expected ')' after 'defined('", loc));
        }
    }
    Ok(i64::from(defined))
}

/// Push the expansion of `def` onto the front of the worklist.
///
/// Returns `false` when a function-like macro is not followed by `(`; the
/// name then evaluates as a plain identifier.
fn expand_into(
    sm: &SourceManager,
    def: &MacroDefinition,
    work: &mut VecDeque<LexedToken>,
    loc: SourceLocation,
) -> Result<bool, PpError> {
    let Some(params) = &def.params else {
        for tok in def.body.iter().rev() {
            work.push_front(*tok);
        }
        return Ok(true);
    };

    if work.front().map(|t| t.kind) != Some(TokenKind::LParen) {
        return Ok(false);
    }
    work.pop_front();

    let mut args: Vec<Vec<LexedToken>> = vec![Vec::new()];
    let mut depth = 0usize;
    let mut closed = false;
    while let Some(tok) = work.pop_front() {
        match tok.kind {
            TokenKind::LParen => {
                depth += 1;
                args.last_mut().expect("args never empty").push(tok);
            }
            TokenKind::RParen => {
                if depth == 0 {
                    closed = true;
                    break;
                }
                depth -= 1;
                args.last_mut().expect("args never empty").push(tok);
            }
            TokenKind::Comma if depth == 0 => args.push(Vec::new()),
            _ => args.last_mut().expect("args never empty").push(tok),
        }
    }
    if !closed {
        return Err(bad_at("unterminated macro argument list", loc));
    }
    let actual = if params.is_empty() && args.len() == 1 && args[0].is_empty() {
        0
    } else {
        args.len()
    };
    if actual != params.len() {
        return Err(bad_at("wrong number of macro arguments", loc));
    }

    let mut expansion = Vec::new();
    for tok in &def.body {
        let param = (tok.kind == TokenKind::RawIdentifier)
            .then(|| {
                let text = token_spelling(sm, tok);
                params.iter().position(|p| **p == *text)
            })
            .flatten();
        match param {
            Some(idx) => expansion.extend_from_slice(&args[idx]),
            None => expansion.push(*tok),
        }
    }
    for tok in expansion.into_iter().rev() {
        work.push_front(tok);
    }
    Ok(true)
}

/// Parse a C integer literal (decimal, octal, hex; `uUlL` suffixes).
fn parse_int(text: &str) -> Option<i64> {
    let t = text.trim_end_matches(|c| matches!(c, 'u' | 'U' | 'l' | 'L'));
    if t.is_empty() {
        return None;
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok();
    }
    if t != "0" {
        if let Some(oct) = t.strip_prefix('0') {
            return i64::from_str_radix(oct, 8).ok();
        }
    }
    t.parse().ok()
}

/// Value of a character constant. Unknown escapes yield the escaped char.
fn char_value(text: &str) -> i64 {
    let inner = text
        .strip_prefix('\'')
        .unwrap_or(text)
        .strip_suffix('\'')
        .unwrap_or(text);
    let mut chars = inner.chars();
    match chars.next() {
        Some('\\') => match chars.next() {
            Some('n') => 10,
            Some('t') => 9,
            Some('r') => 13,
            Some('a') => 7,
            Some('b') => 8,
            Some('f') => 12,
            Some('v') => 11,
            Some('0') => 0,
            Some('x') => i64::from_str_radix(chars.as_str(), 16).unwrap_or(0),
            Some(c) => c as i64,
            None => 0,
        },
        Some(c) => c as i64,
        None => 0,
    }
}

struct Parser<'a> {
    tokens: &'a [PTok],
    pos: usize,
    loc: SourceLocation,
}

impl Parser<'_> {
    fn bad(&self, why: &'static str) -> PpError {
        bad_at(why, self.loc)
    }

    fn peek_punct(&self) -> Option<TokenKind> {
        match self.tokens.get(self.pos) {
            Some(PTok::Punct(kind)) => Some(*kind),
            _ => None,
        }
    }

    fn parse_expr(&mut self, min_prec: u8) -> Result<i64, PpError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let Some(op) = self.peek_punct() else { break };
            if op == TokenKind::Question && min_prec == 0 {
                self.pos += 1;
                let then = self.parse_expr(0)?;
                if self.peek_punct() != Some(TokenKind::Colon) {
                    return Err(self.bad("expected ':' in conditional operator"));
                }
                self.pos += 1;
                let els = self.parse_expr(0)?;
                lhs = if lhs != 0 { then } else { els };
                continue;
            }
            let Some(prec) = binary_prec(op) else { break };
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let rhs = self.parse_expr(prec + 1)?;
            lhs = self.apply(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<i64, PpError> {
        match self.tokens.get(self.pos) {
            Some(PTok::Num(v)) => {
                self.pos += 1;
                Ok(*v)
            }
            Some(PTok::Punct(TokenKind::LParen)) => {
                self.pos += 1;
                let value = self.parse_expr(0)?;
                if self.peek_punct() != Some(TokenKind::RParen) {
                    return Err(self.bad("expected ')'"));
                }
                self.pos += 1;
                Ok(value)
            }
            Some(PTok::Punct(TokenKind::Exclaim)) => {
                self.pos += 1;
                Ok(i64::from(self.parse_unary()? == 0))
            }
            Some(PTok::Punct(TokenKind::Tilde)) => {
                self.pos += 1;
                Ok(!self.parse_unary()?)
            }
            Some(PTok::Punct(TokenKind::Minus)) => {
                self.pos += 1;
                Ok(self.parse_unary()?.wrapping_neg())
            }
            Some(PTok::Punct(TokenKind::Plus)) => {
                self.pos += 1;
                self.parse_unary()
            }
            _ => Err(self.bad("expected an expression")),
        }
    }

    fn apply(&self, op: TokenKind, lhs: i64, rhs: i64) -> Result<i64, PpError> {
        use TokenKind::*;
        Ok(match op {
            PipePipe => i64::from(lhs != 0 || rhs != 0),
            AmpAmp => i64::from(lhs != 0 && rhs != 0),
            Pipe => lhs | rhs,
            Caret => lhs ^ rhs,
            Amp => lhs & rhs,
            EqualEqual => i64::from(lhs == rhs),
            ExclaimEqual => i64::from(lhs != rhs),
            Less => i64::from(lhs < rhs),
            Greater => i64::from(lhs > rhs),
            LessEqual => i64::from(lhs <= rhs),
            GreaterEqual => i64::from(lhs >= rhs),
            LessLess => lhs.wrapping_shl(rhs as u32 & 63),
            GreaterGreater => lhs.wrapping_shr(rhs as u32 & 63),
            Plus => lhs.wrapping_add(rhs),
            Minus => lhs.wrapping_sub(rhs),
            Star => lhs.wrapping_mul(rhs),
            Slash => {
                if rhs == 0 {
                    return Err(self.bad("division by zero"));
                }
                lhs.wrapping_div(rhs)
            }
            Percent => {
                if rhs == 0 {
                    return Err(self.bad("remainder by zero"));
                }
                lhs.wrapping_rem(rhs)
            }
            _ => return Err(self.bad("unexpected operator")),
        })
    }
}

fn binary_prec(op: TokenKind) -> Option<u8> {
    use TokenKind::*;
    Some(match op {
        PipePipe => 1,
        AmpAmp => 2,
        Pipe => 3,
        Caret => 4,
        Amp => 5,
        EqualEqual | ExclaimEqual => 6,
        Less | Greater | LessEqual | GreaterEqual => 7,
        LessLess | GreaterGreater => 8,
        Plus | Minus => 9,
        Star | Slash | Percent => 10,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::{char_value, parse_int};

    #[test]
    fn integer_literals() {
        assert_eq!(parse_int("0"), Some(0));
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("0x2a"), Some(42));
        assert_eq!(parse_int("052"), Some(42));
        assert_eq!(parse_int("42ul"), Some(42));
        assert_eq!(parse_int("1UL"), Some(1));
        assert_eq!(parse_int("abc"), None);
    }

    #[test]
    fn char_constants() {
        assert_eq!(char_value("'a'"), 97);
        assert_eq!(char_value("'\\n'"), 10);
        assert_eq!(char_value("'\\0'"), 0);
        assert_eq!(char_value("'\\x41'"), 65);
    }
}
