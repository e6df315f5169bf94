//! Hand-written scanner turning source text into tokens.
//!
//! The scanner never stops at the first problem: a lexical error is
//! recorded, the offending character is skipped, and scanning continues so
//! later errors still surface in the same run.

use std::str::FromStr;

use crate::{
    error::{CodeLoc, CompileError},
    token::{Keyword, Token, TokenKind},
};

/// Characters that may form operator runs. `=` alone and `->` are split
/// off into their own token kinds after the run is collected.
const OPERATOR_CHARS: &str = "+-*/%<>=!&|^~";

pub(crate) fn lex(source: &str) -> (Vec<Token>, Vec<CompileError>) {
    let mut lexer = Lexer::new(source);
    lexer.run();
    (lexer.tokens, lexer.errors)
}

struct Lexer<'s> {
    rest: &'s str,
    line: u32,
    column: u32,
    tokens: Vec<Token>,
    errors: Vec<CompileError>,
}

impl<'s> Lexer<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            rest: source,
            line: 1,
            column: 1,
            tokens: vec![],
            errors: vec![],
        }
    }

    fn loc(&self) -> CodeLoc {
        CodeLoc::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn peek2(&self) -> Option<char> {
        self.rest.chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.rest.chars().next()?;
        self.rest = &self.rest[c.len_utf8()..];
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&mut self, message: impl Into<String>, loc: CodeLoc) {
        self.errors.push(CompileError::new(message, loc));
    }

    fn push(&mut self, kind: TokenKind, loc: CodeLoc) {
        self.tokens.push(Token::new(kind, loc));
    }

    fn run(&mut self) {
        while let Some(c) = self.peek() {
            let loc = self.loc();
            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    self.bump();
                }
                '/' if self.peek2() == Some('/') => self.skip_line_comment(),
                '/' if self.peek2() == Some('*') => self.skip_block_comment(),
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                '[' => self.single(TokenKind::LBracket),
                ']' => self.single(TokenKind::RBracket),
                '{' => self.single(TokenKind::LBrace),
                '}' => self.single(TokenKind::RBrace),
                ',' => self.single(TokenKind::Comma),
                ':' => self.single(TokenKind::Colon),
                ';' => self.single(TokenKind::Semicolon),
                '.' => self.single(TokenKind::Dot),
                '"' => self.string(loc),
                c if c.is_ascii_digit() => self.number(loc),
                c if c.is_alphabetic() || c == '_' => self.ident(loc),
                c if OPERATOR_CHARS.contains(c) => self.operator(loc),
                c => {
                    self.bump();
                    self.error(format!("unexpected character '{c}'"), loc);
                }
            }
        }
        let loc = self.loc();
        self.push(TokenKind::Eof, loc);
    }

    fn single(&mut self, kind: TokenKind) {
        let loc = self.loc();
        self.bump();
        self.push(kind, loc);
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) {
        let loc = self.loc();
        self.bump();
        self.bump();
        loop {
            match self.bump() {
                Some('*') if self.peek() == Some('/') => {
                    self.bump();
                    return;
                }
                Some(_) => {}
                None => {
                    self.error("unterminated block comment", loc);
                    return;
                }
            }
        }
    }

    fn string(&mut self, loc: CodeLoc) {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => break,
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('"') => value.push('"'),
                    Some('\\') => value.push('\\'),
                    Some(other) => {
                        let at = self.loc();
                        self.error(format!("unknown escape sequence '\\{other}'"), at);
                    }
                    None => {
                        self.error("unterminated string literal", loc);
                        break;
                    }
                },
                Some('\n') | None => {
                    self.error("unterminated string literal", loc);
                    break;
                }
                Some(c) => value.push(c),
            }
        }
        self.push(TokenKind::Str(value), loc);
    }

    fn number(&mut self, loc: CodeLoc) {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        // A '.' continues the number only when a digit follows, so member
        // access on integer literals (`5.toString()`) still lexes as
        // Int, Dot, Ident.
        let is_float = self.peek() == Some('.') && self.peek2().is_some_and(|c| c.is_ascii_digit());
        if is_float {
            text.push('.');
            self.bump();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() || c == '_' {
                    text.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
        }
        let digits: String = text.chars().filter(|c| *c != '_').collect();
        if is_float {
            match digits.parse::<f64>() {
                Ok(v) => self.push(TokenKind::Float(v), loc),
                Err(_) => self.error(format!("malformed float literal '{text}'"), loc),
            }
        } else {
            match digits.parse::<i64>() {
                Ok(v) => self.push(TokenKind::Int(v), loc),
                Err(_) => self.error(format!("integer literal '{text}' out of range"), loc),
            }
        }
    }

    fn ident(&mut self, loc: CodeLoc) {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        match Keyword::from_str(&name) {
            Ok(kw) => self.push(TokenKind::Keyword(kw), loc),
            Err(_) => self.push(TokenKind::Ident(name), loc),
        }
    }

    fn operator(&mut self, loc: CodeLoc) {
        let mut op = String::new();
        while let Some(c) = self.peek() {
            if OPERATOR_CHARS.contains(c) {
                op.push(c);
                self.bump();
            } else {
                break;
            }
        }
        match op.as_str() {
            "=" => self.push(TokenKind::Assign, loc),
            "->" => self.push(TokenKind::Arrow, loc),
            _ => self.push(TokenKind::Op(op), loc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, errors) = lex(source);
        assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn numbers_idents_and_keywords() {
        assert_eq!(
            kinds("mut a = 12 b2 3.5"),
            vec![
                TokenKind::Keyword(Keyword::Mut),
                TokenKind::Ident("a".to_owned()),
                TokenKind::Assign,
                TokenKind::Int(12),
                TokenKind::Ident("b2".to_owned()),
                TokenKind::Float(3.5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn int_dot_member_does_not_lex_as_float() {
        assert_eq!(
            kinds("5.toString"),
            vec![
                TokenKind::Int(5),
                TokenKind::Dot,
                TokenKind::Ident("toString".to_owned()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn operator_runs_are_maximal() {
        assert_eq!(
            kinds("a ++ b == c"),
            vec![
                TokenKind::Ident("a".to_owned()),
                TokenKind::Op("++".to_owned()),
                TokenKind::Ident("b".to_owned()),
                TokenKind::Op("==".to_owned()),
                TokenKind::Ident("c".to_owned()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn arrow_and_assign_split_from_runs() {
        assert_eq!(
            kinds("-> = <="),
            vec![
                TokenKind::Arrow,
                TokenKind::Assign,
                TokenKind::Op("<=".to_owned()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#""a\nb\"c""#),
            vec![TokenKind::Str("a\nb\"c".to_owned()), TokenKind::Eof]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("1 // two\n/* three\nfour */ 5"),
            vec![TokenKind::Int(1), TokenKind::Int(5), TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_string_is_reported() {
        let (_, errors) = lex("\"abc");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("unterminated string"));
    }

    #[test]
    fn locations_are_tracked() {
        let (tokens, _) = lex("a\n  b");
        assert_eq!(tokens[0].loc, CodeLoc::new(1, 1));
        assert_eq!(tokens[1].loc, CodeLoc::new(2, 3));
    }
}
