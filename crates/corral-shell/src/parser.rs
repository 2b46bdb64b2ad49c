//! Recursive-descent parser producing a [`Script`].

use crate::ast::{
    AndOr, Assignment, Command, Connector, Pipeline, Redirect, RedirectTarget, Script,
    SimpleCommand, Word, WordPart,
};
use crate::error::ParseError;
use crate::lexer::{RedirectOp, Spanned, Token, is_name_char, is_name_start, tokenize};

/// Words that introduce compound commands this engine does not implement.
const RESERVED_WORDS: &[&str] = &[
    "if", "then", "else", "elif", "fi", "do", "done", "case", "esac", "while", "until", "for",
    "select", "function", "[[", "]]",
];

/// Parses script text.
///
/// # Errors
///
/// Returns a [`ParseError`] describing the first malformed or unsupported
/// construct.
pub fn parse(source: &str) -> Result<Script, ParseError> {
    let tokens = tokenize(source)?;
    let end = tokens.last().cloned().unwrap_or(Spanned {
        token: Token::Eof,
        line: 1,
        column: 1,
    });
    let mut parser = Parser {
        tokens,
        pos: 0,
        end,
    };
    let script = parser.list(ListEnd::Eof)?;
    match parser.peek() {
        Token::Eof => Ok(script),
        _ => Err(parser.unexpected()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListEnd {
    Eof,
    Paren,
    Brace,
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// The closing `Eof`, returned once `pos` runs past the tokens.
    end: Spanned,
}

impl Parser {
    fn current(&self) -> &Spanned {
        self.tokens.get(self.pos).unwrap_or(&self.end)
    }

    fn peek(&self) -> &Token {
        &self.current().token
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn unexpected(&self) -> ParseError {
        let current = self.current();
        ParseError::unexpected(current.token.describe(), current.line, current.column)
    }

    fn peek_literal(&self) -> Option<&str> {
        match self.peek() {
            Token::Word(word) => word.as_literal(),
            _ => None,
        }
    }

    fn skip_newlines(&mut self) {
        while *self.peek() == Token::Newline {
            self.bump();
        }
    }

    fn at_list_end(&self, end: ListEnd) -> bool {
        match self.peek() {
            Token::Eof => true,
            Token::RParen => end == ListEnd::Paren,
            _ => end == ListEnd::Brace && self.peek_literal() == Some("}"),
        }
    }

    fn list(&mut self, end: ListEnd) -> Result<Script, ParseError> {
        let mut items = Vec::new();
        loop {
            self.skip_newlines();
            if self.at_list_end(end) {
                break;
            }
            items.push(self.and_or()?);
            match self.peek() {
                Token::Semi | Token::Newline => {
                    self.bump();
                }
                _ if self.at_list_end(end) => break,
                _ => return Err(self.unexpected()),
            }
        }
        Ok(Script { items })
    }

    fn and_or(&mut self) -> Result<AndOr, ParseError> {
        let first = self.pipeline()?;
        let mut rest = Vec::new();
        loop {
            let connector = match self.peek() {
                Token::AndIf => Connector::And,
                Token::OrIf => Connector::Or,
                _ => break,
            };
            self.bump();
            self.skip_newlines();
            rest.push((connector, self.pipeline()?));
        }
        Ok(AndOr { first, rest })
    }

    fn pipeline(&mut self) -> Result<Pipeline, ParseError> {
        let negated = self.peek_literal() == Some("!");
        if negated {
            self.bump();
        }
        let mut commands = vec![self.command()?];
        while *self.peek() == Token::Pipe {
            self.bump();
            self.skip_newlines();
            commands.push(self.command()?);
        }
        Ok(Pipeline { negated, commands })
    }

    fn command(&mut self) -> Result<Command, ParseError> {
        if *self.peek() == Token::LParen {
            self.bump();
            let body = self.compound_body(ListEnd::Paren)?;
            if *self.peek() != Token::RParen {
                return Err(self.expected_closer("`)`"));
            }
            self.bump();
            let redirects = self.trailing_redirects()?;
            return Ok(Command::Subshell { body, redirects });
        }
        match self.peek_literal() {
            Some("{") => {
                self.bump();
                let body = self.compound_body(ListEnd::Brace)?;
                if self.peek_literal() != Some("}") {
                    return Err(self.expected_closer("`}`"));
                }
                self.bump();
                let redirects = self.trailing_redirects()?;
                Ok(Command::Group { body, redirects })
            }
            Some(word) if RESERVED_WORDS.contains(&word) => {
                let current = self.current();
                Err(ParseError::unsupported(
                    format!("`{word}`"),
                    current.line,
                    current.column,
                ))
            }
            _ => self.simple().map(Command::Simple),
        }
    }

    fn compound_body(&mut self, end: ListEnd) -> Result<Script, ParseError> {
        let body = self.list(end)?;
        if body.is_empty() && *self.peek() != Token::Eof {
            return Err(self.unexpected());
        }
        Ok(body)
    }

    fn expected_closer(&self, expected: &'static str) -> ParseError {
        match self.peek() {
            Token::Eof => ParseError::UnexpectedEnd { expected },
            _ => self.unexpected(),
        }
    }

    fn simple(&mut self) -> Result<SimpleCommand, ParseError> {
        let mut command = SimpleCommand::default();
        loop {
            match self.peek() {
                Token::Word(word) => {
                    let word = word.clone();
                    self.bump();
                    match split_assignment(&word) {
                        Some(assignment) if command.words.is_empty() => {
                            command.assignments.push(assignment);
                        }
                        _ => command.words.push(word),
                    }
                }
                Token::Redirect { .. } => {
                    let redirect = self.redirect()?;
                    command.redirects.push(redirect);
                }
                _ => break,
            }
        }
        if command.assignments.is_empty() && command.words.is_empty() && command.redirects.is_empty()
        {
            return Err(match self.peek() {
                Token::Eof => ParseError::UnexpectedEnd {
                    expected: "a command",
                },
                _ => self.unexpected(),
            });
        }
        Ok(command)
    }

    fn trailing_redirects(&mut self) -> Result<Vec<Redirect>, ParseError> {
        let mut redirects = Vec::new();
        while matches!(self.peek(), Token::Redirect { .. }) {
            redirects.push(self.redirect()?);
        }
        Ok(redirects)
    }

    fn redirect(&mut self) -> Result<Redirect, ParseError> {
        let Token::Redirect { fd, op } = self.bump() else {
            return Err(self.unexpected());
        };
        let target_token = self.current().clone();
        let Token::Word(word) = target_token.token else {
            return Err(match target_token.token {
                Token::Eof => ParseError::UnexpectedEnd {
                    expected: "a redirection target",
                },
                _ => self.unexpected(),
            });
        };
        self.bump();
        let fd = fd.unwrap_or(match op {
            RedirectOp::Read => 0,
            _ => 1,
        });
        let target = match op {
            RedirectOp::Read => RedirectTarget::Read(word),
            RedirectOp::Write => RedirectTarget::Write(word),
            RedirectOp::Append => RedirectTarget::Append(word),
            RedirectOp::Duplicate => match word.as_literal() {
                Some("1") => RedirectTarget::Duplicate(1),
                Some("2") => RedirectTarget::Duplicate(2),
                _ => {
                    return Err(ParseError::unsupported(
                        "duplication target",
                        target_token.line,
                        target_token.column,
                    ));
                }
            },
        };
        Ok(Redirect { fd, target })
    }
}

fn split_assignment(word: &Word) -> Option<Assignment> {
    let Some(WordPart::Literal(head)) = word.parts.first() else {
        return None;
    };
    let (name, rest) = head.split_once('=')?;
    let mut chars = name.chars();
    if !chars.next().is_some_and(is_name_start) || !chars.all(is_name_char) {
        return None;
    }
    let mut parts = Vec::new();
    if !rest.is_empty() {
        parts.push(WordPart::Literal(rest.to_owned()));
    }
    parts.extend(word.parts.iter().skip(1).cloned());
    Some(Assignment {
        name: name.to_owned(),
        value: Word { parts },
    })
}
