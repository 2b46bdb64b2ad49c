//! Tokeniser for the supported shell subset.

use crate::ast::{Param, Word, WordPart};
use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Word(Word),
    Semi,
    Newline,
    AndIf,
    OrIf,
    Pipe,
    LParen,
    RParen,
    Redirect { fd: Option<u8>, op: RedirectOp },
    Eof,
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Word(word) => word
                .as_literal()
                .map_or_else(|| "word".to_owned(), |text| format!("word `{text}`")),
            Self::Semi => "`;`".to_owned(),
            Self::Newline => "newline".to_owned(),
            Self::AndIf => "`&&`".to_owned(),
            Self::OrIf => "`||`".to_owned(),
            Self::Pipe => "`|`".to_owned(),
            Self::LParen => "`(`".to_owned(),
            Self::RParen => "`)`".to_owned(),
            Self::Redirect { .. } => "redirection".to_owned(),
            Self::Eof => "end of script".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RedirectOp {
    Read,
    Write,
    Append,
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Spanned {
    pub(crate) token: Token,
    pub(crate) line: usize,
    pub(crate) column: usize,
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let spanned = lexer.next_token()?;
        let done = spanned.token == Token::Eof;
        tokens.push(spanned);
        if done {
            return Ok(tokens);
        }
    }
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let current = self.peek()?;
        self.pos += 1;
        if current == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(current)
    }

    fn unsupported(&self, construct: &str) -> ParseError {
        ParseError::unsupported(construct, self.line, self.column)
    }

    fn skip_blanks(&mut self) {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(' ' | '\t' | '\r'), _) => {
                    self.bump();
                }
                (Some('\\'), Some('\n')) => {
                    self.bump();
                    self.bump();
                }
                (Some('#'), _) => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                _ => return,
            }
        }
    }

    fn next_token(&mut self) -> Result<Spanned, ParseError> {
        self.skip_blanks();
        let (line, column) = (self.line, self.column);
        let token = match self.peek() {
            None => Token::Eof,
            Some('\n') => {
                self.bump();
                Token::Newline
            }
            Some(';') => {
                self.bump();
                if self.peek() == Some(';') {
                    return Err(ParseError::unexpected("`;;`", line, column));
                }
                Token::Semi
            }
            Some('&') => {
                self.bump();
                if self.peek() != Some('&') {
                    return Err(ParseError::unsupported("background job `&`", line, column));
                }
                self.bump();
                Token::AndIf
            }
            Some('|') => {
                self.bump();
                if self.peek() == Some('|') {
                    self.bump();
                    Token::OrIf
                } else {
                    Token::Pipe
                }
            }
            Some('(') => {
                self.bump();
                Token::LParen
            }
            Some(')') => {
                self.bump();
                Token::RParen
            }
            Some('<' | '>') => self.redirect(None)?,
            Some(c) if c.is_ascii_digit() && self.io_number_follows() => {
                let fd = self.io_number()?;
                self.redirect(Some(fd))?
            }
            Some(_) => Token::Word(self.word()?),
        };
        Ok(Spanned {
            token,
            line,
            column,
        })
    }

    fn io_number_follows(&self) -> bool {
        let mut offset = 0;
        while self.peek_at(offset).is_some_and(|c| c.is_ascii_digit()) {
            offset += 1;
        }
        matches!(self.peek_at(offset), Some('<' | '>'))
    }

    fn io_number(&mut self) -> Result<u8, ParseError> {
        let (line, column) = (self.line, self.column);
        let mut digits = String::new();
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            self.bump();
            digits.push(c);
        }
        match digits.parse::<u8>() {
            Ok(fd) if fd <= 2 => Ok(fd),
            _ => Err(ParseError::unsupported(
                format!("file descriptor {digits}"),
                line,
                column,
            )),
        }
    }

    fn redirect(&mut self, fd: Option<u8>) -> Result<Token, ParseError> {
        let op = match self.bump() {
            Some('<') => match self.peek() {
                Some('<') => return Err(self.unsupported("here-document")),
                Some('&') => return Err(self.unsupported("input duplication `<&`")),
                _ => RedirectOp::Read,
            },
            _ => match self.peek() {
                Some('>') => {
                    self.bump();
                    RedirectOp::Append
                }
                Some('&') => {
                    self.bump();
                    RedirectOp::Duplicate
                }
                Some('|') => {
                    self.bump();
                    RedirectOp::Write
                }
                _ => RedirectOp::Write,
            },
        };
        Ok(Token::Redirect { fd, op })
    }

    fn word(&mut self) -> Result<Word, ParseError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' | '\n' | ';' | '&' | '|' | '(' | ')' | '<' | '>' => break,
                '\\' => {
                    self.bump();
                    match self.bump() {
                        None => literal.push('\\'),
                        Some('\n') => {}
                        Some(escaped) => {
                            flush(&mut literal, &mut parts);
                            parts.push(WordPart::Quoted(escaped.to_string()));
                        }
                    }
                }
                '\'' => {
                    flush(&mut literal, &mut parts);
                    let text = self.single_quoted()?;
                    parts.push(WordPart::Quoted(text));
                }
                '"' => {
                    flush(&mut literal, &mut parts);
                    let inner = self.quoted_body(true)?;
                    parts.push(WordPart::DoubleQuoted(inner));
                }
                '$' => match self.dollar()? {
                    Some(param) => {
                        flush(&mut literal, &mut parts);
                        parts.push(WordPart::Param(param));
                    }
                    None => literal.push('$'),
                },
                '`' => return Err(self.unsupported("command substitution")),
                _ => {
                    self.bump();
                    literal.push(c);
                }
            }
        }
        flush(&mut literal, &mut parts);
        Ok(Word { parts })
    }

    fn single_quoted(&mut self) -> Result<String, ParseError> {
        let (line, column) = (self.line, self.column);
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('\'') => return Ok(text),
                Some(c) => text.push(c),
                None => {
                    return Err(ParseError::UnterminatedQuote {
                        quote: "single",
                        line,
                        column,
                    });
                }
            }
        }
    }

    /// Lexes double-quoted content. When `delimited` is false the body runs
    /// to the end of input, which is how `${NAME:-...}` fallbacks are read.
    fn quoted_body(&mut self, delimited: bool) -> Result<Vec<WordPart>, ParseError> {
        let (line, column) = (self.line, self.column);
        let unterminated = ParseError::UnterminatedQuote {
            quote: "double",
            line,
            column,
        };
        if delimited {
            self.bump();
        }
        let mut parts = Vec::new();
        let mut literal = String::new();
        loop {
            match self.peek() {
                None if delimited => return Err(unterminated),
                None => break,
                Some('"') if delimited => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    match self.bump() {
                        Some(c @ ('$' | '`' | '"' | '\\')) => literal.push(c),
                        Some('\n') => {}
                        Some(other) => {
                            literal.push('\\');
                            literal.push(other);
                        }
                        None if delimited => return Err(unterminated),
                        None => literal.push('\\'),
                    }
                }
                Some('$') => match self.dollar()? {
                    Some(param) => {
                        flush(&mut literal, &mut parts);
                        parts.push(WordPart::Param(param));
                    }
                    None => literal.push('$'),
                },
                Some('`') => return Err(self.unsupported("command substitution")),
                Some(c) => {
                    self.bump();
                    literal.push(c);
                }
            }
        }
        flush(&mut literal, &mut parts);
        Ok(parts)
    }

    /// Lexes a `$` expansion. Returns `None` (having consumed the `$`) when
    /// the dollar sign is literal.
    fn dollar(&mut self) -> Result<Option<Param>, ParseError> {
        match self.peek_at(1) {
            Some('{') => self.braced_param().map(Some),
            Some('(') => Err(self.unsupported("command substitution")),
            Some('?') => {
                self.bump();
                self.bump();
                Ok(Some(Param {
                    name: "?".to_owned(),
                    fallback: None,
                }))
            }
            Some(c) if c.is_ascii_digit() => {
                self.bump();
                self.bump();
                Ok(Some(Param {
                    name: c.to_string(),
                    fallback: None,
                }))
            }
            Some(c) if is_name_start(c) => {
                self.bump();
                Ok(Some(Param {
                    name: self.name(),
                    fallback: None,
                }))
            }
            _ => {
                self.bump();
                Ok(None)
            }
        }
    }

    fn name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek().filter(|c| is_name_char(*c)) {
            self.bump();
            name.push(c);
        }
        name
    }

    fn braced_param(&mut self) -> Result<Param, ParseError> {
        let (line, column) = (self.line, self.column);
        self.bump();
        self.bump();
        let name = if self.peek() == Some('?') {
            self.bump();
            "?".to_owned()
        } else {
            self.name()
        };
        if name.is_empty() {
            return Err(self.unsupported("parameter operator"));
        }
        match (self.peek(), self.peek_at(1)) {
            (Some('}'), _) => {
                self.bump();
                Ok(Param {
                    name,
                    fallback: None,
                })
            }
            (Some(':'), Some('-')) => {
                self.bump();
                self.bump();
                let mut raw = String::new();
                loop {
                    match self.bump() {
                        Some('}') => break,
                        Some(c) => raw.push(c),
                        None => return Err(ParseError::UnterminatedExpansion { line, column }),
                    }
                }
                let parts = Self::new(&raw).quoted_body(false)?;
                Ok(Param {
                    name,
                    fallback: Some(Word {
                        parts: vec![WordPart::DoubleQuoted(parts)],
                    }),
                })
            }
            (None, _) => Err(ParseError::UnterminatedExpansion { line, column }),
            _ => Err(self.unsupported("parameter operator")),
        }
    }
}

fn flush(literal: &mut String, parts: &mut Vec<WordPart>) {
    if !literal.is_empty() {
        parts.push(WordPart::Literal(std::mem::take(literal)));
    }
}

pub(crate) fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub(crate) fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
