use crate::{ast::Literal, errors::{self, source_location}, FoxError};

use super::{Token, TokenKind};

#[derive(Debug)]
pub struct Scanner<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    line: usize,
    line_start: usize,
    has_err: bool,
}

#[allow(clippy::while_let_on_iterator)]
impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            line_start: 0,
            has_err: false,
        }
    }

    pub fn has_error(&self) -> bool {
        self.has_err
    }

    fn column(&self, offset: usize) -> usize {
        offset.saturating_sub(self.line_start) + 1
    }

    fn newline(&mut self, offset: usize) {
        self.line += 1;
        self.line_start = offset + 1;
    }

    fn match_char(&mut self, next: char) -> bool {
        if let Some((_, c)) = self.chars.peek() {
            if *c == next {
                self.chars.next();
                return true
            }
        }

        false
    }

    fn advance_while_fn<F: Fn(char) -> bool>(&mut self, f: F) -> usize {
        let mut end = None;
        while let Some((loc, c)) = self.chars.peek() {
            if !f(*c) {
                break;
            }

            end = Some(*loc + c.len_utf8());
            self.chars.next();
        }

        end.unwrap_or_default()
    }

    fn token(&self, kind: TokenKind, start: usize, end: usize) -> Token {
        Token::new(kind, &self.source[start..end], self.line, self.column(start))
    }

    fn read_token(&mut self) -> Option<Result<Token, FoxError>> {
        while let Some((loc, char)) = self.chars.next() {
            macro_rules! single {
                ($kind:ident) => {
                    return Some(Ok(self.token(TokenKind::$kind, loc, loc + 1)))
                };
            }

            match char {
                ' ' | '\r' | '\t' => continue,
                '\n' => self.newline(loc),
                '(' => single!(LeftParen),
                ')' => single!(RightParen),
                '{' => single!(LeftBrace),
                '}' => single!(RightBrace),
                '[' => single!(LeftBracket),
                ']' => single!(RightBracket),
                ',' => single!(Comma),
                ':' => single!(Colon),
                '?' => single!(QuestionMark),
                '+' => single!(Plus),
                '*' => single!(Star),
                '|' => single!(Pipe),

                '-' if self.match_char('>') => return Some(Ok(self.token(TokenKind::Arrow, loc, loc + 2))),
                '-' => single!(Minus),
                '!' if self.match_char('=') => return Some(Ok(self.token(TokenKind::BangEqual, loc, loc + 2))),
                '!' => single!(Bang),
                '=' if self.match_char('=') => return Some(Ok(self.token(TokenKind::EqualEqual, loc, loc + 2))),
                '=' if self.match_char('>') => return Some(Ok(self.token(TokenKind::FatArrow, loc, loc + 2))),
                '=' => single!(Equal),
                '>' if self.match_char('=') => return Some(Ok(self.token(TokenKind::GreaterEqual, loc, loc + 2))),
                '>' => single!(Greater),
                '<' if self.match_char('=') => return Some(Ok(self.token(TokenKind::LessEqual, loc, loc + 2))),
                '<' => single!(Less),

                '/' if self.match_char('/') => {
                    while let Some((offset, c)) = self.chars.next() {
                        if c == '\n' {
                            self.newline(offset);
                            break;
                        }
                    }
                },
                '/' if self.match_char('*') => {
                    let mut depth = 1;
                    while let Some((offset, c)) = self.chars.next() {
                        match c {
                            '\n' => self.newline(offset),
                            '/' if self.match_char('*') => {
                                depth += 1;
                            },
                            '*' if self.match_char('/') => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            },
                            _ => {}
                        }
                    }
                },
                '/' => single!(Slash),

                '"' => return Some(self.read_string(loc)),

                c if c.is_ascii_digit() => return Some(self.read_number(loc)),
                c if c.is_ascii_alphabetic() || c == '_' => return Some(Ok(self.read_identifier(loc))),

                c => {
                    self.has_err = true;
                    return Some(Err(errors::syntax_at(
                        source_location(c.to_string(), self.line, self.column(loc)),
                        format!("We found an unexpected character '{}' where we were expecting one of: [whitespace, bracket, brace, operator, identifier, number, string, comment]", c),
                        "Make sure you have entered valid fox code and have not accidentally closed a string.",
                    )))
                }
            }
        }

        None
    }

    fn read_string(&mut self, start: usize) -> Result<Token, FoxError> {
        let line = self.line;
        let column = self.column(start);

        while let Some((loc, c)) = self.chars.next() {
            match c {
                '\n' => self.newline(loc),
                '"' => {
                    let text = &self.source[start + 1..loc];
                    return Ok(Token::new(TokenKind::String, &self.source[start..loc + 1], line, column)
                        .with_literal(Literal::String(text.to_string())));
                },
                _ => {}
            }
        }

        self.has_err = true;
        let sample: String = self.source[start..].chars().take(20).collect();
        Err(errors::syntax_at(
            source_location(sample, line, column),
            "Reached the end of the file without finding the closing quote for a string.",
            "Make sure that you have terminated your string with a '\"' character.",
        ))
    }

    fn read_number(&mut self, start: usize) -> Result<Token, FoxError> {
        let mut end = self.advance_while_fn(|c| c.is_ascii_digit()).max(start + 1);

        if let Some((loc, '.')) = self.chars.peek().copied() {
            let fraction_follows = self.source[loc + 1..].chars().next().map(|c| c.is_ascii_digit()).unwrap_or_default();
            if fraction_follows {
                self.chars.next();
                end = self.advance_while_fn(|c| c.is_ascii_digit());
            }
        }

        let lexeme = &self.source[start..end];
        match lexeme.parse::<f64>() {
            Ok(value) => Ok(self.token(TokenKind::Number, start, end).with_literal(Literal::Number(value))),
            Err(_) => {
                self.has_err = true;
                Err(errors::syntax_at(
                    source_location(lexeme.to_string(), self.line, self.column(start)),
                    format!("Unable to parse number '{}'.", lexeme),
                    "Make sure you have provided a valid number within the bounds of a 64-bit floating point number.",
                ))
            }
        }
    }

    fn read_identifier(&mut self, start: usize) -> Token {
        let end = self.advance_while_fn(|c| c.is_ascii_alphanumeric() || c == '_').max(start + 1);
        let lexeme = &self.source[start..end];

        let kind = match lexeme {
            "_" => TokenKind::Underscore,
            "and" => TokenKind::And,
            "assign" => TokenKind::Assign,
            "break" => TokenKind::Break,
            "defun" => TokenKind::Defun,
            "false" => TokenKind::False,
            "import" => TokenKind::Import,
            "match" => TokenKind::Match,
            "null" => TokenKind::Null,
            "or" => TokenKind::Or,
            "true" => TokenKind::True,
            "var" => TokenKind::Var,
            "while" => TokenKind::While,
            _ => TokenKind::Identifier,
        };

        self.token(kind, start, end)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token, FoxError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_token()
    }
}
