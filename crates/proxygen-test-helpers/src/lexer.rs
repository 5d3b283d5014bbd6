//! Tokenizer for the method-body language, with automatic semicolons.

use crate::parser::ParseError;
use proxygen_core::ast::Span;

const KEYWORDS: &[&str] = &[
    "break", "case", "const", "continue", "default", "else", "for", "func", "if", "map",
    "range", "return", "struct", "switch", "type", "var",
];

// Longest first, so that `<<=` wins over `<<` and `<`.
const PUNCTUATION: &[&str] = &[
    "<<=", ">>=", "&^=", "...", ":=", "==", "!=", "<=", ">=", "&&", "||", "<<", ">>", "&^", "++",
    "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "+", "-", "*", "/", "%", "&", "|",
    "^", "<", ">", "=", "!", "(", ")", "[", "]", "{", "}", ",", ";", ".", ":", "~",
];

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Keyword(&'static str),
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    /// Whether a newline after this token ends the statement.
    fn ends_statement(&self) -> bool {
        match &self.kind {
            TokenKind::Ident(_) | TokenKind::Int(_) | TokenKind::Float(_) | TokenKind::Str(_) => {
                true
            }
            TokenKind::Keyword(kw) => matches!(*kw, "break" | "continue" | "return"),
            TokenKind::Punct(p) => matches!(*p, ")" | "]" | "}" | "++" | "--"),
            TokenKind::Eof => false,
        }
    }
}

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens: Vec<Token> = Vec::new();
        loop {
            let newline = self.skip_trivia();
            if newline && tokens.last().is_some_and(Token::ends_statement) {
                let span = tokens.last().map(|t| t.span).unwrap_or_default();
                tokens.push(Token {
                    kind: TokenKind::Punct(";"),
                    span,
                });
            }
            let span = Span::new(self.line, self.column);
            let Some(c) = self.peek() else {
                if tokens.last().is_some_and(Token::ends_statement) {
                    tokens.push(Token {
                        kind: TokenKind::Punct(";"),
                        span,
                    });
                }
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    span,
                });
                return Ok(tokens);
            };

            let kind = if c.is_alphabetic() || c == '_' {
                let word = self.take_while(|c| c.is_alphanumeric() || c == '_');
                match KEYWORDS.iter().find(|kw| **kw == word) {
                    Some(kw) => TokenKind::Keyword(*kw),
                    None => TokenKind::Ident(word),
                }
            } else if c.is_ascii_digit() {
                self.number(span)?
            } else if c == '"' {
                self.string(span)?
            } else {
                self.punctuation(span)?
            };
            tokens.push(Token { kind, span });
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek().filter(|c| pred(*c)) {
            out.push(c);
            self.bump();
        }
        out
    }

    /// Skips whitespace and comments; returns true if a newline was crossed.
    fn skip_trivia(&mut self) -> bool {
        let mut newline = false;
        loop {
            match self.peek() {
                Some('\n') => {
                    newline = true;
                    self.bump();
                }
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    self.bump();
                    self.bump();
                    while self.peek().is_some()
                        && !(self.peek() == Some('*') && self.peek_at(1) == Some('/'))
                    {
                        if self.bump() == Some('\n') {
                            newline = true;
                        }
                    }
                    self.bump();
                    self.bump();
                }
                _ => return newline,
            }
        }
    }

    fn number(&mut self, span: Span) -> Result<TokenKind, ParseError> {
        let mut text = self.take_while(|c| c.is_ascii_digit() || c == '_');
        let is_float =
            self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit());
        if is_float {
            self.bump();
            text.push('.');
            text.push_str(&self.take_while(|c| c.is_ascii_digit()));
            return text
                .parse()
                .map(TokenKind::Float)
                .map_err(|_| ParseError::new(span, format!("invalid float literal `{}`", text)));
        }
        text.replace('_', "")
            .parse()
            .map(TokenKind::Int)
            .map_err(|_| ParseError::new(span, format!("invalid integer literal `{}`", text)))
    }

    fn string(&mut self, span: Span) -> Result<TokenKind, ParseError> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(TokenKind::Str(value)),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(c) => value.push(c),
                    None => break,
                },
                Some('\n') | None => break,
                Some(c) => value.push(c),
            }
        }
        Err(ParseError::new(span, "unterminated string literal"))
    }

    fn punctuation(&mut self, span: Span) -> Result<TokenKind, ParseError> {
        let rest: String = self.chars[self.pos..].iter().take(3).collect();
        let Some(punct) = PUNCTUATION.iter().find(|p| rest.starts_with(**p)) else {
            return Err(ParseError::new(
                span,
                format!("unexpected character `{}`", rest.chars().next().unwrap_or(' ')),
            ));
        };
        for _ in 0..punct.len() {
            self.bump();
        }
        Ok(TokenKind::Punct(*punct))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_semicolons_are_inserted_at_line_ends() {
        let tokens = kinds("x := 1\nx++\n");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Ident("x".into()),
                TokenKind::Punct(":="),
                TokenKind::Int(1),
                TokenKind::Punct(";"),
                TokenKind::Ident("x".into()),
                TokenKind::Punct("++"),
                TokenKind::Punct(";"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_no_semicolon_after_open_brace() {
        let tokens = kinds("if x {\n}");
        assert!(!tokens[..3].contains(&TokenKind::Punct(";")));
    }

    #[test]
    fn test_longest_punctuation_wins() {
        assert_eq!(kinds("a <<= 2")[1], TokenKind::Punct("<<="));
        assert_eq!(kinds("a &^ b")[1], TokenKind::Punct("&^"));
    }

    #[test]
    fn test_literals_and_comments() {
        let tokens = kinds("// note\n\"a\\\"b\" 2.5 // trailing\n");
        assert_eq!(tokens[0], TokenKind::Str("a\"b".into()));
        assert_eq!(tokens[1], TokenKind::Float(2.5));
        assert_eq!(tokens[2], TokenKind::Punct(";"));
    }
}
