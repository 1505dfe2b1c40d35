use crate::error::LexError;
use crate::utils::line_and_column;
use miette::NamedSource;
use std::sync::Arc;

/// Represents the different kinds of tokens that the lexer can produce.
/// Each token is a meaningful unit of the template syntax.
#[derive(Debug, PartialEq, Clone)]
pub enum TokenType {
    // == Punctuation ==
    /// Left Brace: `{`
    LBrace,
    /// Right Brace: `}`
    RBrace,
    /// Left Bracket: `[`
    LBracket,
    /// Right Bracket: `]`
    RBracket,
    /// Comma: `,`
    Comma,
    /// Colon: `:`
    Colon,

    // == Literals ==
    /// A bare name referencing caller data. Dots are part of the name, so
    /// `user.address.city` is a single identifier holding the whole path.
    Identifier(String),
    /// A string literal, enclosed in double quotes.
    /// The associated `String` holds the raw content; there are no escapes.
    String(String),
    /// A number literal, an integer or a decimal fraction.
    Number(f64),

    // == Keywords ==
    /// The boolean `true` value.
    True,
    /// The boolean `false` value.
    False,
}

/// A token with its type and byte position in the template.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub ttype: TokenType,
    pub pos_start: usize,
    pub pos_end: usize,
}

impl Token {
    pub fn new(ttype: TokenType, pos_start: usize, pos_end: usize) -> Token {
        Token {
            ttype,
            pos_start,
            pos_end,
        }
    }
}

/// The output of a scan: every token that could be recognized, plus the
/// problems found along the way. Diagnostics never stop the scan.
#[derive(Debug, Clone, Default)]
pub struct Scan {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<LexError>,
}

pub struct Lexer<'a> {
    input: &'a str,
    source: Arc<NamedSource<String>>,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    position: usize,
    scan: Scan,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::new_with_name(input, "template".to_string())
    }

    pub fn new_with_name(input: &'a str, name: String) -> Self {
        Self::with_source(input, Arc::new(NamedSource::new(name, input.to_string())))
    }

    pub(crate) fn with_source(input: &'a str, source: Arc<NamedSource<String>>) -> Self {
        Self {
            input,
            source,
            chars: input.char_indices().peekable(),
            position: 0,
            scan: Scan::default(),
        }
    }

    /// Scans the whole input. Unrecognized characters are reported and
    /// skipped, so this always produces a (possibly empty) token stream.
    pub fn scan(mut self) -> Scan {
        while let Some(c) = self.advance() {
            let start_pos = self.position - c.len_utf8();
            let ttype = match c {
                '{' => Some(TokenType::LBrace),
                '}' => Some(TokenType::RBrace),
                '[' => Some(TokenType::LBracket),
                ']' => Some(TokenType::RBracket),
                ',' => Some(TokenType::Comma),
                ':' => Some(TokenType::Colon),
                ' ' | '\t' | '\r' | '\n' => None,
                '"' => Some(self.read_string(start_pos)),
                c if c.is_ascii_digit() => self.read_number(start_pos),
                c if is_identifier_start(c) => Some(self.read_identifier(start_pos)),
                c => {
                    self.report(LexError::UnrecognizedCharacter {
                        character: c,
                        src: (*self.source).clone(),
                        span: (start_pos, c.len_utf8()).into(),
                    });
                    None
                }
            };

            if let Some(ttype) = ttype {
                self.scan
                    .tokens
                    .push(Token::new(ttype, start_pos, self.position));
            }
        }

        log::debug!(
            "scanned {} tokens with {} diagnostics",
            self.scan.tokens.len(),
            self.scan.diagnostics.len()
        );
        self.scan
    }

    fn advance(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        self.position += c.len_utf8();
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_next(&self) -> Option<char> {
        let mut lookahead = self.chars.clone();
        lookahead.next();
        lookahead.next().map(|(_, c)| c)
    }

    fn report(&mut self, error: LexError) {
        let offset = error.offset();
        let (line, column) = line_and_column(self.input, offset);
        log::warn!("{error} at {line}:{column}");
        self.scan.diagnostics.push(error);
    }

    fn read_string(&mut self, start_pos: usize) -> TokenType {
        let content_start = self.position;
        while let Some(c) = self.advance() {
            if c == '"' {
                let value = &self.input[content_start..self.position - 1];
                return TokenType::String(value.to_string());
            }
        }

        // Keep the partial string so the parser still sees a value here.
        self.report(LexError::UnterminatedString {
            src: (*self.source).clone(),
            span: (start_pos, self.position - start_pos).into(),
        });
        TokenType::String(self.input[content_start..].to_string())
    }

    fn read_number(&mut self, start_pos: usize) -> Option<TokenType> {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        // A dot only belongs to the number when a digit follows it.
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Digits with at most one inner dot always parse, but may overflow to infinity.
        let lexeme = &self.input[start_pos..self.position];
        match lexeme.parse::<f64>() {
            Ok(n) if n.is_finite() => Some(TokenType::Number(n)),
            _ => {
                self.report(LexError::NumberOutOfRange {
                    src: (*self.source).clone(),
                    span: (start_pos, self.position - start_pos).into(),
                });
                None
            }
        }
    }

    fn read_identifier(&mut self, start_pos: usize) -> TokenType {
        while self.peek().is_some_and(is_identifier_continue) {
            self.advance();
        }

        match &self.input[start_pos..self.position] {
            "true" => TokenType::True,
            "false" => TokenType::False,
            ident => TokenType::Identifier(ident.to_string()),
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '.'
}

fn is_identifier_continue(c: char) -> bool {
    is_identifier_start(c) || c.is_ascii_digit()
}
