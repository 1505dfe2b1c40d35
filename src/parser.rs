use crate::ast::*;
use crate::error::{LexError, ParserError, TemplateError};
use crate::lexer::{Lexer, Token, TokenType};
use crate::options::Options;
use miette::NamedSource;
use std::sync::Arc;

/// A recursive descent parser for templates, one token of lookahead and no
/// backtracking. The first structural error aborts the parse.
#[derive(Debug)]
pub struct Parser<'a> {
    source: Arc<NamedSource<String>>,
    tokens: Vec<Token>,
    diagnostics: Vec<LexError>,
    position: usize,
    source_text: &'a str,
    options: Options,
}

impl<'a> Parser<'a> {
    pub fn new(source_text: &'a str) -> Self {
        Self::new_with_name(source_text, "template".to_string())
    }

    /// Scans `source_text` and prepares to parse it. Lexer diagnostics are
    /// kept and available through [`Parser::diagnostics`].
    pub fn new_with_name(source_text: &'a str, name: String) -> Self {
        let source = Arc::new(NamedSource::new(name, source_text.to_string()));
        let scan = Lexer::with_source(source_text, Arc::clone(&source)).scan();

        Self {
            source,
            tokens: scan.tokens,
            diagnostics: scan.diagnostics,
            position: 0,
            source_text,
            options: Options::default(),
        }
    }

    /// Parses an already scanned token stream. `source_text` is the template
    /// the tokens came from and is only used for error reporting.
    pub fn from_tokens(tokens: Vec<Token>, source_text: &'a str, name: String) -> Self {
        Self {
            source: Arc::new(NamedSource::new(name, source_text.to_string())),
            tokens,
            diagnostics: Vec::new(),
            position: 0,
            source_text,
            options: Options::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn diagnostics(&self) -> &[LexError] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<LexError> {
        std::mem::take(&mut self.diagnostics)
    }

    pub(crate) fn source(&self) -> &Arc<NamedSource<String>> {
        &self.source
    }

    // === Main Parsing Methods ===

    /// Template ::= { Object }
    ///
    /// Fields of consecutive top-level objects are concatenated unless
    /// `single_root` is set. Empty input yields no fields.
    pub fn parse_template(&mut self) -> Result<Vec<FieldDeclaration>, TemplateError> {
        // The lexer drops these literals, so the template cannot be rendered faithfully.
        let out_of_range = self.diagnostics.iter().find_map(|diagnostic| match diagnostic {
            LexError::NumberOutOfRange { span, .. } => Some(*span),
            _ => None,
        });
        if let Some(span) = out_of_range {
            return Err(ParserError::NumberOutOfRange {
                src: (*self.source).clone(),
                span,
            }
            .into());
        }

        let mut declarations = Vec::new();
        let mut roots = 0;

        while !self.is_at_end() {
            if !self.check(TokenType::LBrace) {
                return Err(self.err_unexpected("an object").into());
            }
            if roots > 0 && self.options.single_root {
                let token = self.current_token("an object")?;
                return Err(ParserError::MultipleRoots {
                    src: (*self.source).clone(),
                    span: (token.pos_start, token.pos_end - token.pos_start).into(),
                }
                .into());
            }
            let (fields, _) = self.parse_object()?;
            declarations.extend(fields);
            roots += 1;
        }

        log::debug!(
            "parsed {} top-level field declarations from {} object(s)",
            declarations.len(),
            roots
        );
        Ok(declarations)
    }

    /// Object ::= "{" [ FieldDecl { "," FieldDecl } ] "}"
    ///
    /// Returns the fields and the position just past the closing brace.
    fn parse_object(&mut self) -> Result<(Vec<FieldDeclaration>, usize), ParserError> {
        self.expect(TokenType::LBrace, "'{'")?;
        let mut fields = Vec::new();
        if !self.check(TokenType::RBrace) {
            fields.push(self.parse_field_declaration()?);
            // A comma always promises another field; trailing commas are rejected.
            while self.match_token(TokenType::Comma) {
                fields.push(self.parse_field_declaration()?);
            }
        }
        let end_token = self.expect(TokenType::RBrace, "',' or '}'")?;
        Ok((fields, end_token.pos_end))
    }

    /// Array ::= "[" [ Value { "," Value } ] "]"
    fn parse_array(&mut self) -> Result<(Vec<Expr>, usize), ParserError> {
        self.expect(TokenType::LBracket, "'['")?;
        let mut values = Vec::new();
        if !self.check(TokenType::RBracket) {
            values.push(self.parse_value()?);
            while self.match_token(TokenType::Comma) {
                values.push(self.parse_value()?);
            }
        }
        let end_token = self.expect(TokenType::RBracket, "',' or ']'")?;
        Ok((values, end_token.pos_end))
    }

    /// FieldDecl ::= FieldName ":" Value
    /// FieldName ::= String | Identifier
    fn parse_field_declaration(&mut self) -> Result<FieldDeclaration, ParserError> {
        let token = self.current_token("a string or identifier as field name")?.clone();
        let name = match &token.ttype {
            TokenType::String(s) => FieldName::String(s.clone()),
            TokenType::Identifier(path) => FieldName::Identifier(self.validate_path(path, &token)?),
            _ => return Err(self.err_unexpected("a string or identifier as field name")),
        };
        self.advance();

        self.expect(TokenType::Colon, "':' after field name")?;
        let value = self.parse_value()?;

        Ok(FieldDeclaration {
            name,
            value,
            pos_start: token.pos_start,
            pos_end: token.pos_end,
        })
    }

    /// Value ::= String | Number | "true" | "false" | Identifier | Array | Object
    fn parse_value(&mut self) -> Result<Expr, ParserError> {
        let start_token = self.current_token("a value")?.clone();

        let (kind, pos_end) = match &start_token.ttype {
            TokenType::LBrace => {
                let (fields, end) = self.parse_object()?;
                (ExprKind::Block(fields), end)
            }
            TokenType::LBracket => {
                let (values, end) = self.parse_array()?;
                (ExprKind::Array(values), end)
            }
            TokenType::String(s) => {
                self.advance();
                (ExprKind::Literal(Literal::String(s.clone())), start_token.pos_end)
            }
            TokenType::Number(n) => {
                self.advance();
                (ExprKind::Literal(Literal::Number(*n)), start_token.pos_end)
            }
            TokenType::True => {
                self.advance();
                (ExprKind::Literal(Literal::Boolean(true)), start_token.pos_end)
            }
            TokenType::False => {
                self.advance();
                (ExprKind::Literal(Literal::Boolean(false)), start_token.pos_end)
            }
            TokenType::Identifier(path) => {
                let path = self.validate_path(path, &start_token)?;
                self.advance();
                (ExprKind::Identifier(path), start_token.pos_end)
            }
            _ => return Err(self.err_unexpected("a value")),
        };

        Ok(Expr {
            kind,
            pos_start: start_token.pos_start,
            pos_end,
        })
    }

    fn validate_path(&self, path: &str, token: &Token) -> Result<String, ParserError> {
        if is_valid_path(path) {
            Ok(path.to_string())
        } else {
            Err(ParserError::InvalidPath {
                src: (*self.source).clone(),
                span: (token.pos_start, token.pos_end - token.pos_start).into(),
                path: path.to_string(),
            })
        }
    }

    // === Tokenizer Helper Methods ===

    fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn current_token(&self, expected: &str) -> Result<&Token, ParserError> {
        self.tokens.get(self.position).ok_or_else(|| {
            let pos = self.source_text.len().saturating_sub(1);
            ParserError::UnexpectedEof {
                src: (*self.source).clone(),
                span: (pos, 0).into(),
                expected: expected.to_string(),
            }
        })
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn expect(&mut self, expected: TokenType, description: &str) -> Result<Token, ParserError> {
        let token = self.current_token(description)?.clone();
        if std::mem::discriminant(&token.ttype) == std::mem::discriminant(&expected) {
            self.advance();
            Ok(token)
        } else {
            Err(self.err_unexpected(description))
        }
    }

    fn match_token(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, ttype: TokenType) -> bool {
        self.tokens.get(self.position).is_some_and(|token| {
            std::mem::discriminant(&token.ttype) == std::mem::discriminant(&ttype)
        })
    }

    fn err_unexpected(&self, expected: &str) -> ParserError {
        match self.current_token(expected) {
            Ok(token) => ParserError::UnexpectedToken {
                src: (*self.source).clone(),
                span: (token.pos_start, token.pos_end - token.pos_start).into(),
                expected: expected.to_string(),
            },
            Err(eof) => eof,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::Report;

    fn parse_ok(source: &str) -> Vec<FieldDeclaration> {
        let mut parser = Parser::new_with_name(source, "test.tmpl".to_string());
        match parser.parse_template() {
            Ok(fields) => fields,
            Err(err) => {
                let report = Report::from(err);
                panic!("{:#}", report);
            }
        }
    }

    fn parse_err(source: &str) -> ParserError {
        match Parser::new(source).parse_template() {
            Ok(fields) => panic!("Expected a syntax error, got {:?}", fields),
            Err(TemplateError::Parser(err)) => err,
            Err(other) => panic!("Expected a syntax error, got {:?}", other),
        }
    }

    fn literal(expr: &Expr) -> &Literal {
        match &expr.kind {
            ExprKind::Literal(l) => l,
            other => panic!("Expected a literal, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_ok("").is_empty());
        assert!(parse_ok("  \n ").is_empty());
    }

    #[test]
    fn test_empty_object() {
        assert!(parse_ok("{}").is_empty());
    }

    #[test]
    fn test_simple_fields() {
        let fields = parse_ok(r#"{ "a": "v", b: 1.5, "c": true, d: false }"#);
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0].name, FieldName::String("a".to_string()));
        assert_eq!(
            literal(&fields[0].value),
            &Literal::String("v".to_string())
        );
        assert_eq!(fields[1].name, FieldName::Identifier("b".to_string()));
        assert_eq!(literal(&fields[1].value), &Literal::Number(1.5));
        assert_eq!(literal(&fields[2].value), &Literal::Boolean(true));
        assert_eq!(literal(&fields[3].value), &Literal::Boolean(false));
    }

    #[test]
    fn test_identifier_value() {
        let fields = parse_ok("{ name: user.name }");
        assert_eq!(
            fields[0].value.kind,
            ExprKind::Identifier("user.name".to_string())
        );
    }

    #[test]
    fn test_nested_block_and_array() {
        let fields = parse_ok(r#"{ "o": { "x": [1, [2], { "y": z }] } }"#);
        let inner = match &fields[0].value.kind {
            ExprKind::Block(inner) => inner,
            other => panic!("Expected a block, got {:?}", other),
        };
        let elements = match &inner[0].value.kind {
            ExprKind::Array(elements) => elements,
            other => panic!("Expected an array, got {:?}", other),
        };
        assert_eq!(elements.len(), 3);
        assert!(matches!(elements[1].kind, ExprKind::Array(ref a) if a.len() == 1));
        assert!(matches!(elements[2].kind, ExprKind::Block(ref b) if b.len() == 1));
    }

    #[test]
    fn test_empty_array() {
        let fields = parse_ok(r#"{ "a": [] }"#);
        assert_eq!(fields[0].value.kind, ExprKind::Array(vec![]));
    }

    #[test]
    fn test_spans_cover_composite_values() {
        let source = r#"{ "a": [1, 2] }"#;
        let fields = parse_ok(source);
        let value = &fields[0].value;
        assert_eq!(&source[value.pos_start..value.pos_end], "[1, 2]");
        assert_eq!(&source[fields[0].pos_start..fields[0].pos_end], "\"a\"");
    }

    #[test]
    fn test_multiple_roots_are_merged_by_default() {
        let fields = parse_ok(r#"{ "a": 1 } { "b": 2 }"#);
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_multiple_roots_rejected_with_single_root() {
        let result = Parser::new(r#"{ "a": 1 } { "b": 2 }"#)
            .with_options(Options::new().single_root(true))
            .parse_template();
        assert!(matches!(
            result,
            Err(TemplateError::Parser(ParserError::MultipleRoots { .. }))
        ));
    }

    #[test]
    fn test_trailing_comma_is_rejected() {
        assert!(matches!(
            parse_err(r#"{"a": 1,}"#),
            ParserError::UnexpectedToken { .. }
        ));
        assert!(matches!(
            parse_err(r#"{"a": [1,]}"#),
            ParserError::UnexpectedToken { .. }
        ));
    }

    #[test]
    fn test_missing_comma_is_rejected() {
        match parse_err(r#"{"a": 1 "b": 2}"#) {
            ParserError::UnexpectedToken { expected, .. } => assert_eq!(expected, "',' or '}'"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_missing_colon() {
        match parse_err(r#"{"a" 1}"#) {
            ParserError::UnexpectedToken { expected, .. } => {
                assert_eq!(expected, "':' after field name")
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_top_level_must_be_object() {
        match parse_err(r#"["a"]"#) {
            ParserError::UnexpectedToken { expected, .. } => assert_eq!(expected, "an object"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_number_is_not_a_field_name() {
        assert!(matches!(
            parse_err("{ 1: 2 }"),
            ParserError::UnexpectedToken { .. }
        ));
    }

    #[test]
    fn test_unexpected_eof() {
        assert!(matches!(
            parse_err("{ key: "),
            ParserError::UnexpectedEof { .. }
        ));
        assert!(matches!(
            parse_err("{ key: [1, 2"),
            ParserError::UnexpectedEof { .. }
        ));
    }

    #[test]
    fn test_invalid_paths() {
        for source in ["{ a: .b }", "{ a.: 1 }", "{ x: a..b }"] {
            assert!(
                matches!(parse_err(source), ParserError::InvalidPath { .. }),
                "{source} should be rejected"
            );
        }
    }

    #[test]
    fn test_number_out_of_range() {
        let source = format!("{{ \"a\": [1, {}] }}", "1".repeat(320));
        assert!(matches!(
            parse_err(&source),
            ParserError::NumberOutOfRange { .. }
        ));
    }

    #[test]
    fn test_lexer_diagnostics_are_kept() {
        let mut parser = Parser::new(r#"{ "a": 1 } %"#);
        assert_eq!(parser.diagnostics().len(), 1);
        assert_eq!(parser.parse_template().unwrap().len(), 1);
        assert_eq!(parser.take_diagnostics().len(), 1);
        assert!(parser.diagnostics().is_empty());
    }

    #[test]
    fn test_from_tokens() {
        let source = r#"{ "a": b }"#;
        let tokens = Lexer::new(source).scan().tokens;
        let fields = Parser::from_tokens(tokens, source, "tokens".to_string())
            .parse_template()
            .unwrap();
        assert_eq!(fields[0].value.kind, ExprKind::Identifier("b".to_string()));
    }
}
