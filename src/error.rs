use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Any failure that stops a template from rendering.
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum TemplateError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Eval(#[from] EvalError),

    #[error("Invalid request: {message}")]
    #[diagnostic(
        code(request::invalid),
        help("A request is a JSON object with a string `template` and an optional object `data`.")
    )]
    InvalidRequest { message: String },
}

/// A problem found while scanning. These are collected rather than raised:
/// the lexer skips past them and keeps going.
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum LexError {
    #[error("Unrecognized character '{character}'")]
    #[diagnostic(
        code(lexer::unrecognized_character),
        severity(Warning),
        help("Templates only contain braces, brackets, commas, colons, strings, numbers, booleans and identifiers.")
    )]
    UnrecognizedCharacter {
        character: char,
        #[source_code]
        src: NamedSource<String>,
        #[label("skipped")]
        span: SourceSpan,
    },

    #[error("Unterminated string")]
    #[diagnostic(
        code(lexer::unterminated_string),
        severity(Warning),
        help("Close the string with a double quote.")
    )]
    UnterminatedString {
        #[source_code]
        src: NamedSource<String>,
        #[label("string starts here and runs to the end of the template")]
        span: SourceSpan,
    },

    #[error("Number out of range")]
    #[diagnostic(
        code(lexer::number_out_of_range),
        severity(Warning),
        help("Numbers must fit in a 64-bit float. The literal was dropped.")
    )]
    NumberOutOfRange {
        #[source_code]
        src: NamedSource<String>,
        #[label("too large")]
        span: SourceSpan,
    },
}

impl LexError {
    /// Byte offset of the problem in the template.
    pub fn offset(&self) -> usize {
        match self {
            LexError::UnrecognizedCharacter { span, .. }
            | LexError::UnterminatedString { span, .. }
            | LexError::NumberOutOfRange { span, .. } => span.offset(),
        }
    }
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ParserError {
    #[error("Unexpected token")]
    #[diagnostic(
        code(parser::unexpected_token),
        help("The parser found a token it did not expect in this position.")
    )]
    UnexpectedToken {
        #[source_code]
        src: NamedSource<String>,
        #[label("Expected {expected}, but found this")]
        span: SourceSpan,
        expected: String,
    },

    #[error("Unexpected end of template")]
    #[diagnostic(
        code(parser::unexpected_eof),
        help("The template ended unexpectedly. The parser expected more tokens.")
    )]
    UnexpectedEof {
        #[source_code]
        src: NamedSource<String>,
        #[label("Expected {expected} here")]
        span: SourceSpan,
        expected: String,
    },

    #[error("Invalid path `{path}`")]
    #[diagnostic(
        code(parser::invalid_path),
        help("A path is one or more names joined by single dots, like `user.address.city`.")
    )]
    InvalidPath {
        #[source_code]
        src: NamedSource<String>,
        #[label("not a valid path")]
        span: SourceSpan,
        path: String,
    },

    #[error("Multiple top-level objects")]
    #[diagnostic(
        code(parser::multiple_roots),
        help("Merge the fields into a single object, or disable `single_root`.")
    )]
    MultipleRoots {
        #[source_code]
        src: NamedSource<String>,
        #[label("second object starts here")]
        span: SourceSpan,
    },

    #[error("Number literal out of range")]
    #[diagnostic(
        code(parser::number_out_of_range),
        help("Numbers must fit in a 64-bit float.")
    )]
    NumberOutOfRange {
        #[source_code]
        src: NamedSource<String>,
        #[label("this number")]
        span: SourceSpan,
    },
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum EvalError {
    #[error("undefined value for {segment}")]
    #[diagnostic(
        code(eval::undefined_value),
        help("Every identifier must name a key in the data, following dots into nested objects.")
    )]
    UndefinedValue {
        segment: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("`{segment}` is not defined here")]
        span: SourceSpan,
    },

    #[error("expected string as field name, found {found}")]
    #[diagnostic(
        code(eval::field_name_not_string),
        help("An identifier used as a field name must resolve to a string.")
    )]
    FieldNameNotString {
        found: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("resolves to {found}")]
        span: SourceSpan,
    },

    #[error("cannot look up {segment} in {found}")]
    #[diagnostic(
        code(eval::not_an_object),
        help("Strict paths only descend into objects. Shorten the path or disable `strict_paths`.")
    )]
    NotAnObject {
        segment: String,
        found: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("path continues past a non-object value")]
        span: SourceSpan,
    },
}
