use crate::ast::FieldDeclaration;
use crate::error::{LexError, TemplateError};
use crate::interpreter::Interpreter;
use crate::options::Options;
use crate::parser::Parser;
use crate::value::{Environment, Value};
use miette::NamedSource;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// The result of a successful render.
/// Holds the output document together with any lexer diagnostics that were
/// recovered from along the way. Serializes as the document alone.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub value: Value,
    pub diagnostics: Vec<LexError>,
}

impl Serialize for Rendered {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.value.serialize(serializer)
    }
}

impl Rendered {
    /// Serializes the document into a compact JSON string.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self)
    }

    /// Serializes the document into a pretty-printed JSON string.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self)
    }

    /// Serializes the document into a YAML string.
    ///
    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self)
    }
}

/// A parsed template, ready to be rendered against any number of
/// environments. It is immutable, so it can be shared between threads.
#[derive(Debug, Clone)]
pub struct Template {
    declarations: Vec<FieldDeclaration>,
    source: Arc<NamedSource<String>>,
    diagnostics: Vec<LexError>,
    options: Options,
}

impl Template {
    pub fn declarations(&self) -> &[FieldDeclaration] {
        &self.declarations
    }

    pub fn diagnostics(&self) -> &[LexError] {
        &self.diagnostics
    }

    /// Renders the template against `env`.
    ///
    /// # Errors
    /// Returns a `TemplateError::Eval` on the first unresolved identifier or
    /// non-string field name. No partial document is produced.
    pub fn render(&self, env: &Environment) -> Result<Rendered, TemplateError> {
        let value = Interpreter::new(env, Arc::clone(&self.source))
            .with_options(self.options)
            .interpret(&self.declarations)?;
        Ok(Rendered {
            value,
            diagnostics: self.diagnostics.clone(),
        })
    }
}

/// Parses a template once so it can be rendered repeatedly.
///
/// # Arguments
///
/// * `source` - The template text.
/// * `name` - A name for the template, used in error reports.
///
/// # Errors
///
/// Returns a `TemplateError::Parser` on the first syntax error.
pub fn compile(source: &str, name: &str) -> Result<Template, TemplateError> {
    compile_with(source, name, Options::default())
}

/// Like [`compile`], with explicit [`Options`].
///
/// # Errors
///
/// Returns a `TemplateError::Parser` on the first syntax error.
pub fn compile_with(source: &str, name: &str, options: Options) -> Result<Template, TemplateError> {
    let mut parser = Parser::new_with_name(source, name.to_string()).with_options(options);
    let declarations = parser.parse_template()?;

    Ok(Template {
        source: Arc::clone(parser.source()),
        diagnostics: parser.take_diagnostics(),
        declarations,
        options,
    })
}

/// Renders a template against caller data.
///
/// This is the primary entry point: it scans, parses and evaluates in one
/// go. Lexer problems do not fail the render; they are returned in
/// [`Rendered::diagnostics`].
///
/// # Errors
///
/// Returns a `TemplateError` if parsing or evaluation fails.
pub fn render(source: &str, env: &Environment) -> Result<Rendered, TemplateError> {
    render_with(source, env, &Options::default())
}

/// Like [`render`], with explicit [`Options`].
///
/// # Errors
///
/// Returns a `TemplateError` if parsing or evaluation fails.
pub fn render_with(
    source: &str,
    env: &Environment,
    options: &Options,
) -> Result<Rendered, TemplateError> {
    compile_with(source, "template", *options)?.render(env)
}

/// A render request as received from a client: the template text and the
/// data to render it with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub template: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Environment,
}

// `"data": null` means no data, same as leaving the key out.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Environment, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Environment>::deserialize(deserializer)?.unwrap_or_default())
}

impl Request {
    /// Decodes a request body.
    ///
    /// # Errors
    /// Returns a `TemplateError::InvalidRequest` if the body is not a valid request.
    pub fn from_json(body: &str) -> Result<Self, TemplateError> {
        serde_json::from_str(body).map_err(invalid_request)
    }

    /// Decodes a request body from a reader.
    ///
    /// # Errors
    /// Returns a `TemplateError::InvalidRequest` if reading fails or the body
    /// is not a valid request.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TemplateError> {
        serde_json::from_reader(reader).map_err(invalid_request)
    }

    /// Reads and decodes a request file.
    ///
    /// # Errors
    /// Returns a `TemplateError::InvalidRequest` if the file cannot be read or
    /// decoded.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let body = std::fs::read_to_string(path).map_err(|err| TemplateError::InvalidRequest {
            message: format!("cannot read {}: {err}", path.display()),
        })?;
        Self::from_json(&body)
    }

    /// Renders the request's template against its data.
    ///
    /// # Errors
    /// Returns a `TemplateError` if parsing or evaluation fails.
    pub fn render(&self, options: &Options) -> Result<Rendered, TemplateError> {
        render_with(&self.template, &self.data, options)
    }
}

fn invalid_request(err: serde_json::Error) -> TemplateError {
    TemplateError::InvalidRequest {
        message: err.to_string(),
    }
}

/// The JSON body sent back to a client whose request failed:
/// `{"err": "<message>"}`.
pub fn error_body(err: &TemplateError) -> String {
    serde_json::json!({ "err": err.to_string() }).to_string()
}
