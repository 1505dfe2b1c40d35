use crate::ast::{Expr, ExprKind, FieldDeclaration, FieldName, Literal};
use crate::error::EvalError;
use crate::options::Options;
use crate::utils::describe;
use crate::value::{Environment, Value};
use indexmap::IndexMap;
use miette::{NamedSource, SourceSpan};
use std::sync::Arc;
use thiserror::Error;

/// Why a path could not be resolved. Carries no source position; the
/// interpreter attaches one when it turns this into an [`EvalError`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    #[error("undefined value for {segment}")]
    Undefined { segment: String },

    #[error("cannot look up {segment} in {found}")]
    NotAnObject {
        segment: String,
        found: &'static str,
    },
}

/// Resolves a dotted path against the environment.
///
/// Each segment is looked up in the object reached so far. Once a segment
/// lands on something that is not an object, the remaining segments are
/// ignored and that value is the result, unless `strict` is set, in which
/// case continuing past it is an error.
pub fn resolve<'v>(
    env: &'v Environment,
    path: &str,
    strict: bool,
) -> Result<&'v Value, PathError> {
    let mut segments = path.split('.');
    let first = segments.next().unwrap_or_default();
    let mut resolved = lookup(env, first)?;

    for segment in segments {
        let map = match resolved {
            Value::Object(map) => map,
            other if strict => {
                return Err(PathError::NotAnObject {
                    segment: segment.to_string(),
                    found: describe(other),
                })
            }
            _ => {
                log::trace!("path `{path}` stops before `{segment}`, ignoring the rest");
                break;
            }
        };
        resolved = lookup(map, segment)?;
    }

    Ok(resolved)
}

fn lookup<'v>(scope: &'v IndexMap<String, Value>, segment: &str) -> Result<&'v Value, PathError> {
    scope.get(segment).ok_or_else(|| PathError::Undefined {
        segment: segment.to_string(),
    })
}

/// Evaluates parsed field declarations against a read-only environment.
/// Holds no state between calls, so one interpreter can render any number
/// of templates written against the same source.
pub struct Interpreter<'a> {
    env: &'a Environment,
    source: Arc<NamedSource<String>>,
    options: Options,
}

impl<'a> Interpreter<'a> {
    pub fn new(env: &'a Environment, source: Arc<NamedSource<String>>) -> Self {
        Self {
            env,
            source,
            options: Options::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Builds the output document: one object holding every top-level field.
    pub fn interpret(&self, declarations: &[FieldDeclaration]) -> Result<Value, EvalError> {
        let object = self.object(declarations)?;
        log::debug!("rendered object with {} fields", object.len());
        Ok(Value::Object(object))
    }

    // Duplicate names are allowed; the last one wins.
    fn object(
        &self,
        declarations: &[FieldDeclaration],
    ) -> Result<IndexMap<String, Value>, EvalError> {
        let mut object = IndexMap::with_capacity(declarations.len());
        for declaration in declarations {
            let name = self.field_name(declaration)?;
            let value = self.evaluate(&declaration.value)?;
            object.insert(name, value);
        }
        Ok(object)
    }

    fn field_name(&self, declaration: &FieldDeclaration) -> Result<String, EvalError> {
        match &declaration.name {
            FieldName::String(name) => Ok(name.clone()),
            FieldName::Identifier(path) => {
                let span = declaration.name_span();
                match self.resolve(path, span)? {
                    Value::String(name) => Ok(name.clone()),
                    other => Err(EvalError::FieldNameNotString {
                        found: describe(other).to_string(),
                        src: (*self.source).clone(),
                        span,
                    }),
                }
            }
        }
    }

    fn evaluate(&self, expr: &Expr) -> Result<Value, EvalError> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(match literal {
                Literal::String(s) => Value::String(s.clone()),
                Literal::Number(n) => Value::Number(*n),
                Literal::Boolean(b) => Value::Boolean(*b),
            }),
            ExprKind::Identifier(path) => self.resolve(path, expr.get_source_span()).cloned(),
            ExprKind::Array(elements) => elements
                .iter()
                .map(|element| self.evaluate(element))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            ExprKind::Block(declarations) => self.object(declarations).map(Value::Object),
        }
    }

    fn resolve(&self, path: &str, span: SourceSpan) -> Result<&'a Value, EvalError> {
        resolve(self.env, path, self.options.strict_paths).map_err(|err| match err {
            PathError::Undefined { segment } => EvalError::UndefinedValue {
                segment,
                src: (*self.source).clone(),
                span,
            },
            PathError::NotAnObject { segment, found } => EvalError::NotAnObject {
                segment,
                found: found.to_string(),
                src: (*self.source).clone(),
                span,
            },
        })
    }
}
