pub mod api;
pub mod ast;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod utils;
pub mod value;

pub use api::{compile, compile_with, error_body, render, render_with, Rendered, Request, Template};
pub use error::TemplateError;
pub use options::Options;
pub use value::{environment_from_json, Environment, Value};
