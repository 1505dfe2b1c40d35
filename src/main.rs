//! `jsonplate` command line entry point.
//!
//! Renders a template against JSON data, the same way a request to the
//! template service would be handled:
//! - `jsonplate request.json` reads `{"template": ..., "data": ...}`
//! - `jsonplate --template t.tmpl --data d.json` reads the parts separately

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::exit;

use clap::{Parser, ValueEnum};
use jsonplate_core::{compile_with, error_body, Environment, Options, Rendered, TemplateError};
use tracing_subscriber::EnvFilter;

/// Render a JSON template against data.
#[derive(Debug, Parser)]
#[command(name = "jsonplate")]
#[command(about = "Render a JSON template against data", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Request file holding `{"template": ..., "data": ...}`; stdin when omitted
    #[arg(conflicts_with = "template")]
    pub request: Option<PathBuf>,

    /// Template file, instead of a request
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// JSON object with the data for `--template`
    #[arg(long, requires = "template")]
    pub data: Option<PathBuf>,

    /// Fail when a path continues past a value that is not an object
    #[arg(long)]
    pub strict_paths: bool,

    /// Reject templates with more than one top-level object
    #[arg(long)]
    pub single_root: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Json)]
    pub format: Format,

    /// Report failures and warnings as annotated source on stderr
    #[arg(long)]
    pub fancy: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Format {
    Json,
    Yaml,
}

/// Where the template came from, its text, and the data for it.
struct Input {
    name: String,
    template: String,
    data: Environment,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let options = Options::new()
        .strict_paths(cli.strict_paths)
        .single_root(cli.single_root);

    match read_input(&cli).and_then(|input| render(&input, options)) {
        Ok(rendered) => {
            if cli.fancy {
                for diagnostic in &rendered.diagnostics {
                    eprintln!("{:?}", miette::Report::new(diagnostic.clone()));
                }
            }
            match format(&rendered, &cli) {
                Ok(text) => println!("{text}"),
                Err(message) => {
                    eprintln!("{message}");
                    exit(2);
                }
            }
        }
        Err(err) => {
            if cli.fancy {
                eprintln!("{:?}", miette::Report::new(err));
            } else {
                println!("{}", error_body(&err));
            }
            exit(1);
        }
    }
}

fn render(input: &Input, options: Options) -> Result<Rendered, TemplateError> {
    log::debug!("rendering {}", input.name);
    compile_with(&input.template, &input.name, options)?.render(&input.data)
}

fn read_input(cli: &Cli) -> Result<Input, TemplateError> {
    if let Some(template_path) = &cli.template {
        let data = match &cli.data {
            Some(path) => serde_json::from_str(&read_file(path)?).map_err(|err| {
                TemplateError::InvalidRequest {
                    message: format!("{}: {err}", path.display()),
                }
            })?,
            None => Environment::new(),
        };
        return Ok(Input {
            name: template_path.display().to_string(),
            template: read_file(template_path)?,
            data,
        });
    }

    let (name, request) = match &cli.request {
        Some(path) => (
            path.display().to_string(),
            jsonplate_core::Request::from_path(path)?,
        ),
        None => {
            let mut body = String::new();
            io::stdin()
                .read_to_string(&mut body)
                .map_err(|err| TemplateError::InvalidRequest {
                    message: format!("failed reading stdin: {err}"),
                })?;
            ("<stdin>".to_string(), jsonplate_core::Request::from_json(&body)?)
        }
    };

    Ok(Input {
        name,
        template: request.template,
        data: request.data,
    })
}

fn read_file(path: &Path) -> Result<String, TemplateError> {
    std::fs::read_to_string(path).map_err(|err| TemplateError::InvalidRequest {
        message: format!("cannot read {}: {err}", path.display()),
    })
}

fn format(rendered: &Rendered, cli: &Cli) -> Result<String, String> {
    match cli.format {
        Format::Json if cli.pretty => rendered.to_json_pretty().map_err(|e| e.to_string()),
        Format::Json => rendered.to_json().map_err(|e| e.to_string()),
        Format::Yaml => rendered
            .to_yaml()
            .map(|yaml| yaml.trim_end().to_string())
            .map_err(|e| e.to_string()),
    }
}
