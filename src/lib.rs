//! dftemplate - compiles builder calls into DiamondFire code templates
//!
//! Calls are recorded by a [`GraphBuilder`], flattened into a balanced node
//! sequence, emitted as codeblock and bracket records, and finally encoded
//! as the gzip+base64 code string the platform imports.
//!
//! # Example
//!
//! ```rust
//! use dftemplate::graph::ActionNode;
//! use dftemplate::{Compiler, CompilerConfig, TemplateHeader};
//!
//! let compiler = Compiler::new(CompilerConfig::default());
//! let mut builder = compiler.builder();
//! builder.add_action(ActionNode::event("Join")).unwrap();
//! builder
//!     .add_action(ActionNode::player("SendMessage").with_param("Hello"))
//!     .unwrap();
//!
//! let encoded = compiler
//!     .encode(builder, TemplateHeader::new("greeting", "someone"))
//!     .unwrap();
//! assert!(!encoded.code.is_empty());
//! ```

pub mod block;
pub mod config;
pub mod emit;
pub mod error;
pub mod graph;
pub mod registry;
pub mod script;
pub mod template;
pub mod value;

pub use config::{CompilerConfig, ConfigError, Limits};
pub use emit::{Emitter, SchemaError, SchemaTable};
pub use error::{CompileError, ScriptError, Span};
pub use graph::{resolve, ActionGraph, FlatNode, GraphBuilder};
pub use template::{decode, EncodedTemplate, Template, TemplateHeader};
pub use value::{Value, ValueError, ValueKind};

use thiserror::Error;
use tracing::debug;

/// Errors from the script-driven pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The script could not be read
    #[error("script errors: {}", format_script_errors(.0))]
    Script(Vec<ScriptError>),

    /// A builder call was rejected; `span` is the statement that issued it
    #[error("{error}")]
    Compile {
        error: CompileError,
        span: Option<Span>,
    },
}

impl From<Vec<ScriptError>> for PipelineError {
    fn from(errors: Vec<ScriptError>) -> Self {
        PipelineError::Script(errors)
    }
}

impl PipelineError {
    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        match self {
            PipelineError::Script(errors) => errors
                .iter()
                .map(|e| e.format(source, filename))
                .collect::<Vec<_>>()
                .join("\n"),
            PipelineError::Compile {
                error,
                span: Some(span),
            } => {
                let message = error.to_string();
                error::format_report(source, filename, span, &message, &message)
            }
            PipelineError::Compile { error, span: None } => format!("Error: {error}"),
        }
    }
}

fn format_script_errors(errors: &[ScriptError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// The resolved node sequence alongside the template built from it
#[derive(Debug, Clone)]
pub struct Compiled {
    pub nodes: Vec<FlatNode>,
    pub template: Template,
}

/// Runs the resolve, emit and encode stages for finished builder sessions
///
/// A compiler holds no per-compilation state, so one instance can serve any
/// number of builders, on any number of threads.
#[derive(Debug, Clone)]
pub struct Compiler<'a> {
    config: CompilerConfig,
    schema: &'a SchemaTable,
}

impl Compiler<'static> {
    /// Compiler using the built-in schema table
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config,
            schema: SchemaTable::builtin(),
        }
    }
}

impl<'a> Compiler<'a> {
    pub fn with_schema(config: CompilerConfig, schema: &'a SchemaTable) -> Self {
        Self { config, schema }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn schema(&self) -> &'a SchemaTable {
        self.schema
    }

    /// A fresh builder session
    pub fn builder(&self) -> GraphBuilder {
        GraphBuilder::new()
    }

    /// Header using the configured author
    pub fn header(&self, name: impl Into<String>) -> TemplateHeader {
        TemplateHeader::new(name, self.config.author.clone())
    }

    /// Resolve and emit, keeping the flat node sequence for diagnostics
    pub fn compile_detailed(
        &self,
        builder: GraphBuilder,
        header: TemplateHeader,
    ) -> Result<Compiled, CompileError> {
        let graph = builder.finish();
        let nodes = resolve(graph)?;

        let records = Emitter::new(self.schema, &self.config.limits).emit(&nodes)?;
        Ok(Compiled {
            nodes,
            template: Template::new(header, records),
        })
    }

    pub fn compile(
        &self,
        builder: GraphBuilder,
        header: TemplateHeader,
    ) -> Result<Template, CompileError> {
        self.compile_detailed(builder, header).map(|c| c.template)
    }

    /// Compile and encode into the platform's code string
    pub fn encode(
        &self,
        builder: GraphBuilder,
        header: TemplateHeader,
    ) -> Result<EncodedTemplate, CompileError> {
        self.compile(builder, header)?.encode(&self.config)
    }
}

/// Compile a call script, mapping compile errors back to statement spans
pub fn compile_script(
    source: &str,
    compiler: &Compiler<'_>,
    header: TemplateHeader,
) -> Result<Compiled, PipelineError> {
    let script = script::parse(source)?;
    debug!(statements = script.statements.len(), "parsed call script");

    let mut builder = compiler.builder();
    script::interpret(&script, &mut builder)?;

    compiler
        .compile_detailed(builder, header)
        .map_err(|error| {
            // Statement i issued call i
            let span = error
                .index()
                .and_then(|i| script.statements.get(i))
                .map(|stmt| stmt.span.clone());
            PipelineError::Compile { error, span }
        })
}

/// Compile and encode a call script with the default configuration
///
/// # Example
///
/// ```rust
/// use dftemplate::{compile_source, decode};
///
/// let encoded = compile_source(r#"
///     event Join
///     action player SendMessage ("Welcome!")
/// "#).unwrap();
///
/// let document = decode(&encoded.code).unwrap();
/// assert_eq!(document.blocks.len(), 2);
/// ```
pub fn compile_source(source: &str) -> Result<EncodedTemplate, PipelineError> {
    let compiler = Compiler::new(CompilerConfig::default());
    let compiled = compile_script(source, &compiler, compiler.header("template"))?;
    compiled
        .template
        .encode(compiler.config())
        .map_err(|error| PipelineError::Compile { error, span: None })
}
