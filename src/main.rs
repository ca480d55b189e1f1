//! dftemplate CLI
//!
//! Usage:
//!   dftemplate [OPTIONS] [FILE]
//!
//! Options:
//!   -c, --config <FILE>   Compiler configuration (TOML format)
//!   -s, --schema <FILE>   Extra action schemas, merged over the built-in table
//!   -n, --name <NAME>     Template name
//!   -a, --author <NAME>   Template author
//!   --dump                Print the indented block listing
//!   --json                Print the template document as JSON
//!   --envelope            Print the {author, name, version, code} envelope
//!   --decode <CODE>       Decode a template code string
//!   -d, --debug           Enable debug logging
//!   -h, --help            Print help

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use dftemplate::template::dump;
use dftemplate::{compile_script, decode, Compiler, CompilerConfig, SchemaTable};

#[derive(Parser)]
#[command(name = "dftemplate")]
#[command(about = "Compile call scripts into DiamondFire code templates")]
struct Cli {
    /// Input file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Compiler configuration (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Extra action schemas (TOML format), merged over the built-in table
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// Template name
    #[arg(short, long, default_value = "template")]
    name: String,

    /// Template author (overrides the configuration)
    #[arg(short, long)]
    author: Option<String>,

    /// Print the indented block listing instead of the code
    #[arg(long, conflicts_with_all = ["json", "envelope"])]
    dump: bool,

    /// Print the template document as pretty JSON instead of the code
    #[arg(long, conflicts_with = "envelope")]
    json: bool,

    /// Print the code wrapped in its {author, name, version, code} envelope
    #[arg(long)]
    envelope: bool,

    /// Decode a template code string and print its document
    #[arg(long, value_name = "CODE")]
    decode: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    if let Some(code) = &cli.decode {
        let document = match decode(code) {
            Ok(d) => d,
            Err(e) => fail(format!("Error: {e}")),
        };
        match serde_json::to_string_pretty(&document) {
            Ok(json) => println!("{json}"),
            Err(e) => fail(format!("Error: {e}")),
        }
        return;
    }

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => match CompilerConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => fail(format!(
                "Error loading config '{}': {}",
                path.display(),
                e
            )),
        },
        None => CompilerConfig::default(),
    };
    if let Some(author) = &cli.author {
        config = config.with_author(author.clone());
    }

    // Extra schemas override built-in entries with the same block and action
    let merged;
    let schema = match &cli.schema {
        Some(path) => match SchemaTable::from_file(path) {
            Ok(extra) => {
                merged = SchemaTable::builtin().clone().merge(extra);
                &merged
            }
            Err(e) => fail(format!(
                "Error loading schema '{}': {}",
                path.display(),
                e
            )),
        },
        None => SchemaTable::builtin(),
    };

    // Read input
    let (source, filename) = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => fail(format!("Error reading file '{}': {}", path.display(), e)),
        },
        None => {
            let mut buffer = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut buffer) {
                fail(format!("Error reading from stdin: {}", e));
            }
            (buffer, "<stdin>".to_string())
        }
    };

    let compiler = Compiler::with_schema(config, schema);
    let compiled = match compile_script(&source, &compiler, compiler.header(&cli.name)) {
        Ok(c) => c,
        Err(e) => fail(e.format(&source, &filename)),
    };

    if cli.dump {
        print!("{}", dump::render(&compiled.nodes));
        return;
    }

    let output = if cli.json {
        compiled.template.document_json_pretty()
    } else {
        compiled
            .template
            .encode(compiler.config())
            .and_then(|encoded| {
                if cli.envelope {
                    encoded.envelope_json()
                } else {
                    Ok(encoded.code)
                }
            })
    };
    match output {
        Ok(text) => println!("{text}"),
        Err(e) => fail(format!("Error: {e}")),
    }
}

fn fail(message: String) -> ! {
    eprintln!("{message}");
    process::exit(1);
}
