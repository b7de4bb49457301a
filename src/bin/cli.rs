//! Meta Engine CLI Client
//!
//! Command-line interface for creating, tagging and searching records on a
//! running `metaengine-server`.
//!
//! Two output modes:
//! - **Human** (default): Redis-style, e.g. `(integer) 42`, `1) "name" => "alice"`
//! - **JSON** (`--json`): `serde_json::to_string_pretty`

use std::collections::{BTreeMap, BTreeSet};

use clap::{Parser, Subcommand};
use metaengine::{Config, Fields, MetaEngine, MetaError, RecordId, Result};
use serde_json::json;

/// Meta Engine CLI
#[derive(Parser, Debug)]
#[command(name = "metaengine-cli")]
#[command(about = "CLI for the Meta Engine record store")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    server: String,

    /// Password for the server
    #[arg(short, long)]
    password: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a record from name=value pairs
    Create {
        /// Fields as name=value
        #[arg(required = true)]
        fields: Vec<String>,
    },

    /// Add or overwrite fields of a record
    Append {
        /// Record ID
        id: RecordId,

        /// Fields as name=value
        #[arg(required = true)]
        fields: Vec<String>,
    },

    /// Show every field of a record
    Get {
        /// Record ID
        id: RecordId,
    },

    /// Show all records with name=value
    Find { name: String, value: String },

    /// Show records with name=value that lack the exclude field
    Unprocessed {
        name: String,
        value: String,
        exclude: String,
    },

    /// Add new_name=new_value to every record with name=value
    Tag {
        name: String,
        value: String,
        new_name: String,
        new_value: String,
    },

    /// List every field name in use
    Fields,

    /// Dump the whole table as tab-separated rows, one column per field name
    Export,

    /// Ping the server
    Ping,
}

/// Output formatting mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

fn main() {
    let args = Args::parse();
    let mode = if args.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    match run(&args, mode) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("{}", format_error(&e, mode));
            std::process::exit(1);
        }
    }
}

fn run(args: &Args, mode: OutputMode) -> Result<String> {
    let mut builder = Config::builder().pool_size(1);
    if let Some(password) = &args.password {
        builder = builder.password(password.as_str());
    }
    let engine = MetaEngine::connect_with_config(&args.server, builder.build())?;

    let output = match &args.command {
        Commands::Create { fields } => {
            let id = engine.create_record(parse_pairs(fields)?)?;
            format_integer(id, mode)
        }
        Commands::Append { id, fields } => {
            engine.append_to_record(*id, parse_pairs(fields)?)?;
            format_ok(mode)
        }
        Commands::Get { id } => {
            let fields = engine.get_all_fields(*id)?;
            if fields.is_empty() {
                return Err(MetaError::RecordNotFound(*id));
            }
            format_fields(&fields, mode)
        }
        Commands::Find { name, value } => format_records(&engine.get_records(name, value)?, mode),
        Commands::Unprocessed {
            name,
            value,
            exclude,
        } => format_values(&engine.get_unprocessed_records(name, value, exclude)?, mode),
        Commands::Tag {
            name,
            value,
            new_name,
            new_value,
        } => {
            let count = engine.add_field_to_all_matched(name, value, new_name, new_value)?;
            format_integer(count as u64, mode)
        }
        Commands::Fields => format_names(&engine.field_names()?, mode),
        Commands::Export => {
            let names = engine.field_names()?;
            let records = engine.scan()?.collect::<Result<BTreeMap<_, _>>>()?;
            format_export(&names, &records, mode)
        }
        Commands::Ping => {
            engine.ping()?;
            match mode {
                OutputMode::Human => "PONG".to_string(),
                OutputMode::Json => pretty(json!({ "ok": "PONG" })),
            }
        }
    };
    Ok(output)
}

/// Split `name=value` arguments (the value may itself contain `=`)
fn parse_pairs(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|arg| {
            arg.split_once('=')
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .ok_or_else(|| {
                    MetaError::InvalidInput(format!("expected name=value, got '{}'", arg))
                })
        })
        .collect()
}

// =============================================================================
// Formatting
// =============================================================================

fn pretty(value: serde_json::Value) -> String {
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

fn format_error(err: &MetaError, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => pretty(json!({ "error": err.to_string() })),
        OutputMode::Human => format!("(error) {}", err),
    }
}

fn format_ok(mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => pretty(json!({ "ok": true })),
        OutputMode::Human => "OK".to_string(),
    }
}

fn format_integer(n: u64, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => n.to_string(),
        OutputMode::Human => format!("(integer) {}", n),
    }
}

fn format_fields(fields: &Fields, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => pretty(json!(fields)),
        OutputMode::Human => fields
            .iter()
            .enumerate()
            .map(|(i, (name, value))| format!("{}) \"{}\" => \"{}\"", i + 1, name, value))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn format_records(records: &BTreeMap<RecordId, Fields>, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => pretty(json!(records)),
        OutputMode::Human => records
            .iter()
            .map(|(id, fields)| {
                let body = format_fields(fields, mode)
                    .lines()
                    .map(|line| format!("   {}", line))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("record {}:\n{}", id, body)
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn format_values(values: &BTreeMap<RecordId, String>, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => pretty(json!(values)),
        OutputMode::Human => values
            .iter()
            .map(|(id, value)| format!("{}) \"{}\"", id, value))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn format_names(names: &BTreeSet<String>, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => pretty(json!(names)),
        OutputMode::Human if names.is_empty() => "(empty list)".to_string(),
        OutputMode::Human => names
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{}) \"{}\"", i + 1, name))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn format_export(
    names: &BTreeSet<String>,
    records: &BTreeMap<RecordId, Fields>,
    mode: OutputMode,
) -> String {
    match mode {
        OutputMode::Json => pretty(json!(records)),
        OutputMode::Human => {
            let header = std::iter::once("id")
                .chain(names.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join("\t");

            let mut rows = vec![header];
            for (id, fields) in records {
                let cells = names
                    .iter()
                    .map(|name| fields.get(name).map(String::as_str).unwrap_or(""));
                let row = std::iter::once(id.to_string())
                    .chain(cells.map(str::to_string))
                    .collect::<Vec<_>>()
                    .join("\t");
                rows.push(row);
            }
            rows.join("\n")
        }
    }
}
