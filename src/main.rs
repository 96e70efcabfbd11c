//! sapnwrfc - SAP NetWeaver RFC diagnostics
//!
//! Command line entry point for checking connectivity, reading connection
//! attributes and inspecting function module metadata.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sapnwrfc::ffi::{NativeRfc, RfcInterop};
use sapnwrfc::{
    Connection, ConnectionParameters, FieldDescriptor, FunctionDescriptor, RfcConfig, ValueKind,
};
use serde_json::{json, Value as Json};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sapnwrfc")]
#[command(version)]
#[command(about = "SAP NetWeaver RFC diagnostics", long_about = None)]
struct Cli {
    /// Config file (default: sapnwrfc.toml in this or a parent directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Connection parameter, overrides the config file
    #[arg(
        short = 'p',
        long = "param",
        value_name = "KEY=VALUE",
        global = true,
        value_parser = parse_param
    )]
    params: Vec<(String, String)>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and ping the server
    Ping,

    /// Connect and print the connection attributes
    Attributes,

    /// Print the parameters of a function module
    Describe {
        /// Function module name
        name: String,
    },
}

fn parse_param(pair: &str) -> Result<(String, String), String> {
    ConnectionParameters::parse_pair(pair).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => RfcConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => RfcConfig::load_from_cwd().context("Failed to load sapnwrfc.toml")?,
    };
    for (key, value) in cli.params {
        config.connection.set(&key, value);
    }

    let interop: Arc<dyn RfcInterop> = Arc::new(NativeRfc::load(&config.library_loader())?);
    let connection = Connection::open(interop, config.connection.clone())
        .context("Failed to connect")?;

    let output = match cli.command {
        Commands::Ping => cmd_ping(&connection),
        Commands::Attributes => cmd_attributes(&connection)?,
        Commands::Describe { name } => cmd_describe(&connection, &name)?,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_ping(connection: &Connection) -> Json {
    let alive = connection.ping();
    json!({ "ping": alive, "valid": connection.is_valid() })
}

fn cmd_attributes(connection: &Connection) -> Result<Json> {
    let attributes = connection
        .get_attributes()
        .context("Failed to read connection attributes")?;
    Ok(serde_json::to_value(attributes)?)
}

fn cmd_describe(connection: &Connection, name: &str) -> Result<Json> {
    let descriptor = connection
        .describe(name)
        .with_context(|| format!("Failed to describe {}", name))?;
    Ok(function_json(&descriptor))
}

fn function_json(descriptor: &FunctionDescriptor) -> Json {
    let parameters: Vec<Json> = descriptor
        .parameters
        .iter()
        .map(|p| {
            let mut entry = json!({
                "name": p.name,
                "direction": p.direction.as_str(),
                "type": p.rfc_type.to_string(),
                "kind": p.kind.to_string(),
                "length": p.nuc_length,
                "decimals": p.decimals,
                "optional": p.optional,
            });
            if !p.default_value.is_empty() {
                entry["default"] = json!(p.default_value);
            }
            if !p.description.is_empty() {
                entry["description"] = json!(p.description);
            }
            if let Some(fields) = nested_fields(&p.kind) {
                entry["fields"] = fields;
            }
            entry
        })
        .collect();

    json!({ "name": descriptor.name, "parameters": parameters })
}

fn nested_fields(kind: &ValueKind) -> Option<Json> {
    match kind {
        ValueKind::Structure(ty) | ValueKind::Table(ty) => {
            Some(Json::Array(ty.fields.iter().map(field_json).collect()))
        }
        _ => None,
    }
}

fn field_json(field: &FieldDescriptor) -> Json {
    let mut entry = json!({
        "name": field.name,
        "type": field.rfc_type.to_string(),
        "kind": field.kind.to_string(),
        "length": field.nuc_length,
        "decimals": field.decimals,
    });
    if let Some(fields) = nested_fields(&field.kind) {
        entry["fields"] = fields;
    }
    entry
}
