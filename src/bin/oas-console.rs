//! OAS Console CLI
//!
//! Command-line companion for the console core: inspect the operation
//! registry derived from an OpenAPI document, resolve per-view field lists,
//! and check a console config before deploying it.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use oas_console::{
    build_registry, load_document, load_document_auto, resolve_base_url, resolve_fields,
    ConsoleConfig, NavIndex, OperationRegistry, SchemaShape,
};

#[derive(Parser)]
#[command(name = "oas-console")]
#[command(about = "Inspect the operation registry and config of an OAS-driven console")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and print the operation registry for an OpenAPI document
    Registry {
        /// OpenAPI document: file path or URL (http:// or https://)
        oas: String,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the resolved field list for one collection view
    Fields {
        /// OpenAPI document: file path or URL
        oas: String,

        /// Console config file
        #[arg(long)]
        config: PathBuf,

        /// Collection path, e.g. /pets
        #[arg(long)]
        path: String,

        /// Which view's overrides to apply
        #[arg(long, value_enum, default_value = "list")]
        view: View,
    },

    /// Validate a console config, optionally against an OpenAPI document
    Check {
        /// Console config file
        config: PathBuf,

        /// OpenAPI document to cross-check navigation paths against
        #[arg(long)]
        oas: Option<String>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum View {
    List,
    Form,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Registry { oas, pretty } => run_registry(&oas, pretty).await,
        Commands::Fields {
            oas,
            config,
            path,
            view,
        } => run_fields(&oas, &config, &path, view).await,
        Commands::Check { config, oas } => run_check(&config, oas.as_deref()).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

async fn load_oas(source: &str) -> Result<serde_json::Value, u8> {
    load_document_auto(source).await.map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn load_config(path: &PathBuf) -> Result<ConsoleConfig, u8> {
    let raw = load_document(path).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    let config = ConsoleConfig::from_value(raw).map_err(|e| {
        eprintln!("Error: invalid config {}: {}", path.display(), e);
        2u8
    })?;
    config.validate().map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    Ok(config)
}

async fn run_registry(oas_source: &str, pretty: bool) -> Result<(), u8> {
    let oas = load_oas(oas_source).await?;
    let registry = build_registry(&oas);

    let json_output = if pretty {
        serde_json::to_string_pretty(&registry)
    } else {
        serde_json::to_string(&registry)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", json_output);
    Ok(())
}

async fn run_fields(
    oas_source: &str,
    config_path: &PathBuf,
    collection_path: &str,
    view: View,
) -> Result<(), u8> {
    let oas = load_oas(oas_source).await?;
    let config = load_config(config_path)?;
    let registry = build_registry(&oas);
    let nav = NavIndex::build(&config.navigation);

    let Some(collection) = registry.collections.get(collection_path) else {
        eprintln!("Error: no collection registered for {}", collection_path);
        return Err(1);
    };

    // List views read the list response schema; form views prefer the create
    // request schema and fall back to the response shape.
    let schema = match view {
        View::List => collection.get.as_ref().and_then(|op| op.response_schema.as_ref()),
        View::Form => collection
            .post
            .as_ref()
            .and_then(|op| op.request_schema.as_ref())
            .or_else(|| collection.get.as_ref().and_then(|op| op.response_schema.as_ref())),
    };
    let Some(schema) = schema else {
        eprintln!("Error: no schema available for {}", collection_path);
        return Err(1);
    };

    let shape = SchemaShape::of(schema);
    let overrides = match view {
        View::List => nav.list_overrides(collection_path),
        View::Form => nav.form_field_overrides(collection_path),
    };
    let fields = resolve_fields(shape.fields(), nav.display_fields(collection_path), overrides);

    for field in fields {
        println!("{}", field);
    }
    Ok(())
}

async fn run_check(config_path: &PathBuf, oas_source: Option<&str>) -> Result<(), u8> {
    let config = load_config(config_path)?;

    let registry: Option<OperationRegistry> = match oas_source {
        Some(source) => {
            let oas = load_oas(source).await?;
            let registry = build_registry(&oas);
            if let Some(base_url) = resolve_base_url(Some(&config), &oas) {
                println!("base URL: {}", base_url);
            } else {
                println!("base URL: (none configured and no servers entry)");
            }
            Some(registry)
        }
        None => None,
    };

    let nav = NavIndex::build(&config.navigation);
    let mut missing = 0usize;
    for entry in nav.entries() {
        let path = &entry.collection.path;
        match &registry {
            Some(registry) if !registry.collections.contains_key(path) => {
                eprintln!("  missing: {} ({})", path, entry.label);
                missing += 1;
            }
            _ => println!("  ok: {} ({})", path, entry.label),
        }
    }

    if missing > 0 {
        eprintln!("{} navigation path(s) missing from the registry", missing);
        return Err(1);
    }
    println!("config ok: {} bound collection(s)", nav.entries().len());
    Ok(())
}
