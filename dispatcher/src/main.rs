//! Dispatcher binary entry point
//!
//! Runs a single generation against a JSON template store and prints the
//! output and its log record as JSON.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use dispatcher::{Catalogue, Dispatcher, EngineConfig, InMemoryTemplateStore, ModelRegistry, VendorSet};
use shared::{Environment, GenerateRequest, TemplateRef, VersionSelector};

#[derive(Parser)]
#[command(name = "dispatcher")]
#[command(about = "Run a stored prompt template against its model vendor")]
struct Args {
    /// Template store snapshot (JSON with `templates` and `versions`)
    #[arg(long)]
    store: PathBuf,

    /// Template owner
    #[arg(long)]
    username: String,

    /// Package containing the template
    #[arg(long)]
    package: String,

    /// Template name
    #[arg(long)]
    template: String,

    /// Version label or DEV/PREVIEW/RELEASE
    #[arg(long, default_value = "RELEASE")]
    selector: String,

    /// Variable value as `typekey=value`, e.g. `stringname=Ada` (repeatable)
    #[arg(long = "var", value_name = "KEY=VALUE")]
    vars: Vec<String>,

    /// Shape the request without contacting the vendor
    #[arg(long)]
    dry_run: bool,

    /// Caller environment; DEV callers may run disabled models
    #[arg(long, default_value = "RELEASE")]
    environment: String,

    /// Catalogue JSON replacing the built-in one
    #[arg(long)]
    catalogue: Option<PathBuf>,

    /// Print the variables the selected version expects and exit
    #[arg(long)]
    list_variables: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

fn parse_vars(raw: &[String]) -> Result<HashMap<String, String>> {
    raw.iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
            _ => bail!("Invalid --var '{pair}', expected KEY=VALUE"),
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    shared::logging::init_tracing_with_level(args.log_level.as_deref());

    let config = EngineConfig::from_env()?;
    let catalogue = match &args.catalogue {
        Some(path) => Catalogue::from_file(path)?,
        None => Catalogue::builtin(),
    };
    let registry = Arc::new(ModelRegistry::new(catalogue)?);
    let store = Arc::new(InMemoryTemplateStore::from_file(&args.store)?);
    let vendors = VendorSet::from_config(&config)?;
    let dispatcher = Dispatcher::new(store, registry, vendors, config.dispatch_timeout());

    if args.list_variables {
        let reference = TemplateRef::new(&args.username, &args.package, &args.template);
        let variables = dispatcher
            .variables(&reference, &VersionSelector::parse(&args.selector))
            .await?;
        println!("{}", serde_json::to_string_pretty(&variables)?);
        return Ok(());
    }

    let environment: Environment = args
        .environment
        .parse()
        .with_context(|| format!("Invalid --environment '{}'", args.environment))?;

    let request = GenerateRequest {
        username: args.username,
        package: args.package,
        template: args.template,
        version_or_environment: args.selector,
        is_development: args.dry_run,
        environment,
        data: parse_vars(&args.vars)?,
    };

    info!("Dispatching {} @ {}", request.template_ref(), request.version_or_environment);
    let generation = dispatcher.dispatch(&request).await?;
    println!("{}", serde_json::to_string_pretty(&generation)?);
    Ok(())
}
