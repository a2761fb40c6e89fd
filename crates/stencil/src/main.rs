//! Stencil CLI - Main entry point

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stencil::ConfigurationBuilder;
use stencil_core::encoding::RawTextEncoding;
use stencil_core::key::ResolveType;
use stencil_core::template::TemplateSource;
use stencil_core::value::{TemplateValue, ViewBag};

#[derive(Parser)]
#[command(name = "stencil")]
#[command(version)]
#[command(about = "Stencil template engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and run a template file
    Render {
        /// Template file (generated statement-language source)
        template: PathBuf,

        /// JSON file providing the model
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Embed debug information and keep temp emission
        #[arg(long)]
        debug: bool,

        /// Write dynamic values without HTML encoding
        #[arg(long)]
        raw: bool,
    },

    /// Compile a template file and report diagnostics
    Check {
        /// Template file (generated statement-language source)
        template: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stencil=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            template,
            model,
            debug,
            raw,
        } => render(&template, model.as_deref(), debug, raw),
        Commands::Check { template } => check(&template),
    }
}

fn template_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "template".to_string())
}

fn load_model(path: Option<&Path>) -> Result<TemplateValue> {
    let Some(path) = path else {
        return Ok(TemplateValue::Null);
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading model file {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("parsing model file {}", path.display()))?;
    Ok(TemplateValue::from(json))
}

fn render(template: &Path, model: Option<&Path>, debug: bool, raw: bool) -> Result<()> {
    let source = fs::read_to_string(template)
        .with_context(|| format!("reading template {}", template.display()))?;
    let model = load_model(model)?;

    let mut builder = ConfigurationBuilder::new().debug(debug);
    if raw {
        builder = builder.encoding(Arc::new(RawTextEncoding));
    }
    let service = builder.build_service()?;

    let key = service.get_key(&template_name(template), ResolveType::Global)?;
    service.add_template(&key, TemplateSource::with_file(source, template))?;

    // The tracing macros import `tracing::field::debug` into their expansion
    // scope, which shadows a local named `debug`; rebind to avoid the clash.
    let debug_flag = debug;
    tracing::info!(template = %template.display(), debug = debug_flag, raw, "rendering template");
    let output = service.run(&key, model, ViewBag::new())?;
    println!("{output}");
    Ok(())
}

fn check(template: &Path) -> Result<()> {
    let source = fs::read_to_string(template)
        .with_context(|| format!("reading template {}", template.display()))?;

    let service = ConfigurationBuilder::new()
        .disable_temp_file_locking(true)
        .build_service()?;
    let key = service.get_key(&template_name(template), ResolveType::Global)?;
    service.add_template(&key, TemplateSource::with_file(source, template))?;

    tracing::info!(template = %template.display(), "checking template");
    match service.compile(&key) {
        Ok(_) => {
            println!("{}: ok", template.display());
            Ok(())
        }
        Err(err) => {
            tracing::debug!(
                template = %template.display(),
                diagnostics = err.diagnostics().len(),
                "compilation failed"
            );
            for diagnostic in err.diagnostics() {
                eprintln!("{}: {diagnostic}", template.display());
            }
            Err(err.into())
        }
    }
}
